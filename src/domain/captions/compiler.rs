//! Transcript segments to caption cues.
//!
//! The compiler works on a flat stream of timed words:
//! 1. segments are normalized and split into words (using recognizer word
//!    timings when present, a length-proportional split otherwise)
//! 2. words are packed greedily into lines, breaking at sentence ends
//! 3. short lines are grouped into cues so nothing flickers
//! 4. cue boundaries are clamped, stretched and extended so that starts are
//!    strictly increasing and no cue overlaps the next one

use super::types::{quantize, CaptionCue, CompilerPolicy};
use crate::domain::media::{TimedWord, TranscriptSegment};
use crate::error::CompilerError;

/// Compile transcript segments into an ordered list of caption cues.
///
/// Returns [`CompilerError::NoCaptions`] when nothing survives normalization.
pub fn compile(
    segments: &[TranscriptSegment],
    policy: &CompilerPolicy,
) -> Result<Vec<CaptionCue>, CompilerError> {
    policy.validate()?;
    check_ordering(segments)?;

    let mut lines: Vec<Vec<TimedWord>> = Vec::new();
    let mut last_word_start = 0;
    for segment in segments {
        let words = segment_words(segment, &mut last_word_start);
        if words.is_empty() {
            continue;
        }
        lines.extend(pack_lines(words, policy.max_line_chars));
    }

    if lines.is_empty() {
        return Err(CompilerError::NoCaptions);
    }

    let groups = group_lines(lines, policy);
    Ok(place_cues(groups, policy))
}

fn check_ordering(segments: &[TranscriptSegment]) -> Result<(), CompilerError> {
    let mut previous_start: Option<u64> = None;
    for (index, segment) in segments.iter().enumerate() {
        if segment.end_ms < segment.start_ms {
            return Err(CompilerError::InvalidSegment {
                index,
                start_ms: segment.start_ms,
                end_ms: segment.end_ms,
            });
        }
        if let Some(previous_start_ms) = previous_start {
            if segment.start_ms < previous_start_ms {
                return Err(CompilerError::RegressingSegment {
                    index,
                    start_ms: segment.start_ms,
                    previous_start_ms,
                });
            }
        }
        previous_start = Some(segment.start_ms);
    }
    Ok(())
}

/// Collapse whitespace and drop characters the styled format reserves:
/// braces open override blocks and a backslash starts `\N`, `\n` or `\h`.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.replace(['{', '}', '\\'], ""))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn segment_words(segment: &TranscriptSegment, last_start: &mut u64) -> Vec<TimedWord> {
    let raw: Vec<TimedWord> = if segment.words.is_empty() {
        split_proportionally(segment)
    } else {
        segment
            .words
            .iter()
            .flat_map(|w| {
                // A recognizer "word" may itself contain spaces
                normalize_text(&w.text)
                    .split(' ')
                    .filter(|t| !t.is_empty())
                    .map(|t| TimedWord::new(t, w.start_ms, w.end_ms))
                    .collect::<Vec<_>>()
            })
            .collect()
    };

    raw.into_iter()
        .map(|w| {
            let start = quantize(w.start_ms).max(*last_start);
            let end = quantize(w.end_ms).max(start);
            *last_start = start;
            TimedWord::new(w.text, start, end)
        })
        .collect()
}

fn split_proportionally(segment: &TranscriptSegment) -> Vec<TimedWord> {
    let text = normalize_text(&segment.text);
    let tokens: Vec<&str> = text.split(' ').filter(|t| !t.is_empty()).collect();
    let total: u64 = tokens.iter().map(|t| t.chars().count() as u64).sum();
    if total == 0 {
        return Vec::new();
    }

    let span = segment.end_ms - segment.start_ms;
    let mut consumed = 0u64;
    tokens
        .into_iter()
        .map(|token| {
            let start = segment.start_ms + span * consumed / total;
            consumed += token.chars().count() as u64;
            let end = segment.start_ms + span * consumed / total;
            TimedWord::new(token, start, end)
        })
        .collect()
}

fn ends_sentence(word: &str) -> bool {
    word.trim_end_matches(['"', '\'', ')', '»', '”'])
        .ends_with(['.', '!', '?', '…'])
}

fn pack_lines(words: Vec<TimedWord>, max_chars: usize) -> Vec<Vec<TimedWord>> {
    let mut lines = Vec::new();
    let mut current: Vec<TimedWord> = Vec::new();
    let mut current_len = 0usize;

    for word in words {
        let word_len = word.text.chars().count();
        if !current.is_empty() && current_len + 1 + word_len > max_chars {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }

        current_len = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len
        };
        let sentence_end = ends_sentence(&word.text);
        current.push(word);

        if sentence_end {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn span_of(lines: &[Vec<TimedWord>]) -> u64 {
    let start = lines
        .first()
        .and_then(|l| l.first())
        .map_or(0, |w| w.start_ms);
    let end = lines.last().and_then(|l| l.last()).map_or(0, |w| w.end_ms);
    end.saturating_sub(start)
}

fn group_lines(lines: Vec<Vec<TimedWord>>, policy: &CompilerPolicy) -> Vec<Vec<Vec<TimedWord>>> {
    let min_display = policy.effective_min_display_ms();
    let mut groups: Vec<Vec<Vec<TimedWord>>> = Vec::new();
    let mut iter = lines.into_iter().peekable();

    while let Some(line) = iter.next() {
        let mut group = vec![line];
        while group.len() < policy.max_lines_per_cue && span_of(&group) < min_display {
            match iter.next() {
                Some(next) => group.push(next),
                None => break,
            }
        }
        groups.push(group);
    }
    groups
}

fn place_cues(groups: Vec<Vec<Vec<TimedWord>>>, policy: &CompilerPolicy) -> Vec<CaptionCue> {
    let frame = policy.frame_interval_ms();
    let min_display = policy.effective_min_display_ms();

    let mut cues: Vec<CaptionCue> = Vec::with_capacity(groups.len());
    let mut previous_end: Option<u64> = None;

    for (i, group) in groups.into_iter().enumerate() {
        let words: Vec<TimedWord> = group.iter().flatten().cloned().collect();
        let mut start = words.first().map_or(0, |w| w.start_ms);
        let mut end = words.last().map_or(0, |w| w.end_ms);

        // Overlap: later cue yields to the earlier one
        if let Some(prev) = previous_end {
            start = start.max(prev);
        }
        end = end.max(start + frame);
        previous_end = Some(end);

        cues.push(CaptionCue {
            index: i + 1,
            start_ms: start,
            end_ms: end,
            lines: group
                .iter()
                .map(|line| {
                    line.iter()
                        .map(|w| w.text.as_str())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect(),
            words,
        });
    }

    for i in 0..cues.len() {
        let mut target = cues[i].end_ms.max(cues[i].start_ms + min_display);
        if let Some(next) = cues.get(i + 1) {
            target = target.min(next.start_ms);
        }
        cues[i].end_ms = target.max(cues[i].end_ms);
    }

    cues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: u64, end: u64, text: &str) -> TranscriptSegment {
        TranscriptSegment::new(start, end, text)
    }

    fn assert_well_ordered(cues: &[CaptionCue]) {
        for (i, cue) in cues.iter().enumerate() {
            assert_eq!(cue.index, i + 1);
            assert!(cue.end_ms > cue.start_ms, "cue {} is empty", cue.index);
            assert!(!cue.lines.is_empty() && cue.lines.len() <= 2);
        }
        for pair in cues.windows(2) {
            assert!(pair[0].start_ms < pair[1].start_ms);
            assert!(pair[0].end_ms <= pair[1].start_ms);
        }
    }

    #[test]
    fn test_single_segment_single_cue() {
        let cues = compile(&[seg(0, 1200, "Hello world")], &CompilerPolicy::default()).unwrap();

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[0].start_ms, 0);
        assert_eq!(cues[0].end_ms, 1200);
        assert_eq!(cues[0].lines, vec!["Hello world".to_string()]);
    }

    #[test]
    fn test_minimum_display_duration() {
        let policy = CompilerPolicy::default();
        let cues = compile(&[seg(0, 50, "Hi")], &policy).unwrap();

        assert_eq!(cues.len(), 1);
        assert!(cues[0].end_ms >= policy.min_display_ms);
    }

    #[test]
    fn test_sub_frame_segment_is_stretched_but_not_into_next() {
        let policy = CompilerPolicy {
            max_lines_per_cue: 1,
            ..CompilerPolicy::default()
        };
        let cues = compile(
            &[seg(1000, 1000, "Blink."), seg(1100, 2500, "Then a long sentence.")],
            &policy,
        )
        .unwrap();

        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].start_ms, 1000);
        assert_eq!(cues[0].end_ms, 1100);
        assert_well_ordered(&cues);
    }

    #[test]
    fn test_empty_transcription_signals_no_captions() {
        let result = compile(&[], &CompilerPolicy::default());
        assert_eq!(result, Err(CompilerError::NoCaptions));

        let result = compile(&[seg(0, 500, "   "), seg(600, 900, "")], &CompilerPolicy::default());
        assert_eq!(result, Err(CompilerError::NoCaptions));
    }

    #[test]
    fn test_empty_segments_do_not_leave_index_gaps() {
        let cues = compile(
            &[
                seg(0, 1000, "First line here."),
                seg(1000, 1500, "  "),
                seg(1500, 3000, "Second line here."),
            ],
            &CompilerPolicy::default(),
        )
        .unwrap();

        let indices: Vec<usize> = cues.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn test_regressing_segments_are_rejected() {
        let result = compile(
            &[seg(1000, 2000, "later"), seg(500, 900, "earlier")],
            &CompilerPolicy::default(),
        );
        assert_eq!(
            result,
            Err(CompilerError::RegressingSegment {
                index: 1,
                start_ms: 500,
                previous_start_ms: 1000
            })
        );
    }

    #[test]
    fn test_inverted_segment_is_rejected() {
        let result = compile(&[seg(2000, 1000, "backwards")], &CompilerPolicy::default());
        assert!(matches!(result, Err(CompilerError::InvalidSegment { index: 0, .. })));
    }

    #[test]
    fn test_line_budget_and_sentence_breaks() {
        let policy = CompilerPolicy {
            max_line_chars: 20,
            max_lines_per_cue: 1,
            ..CompilerPolicy::default()
        };
        let cues = compile(
            &[seg(0, 6000, "Short one. This sentence is definitely longer than twenty")],
            &policy,
        )
        .unwrap();

        let texts: Vec<String> = cues.iter().map(|c| c.text()).collect();
        assert_eq!(texts[0], "Short one.");
        assert!(texts.iter().all(|t| t.chars().count() <= 20));
        assert_eq!(
            texts.join(" "),
            "Short one. This sentence is definitely longer than twenty"
        );
        assert_well_ordered(&cues);
    }

    #[test]
    fn test_overlong_word_gets_its_own_line() {
        let policy = CompilerPolicy {
            max_line_chars: 5,
            ..CompilerPolicy::default()
        };
        let cues = compile(&[seg(0, 3000, "a supercalifragilistic b")], &policy).unwrap();
        let lines: Vec<String> = cues.iter().flat_map(|c| c.lines.clone()).collect();
        assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn test_short_lines_are_grouped() {
        let policy = CompilerPolicy {
            max_line_chars: 10,
            ..CompilerPolicy::default()
        };
        let words = vec![
            TimedWord::new("Quick.", 0, 200),
            TimedWord::new("Fast.", 200, 400),
            TimedWord::new("Slow", 2000, 3000),
        ];
        let cues = compile(&[seg(0, 3000, "Quick. Fast. Slow").with_words(words)], &policy).unwrap();

        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].lines, vec!["Quick.", "Fast."]);
        assert_eq!(cues[0].start_ms, 0);
        assert_eq!(cues[0].end_ms, 700);
        assert_eq!(cues[1].lines, vec!["Slow"]);
        assert_eq!(cues[1].start_ms, 2000);
    }

    #[test]
    fn test_overlapping_segments_are_clamped() {
        let cues = compile(
            &[seg(0, 1500, "First sentence."), seg(1200, 2500, "Second sentence.")],
            &CompilerPolicy::default(),
        )
        .unwrap();

        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].end_ms, 1500);
        assert_eq!(cues[1].start_ms, 1500);
        assert_well_ordered(&cues);
    }

    #[test]
    fn test_word_timings_drive_cue_bounds() {
        let words = vec![
            TimedWord::new(" Hello", 120, 480),
            TimedWord::new(" there", 500, 1010),
        ];
        let cues = compile(
            &[seg(0, 1500, "Hello there").with_words(words)],
            &CompilerPolicy::default(),
        )
        .unwrap();

        assert_eq!(cues[0].start_ms, 120);
        assert_eq!(cues[0].end_ms, 1010);
        assert_eq!(cues[0].words.len(), 2);
        assert_eq!(cues[0].words[0].text, "Hello");
    }

    #[test]
    fn test_times_land_on_grid() {
        let cues = compile(
            &[seg(13, 1287, "Odd timings everywhere"), seg(1291, 2003, "again")],
            &CompilerPolicy::default(),
        )
        .unwrap();
        for cue in &cues {
            assert_eq!(cue.start_ms % 10, 0);
            assert_eq!(cue.end_ms % 10, 0);
        }
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  a \t b\n c  "), "a b c");
        assert_eq!(normalize_text("{\\i1}x{y}"), "i1xy");
        assert_eq!(normalize_text("C:\\New folder\\h"), "C:New folderh");
        assert_eq!(normalize_text(" { } "), "");
    }

    #[test]
    fn test_ordering_holds_for_dense_transcripts() {
        let mut segments = Vec::new();
        let mut t: u64 = 0;
        for i in 0..200u64 {
            let len = 20 + (i * 37) % 900;
            // every third segment overlaps its predecessor a little
            let start = if i % 3 == 0 { t.saturating_sub(15) } else { t };
            segments.push(seg(start, start + len, &format!("word{} and more words {}", i, i)));
            t = start + len;
        }

        let cues = compile(&segments, &CompilerPolicy::default()).unwrap();
        assert_well_ordered(&cues);
    }
}
