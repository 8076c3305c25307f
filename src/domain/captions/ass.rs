//! Styled captions in Advanced SubStation Alpha format.
//!
//! ASS timing is `H:MM:SS.cc` (centiseconds). The compiler keeps every cue on
//! a 10 ms grid, so nothing is lost relative to the SRT output.

use super::types::{CaptionCue, CaptionStyle, DecodedCue};
use crate::error::CaptionParseError;
use regex::Regex;
use std::sync::OnceLock;

const EVENT_FORMAT: &str = "Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";
const STYLE_FORMAT: &str = "Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding";

/// Write cues as a complete ASS script using a single `Default` style.
pub fn write_ass(cues: &[CaptionCue], style: &CaptionStyle) -> String {
    let mut output = String::new();

    output.push_str("[Script Info]\n");
    output.push_str("ScriptType: v4.00+\n");
    output.push_str(&format!("PlayResX: {}\n", style.play_res_x));
    output.push_str(&format!("PlayResY: {}\n", style.play_res_y));
    output.push_str("WrapStyle: 2\n");
    output.push_str("ScaledBorderAndShadow: yes\n\n");

    output.push_str("[V4+ Styles]\n");
    output.push_str(&format!("Format: {}\n", STYLE_FORMAT));
    output.push_str(&format!(
        "Style: Default,{},{},{},{},{},{},{},0,0,0,100,100,0,0,1,{},{},{},{},{},{},1\n\n",
        style.font_name,
        style.font_size,
        style.primary_colour,
        style.secondary_colour,
        style.outline_colour,
        style.back_colour,
        if style.bold { -1 } else { 0 },
        style.outline,
        style.shadow,
        style.alignment,
        style.margin_l,
        style.margin_r,
        style.margin_v,
    ));

    output.push_str("[Events]\n");
    output.push_str(&format!("Format: {}\n", EVENT_FORMAT));
    for cue in cues {
        let text = if style.karaoke && !cue.words.is_empty() {
            karaoke_text(cue)
        } else {
            cue.lines.join("\\N")
        };
        output.push_str(&format!(
            "Dialogue: 0,{},{},Default,,0,0,0,,{}\n",
            format_ass_time(cue.start_ms),
            format_ass_time(cue.end_ms),
            text
        ));
    }

    output
}

/// Format milliseconds as `H:MM:SS.cc`.
pub fn format_ass_time(ms: u64) -> String {
    let centis = (ms % 1000) / 10;
    let total_secs = ms / 1000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{}:{:02}:{:02}.{:02}", hours, mins, secs, centis)
}

/// Prefix every word with a `\k` tag covering its share of the cue.
///
/// The tags partition the cue exactly: the first word also owns any lead-in,
/// the last one owns the tail.
fn karaoke_text(cue: &CaptionCue) -> String {
    let mut marks = Vec::with_capacity(cue.words.len() + 1);
    marks.push(cue.start_ms);
    for word in cue.words.iter().skip(1) {
        let previous = *marks.last().unwrap_or(&cue.start_ms);
        marks.push(word.start_ms.clamp(previous, cue.end_ms));
    }
    marks.push(cue.end_ms);

    let mut words = cue.words.iter().enumerate();
    let mut rendered_lines = Vec::with_capacity(cue.lines.len());
    for line in &cue.lines {
        let count = line.split(' ').count();
        let rendered: Vec<String> = words
            .by_ref()
            .take(count)
            .map(|(i, w)| format!("{{\\k{}}}{}", (marks[i + 1] - marks[i]) / 10, w.text))
            .collect();
        rendered_lines.push(rendered.join(" "));
    }
    rendered_lines.join("\\N")
}

fn ass_time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+):(\d{2}):(\d{2})\.(\d{2})$").expect("ass time regex is valid"))
}

fn override_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[^}]*\}").expect("override tag regex is valid"))
}

/// Parse an `H:MM:SS.cc` timestamp into milliseconds.
pub fn parse_ass_time(value: &str) -> Option<u64> {
    let caps = ass_time_regex().captures(value.trim())?;
    let field = |i: usize| caps[i].parse::<u64>().ok();
    Some(((field(1)? * 60 + field(2)?) * 60 + field(3)?) * 1000 + field(4)? * 10)
}

/// Remove override blocks and turn ASS line breaks into newlines.
pub fn strip_ass_tags(text: &str) -> String {
    override_tag_regex()
        .replace_all(text, "")
        .replace("\\N", "\n")
        .replace("\\n", "\n")
        .replace("\\h", " ")
}

/// Read the `Dialogue` events of an ASS script.
pub fn parse_ass(content: &str) -> Result<Vec<DecodedCue>, CaptionParseError> {
    let mut in_events = false;
    let mut format: Vec<String> = Vec::new();
    let mut cues = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line_num = line_num + 1;
        let line = line.trim().trim_start_matches('\u{feff}');

        if line.starts_with('[') && line.ends_with(']') {
            in_events = line.eq_ignore_ascii_case("[events]");
            continue;
        }
        if !in_events {
            continue;
        }

        if let Some(fields) = line.strip_prefix("Format:") {
            format = fields.split(',').map(|f| f.trim().to_lowercase()).collect();
            continue;
        }
        let Some(body) = line.strip_prefix("Dialogue:") else {
            continue;
        };
        if format.is_empty() {
            return Err(CaptionParseError::InvalidEvent {
                line: line_num,
                message: "Dialogue before Format line".to_string(),
            });
        }

        let values: Vec<&str> = body.trim_start().splitn(format.len(), ',').collect();
        let parse_time = |name: &'static str| -> Result<u64, CaptionParseError> {
            let raw = event_field(&format, &values, name, line_num)?;
            parse_ass_time(raw).ok_or_else(|| CaptionParseError::InvalidTime {
                line: line_num,
                value: raw.trim().to_string(),
            })
        };

        cues.push(DecodedCue {
            start_ms: parse_time("start")?,
            end_ms: parse_time("end")?,
            text: strip_ass_tags(event_field(&format, &values, "text", line_num)?),
        });
    }

    Ok(cues)
}

fn event_field<'a>(
    format: &[String],
    values: &[&'a str],
    name: &str,
    line: usize,
) -> Result<&'a str, CaptionParseError> {
    format
        .iter()
        .position(|f| f == name)
        .and_then(|i| values.get(i).copied())
        .ok_or_else(|| CaptionParseError::InvalidEvent {
            line,
            message: format!("missing field '{}'", name),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::media::TimedWord;

    fn karaoke_cue() -> CaptionCue {
        CaptionCue {
            index: 1,
            start_ms: 100,
            end_ms: 1500,
            lines: vec!["Hello there,".to_string(), "friend".to_string()],
            words: vec![
                TimedWord::new("Hello", 200, 500),
                TimedWord::new("there,", 600, 900),
                TimedWord::new("friend", 1000, 1400),
            ],
        }
    }

    #[test]
    fn test_format_ass_time() {
        assert_eq!(format_ass_time(0), "0:00:00.00");
        assert_eq!(format_ass_time(1200), "0:00:01.20");
        assert_eq!(format_ass_time(3_723_040), "1:02:03.04");
        assert_eq!(parse_ass_time("1:02:03.04"), Some(3_723_040));
        assert_eq!(parse_ass_time("1:2:3.4"), None);
    }

    #[test]
    fn test_karaoke_tags_partition_the_cue() {
        let text = karaoke_text(&karaoke_cue());
        assert_eq!(text, "{\\k50}Hello {\\k40}there,\\N{\\k50}friend");
    }

    #[test]
    fn test_write_ass_contains_style_and_events() {
        let style = CaptionStyle::default();
        let output = write_ass(&[karaoke_cue()], &style);

        assert!(output.contains("PlayResX: 1080"));
        assert!(output.contains("PlayResY: 1920"));
        assert!(output.contains("Style: Default,Lexend Bold,100,"));
        assert!(output.contains("Dialogue: 0,0:00:00.10,0:00:01.50,Default,,0,0,0,,{\\k50}Hello"));
    }

    #[test]
    fn test_parse_written_ass() {
        let plain = CaptionStyle {
            karaoke: false,
            ..CaptionStyle::default()
        };
        for style in [CaptionStyle::default(), plain] {
            let decoded = parse_ass(&write_ass(&[karaoke_cue()], &style)).unwrap();
            assert_eq!(
                decoded,
                vec![DecodedCue {
                    start_ms: 100,
                    end_ms: 1500,
                    text: "Hello there,\nfriend".to_string()
                }]
            );
        }
    }

    #[test]
    fn test_parse_ass_keeps_commas_in_text() {
        let content = "[Events]\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\nDialogue: 0,0:00:01.00,0:00:02.50,Default,,0,0,0,,One, two,\\hthree\n";
        let decoded = parse_ass(content).unwrap();
        assert_eq!(decoded[0].text, "One, two, three");
        assert_eq!(decoded[0].end_ms, 2500);
    }

    #[test]
    fn test_parse_ass_rejects_bad_time() {
        let content = "[Events]\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\nDialogue: 0,0:00:01,0:00:02.50,Default,,0,0,0,,x\n";
        assert!(matches!(
            parse_ass(content),
            Err(CaptionParseError::InvalidTime { line: 3, .. })
        ));
    }
}
