//! SRT writer and reader.
//!
//! The reader is lenient enough to also accept the WebVTT files edge-tts
//! writes for word boundaries (`WEBVTT` header, `.` before milliseconds).

use super::types::{CaptionCue, DecodedCue};
use crate::error::CaptionParseError;
use regex::Regex;
use std::sync::OnceLock;

/// Write cues as SRT.
pub fn write_srt(cues: &[CaptionCue]) -> String {
    let mut output = String::new();

    for (i, cue) in cues.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        output.push_str(&format!("{}\n", cue.index));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(cue.start_ms),
            format_srt_time(cue.end_ms)
        ));
        for line in &cue.lines {
            output.push_str(line);
            output.push('\n');
        }
    }

    output
}

/// Format milliseconds as `HH:MM:SS,mmm`.
pub fn format_srt_time(ms: u64) -> String {
    let millis = ms % 1000;
    let total_secs = ms / 1000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, millis)
}

fn timing_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*(?:(\d+):)?(\d{1,2}):(\d{2})[,.](\d{3})\s*-->\s*(?:(\d+):)?(\d{1,2}):(\d{2})[,.](\d{3})",
        )
        .expect("timing regex is valid")
    })
}

fn capture_ms(caps: &regex::Captures<'_>, first: usize) -> u64 {
    let field = |i: usize| -> u64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };
    ((field(first) * 60 + field(first + 1)) * 60 + field(first + 2)) * 1000 + field(first + 3)
}

/// Parse SRT (or WebVTT) content.
///
/// Blocks without a timing line, such as a `WEBVTT` header or `NOTE`, are
/// skipped.
pub fn parse_srt(content: &str) -> Result<Vec<DecodedCue>, CaptionParseError> {
    let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let mut cues = Vec::new();
    let mut line_num = 0usize;

    for block in content.split("\n\n") {
        let lines: Vec<&str> = block.lines().collect();
        let block_start = line_num + 1;
        line_num += lines.len() + 1;

        let Some(timing_pos) = lines.iter().position(|l| l.contains("-->")) else {
            continue;
        };
        let timing_line = lines[timing_pos];
        let caps = timing_regex()
            .captures(timing_line)
            .ok_or_else(|| CaptionParseError::InvalidTime {
                line: block_start + timing_pos,
                value: timing_line.trim().to_string(),
            })?;

        let start_ms = capture_ms(&caps, 1);
        let end_ms = capture_ms(&caps, 5);
        let text = lines[timing_pos + 1..]
            .iter()
            .map(|l| l.trim_end())
            .collect::<Vec<_>>()
            .join("\n");

        cues.push(DecodedCue {
            start_ms,
            end_ms,
            text,
        });
    }

    Ok(cues)
}
