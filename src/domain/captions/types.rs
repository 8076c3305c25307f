use crate::domain::media::TimedWord;
use crate::error::CompilerError;
use std::path::PathBuf;

/// Every cue boundary lands on this grid so that SRT (milliseconds) and ASS
/// (centiseconds) carry the same timing.
pub const TIME_GRID_MS: u64 = 10;

/// Round to the nearest grid point.
pub fn quantize(ms: u64) -> u64 {
    (ms + TIME_GRID_MS / 2) / TIME_GRID_MS * TIME_GRID_MS
}

/// Round up to the next grid point.
pub fn quantize_up(ms: u64) -> u64 {
    ms.div_ceil(TIME_GRID_MS) * TIME_GRID_MS
}

/// A single caption entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionCue {
    /// 1-based, gapless
    pub index: usize,
    pub start_ms: u64,
    pub end_ms: u64,
    pub lines: Vec<String>,
    /// Word timings inside the cue, used for karaoke emphasis
    pub words: Vec<TimedWord>,
}

impl CaptionCue {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }
}

/// A cue as read back from a caption file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCue {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}

impl From<&CaptionCue> for DecodedCue {
    fn from(cue: &CaptionCue) -> Self {
        Self {
            start_ms: cue.start_ms,
            end_ms: cue.end_ms,
            text: cue.text(),
        }
    }
}

/// Line wrapping and timing rules for the compiler
#[derive(Debug, Clone, PartialEq)]
pub struct CompilerPolicy {
    pub max_line_chars: usize,
    pub max_lines_per_cue: usize,
    /// Cues shorter than this are merged or extended
    pub min_display_ms: u64,
    /// Frame rate of the output video, sets the shortest visible cue
    pub frame_rate: u32,
}

impl Default for CompilerPolicy {
    fn default() -> Self {
        Self {
            max_line_chars: 40,
            max_lines_per_cue: 2,
            min_display_ms: 700,
            frame_rate: 30,
        }
    }
}

impl CompilerPolicy {
    pub fn validate(&self) -> Result<(), CompilerError> {
        if self.max_line_chars == 0 {
            return Err(CompilerError::InvalidPolicy(
                "max_line_chars must be at least 1".to_string(),
            ));
        }
        if !(1..=2).contains(&self.max_lines_per_cue) {
            return Err(CompilerError::InvalidPolicy(format!(
                "max_lines_per_cue must be 1 or 2, got {}",
                self.max_lines_per_cue
            )));
        }
        if self.frame_rate == 0 {
            return Err(CompilerError::InvalidPolicy(
                "frame_rate must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// One frame, rounded up to the time grid.
    pub fn frame_interval_ms(&self) -> u64 {
        quantize_up(1000u64.div_ceil(u64::from(self.frame_rate.max(1))))
    }

    /// Minimum display duration on the time grid, never shorter than a frame.
    pub fn effective_min_display_ms(&self) -> u64 {
        quantize_up(self.min_display_ms).max(self.frame_interval_ms())
    }
}

/// ASS style parameters applied to every styled cue.
///
/// Defaults reproduce the look of the original burn-in (`Lexend Bold`, top
/// center, thick outline) on a 1080x1920 canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStyle {
    pub font_name: String,
    pub font_size: u32,
    /// `&HAABBGGRR`
    pub primary_colour: String,
    /// Colour of words not yet reached in karaoke mode
    pub secondary_colour: String,
    pub outline_colour: String,
    pub back_colour: String,
    pub bold: bool,
    pub outline: u32,
    pub shadow: u32,
    /// Numpad alignment (8 = top center)
    pub alignment: u8,
    pub margin_l: u32,
    pub margin_r: u32,
    pub margin_v: u32,
    pub play_res_x: u32,
    pub play_res_y: u32,
    /// Emit `\k` tags so each word lights up when spoken
    pub karaoke: bool,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_name: "Lexend Bold".to_string(),
            font_size: 100,
            primary_colour: "&H0000FFFF".to_string(),
            secondary_colour: "&H00FFFFFF".to_string(),
            outline_colour: "&H00000000".to_string(),
            back_colour: "&H80000000".to_string(),
            bold: true,
            outline: 3,
            shadow: 5,
            alignment: 8,
            margin_l: 126,
            margin_r: 155,
            margin_v: 167,
            play_res_x: 1080,
            play_res_y: 1920,
            karaoke: true,
        }
    }
}

/// Paths of the two serializations of one cue list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionFiles {
    pub srt: PathBuf,
    pub ass: PathBuf,
}
