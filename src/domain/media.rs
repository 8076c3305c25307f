use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A single word with its own timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedWord {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl TimedWord {
    pub fn new(text: impl Into<String>, start_ms: u64, end_ms: u64) -> Self {
        Self {
            text: text.into(),
            start_ms,
            end_ms,
        }
    }
}

/// A time-aligned chunk of transcribed speech
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
    /// Word-level timings, when the recognizer produced them
    pub words: Vec<TimedWord>,
}

impl TranscriptSegment {
    pub fn new(start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            end_ms,
            text: text.into(),
            words: Vec::new(),
        }
    }

    pub fn with_words(mut self, words: Vec<TimedWord>) -> Self {
        self.words = words;
        self
    }
}

/// Word timing reported by the speech synthesizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordBoundary {
    pub text: String,
    pub start_offset_ms: u64,
    pub duration_ms: u64,
}

/// Turn synthesizer word boundaries into one segment per boundary.
pub fn boundaries_to_segments(boundaries: &[WordBoundary]) -> Vec<TranscriptSegment> {
    boundaries
        .iter()
        .map(|b| {
            let end = b.start_offset_ms + b.duration_ms.max(1);
            TranscriptSegment::new(b.start_offset_ms, end, b.text.clone())
        })
        .collect()
}

/// Audio produced by the voice synthesizer for a single job
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub audio_path: PathBuf,
    pub duration_ms: u64,
    pub word_boundaries: Option<Vec<WordBoundary>>,
}

/// A candidate background clip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackgroundAsset {
    pub path: PathBuf,
    pub duration_ms: u64,
}

/// A synthesizer voice as listed by the TTS service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub gender: String,
    pub locale: String,
}
