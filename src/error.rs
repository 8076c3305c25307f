//! Error taxonomy for the pipeline.
//!
//! Only [`ConfigurationError`] terminates a run. Everything else is scoped to a
//! single job and ends up as the `error_detail` of a `JobResult`.

use std::path::PathBuf;

/// Problems with the environment or inputs that make the whole run pointless.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// A required command-line tool is not on `PATH`.
    #[error("Required tool '{0}' not found on PATH")]
    MissingTool(String),

    /// The background directory contains no usable clips.
    #[error("Background pool is empty")]
    EmptyPool,

    /// The job list could not be read from disk.
    #[error("Failed to read job list '{path}': {source}")]
    UnreadableJobList {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The job list is not a JSON array.
    #[error("Invalid job list: {0}")]
    InvalidJobList(String),

    /// Random voice requested without a usable gender/locale filter.
    #[error("Invalid voice selection: {0}")]
    InvalidVoiceSelection(String),

    /// Background directory could not be scanned.
    #[error("Failed to scan background directory '{path}': {source}")]
    BackgroundScan {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Any other invalid setting.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Failures of the voice synthesis stage.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("TTS tool exited with {status}: {stderr}")]
    Tool { status: String, stderr: String },

    #[error("TTS produced no audio at '{0}'")]
    NoAudio(PathBuf),

    #[error("Failed to probe audio duration: {0}")]
    Probe(String),

    #[error("TTS I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the transcription stage.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("Transcription tool exited with {status}: {stderr}")]
    Tool { status: String, stderr: String },

    #[error("Transcription output missing at '{0}'")]
    MissingOutput(PathBuf),

    #[error("Malformed transcription output: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Transcription I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the muxing stage.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("ffmpeg exited with {status}: {diagnostic}")]
    Tool { status: String, diagnostic: String },

    #[error("Composition timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Composition produced no output at '{0}'")]
    MissingOutput(PathBuf),

    #[error("Compose I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Subtitle compilation outcomes other than a cue list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompilerError {
    /// Nothing to caption. Callers may continue without burned-in text.
    #[error("Transcription produced no captions")]
    NoCaptions,

    #[error("Segment {index} starts at {start_ms}ms, before the previous segment at {previous_start_ms}ms")]
    RegressingSegment {
        index: usize,
        start_ms: u64,
        previous_start_ms: u64,
    },

    #[error("Segment {index} ends ({end_ms}ms) before it starts ({start_ms}ms)")]
    InvalidSegment {
        index: usize,
        start_ms: u64,
        end_ms: u64,
    },

    #[error("Invalid compiler policy: {0}")]
    InvalidPolicy(String),
}

/// Why a single job ended in the `Failed` state.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Synthesis failed after {attempts} attempt(s): {source}")]
    Synthesis {
        attempts: u32,
        source: SynthesisError,
    },

    #[error("Transcription failed: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error("Caption compilation failed: {0}")]
    Compiler(#[from] CompilerError),

    #[error("Composition failed: {0}")]
    Compose(#[from] ComposeError),

    #[error("Job cancelled")]
    Cancelled,

    #[error("Job I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// Errors raised while reading SRT/VTT/ASS caption text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptionParseError {
    #[error("Invalid time format at line {line}: '{value}'")]
    InvalidTime { line: usize, value: String },

    #[error("Invalid event at line {line}: {message}")]
    InvalidEvent { line: usize, message: String },
}
