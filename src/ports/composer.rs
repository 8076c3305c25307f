use crate::domain::captions::CaptionFiles;
use crate::domain::media::BackgroundAsset;
use crate::error::ComposeError;
use async_trait::async_trait;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ComposeRequest {
    pub background: BackgroundAsset,
    /// Where to start reading the background clip
    pub start_offset_ms: u64,
    /// Output length, equal to the voiceover
    pub duration_ms: u64,
    pub audio_path: PathBuf,
    /// `None` muxes without burned-in text
    pub captions: Option<CaptionFiles>,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ComposeOutput {
    /// Tool diagnostics (stderr), kept for logging
    pub diagnostic: String,
}

#[async_trait]
pub trait VideoComposerPort: Send + Sync {
    async fn compose(&self, request: &ComposeRequest) -> Result<ComposeOutput, ComposeError>;
}
