use crate::domain::media::{SynthesisResult, Voice};
use crate::error::SynthesisError;
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait VoiceSynthesisPort: Send + Sync {
    /// Speak `text` with `voice`, writing the audio (and any side files) into
    /// `work_dir`.
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        work_dir: &Path,
    ) -> Result<SynthesisResult, SynthesisError>;

    /// Voices the service offers
    async fn list_voices(&self) -> Result<Vec<Voice>, SynthesisError>;
}
