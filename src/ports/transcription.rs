use crate::domain::device::DeviceProfile;
use crate::domain::media::TranscriptSegment;
use crate::error::TranscriptionError;
use async_trait::async_trait;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub audio_path: PathBuf,
    /// Language hint such as `en`; `None` lets the recognizer detect it
    pub language: Option<String>,
    /// Model name, e.g. `small.en`
    pub model: String,
    pub device: DeviceProfile,
    /// Scratch directory for tool output
    pub work_dir: PathBuf,
}

#[async_trait]
pub trait TranscriptionPort: Send + Sync {
    /// Ordered, time-aligned segments for the request's audio
    async fn transcribe(
        &self,
        request: &TranscriptionRequest,
    ) -> Result<Vec<TranscriptSegment>, TranscriptionError>;
}
