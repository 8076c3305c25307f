use crate::error::ConfigurationError;
use std::path::PathBuf;

/// Tools every run shells out to.
pub const REQUIRED_TOOLS: &[&str] = &["ffmpeg", "ffprobe", "edge-tts", "whisper"];

/// Resolve each tool on `PATH`, failing on the first one missing.
pub fn ensure_tools(tools: &[&str]) -> Result<Vec<PathBuf>, ConfigurationError> {
    tools
        .iter()
        .map(|tool| {
            let path = which::which(tool)
                .map_err(|_| ConfigurationError::MissingTool(tool.to_string()))?;
            tracing::debug!(tool, ?path, "Found tool");
            Ok(path)
        })
        .collect()
}
