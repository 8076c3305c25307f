use super::cmd::{RealToolRunner, ToolRunner};
use super::probe::probe_duration_ms;
use crate::domain::media::BackgroundAsset;
use crate::error::ConfigurationError;
use crate::ports::background::BackgroundLibrary;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm", "mov", "m4v"];

/// Background clips stored as video files in a single directory.
pub struct FsBackgroundLibrary<R: ToolRunner = RealToolRunner> {
    dir: PathBuf,
    runner: R,
}

impl FsBackgroundLibrary<RealToolRunner> {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_runner(dir, RealToolRunner)
    }
}

impl<R: ToolRunner> FsBackgroundLibrary<R> {
    pub fn with_runner(dir: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            dir: dir.into(),
            runner,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[async_trait]
impl<R: ToolRunner> BackgroundLibrary for FsBackgroundLibrary<R> {
    async fn discover(&self) -> Result<Vec<BackgroundAsset>, ConfigurationError> {
        let scan_error = |source: std::io::Error| ConfigurationError::BackgroundScan {
            path: self.dir.clone(),
            source,
        };

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(dir = ?self.dir, "Background directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(scan_error(e)),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(scan_error)? {
            let path = entry.path();
            if is_video(&path) {
                paths.push(std::path::absolute(&path).map_err(scan_error)?);
            }
        }
        // Directory order is platform dependent; seeded runs need a stable pool
        paths.sort();

        let mut pool = Vec::with_capacity(paths.len());
        for path in paths {
            match probe_duration_ms(&self.runner, &path).await {
                Ok(duration_ms) if duration_ms > 0 => pool.push(BackgroundAsset { path, duration_ms }),
                Ok(_) => tracing::warn!(?path, "Skipping zero-length background"),
                Err(e) => tracing::warn!(?path, error = %e, "Skipping unreadable background"),
            }
        }

        tracing::info!(dir = ?self.dir, clips = pool.len(), "Background pool loaded");
        Ok(pool)
    }
}
