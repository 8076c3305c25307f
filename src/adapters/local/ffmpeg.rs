//! Muxing through the `ffmpeg` command-line tool.
//!
//! The background is center-cropped to 9:16, scaled to the output size and
//! softly blurred; the ASS captions are burned in with the `subtitles` filter.
//! ffmpeg runs inside the caption directory so the filter argument is a bare
//! file name; that name is still escaped for both filtergraph levels.

use super::cmd::{path_arg, status_text, stderr_tail, RealToolRunner, ToolRunner};
use crate::error::ComposeError;
use crate::ports::composer::{ComposeOutput, ComposeRequest, VideoComposerPort};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeSettings {
    pub width: u32,
    pub height: u32,
    pub video_codec: String,
    pub video_bitrate: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub audio_channels: u32,
    pub blur_sigma: u32,
    pub threads: usize,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        Self {
            width: 1080,
            height: 1920,
            video_codec: "libx264".to_string(),
            video_bitrate: "5M".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "96K".to_string(),
            audio_channels: 1,
            blur_sigma: 2,
            threads: (cpus / 2).max(1),
        }
    }
}

pub struct FfmpegComposer<R: ToolRunner = RealToolRunner> {
    runner: R,
    settings: EncodeSettings,
}

impl FfmpegComposer<RealToolRunner> {
    pub fn new(settings: EncodeSettings) -> Self {
        Self::with_runner(RealToolRunner, settings)
    }
}

impl<R: ToolRunner> FfmpegComposer<R> {
    pub fn with_runner(runner: R, settings: EncodeSettings) -> Self {
        Self { runner, settings }
    }

    fn video_filter(&self, subtitles: Option<&str>) -> String {
        let s = &self.settings;
        let mut filter = format!(
            "crop=ih/16*9:ih,scale=w={}:h={}:flags=bicubic,gblur=sigma={}",
            s.width, s.height, s.blur_sigma
        );
        if let Some(name) = subtitles {
            filter.push_str(&format!(",subtitles={}", escape_filter_value(name)));
        }
        filter
    }

    /// Working directory and ffmpeg arguments for `request`.
    fn command(&self, request: &ComposeRequest) -> Result<(PathBuf, Vec<String>), ComposeError> {
        let background = std::path::absolute(&request.background.path)?;
        let audio = std::path::absolute(&request.audio_path)?;
        let output = std::path::absolute(&request.output_path)?;

        let (cwd, subtitles) = match &request.captions {
            Some(files) => {
                let ass = std::path::absolute(&files.ass)?;
                let dir = ass.parent().map(Path::to_path_buf).unwrap_or_default();
                let name = ass
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (dir, Some(name))
            }
            None => (
                output.parent().map(Path::to_path_buf).unwrap_or_default(),
                None,
            ),
        };

        let s = &self.settings;
        let args = vec![
            "-hide_banner".to_string(),
            "-y".to_string(),
            "-ss".to_string(),
            format_seconds(request.start_offset_ms),
            "-t".to_string(),
            format_seconds(request.duration_ms),
            "-i".to_string(),
            path_arg(&background),
            "-i".to_string(),
            path_arg(&audio),
            "-map".to_string(),
            "0:v".to_string(),
            "-map".to_string(),
            "1:a".to_string(),
            "-filter:v".to_string(),
            self.video_filter(subtitles.as_deref()),
            "-c:v".to_string(),
            s.video_codec.clone(),
            "-b:v".to_string(),
            s.video_bitrate.clone(),
            "-c:a".to_string(),
            s.audio_codec.clone(),
            "-ac".to_string(),
            s.audio_channels.to_string(),
            "-b:a".to_string(),
            s.audio_bitrate.clone(),
            "-threads".to_string(),
            s.threads.to_string(),
            path_arg(&output),
        ];

        Ok((cwd, args))
    }
}

#[async_trait]
impl<R: ToolRunner> VideoComposerPort for FfmpegComposer<R> {
    async fn compose(&self, request: &ComposeRequest) -> Result<ComposeOutput, ComposeError> {
        let (cwd, args) = self.command(request)?;
        tracing::debug!(
            background = ?request.background.path,
            captions = request.captions.is_some(),
            "Composing video"
        );

        let output = self.runner.run("ffmpeg", &args, &cwd).await?;
        let diagnostic = stderr_tail(&output, 20);
        if !output.status.success() {
            return Err(ComposeError::Tool {
                status: status_text(&output),
                diagnostic,
            });
        }

        match tokio::fs::metadata(&request.output_path).await {
            Ok(meta) if meta.len() > 0 => Ok(ComposeOutput { diagnostic }),
            _ => Err(ComposeError::MissingOutput(request.output_path.clone())),
        }
    }
}

/// Escape a filter option value: once for the option parser (`\\ ' :`) and
/// once more for the filtergraph parser (`\\ ' [ ] , ;`).
fn escape_filter_value(value: &str) -> String {
    fn escape(value: &str, special: &[char]) -> String {
        let mut escaped = String::with_capacity(value.len());
        for c in value.chars() {
            if special.contains(&c) {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped
    }
    let option = escape(value, &['\\', '\'', ':']);
    escape(&option, &['\\', '\'', '[', ']', ',', ';'])
}

/// Milliseconds as ffmpeg seconds, `12.345`.
fn format_seconds(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}
