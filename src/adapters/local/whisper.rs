//! Transcription through the openai-whisper command-line tool.

use super::cmd::{path_arg, status_text, stderr_tail, RealToolRunner, ToolRunner};
use crate::domain::media::{TimedWord, TranscriptSegment};
use crate::error::TranscriptionError;
use crate::ports::transcription::{TranscriptionPort, TranscriptionRequest};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
    #[serde(default)]
    words: Vec<WhisperWord>,
}

#[derive(Debug, Deserialize)]
struct WhisperWord {
    word: String,
    start: f64,
    end: f64,
}

pub struct WhisperCliAdapter<R: ToolRunner = RealToolRunner> {
    runner: R,
    program: String,
}

impl WhisperCliAdapter<RealToolRunner> {
    pub fn new() -> Self {
        Self::with_runner(RealToolRunner)
    }
}

impl Default for WhisperCliAdapter<RealToolRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ToolRunner> WhisperCliAdapter<R> {
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            program: "whisper".to_string(),
        }
    }

    fn arguments(request: &TranscriptionRequest) -> Vec<String> {
        let mut args = vec![
            path_arg(&request.audio_path),
            "--model".to_string(),
            request.model.clone(),
            "--task".to_string(),
            "transcribe".to_string(),
            "--output_format".to_string(),
            "json".to_string(),
            "--output_dir".to_string(),
            path_arg(&request.work_dir),
            "--word_timestamps".to_string(),
            "True".to_string(),
            "--device".to_string(),
            request.device.torch_device().to_string(),
            // Half precision is a GPU-only path
            "--fp16".to_string(),
            if request.device.is_accelerated() { "True" } else { "False" }.to_string(),
            "--verbose".to_string(),
            "False".to_string(),
        ];
        if let Some(language) = &request.language {
            args.push("--language".to_string());
            args.push(language.clone());
        }
        args
    }
}

#[async_trait]
impl<R: ToolRunner> TranscriptionPort for WhisperCliAdapter<R> {
    async fn transcribe(
        &self,
        request: &TranscriptionRequest,
    ) -> Result<Vec<TranscriptSegment>, TranscriptionError> {
        let args = Self::arguments(request);
        let output = self.runner.run(&self.program, &args, &request.work_dir).await?;
        if !output.status.success() {
            return Err(TranscriptionError::Tool {
                status: status_text(&output),
                stderr: stderr_tail(&output, 10),
            });
        }

        let stem = request
            .audio_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let json_path = request.work_dir.join(format!("{}.json", stem));
        let content = match tokio::fs::read_to_string(&json_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TranscriptionError::MissingOutput(json_path));
            }
            Err(e) => return Err(e.into()),
        };

        let segments = parse_whisper_json(&content)?;
        tracing::debug!(segments = segments.len(), model = %request.model, "Transcription finished");
        Ok(segments)
    }
}

fn seconds_to_ms(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    }
}

/// Convert whisper's JSON output into transcript segments.
pub fn parse_whisper_json(content: &str) -> Result<Vec<TranscriptSegment>, TranscriptionError> {
    let output: WhisperOutput = serde_json::from_str(content)?;

    Ok(output
        .segments
        .into_iter()
        .filter(|s| !s.text.trim().is_empty())
        .map(|s| {
            let start_ms = seconds_to_ms(s.start);
            let end_ms = seconds_to_ms(s.end).max(start_ms);
            let words = s
                .words
                .into_iter()
                .filter(|w| !w.word.trim().is_empty())
                .map(|w| {
                    let word_start = seconds_to_ms(w.start);
                    TimedWord::new(w.word.trim(), word_start, seconds_to_ms(w.end).max(word_start))
                })
                .collect();
            TranscriptSegment::new(start_ms, end_ms, s.text.trim()).with_words(words)
        })
        .collect())
}
