//! Voice synthesis through the `edge-tts` command-line tool.

use super::cmd::{path_arg, status_text, stderr_tail, RealToolRunner, ToolRunner};
use super::probe::probe_duration_ms;
use crate::domain::captions::srt::parse_srt;
use crate::domain::media::{SynthesisResult, Voice, WordBoundary};
use crate::error::SynthesisError;
use crate::ports::synthesis::VoiceSynthesisPort;
use async_trait::async_trait;
use std::path::Path;

const AUDIO_FILE: &str = "voiceover.mp3";
const BOUNDARY_FILE: &str = "voiceover.vtt";

pub struct EdgeTtsAdapter<R: ToolRunner = RealToolRunner> {
    runner: R,
    program: String,
}

impl EdgeTtsAdapter<RealToolRunner> {
    pub fn new() -> Self {
        Self::with_runner(RealToolRunner)
    }
}

impl Default for EdgeTtsAdapter<RealToolRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ToolRunner> EdgeTtsAdapter<R> {
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            program: "edge-tts".to_string(),
        }
    }

    /// Read the per-word subtitle side file, if the tool wrote a usable one.
    async fn read_boundaries(&self, path: &Path) -> Option<Vec<WordBoundary>> {
        let content = tokio::fs::read_to_string(path).await.ok()?;
        match parse_srt(&content) {
            Ok(cues) if !cues.is_empty() => Some(
                cues.into_iter()
                    .map(|cue| WordBoundary {
                        text: cue.text.replace('\n', " "),
                        start_offset_ms: cue.start_ms,
                        duration_ms: cue.end_ms.saturating_sub(cue.start_ms),
                    })
                    .collect(),
            ),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable word boundaries");
                None
            }
        }
    }
}

#[async_trait]
impl<R: ToolRunner> VoiceSynthesisPort for EdgeTtsAdapter<R> {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        work_dir: &Path,
    ) -> Result<SynthesisResult, SynthesisError> {
        let audio_path = work_dir.join(AUDIO_FILE);
        let boundary_path = work_dir.join(BOUNDARY_FILE);

        let args = vec![
            "--voice".to_string(),
            voice.to_string(),
            "--text".to_string(),
            text.to_string(),
            "--write-media".to_string(),
            path_arg(&audio_path),
            "--write-subtitles".to_string(),
            path_arg(&boundary_path),
        ];

        let output = self.runner.run(&self.program, &args, work_dir).await?;
        if !output.status.success() {
            return Err(SynthesisError::Tool {
                status: status_text(&output),
                stderr: stderr_tail(&output, 10),
            });
        }

        let produced = tokio::fs::metadata(&audio_path)
            .await
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if !produced {
            return Err(SynthesisError::NoAudio(audio_path));
        }

        let duration_ms = probe_duration_ms(&self.runner, &audio_path)
            .await
            .map_err(SynthesisError::Probe)?;
        let word_boundaries = self.read_boundaries(&boundary_path).await;

        tracing::debug!(
            voice,
            duration_ms,
            boundaries = word_boundaries.as_ref().map_or(0, Vec::len),
            "Synthesized voiceover"
        );

        Ok(SynthesisResult {
            audio_path,
            duration_ms,
            word_boundaries,
        })
    }

    async fn list_voices(&self) -> Result<Vec<Voice>, SynthesisError> {
        let args = vec!["--list-voices".to_string()];
        let output = self.runner.run(&self.program, &args, Path::new(".")).await?;
        if !output.status.success() {
            return Err(SynthesisError::Tool {
                status: status_text(&output),
                stderr: stderr_tail(&output, 10),
            });
        }
        Ok(parse_voice_list(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse `edge-tts --list-voices`.
///
/// Older releases print `Name:`/`Gender:` blocks, newer ones a table whose
/// first two columns are the name and gender.
pub fn parse_voice_list(listing: &str) -> Vec<Voice> {
    let mut voices = Vec::new();
    let mut pending_name: Option<String> = None;

    for line in listing.lines() {
        let line = line.trim();
        if let Some(name) = line.strip_prefix("Name:") {
            pending_name = Some(name.trim().to_string());
            continue;
        }
        if let Some(gender) = line.strip_prefix("Gender:") {
            if let Some(name) = pending_name.take() {
                if let Some(voice) = voice_from(&name, gender.trim()) {
                    voices.push(voice);
                }
            }
            continue;
        }

        let mut columns = line.split_whitespace();
        if let (Some(name), Some(gender)) = (columns.next(), columns.next()) {
            if matches!(gender, "Male" | "Female") {
                if let Some(voice) = voice_from(name, gender) {
                    voices.push(voice);
                }
            }
        }
    }

    voices
}

fn voice_from(name: &str, gender: &str) -> Option<Voice> {
    // en-US-AriaNeural -> en-US
    let (locale, _) = name.rsplit_once('-')?;
    if !locale.contains('-') {
        return None;
    }
    Some(Voice {
        name: name.to_string(),
        gender: gender.to_string(),
        locale: locale.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::local::cmd::test_support::output;
    use crate::adapters::local::cmd::MockToolRunner;
    use tempfile::TempDir;

    #[test]
    fn test_parse_block_listing() {
        let listing = "Name: en-US-AriaNeural\nGender: Female\n\nName: de-DE-ConradNeural\nGender: Male\n";
        let voices = parse_voice_list(listing);
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].locale, "en-US");
        assert_eq!(voices[1].gender, "Male");
    }

    #[test]
    fn test_parse_table_listing() {
        let listing = "\
Name                               Gender    ContentCategories      VoicePersonalities
---------------------------------  --------  ---------------------  ------------------
en-GB-SoniaNeural                  Female    General                Friendly, Positive
zh-CN-liaoning-XiaobeiNeural       Female    Dialect                Humorous
";
        let voices = parse_voice_list(listing);
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].name, "en-GB-SoniaNeural");
        assert_eq!(voices[0].locale, "en-GB");
        assert_eq!(voices[1].locale, "zh-CN-liaoning");
    }

    #[tokio::test]
    async fn test_synthesize_writes_audio_and_boundaries() {
        let dir = TempDir::new().unwrap();
        let mut runner = MockToolRunner::new();

        runner
            .expect_run()
            .withf(|program, args, _| {
                program == "edge-tts"
                    && args.windows(2).any(|w| w[0] == "--voice" && w[1] == "en-US-GuyNeural")
                    && args.windows(2).any(|w| w[0] == "--text" && w[1] == "Hello there")
            })
            .times(1)
            .returning(|_, args, _| {
                let media = args.iter().position(|a| a == "--write-media").unwrap() + 1;
                let subs = args.iter().position(|a| a == "--write-subtitles").unwrap() + 1;
                std::fs::write(&args[media], b"ID3").unwrap();
                std::fs::write(
                    &args[subs],
                    "WEBVTT\n\n00:00:00.100 --> 00:00:00.500\nHello\n\n00:00:00.500 --> 00:00:01.000\nthere\n",
                )
                .unwrap();
                output("", "", true)
            });
        runner
            .expect_run()
            .withf(|program, _, _| program == "ffprobe")
            .times(1)
            .returning(|_, _, _| output("1.2\n", "", true));

        let adapter = EdgeTtsAdapter::with_runner(runner);
        let result = adapter
            .synthesize("Hello there", "en-US-GuyNeural", dir.path())
            .await
            .unwrap();

        assert_eq!(result.audio_path, dir.path().join(AUDIO_FILE));
        assert_eq!(result.duration_ms, 1200);
        let boundaries = result.word_boundaries.unwrap();
        assert_eq!(boundaries.len(), 2);
        assert_eq!(boundaries[1].text, "there");
        assert_eq!(boundaries[1].start_offset_ms, 500);
        assert_eq!(boundaries[1].duration_ms, 500);
    }

    #[tokio::test]
    async fn test_synthesize_without_audio_fails() {
        let dir = TempDir::new().unwrap();
        let mut runner = MockToolRunner::new();
        runner.expect_run().times(1).returning(|_, _, _| output("", "", true));

        let adapter = EdgeTtsAdapter::with_runner(runner);
        let err = adapter
            .synthesize("Hello", "en-US-GuyNeural", dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::NoAudio(_)));
    }

    #[tokio::test]
    async fn test_synthesize_tool_failure() {
        let dir = TempDir::new().unwrap();
        let mut runner = MockToolRunner::new();
        runner
            .expect_run()
            .returning(|_, _, _| output("", "503 Service Unavailable", false));

        let adapter = EdgeTtsAdapter::with_runner(runner);
        let err = adapter
            .synthesize("Hello", "en-US-GuyNeural", dir.path())
            .await
            .unwrap_err();
        match err {
            SynthesisError::Tool { stderr, .. } => assert!(stderr.contains("503")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
