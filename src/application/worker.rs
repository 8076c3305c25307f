use crate::domain::background::pick_start_offset;
use crate::domain::captions::{self, CaptionFiles, CaptionStyle, CompilerPolicy};
use crate::domain::device::DeviceProfile;
use crate::domain::jobs::{JobResult, JobState, JobStatus, VideoJob};
use crate::domain::media::{boundaries_to_segments, BackgroundAsset, SynthesisResult};
use crate::error::{ComposeError, CompilerError, JobError};
use crate::ports::composer::{ComposeOutput, ComposeRequest, VideoComposerPort};
use crate::ports::synthesis::VoiceSynthesisPort;
use crate::ports::transcription::{TranscriptionPort, TranscriptionRequest};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Caption files inside the temp directory use this stem so the composer
/// never sees the series name; delivered copies are renamed.
const CAPTION_STEM: &str = "captions";

/// Decisions made for a job before it runs.
#[derive(Debug, Clone)]
pub struct JobPlan {
    pub job: VideoJob,
    pub voice: String,
    pub background: BackgroundAsset,
    /// Uniform draw in `[0, 1)` that places the clip start once the audio
    /// length is known
    pub offset_fraction: f64,
}

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub model: String,
    pub language: Option<String>,
    pub output_dir: PathBuf,
    pub temp_root: Option<PathBuf>,
    pub keep_intermediates: bool,
    pub synthesis_retries: u32,
    pub retry_backoff: Duration,
    pub compose_timeout: Duration,
    pub policy: CompilerPolicy,
    pub style: CaptionStyle,
}

/// What a finished job delivered.
struct Delivery {
    video: PathBuf,
    captions_burned: bool,
}

/// Bookkeeping for one job as it moves through its states.
struct JobRun {
    label: String,
    state: JobState,
    warnings: Vec<String>,
}

impl JobRun {
    fn new(job: &VideoJob) -> Self {
        Self {
            label: job.label(),
            state: JobState::Loaded,
            warnings: Vec::new(),
        }
    }

    fn advance(&mut self, to: JobState) {
        debug_assert!(self.state.can_move_to(to), "{} cannot move to {}", self.state, to);
        tracing::debug!(job = %self.label, from = %self.state, to = %to, "Job state");
        self.state = to;
    }

    fn warn(&mut self, message: String) {
        tracing::warn!(job = %self.label, "{}", message);
        self.warnings.push(message);
    }

    fn finish(mut self, outcome: Result<Delivery, JobError>) -> JobResult {
        let last_state = self.state;
        match outcome {
            Ok(delivery) => {
                self.advance(JobState::Succeeded);
                let status = if delivery.captions_burned {
                    JobStatus::Success
                } else {
                    JobStatus::PartialFailure
                };
                tracing::info!(job = %self.label, ?status, output = ?delivery.video, "Job finished");
                JobResult {
                    job: self.label,
                    status,
                    output_path: Some(delivery.video),
                    error_detail: None,
                    final_state: self.state,
                    last_state,
                    warnings: self.warnings,
                }
            }
            Err(e) => {
                tracing::error!(job = %self.label, state = %self.state, error = %e, "Job failed");
                self.advance(JobState::Failed);
                JobResult {
                    job: self.label,
                    status: JobStatus::Fatal,
                    output_path: None,
                    error_detail: Some(e.to_string()),
                    final_state: self.state,
                    last_state,
                    warnings: self.warnings,
                }
            }
        }
    }
}

/// Runs a single planned job through every pipeline stage.
pub struct WorkerService<S, T, C> {
    synthesizer: S,
    transcriber: T,
    composer: C,
    settings: WorkerSettings,
}

impl<S, T, C> WorkerService<S, T, C>
where
    S: VoiceSynthesisPort,
    T: TranscriptionPort,
    C: VideoComposerPort,
{
    pub fn new(synthesizer: S, transcriber: T, composer: C, settings: WorkerSettings) -> Self {
        Self {
            synthesizer,
            transcriber,
            composer,
            settings,
        }
    }

    pub fn synthesizer(&self) -> &S {
        &self.synthesizer
    }

    #[cfg(test)]
    pub(crate) fn composer(&self) -> &C {
        &self.composer
    }

    /// Run `plan` to completion or cancellation. Never fails; every outcome
    /// is a [`JobResult`].
    pub async fn process(
        &self,
        plan: &JobPlan,
        device: DeviceProfile,
        cancel: &CancellationToken,
    ) -> JobResult {
        let mut run = JobRun::new(&plan.job);
        if cancel.is_cancelled() {
            return run.finish(Err(JobError::Cancelled));
        }

        let work_dir = match self.work_dir() {
            Ok(dir) => dir,
            Err(e) => return run.finish(Err(e.into())),
        };
        tracing::info!(job = %run.label, voice = %plan.voice, background = ?plan.background.path, "Starting job");

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(JobError::Cancelled),
            result = self.execute(plan, device, work_dir.path(), &mut run) => result,
        };

        // The stage future is gone by now, so no child process still writes here
        if self.settings.keep_intermediates {
            let kept = work_dir.keep();
            tracing::info!(job = %run.label, dir = ?kept, "Keeping intermediates");
        } else if let Err(e) = work_dir.close() {
            run.warn(format!("failed to remove temp directory: {}", e));
        }

        run.finish(outcome)
    }

    fn work_dir(&self) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("shortsmith-");
        match &self.settings.temp_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
    }

    async fn execute(
        &self,
        plan: &JobPlan,
        device: DeviceProfile,
        work_dir: &Path,
        run: &mut JobRun,
    ) -> Result<Delivery, JobError> {
        let job = &plan.job;
        run.advance(JobState::DeviceResolved);

        let synthesis = self.synthesize(job, &plan.voice, work_dir, run).await?;
        run.advance(JobState::Synthesized);

        let request = TranscriptionRequest {
            audio_path: synthesis.audio_path.clone(),
            language: self.settings.language.clone(),
            model: self.settings.model.clone(),
            device,
            work_dir: work_dir.to_path_buf(),
        };
        let mut segments = self.transcriber.transcribe(&request).await?;
        if segments.is_empty() {
            if let Some(boundaries) = synthesis.word_boundaries.as_deref().filter(|b| !b.is_empty()) {
                run.warn("transcription was empty, using synthesizer word timings".to_string());
                segments = boundaries_to_segments(boundaries);
            }
        }
        run.advance(JobState::Transcribed);

        let captions = match captions::compile(&segments, &self.settings.policy) {
            Ok(cues) => Some(
                captions::write_caption_files(
                    &cues,
                    &self.settings.style,
                    &work_dir.join("captions"),
                    CAPTION_STEM,
                )
                .await?,
            ),
            Err(CompilerError::NoCaptions) => {
                run.warn("no captions to burn in".to_string());
                None
            }
            Err(e) => return Err(e.into()),
        };
        run.advance(JobState::CaptionsCompiled);

        let request = ComposeRequest {
            background: plan.background.clone(),
            start_offset_ms: pick_start_offset(
                plan.background.duration_ms,
                synthesis.duration_ms,
                plan.offset_fraction,
            ),
            duration_ms: synthesis.duration_ms,
            audio_path: synthesis.audio_path.clone(),
            captions: captions.clone(),
            output_path: work_dir.join(format!("{}.mp4", job.file_stem())),
        };
        let captions_burned = self.compose(request.clone(), run).await?;
        run.advance(JobState::Composed);

        let video = self.finalize(job, &request.output_path, captions.as_ref()).await?;
        run.advance(JobState::Finalized);

        Ok(Delivery {
            video,
            captions_burned,
        })
    }

    async fn synthesize(
        &self,
        job: &VideoJob,
        voice: &str,
        work_dir: &Path,
        run: &mut JobRun,
    ) -> Result<SynthesisResult, JobError> {
        let text = job.full_text();
        let mut delay = self.settings.retry_backoff;
        let mut attempt = 1;

        loop {
            match self.synthesizer.synthesize(&text, voice, work_dir).await {
                Ok(result) => return Ok(result),
                Err(e) if attempt <= self.settings.synthesis_retries => {
                    run.warn(format!("synthesis attempt {} failed: {}", attempt, e));
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
                Err(source) => {
                    return Err(JobError::Synthesis {
                        attempts: attempt,
                        source,
                    })
                }
            }
        }
    }

    async fn compose_once(&self, request: &ComposeRequest) -> Result<ComposeOutput, ComposeError> {
        let timeout = self.settings.compose_timeout;
        match tokio::time::timeout(timeout, self.composer.compose(request)).await {
            Ok(result) => result,
            Err(_) => Err(ComposeError::Timeout(timeout)),
        }
    }

    /// Compose the video, falling back to a caption-less encode once.
    /// Returns whether the captions made it into the output.
    async fn compose(&self, mut request: ComposeRequest, run: &mut JobRun) -> Result<bool, ComposeError> {
        let with_captions = request.captions.is_some();
        match self.compose_once(&request).await {
            Ok(output) => {
                tracing::trace!(job = %run.label, diagnostic = %output.diagnostic, "Composer output");
                Ok(with_captions)
            }
            Err(e) if with_captions => {
                run.warn(format!("composing with captions failed, retrying without: {}", e));
                request.captions = None;
                self.compose_once(&request).await?;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Deliver caption files, then move the video into the output directory.
    async fn finalize(
        &self,
        job: &VideoJob,
        video: &Path,
        captions: Option<&CaptionFiles>,
    ) -> Result<PathBuf, JobError> {
        if let Some(files) = captions {
            let dir = job.caption_dir();
            let stem = job.file_stem();
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::copy(&files.srt, dir.join(format!("{}.srt", stem))).await?;
            tokio::fs::copy(&files.ass, dir.join(format!("{}.ass", stem))).await?;
        }

        tokio::fs::create_dir_all(&self.settings.output_dir).await?;
        let destination = self
            .settings
            .output_dir
            .join(format!("{}.mp4", job.file_stem()));
        move_file(video, &destination).await?;

        Ok(destination)
    }
}

/// Rename, or copy and delete when the paths are on different filesystems.
async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await
}
