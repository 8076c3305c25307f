use super::worker::{JobPlan, WorkerService, WorkerSettings};
use crate::config::PipelineConfig;
use crate::domain::background::select_background;
use crate::domain::device::DeviceProfile;
use crate::domain::jobs::{JobResult, LoadedJobs, RunSummary, VideoJob};
use crate::domain::media::{BackgroundAsset, Voice};
use crate::domain::speech::{choose_voice, matching_voices, VoiceSelection};
use crate::error::{ConfigurationError, PipelineError};
use crate::ports::background::BackgroundLibrary;
use crate::ports::composer::VideoComposerPort;
use crate::ports::device::DeviceProbe;
use crate::ports::synthesis::VoiceSynthesisPort;
use crate::ports::transcription::TranscriptionPort;
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{OnceCell, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Plans and runs a whole job list.
///
/// Owns the only cross-job state: the resolved device and, during planning,
/// the previously selected background.
pub struct PipelineService<S, T, C, B, D> {
    worker: WorkerService<S, T, C>,
    library: B,
    probe: D,
    voice: VoiceSelection,
    max_parallel_jobs: usize,
    seed: Option<u64>,
    device: OnceCell<DeviceProfile>,
}

impl<S, T, C, B, D> PipelineService<S, T, C, B, D>
where
    S: VoiceSynthesisPort,
    T: TranscriptionPort,
    C: VideoComposerPort,
    B: BackgroundLibrary,
    D: DeviceProbe,
{
    pub fn new(
        synthesizer: S,
        transcriber: T,
        composer: C,
        library: B,
        probe: D,
        config: &PipelineConfig,
    ) -> Self {
        let settings = WorkerSettings {
            model: config.model_name(),
            language: config.language_hint(),
            output_dir: config.output_dir.clone(),
            temp_root: config.temp_root.clone(),
            keep_intermediates: config.keep_intermediates,
            synthesis_retries: config.synthesis_retries,
            retry_backoff: config.retry_backoff,
            compose_timeout: config.compose_timeout,
            policy: config.policy.clone(),
            style: config.style.clone(),
        };

        Self {
            worker: WorkerService::new(synthesizer, transcriber, composer, settings),
            library,
            probe,
            voice: config.voice.clone(),
            max_parallel_jobs: config.max_parallel_jobs.max(1),
            seed: config.seed,
            device: OnceCell::new(),
        }
    }

    /// Device profile, probed on first use and reused afterwards.
    pub async fn device(&self) -> DeviceProfile {
        *self
            .device
            .get_or_init(|| DeviceProfile::resolve(&self.probe))
            .await
    }

    /// Run every loaded job. Job failures end up in the summary; only
    /// configuration problems are returned as errors.
    pub async fn run(
        &self,
        loaded: LoadedJobs,
        cancel: CancellationToken,
    ) -> Result<RunSummary, PipelineError> {
        let LoadedJobs { jobs, rejected } = loaded;
        if jobs.is_empty() {
            tracing::info!(rejected = rejected.len(), "No jobs to run");
            return Ok(RunSummary {
                results: Vec::new(),
                rejected,
            });
        }

        let device = self.device().await;
        let pool = self.library.discover().await?;
        let voices = self.voice_candidates().await?;

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let plans = plan_jobs(jobs, &self.voice, voices.as_deref(), &pool, &mut rng)?;

        let permits = self.max_parallel_jobs.min(device.slots()).max(1);
        let run_id = Uuid::new_v4();
        tracing::info!(%run_id, jobs = plans.len(), parallel = permits, %device, "Running jobs");
        let semaphore = Semaphore::new(permits);

        let results: Vec<JobResult> = join_all(plans.iter().map(|plan| {
            let semaphore = &semaphore;
            let cancel = &cancel;
            async move {
                let _permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    permit = semaphore.acquire() => permit.ok(),
                };
                // A missing permit means cancellation; process reports it
                self.worker.process(plan, device, cancel).await
            }
        }))
        .instrument(tracing::info_span!("run", %run_id))
        .await;

        Ok(RunSummary { results, rejected })
    }

    #[cfg(test)]
    pub(crate) fn worker_composer(&self) -> &C {
        self.worker.composer()
    }

    /// Voices to draw from when the selection is random.
    async fn voice_candidates(&self) -> Result<Option<Vec<Voice>>, ConfigurationError> {
        match &self.voice {
            VoiceSelection::Fixed(_) => Ok(None),
            VoiceSelection::Random { .. } => {
                let voices = self.worker.synthesizer().list_voices().await.map_err(|e| {
                    ConfigurationError::InvalidVoiceSelection(format!("could not list voices: {}", e))
                })?;
                Ok(Some(voices))
            }
        }
    }
}

/// Decide voice, background and clip offset for every job, in job order.
///
/// Runs before any job starts, so the previous background is only ever
/// tracked here.
pub fn plan_jobs<R: Rng + ?Sized>(
    jobs: Vec<VideoJob>,
    selection: &VoiceSelection,
    voices: Option<&[Voice]>,
    pool: &[BackgroundAsset],
    rng: &mut R,
) -> Result<Vec<JobPlan>, ConfigurationError> {
    let candidates = match (selection, voices) {
        (VoiceSelection::Random { gender, locale }, Some(voices)) => {
            let candidates = matching_voices(voices, gender, locale);
            tracing::debug!(%gender, %locale, voices = candidates.len(), "Random voice candidates");
            candidates
        }
        _ => Vec::new(),
    };

    let mut previous: Option<&BackgroundAsset> = None;
    let mut plans = Vec::with_capacity(jobs.len());
    for job in jobs {
        let voice = match selection {
            VoiceSelection::Fixed(name) => name.clone(),
            VoiceSelection::Random { .. } => choose_voice(&candidates, rng)?,
        };
        let background = select_background(pool, previous, rng)?;
        let offset_fraction: f64 = rng.gen();
        previous = Some(background);

        plans.push(JobPlan {
            job,
            voice,
            background: background.clone(),
            offset_fraction,
        });
    }
    Ok(plans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn job(part: u32) -> VideoJob {
        VideoJob {
            series: "Facts".to_string(),
            part,
            text: "Text".to_string(),
            outro: "Bye".to_string(),
            subtitles_path: PathBuf::from("subs"),
        }
    }

    fn pool(n: usize) -> Vec<BackgroundAsset> {
        (0..n)
            .map(|i| BackgroundAsset {
                path: PathBuf::from(format!("bg_{}.mp4", i)),
                duration_ms: 90_000,
            })
            .collect()
    }

    fn voice(name: &str, gender: &str, locale: &str) -> Voice {
        Voice {
            name: name.to_string(),
            gender: gender.to_string(),
            locale: locale.to_string(),
        }
    }

    #[test]
    fn test_plan_never_repeats_background() {
        let pool = pool(3);
        let jobs = (1..=30).map(job).collect();
        let mut rng = StdRng::seed_from_u64(5);
        let plans = plan_jobs(jobs, &VoiceSelection::default(), None, &pool, &mut rng).unwrap();

        assert_eq!(plans.len(), 30);
        for pair in plans.windows(2) {
            assert_ne!(pair[0].background.path, pair[1].background.path);
        }
        assert!(plans
            .iter()
            .all(|p| (0.0..1.0).contains(&p.offset_fraction)));
        assert!(plans.iter().all(|p| p.voice == "en-US-ChristopherNeural"));
    }

    #[test]
    fn test_plan_is_reproducible() {
        let pool = pool(4);
        let run = || {
            let mut rng = StdRng::seed_from_u64(11);
            plan_jobs((1..=10).map(job).collect(), &VoiceSelection::default(), None, &pool, &mut rng)
                .unwrap()
                .into_iter()
                .map(|p| p.background.path)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_plan_empty_pool() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = plan_jobs(vec![job(1)], &VoiceSelection::default(), None, &[], &mut rng);
        assert!(matches!(result, Err(ConfigurationError::EmptyPool)));
    }

    #[test]
    fn test_plan_random_voices() {
        let voices = vec![
            voice("de-DE-KatjaNeural", "Female", "de-DE"),
            voice("de-DE-AmalaNeural", "Female", "de-DE"),
            voice("de-DE-ConradNeural", "Male", "de-DE"),
        ];
        let selection = VoiceSelection::Random {
            gender: "Female".to_string(),
            locale: "de-DE".to_string(),
        };
        let mut rng = StdRng::seed_from_u64(2);
        let plans = plan_jobs(
            (1..=20).map(job).collect(),
            &selection,
            Some(&voices),
            &pool(2),
            &mut rng,
        )
        .unwrap();
        assert!(plans.iter().all(|p| p.voice != "de-DE-ConradNeural"));

        let missing = VoiceSelection::Random {
            gender: "Male".to_string(),
            locale: "fr-FR".to_string(),
        };
        let result = plan_jobs(vec![job(1)], &missing, Some(&voices), &pool(2), &mut rng);
        assert!(matches!(result, Err(ConfigurationError::InvalidVoiceSelection(_))));
    }
}
