//! Shortsmith Binary - Batch run over a job list
//!
//! Wires the command-line tool adapters into the pipeline service, runs every
//! job in the list and prints a per-job summary.

use clap::Parser;
use shortsmith::adapters::local::tools::{ensure_tools, REQUIRED_TOOLS};
use shortsmith::adapters::local::{
    EdgeTtsAdapter, FfmpegComposer, FsBackgroundLibrary, NvidiaSmiProbe, WhisperCliAdapter,
};
use shortsmith::config::PipelineConfig;
use shortsmith::domain::jobs::{load_job_list, JobStatus, RunSummary};
use shortsmith::domain::speech::{ModelSize, VoiceSelection};
use shortsmith::error::ConfigurationError;
use shortsmith::ports::synthesis::VoiceSynthesisPort;
use shortsmith::PipelineService;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "shortsmith")]
#[command(about = "Turn short scripts into captioned vertical videos")]
#[command(version)]
struct Cli {
    /// Whisper model size
    #[arg(long, value_enum)]
    model: Option<ModelSize>,

    /// Don't use the English-only model
    #[arg(long, alias = "non_english")]
    non_english: bool,

    /// Voice to use for TTS
    #[arg(long)]
    tts: Option<String>,

    /// Pick a random TTS voice per video (needs --gender and --language)
    #[arg(long, alias = "random_voice")]
    random_voice: bool,

    /// Gender of the random TTS voice
    #[arg(long, value_parser = ["Male", "Female"])]
    gender: Option<String>,

    /// Locale of the random TTS voice, for example en-US
    #[arg(long)]
    language: Option<String>,

    /// Print the available TTS voices and exit
    #[arg(long)]
    list_voices: bool,

    /// JSON job list
    #[arg(long)]
    jobs: Option<PathBuf>,

    #[arg(long)]
    background_dir: Option<PathBuf>,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Maximum number of videos produced at once
    #[arg(long)]
    parallel: Option<usize>,

    /// Keep each job's temp directory for debugging
    #[arg(long)]
    keep_intermediates: bool,

    /// Seed for voice and background choices
    #[arg(long)]
    seed: Option<u64>,

    /// Also write the run summary as JSON
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Apply flags on top of the environment configuration.
    fn apply(&self, config: &mut PipelineConfig) -> Result<(), ConfigurationError> {
        if let Some(model) = self.model {
            config.model = model;
        }
        if self.non_english {
            config.non_english = true;
        }
        if self.random_voice {
            config.voice = VoiceSelection::from_options(
                None,
                true,
                self.gender.clone(),
                self.language.clone(),
            )?;
        } else if let Some(tts) = &self.tts {
            config.voice = VoiceSelection::Fixed(tts.clone());
        }
        if let Some(jobs) = &self.jobs {
            config.jobs_path = jobs.clone();
        }
        if let Some(dir) = &self.background_dir {
            config.background_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(parallel) = self.parallel {
            config.max_parallel_jobs = parallel;
        }
        if self.keep_intermediates {
            config.keep_intermediates = true;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.validate()
    }
}

/// Log to stderr and append to `log/shortsmith.log`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = std::fs::create_dir_all("log")
        .and_then(|_| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open("log/shortsmith.log")
        })
        .map(|file| fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        .ok();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
}

fn print_summary(summary: &RunSummary) {
    for result in &summary.results {
        let status = match result.status {
            JobStatus::Success => "OK",
            JobStatus::PartialFailure => "PARTIAL",
            JobStatus::Fatal => "FAILED",
        };
        match (&result.output_path, &result.error_detail) {
            (Some(path), _) => println!("[{}] {} -> {}", status, result.job, path.display()),
            (None, Some(detail)) => println!("[{}] {} ({}): {}", status, result.job, result.last_state, detail),
            (None, None) => println!("[{}] {}", status, result.job),
        }
        for warning in &result.warnings {
            println!("    warning: {}", warning);
        }
    }
    for rejected in &summary.rejected {
        println!("[REJECTED] record {}: {}", rejected.index, rejected.reason);
    }
    println!(
        "{} succeeded, {} without captions, {} failed, {} rejected",
        summary.succeeded(),
        summary.partial(),
        summary.failed(),
        summary.rejected.len()
    );
}

async fn write_summary_json(path: &Path, summary: &RunSummary) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    tokio::fs::write(path, json).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid environment configuration");
            return ExitCode::from(2);
        }
    };
    if let Err(e) = cli.apply(&mut config) {
        tracing::error!(error = %e, "Invalid arguments");
        return ExitCode::from(2);
    }

    if cli.list_voices {
        return match EdgeTtsAdapter::new().list_voices().await {
            Ok(voices) => {
                for voice in voices {
                    println!("{:<40} {:<8} {}", voice.name, voice.gender, voice.locale);
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!(error = %e, "Could not list voices");
                ExitCode::FAILURE
            }
        };
    }

    if let Err(e) = ensure_tools(REQUIRED_TOOLS) {
        tracing::error!(error = %e, "Missing dependency");
        return ExitCode::from(2);
    }

    let loaded = match load_job_list(&config.jobs_path).await {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!(error = %e, "Could not load jobs");
            return ExitCode::from(2);
        }
    };
    tracing::info!(
        jobs = loaded.jobs.len(),
        rejected = loaded.rejected.len(),
        path = ?config.jobs_path,
        "Job list loaded"
    );

    let service = PipelineService::new(
        EdgeTtsAdapter::new(),
        WhisperCliAdapter::new(),
        FfmpegComposer::new(config.encode.clone()),
        FsBackgroundLibrary::new(&config.background_dir),
        NvidiaSmiProbe::new(),
        &config,
    );

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling remaining jobs");
            shutdown.cancel();
        }
    });

    let summary = match service.run(loaded, cancel).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!(error = %e, "Run aborted");
            return ExitCode::from(2);
        }
    };

    print_summary(&summary);
    if let Some(path) = &cli.summary_json {
        if let Err(e) = write_summary_json(path, &summary).await {
            tracing::error!(error = %e, ?path, "Could not write summary");
        }
    }

    if summary.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
