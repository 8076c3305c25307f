//! Pipeline configuration.
//!
//! Values come from `SHORTSMITH_*` environment variables (a `.env` file is
//! loaded first); the binary then overrides them with command-line flags.

use crate::adapters::local::EncodeSettings;
use crate::domain::captions::{CaptionStyle, CompilerPolicy};
use crate::domain::speech::{ModelSize, VoiceSelection};
use crate::error::ConfigurationError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// JSON job list
    pub jobs_path: PathBuf,
    /// Directory scanned for background clips
    pub background_dir: PathBuf,
    /// Where finished videos are written
    pub output_dir: PathBuf,
    pub model: ModelSize,
    /// Use the multilingual whisper model even for English voices
    pub non_english: bool,
    pub voice: VoiceSelection,
    pub max_parallel_jobs: usize,
    /// Keep each job's temp directory instead of removing it
    pub keep_intermediates: bool,
    /// Parent of the per-job temp directories; the system default when unset
    pub temp_root: Option<PathBuf>,
    /// Seed for voice, background and offset choices
    pub seed: Option<u64>,
    /// Synthesis attempts after the first one fails
    pub synthesis_retries: u32,
    /// Delay before the first synthesis retry, doubled on each further one
    pub retry_backoff: Duration,
    pub compose_timeout: Duration,
    pub policy: CompilerPolicy,
    pub style: CaptionStyle,
    pub encode: EncodeSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            jobs_path: PathBuf::from("video.json"),
            background_dir: PathBuf::from("background"),
            output_dir: PathBuf::from("output"),
            model: ModelSize::default(),
            non_english: false,
            voice: VoiceSelection::default(),
            max_parallel_jobs: 1,
            keep_intermediates: false,
            temp_root: None,
            seed: None,
            synthesis_retries: 3,
            retry_backoff: Duration::from_millis(500),
            compose_timeout: Duration::from_secs(600),
            policy: CompilerPolicy::default(),
            style: CaptionStyle::default(),
            encode: EncodeSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup, starting from the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let var = |name: &str| lookup(&format!("SHORTSMITH_{}", name)).filter(|v| !v.trim().is_empty());

        if let Some(path) = var("JOBS") {
            config.jobs_path = PathBuf::from(path);
        }
        if let Some(dir) = var("BACKGROUND_DIR") {
            config.background_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var("OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(model) = var("MODEL") {
            config.model = model.parse()?;
        }
        config.non_english = parse_or("NON_ENGLISH", var("NON_ENGLISH"), false)?;
        config.voice = VoiceSelection::from_options(
            var("TTS"),
            parse_or("RANDOM_VOICE", var("RANDOM_VOICE"), false)?,
            var("GENDER"),
            var("LANGUAGE"),
        )?;
        config.max_parallel_jobs = parse_or("PARALLEL", var("PARALLEL"), config.max_parallel_jobs)?;
        config.keep_intermediates =
            parse_or("KEEP_INTERMEDIATES", var("KEEP_INTERMEDIATES"), false)?;
        config.temp_root = var("TEMP_DIR").map(PathBuf::from);
        config.seed = var("SEED").map(|s| parse_value("SEED", &s)).transpose()?;
        config.synthesis_retries =
            parse_or("SYNTHESIS_RETRIES", var("SYNTHESIS_RETRIES"), config.synthesis_retries)?;
        config.retry_backoff = Duration::from_millis(parse_or(
            "RETRY_BACKOFF_MS",
            var("RETRY_BACKOFF_MS"),
            config.retry_backoff.as_millis() as u64,
        )?);
        config.compose_timeout = Duration::from_secs(parse_or(
            "COMPOSE_TIMEOUT_SECS",
            var("COMPOSE_TIMEOUT_SECS"),
            config.compose_timeout.as_secs(),
        )?);
        config.policy.max_line_chars =
            parse_or("MAX_LINE_CHARS", var("MAX_LINE_CHARS"), config.policy.max_line_chars)?;
        config.policy.min_display_ms =
            parse_or("MIN_DISPLAY_MS", var("MIN_DISPLAY_MS"), config.policy.min_display_ms)?;
        config.style.karaoke = parse_or("KARAOKE", var("KARAOKE"), config.style.karaoke)?;
        if let Some(font) = var("FONT") {
            config.style.font_name = font;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_parallel_jobs == 0 {
            return Err(ConfigurationError::Invalid(
                "parallel jobs must be at least 1".to_string(),
            ));
        }
        if self.compose_timeout.is_zero() {
            return Err(ConfigurationError::Invalid(
                "compose timeout must be positive".to_string(),
            ));
        }
        self.policy
            .validate()
            .map_err(|e| ConfigurationError::Invalid(e.to_string()))
    }

    /// Whether transcription can use an English-only model.
    pub fn english(&self) -> bool {
        !self.non_english && self.voice.is_english()
    }

    /// Whisper model name for this run.
    pub fn model_name(&self) -> String {
        self.model.model_name(self.english())
    }

    /// Language hint for the recognizer; `None` lets it detect the language.
    pub fn language_hint(&self) -> Option<String> {
        self.english().then(|| "en".to_string())
    }
}

fn parse_value<T: FromStr>(name: &str, raw: &str) -> Result<T, ConfigurationError> {
    raw.trim().parse().map_err(|_| {
        ConfigurationError::Invalid(format!("SHORTSMITH_{} has invalid value '{}'", name, raw))
    })
}

fn parse_or<T: FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T, ConfigurationError> {
    match raw {
        Some(raw) => parse_value(name, &raw),
        None => Ok(default),
    }
}
