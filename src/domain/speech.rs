//! Voice and recognition model choices.

use crate::domain::media::Voice;
use crate::error::ConfigurationError;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_VOICE: &str = "en-US-ChristopherNeural";

/// How the TTS voice is chosen for each job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceSelection {
    Fixed(String),
    /// A random voice per job, filtered by gender and locale (e.g. `en-US`)
    Random { gender: String, locale: String },
}

impl Default for VoiceSelection {
    fn default() -> Self {
        VoiceSelection::Fixed(DEFAULT_VOICE.to_string())
    }
}

impl VoiceSelection {
    /// Build from the CLI/env options; random voices need both filters.
    pub fn from_options(
        voice: Option<String>,
        random: bool,
        gender: Option<String>,
        locale: Option<String>,
    ) -> Result<Self, ConfigurationError> {
        if !random {
            return Ok(VoiceSelection::Fixed(
                voice.unwrap_or_else(|| DEFAULT_VOICE.to_string()),
            ));
        }
        match (gender, locale) {
            (Some(gender), Some(locale)) => Ok(VoiceSelection::Random { gender, locale }),
            _ => Err(ConfigurationError::InvalidVoiceSelection(
                "a random voice needs both a gender and a language".to_string(),
            )),
        }
    }

    /// Whether the selected voice speaks English.
    pub fn is_english(&self) -> bool {
        match self {
            VoiceSelection::Fixed(name) => name.to_lowercase().starts_with("en"),
            VoiceSelection::Random { locale, .. } => locale.to_lowercase().starts_with("en"),
        }
    }
}

/// Voices matching a gender and locale, case-insensitively.
pub fn matching_voices<'a>(voices: &'a [Voice], gender: &str, locale: &str) -> Vec<&'a Voice> {
    voices
        .iter()
        .filter(|v| v.gender.eq_ignore_ascii_case(gender) && v.locale.eq_ignore_ascii_case(locale))
        .collect()
}

/// Pick one voice from `candidates`.
pub fn choose_voice<R: Rng + ?Sized>(
    candidates: &[&Voice],
    rng: &mut R,
) -> Result<String, ConfigurationError> {
    candidates
        .choose(rng)
        .map(|v| v.name.clone())
        .ok_or_else(|| {
            ConfigurationError::InvalidVoiceSelection(
                "no voice matches the requested gender and language".to_string(),
            )
        })
}

/// Whisper model sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Tiny,
    Base,
    #[default]
    Small,
    Medium,
    Large,
}

impl ModelSize {
    /// Name passed to whisper. English-only variants exist for all but `large`.
    pub fn model_name(self, english_only: bool) -> String {
        if english_only && self != ModelSize::Large {
            format!("{}.en", self)
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        };
        f.write_str(name)
    }
}

impl FromStr for ModelSize {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tiny" => Ok(ModelSize::Tiny),
            "base" => Ok(ModelSize::Base),
            "small" => Ok(ModelSize::Small),
            "medium" => Ok(ModelSize::Medium),
            "large" => Ok(ModelSize::Large),
            other => Err(ConfigurationError::Invalid(format!(
                "unknown model size '{}'",
                other
            ))),
        }
    }
}
