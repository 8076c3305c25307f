use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// One script-to-video conversion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoJob {
    pub series: String,
    pub part: u32,
    pub text: String,
    pub outro: String,
    /// Directory the caption files are delivered to
    #[serde(rename = "path")]
    pub subtitles_path: PathBuf,
}

impl VideoJob {
    /// Script handed to the voice synthesizer.
    pub fn full_text(&self) -> String {
        format!("{} Part {}.\n{}\n{}", self.series, self.part, self.text, self.outro)
    }

    /// Series name reduced to a single safe path component, used for
    /// directories and file names. Anything other than letters, digits,
    /// `-`, `_` and `.` becomes `_`; leading dots are dropped.
    pub fn series_slug(&self) -> String {
        let slug: String = self
            .series
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let slug = slug.trim_start_matches('.');
        if slug.is_empty() {
            "_".to_string()
        } else {
            slug.to_string()
        }
    }

    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.series_slug(), self.part)
    }

    /// Directory the `.srt`/`.ass` deliverables end up in.
    pub fn caption_dir(&self) -> PathBuf {
        self.subtitles_path.join(self.series_slug())
    }

    pub fn label(&self) -> String {
        format!("{} Part {}", self.series, self.part)
    }
}

/// A job list entry that could not be turned into a [`VideoJob`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRecord {
    pub index: usize,
    pub reason: String,
}

/// Outcome of loading a job list
#[derive(Debug, Default)]
pub struct LoadedJobs {
    pub jobs: Vec<VideoJob>,
    pub rejected: Vec<RejectedRecord>,
}

/// Parse a JSON array of job records.
///
/// The document itself must be an array; individual records that fail
/// validation are collected in `rejected` instead of failing the load.
pub fn parse_job_list(content: &str) -> Result<LoadedJobs, ConfigurationError> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| ConfigurationError::InvalidJobList(e.to_string()))?;
    let records = value
        .as_array()
        .ok_or_else(|| ConfigurationError::InvalidJobList("expected a JSON array".to_string()))?;

    let mut loaded = LoadedJobs::default();
    for (index, record) in records.iter().enumerate() {
        match validate_record(record) {
            Ok(job) => loaded.jobs.push(job),
            Err(reason) => {
                tracing::warn!(index, %reason, "Rejecting job record");
                loaded.rejected.push(RejectedRecord { index, reason });
            }
        }
    }
    Ok(loaded)
}

/// Read and parse a job list file.
pub async fn load_job_list(path: &Path) -> Result<LoadedJobs, ConfigurationError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigurationError::UnreadableJobList {
            path: path.to_path_buf(),
            source,
        })?;
    parse_job_list(&content)
}

fn validate_record(record: &Value) -> Result<VideoJob, String> {
    let object = record.as_object().ok_or("record is not an object")?;

    let string_field = |name: &str| -> Result<String, String> {
        match object.get(name) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(format!("field '{}' must be a string", name)),
            None => Err(format!("missing field '{}'", name)),
        }
    };

    let series = string_field("series")?;
    let text = string_field("text")?;
    let outro = string_field("outro")?;
    let path = string_field("path")?;

    let part = match object.get("part") {
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|p| u32::try_from(p).ok())
            .ok_or_else(|| format!("field 'part' must be a non-negative integer, got {}", n))?,
        Some(_) => return Err("field 'part' must be an integer".to_string()),
        None => return Err("missing field 'part'".to_string()),
    };

    if series.trim().is_empty() {
        return Err("field 'series' is empty".to_string());
    }
    if text.trim().is_empty() {
        return Err("field 'text' is empty".to_string());
    }

    Ok(VideoJob {
        series,
        part,
        text,
        outro,
        subtitles_path: PathBuf::from(path),
    })
}

/// Per-job pipeline states, in the only order they may be visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum JobState {
    Loaded,
    DeviceResolved,
    Synthesized,
    Transcribed,
    CaptionsCompiled,
    Composed,
    Finalized,
    Succeeded,
    Failed,
}

impl JobState {
    /// The state that follows `self` on the happy path.
    pub fn next(self) -> Option<JobState> {
        use JobState::*;
        match self {
            Loaded => Some(DeviceResolved),
            DeviceResolved => Some(Synthesized),
            Synthesized => Some(Transcribed),
            Transcribed => Some(CaptionsCompiled),
            CaptionsCompiled => Some(Composed),
            Composed => Some(Finalized),
            Finalized => Some(Succeeded),
            Succeeded | Failed => None,
        }
    }

    /// Whether `self` may move to `to`: the next state on the happy path,
    /// or `Failed` from any non-terminal state.
    pub fn can_move_to(self, to: JobState) -> bool {
        match to {
            JobState::Failed => !self.is_terminal(),
            _ => self.next() == Some(to),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobStatus {
    /// Video written with burned-in captions
    Success,
    /// Video written, but without captions
    PartialFailure,
    /// No video produced
    Fatal,
}

/// Terminal record for one job
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    pub job: String,
    pub status: JobStatus,
    pub output_path: Option<PathBuf>,
    pub error_detail: Option<String>,
    /// `Succeeded` or `Failed`
    pub final_state: JobState,
    /// Last pipeline state reached before the terminal one
    pub last_state: JobState,
    pub warnings: Vec<String>,
}

impl JobResult {
    pub fn is_failure(&self) -> bool {
        self.status == JobStatus::Fatal
    }
}

/// Everything reported at the end of a run
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub results: Vec<JobResult>,
    pub rejected: Vec<RejectedRecord>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.count(JobStatus::Success)
    }

    pub fn partial(&self) -> usize {
        self.count(JobStatus::PartialFailure)
    }

    pub fn failed(&self) -> usize {
        self.count(JobStatus::Fatal)
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0 || !self.rejected.is_empty()
    }

    fn count(&self, status: JobStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}
