use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Free-form job metadata, stored and returned verbatim
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Lifecycle state of a job
///
/// Allowed transitions:
/// - `pending -> in-progress`
/// - `in-progress -> complete`
/// - `in-progress -> failed`
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum JobState {
    Pending,
    InProgress,
    Failed,
    Complete,
}

impl JobState {
    pub const ALL: [JobState; 4] = [
        JobState::Pending,
        JobState::InProgress,
        JobState::Failed,
        JobState::Complete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::InProgress => "in-progress",
            JobState::Failed => "failed",
            JobState::Complete => "complete",
        }
    }

    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Pending, JobState::InProgress)
                | (JobState::InProgress, JobState::Complete)
                | (JobState::InProgress, JobState::Failed)
        )
    }

    /// States from which `next` may be entered
    pub fn sources_of(next: JobState) -> Vec<JobState> {
        Self::ALL
            .into_iter()
            .filter(|state| state.can_transition_to(next))
            .collect()
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownJobState(pub String);

impl fmt::Display for UnknownJobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown job state '{}'", self.0)
    }
}

impl std::error::Error for UnknownJobState {}

impl FromStr for JobState {
    type Err = UnknownJobState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| UnknownJobState(s.to_string()))
    }
}

/// A job as stored and returned to workers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub state: JobState,
    #[serde(rename = "created_time")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "started_time")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "completed_time")]
    pub completed_at: Option<DateTime<Utc>>,
    pub metadata: Metadata,
}

impl Job {
    /// Time spent on the job so far: up to completion if finished, up to `now` otherwise.
    /// `None` when the job was never started.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        let started_at = self.started_at?;
        Some(self.completed_at.unwrap_or(now) - started_at)
    }
}

/// Job creation payload
#[derive(Deserialize, Serialize, Debug, Validate)]
pub struct CreateJob {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,

    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 255, message = "Type must be between 1 and 255 characters"))]
    pub job_type: String,

    #[serde(default)]
    pub state: Option<JobState>,

    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Validated job ready for insertion
#[derive(Debug, Clone)]
pub struct NewJob {
    pub name: String,
    pub job_type: String,
    pub metadata: Metadata,
}
