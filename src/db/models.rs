use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

use crate::api::job::models::{Job, Metadata};
use crate::db::store::StoreError;

/// Column list shared by every job query
pub const JOB_COLUMNS: &str =
    "id, name, job_type, state, created_at, started_at, completed_at, metadata";

/// Database representation of a job with all fields
#[derive(Debug, FromRow)]
pub struct JobRow {
    pub id: i32,
    pub name: String,
    pub job_type: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub metadata: Json<Metadata>,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let state = row
            .state
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("job {}: {}", row.id, e)))?;

        Ok(Job {
            id: row.id,
            name: row.name,
            job_type: row.job_type,
            state,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            metadata: row.metadata.0,
        })
    }
}

/// Stored app credential
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TokenRecord {
    pub id: i32,
    pub comment: String,
    pub duration_secs: i64,
    pub token: String,
    #[serde(rename = "created_time")]
    pub created_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn validity(&self) -> Duration {
        Duration::seconds(self.duration_secs)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + self.validity()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}
