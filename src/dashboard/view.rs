//! View models served to the dashboard pages.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::api::job::{Job, JobError, JobService, JobState};
use crate::db::models::TokenRecord;

/// Jobs per dashboard page
pub const PAGE_SIZE: i64 = 15;

/// `HH:MM:SS`, prefixed with days and 30-day months when they are non-zero.
/// `N/A` when there is no duration.
pub fn format_duration(duration: Option<Duration>) -> String {
    let Some(duration) = duration else {
        return "N/A".to_string();
    };
    let total = duration.num_seconds().max(0);

    let total_days = total / 86_400;
    let months = total_days / 30;
    let days = total_days % 30;
    let hours = (total / 3_600) % 24;
    let minutes = (total / 60) % 60;
    let seconds = total % 60;

    if months > 0 {
        format!("{}m {}d {:02}:{:02}:{:02}", months, days, hours, minutes, seconds)
    } else if days > 0 {
        format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

#[derive(Debug, Serialize)]
pub struct JobView {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub state: JobState,
    pub created_time: DateTime<Utc>,
    pub duration: String,
}

impl JobView {
    pub fn new(job: &Job, now: DateTime<Utc>) -> Self {
        Self {
            id: job.id,
            name: job.name.clone(),
            job_type: job.job_type.clone(),
            state: job.state,
            created_time: job.created_at,
            duration: format_duration(job.elapsed(now)),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub failed: i64,
    pub complete: i64,
}

impl JobStats {
    pub async fn collect(service: &JobService) -> Result<Self, JobError> {
        Ok(Self {
            total: service.count_jobs(None).await?,
            pending: service.count_jobs(Some(JobState::Pending)).await?,
            in_progress: service.count_jobs(Some(JobState::InProgress)).await?,
            failed: service.count_jobs(Some(JobState::Failed)).await?,
            complete: service.count_jobs(Some(JobState::Complete)).await?,
        })
    }
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl Pagination {
    /// Pages are 1-based. Below 1 means the first page, past the end means the last.
    pub fn new(requested: Option<i64>, total_items: i64) -> Self {
        let total_pages = (total_items.max(0) + PAGE_SIZE - 1) / PAGE_SIZE;
        Self {
            page: requested
                .filter(|page| *page > 0)
                .unwrap_or(1)
                .min(total_pages.max(1)),
            page_size: PAGE_SIZE,
            total_pages,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardData {
    pub jobs: Vec<JobView>,
    pub stats: JobStats,
    pub pagination: Pagination,
    pub state_filter: Option<JobState>,
    /// Id of the job the next worker poll will receive
    pub next_pending: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct TokenView {
    pub id: i32,
    pub comment: String,
    pub token: String,
    pub created_time: DateTime<Utc>,
    pub expires_time: DateTime<Utc>,
    pub remaining: String,
    pub expired: bool,
}

impl TokenView {
    pub fn new(record: &TokenRecord, now: DateTime<Utc>) -> Self {
        let expired = record.is_expired_at(now);
        Self {
            id: record.id,
            comment: record.comment.clone(),
            token: record.token.clone(),
            created_time: record.created_at,
            expires_time: record.expires_at(),
            remaining: if expired {
                "expired".to_string()
            } else {
                format_duration(Some(record.expires_at() - now))
            },
            expired,
        }
    }
}
