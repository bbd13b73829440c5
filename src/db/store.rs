use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::api::job::models::{Job, JobState, NewJob};
use crate::auth::token::TokenValidity;
use crate::db::models::TokenRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Persistence for jobs.
///
/// Implementations do not know the transition table. Writers pass the states
/// a row must currently be in, and the update only applies if it still is.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a pending job
    async fn insert(&self, job: &NewJob) -> Result<Job, StoreError>;

    async fn get(&self, id: i32) -> Result<Option<Job>, StoreError>;

    /// Oldest pending job, without claiming it
    async fn next_pending(&self) -> Result<Option<Job>, StoreError>;

    /// Atomically move the oldest pending job to in-progress and return it.
    /// Two concurrent callers never receive the same job.
    async fn claim_next(&self) -> Result<Option<Job>, StoreError>;

    /// Move job `id` to `to` if its current state is one of `allowed_from`.
    ///
    /// Stamps `started_at` on entering in-progress (never overwriting an
    /// existing stamp) and `completed_at` on entering complete. Returns `None`
    /// when the job is missing or in another state.
    async fn set_state(
        &self,
        id: i32,
        to: JobState,
        allowed_from: &[JobState],
    ) -> Result<Option<Job>, StoreError>;

    /// Fail every in-progress job started before `started_before`
    async fn fail_stale(&self, started_before: DateTime<Utc>) -> Result<Vec<Job>, StoreError>;

    /// Jobs newest first
    async fn list(
        &self,
        state: Option<JobState>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Job>, StoreError>;

    async fn count(&self, state: Option<JobState>) -> Result<i64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Persistence for issued app credentials
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert(
        &self,
        comment: &str,
        validity: TokenValidity,
        token: &str,
        created_at: DateTime<Utc>,
    ) -> Result<TokenRecord, StoreError>;

    async fn list(&self) -> Result<Vec<TokenRecord>, StoreError>;

    /// Returns false when no record had this id
    async fn delete(&self, id: i32) -> Result<bool, StoreError>;

    async fn contains(&self, token: &str) -> Result<bool, StoreError>;
}
