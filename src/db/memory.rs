//! In-process stores for tests. A single mutex makes every operation atomic.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::api::job::models::{Job, JobState, NewJob};
use crate::auth::token::TokenValidity;
use crate::db::models::TokenRecord;
use crate::db::store::{JobStore, StoreError, TokenStore};

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<Vec<Job>>,
}

impl MemoryJobStore {
    /// Overwrite a job's start stamp, to simulate one that has been running a while
    pub fn backdate_start(&self, id: i32, started_at: DateTime<Utc>) {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.iter_mut().find(|job| job.id == id) {
            job.started_at = Some(started_at);
        }
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, job: &NewJob) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = Job {
            id: jobs.len() as i32 + 1,
            name: job.name.clone(),
            job_type: job.job_type.clone(),
            state: JobState::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            metadata: job.metadata.clone(),
        };
        jobs.push(job.clone());
        Ok(job)
    }

    async fn get(&self, id: i32) -> Result<Option<Job>, StoreError> {
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs.iter().find(|job| job.id == id).cloned())
    }

    async fn next_pending(&self) -> Result<Option<Job>, StoreError> {
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs.iter().find(|job| job.state == JobState::Pending).cloned())
    }

    async fn claim_next(&self) -> Result<Option<Job>, StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        Ok(jobs
            .iter_mut()
            .find(|job| job.state == JobState::Pending)
            .map(|job| {
                job.state = JobState::InProgress;
                job.started_at.get_or_insert_with(Utc::now);
                job.clone()
            }))
    }

    async fn set_state(
        &self,
        id: i32,
        to: JobState,
        allowed_from: &[JobState],
    ) -> Result<Option<Job>, StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        let Some(job) = jobs
            .iter_mut()
            .find(|job| job.id == id && allowed_from.contains(&job.state))
        else {
            return Ok(None);
        };

        job.state = to;
        match to {
            JobState::InProgress => {
                job.started_at.get_or_insert_with(Utc::now);
            }
            JobState::Complete => {
                job.completed_at.get_or_insert_with(Utc::now);
            }
            JobState::Pending | JobState::Failed => {}
        }
        Ok(Some(job.clone()))
    }

    async fn fail_stale(&self, started_before: DateTime<Utc>) -> Result<Vec<Job>, StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        Ok(jobs
            .iter_mut()
            .filter(|job| {
                job.state == JobState::InProgress
                    && job.started_at.is_some_and(|started| started < started_before)
            })
            .map(|job| {
                job.state = JobState::Failed;
                job.clone()
            })
            .collect())
    }

    async fn list(
        &self,
        state: Option<JobState>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Job>, StoreError> {
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs
            .iter()
            .rev()
            .filter(|job| state.map_or(true, |state| job.state == state))
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self, state: Option<JobState>) -> Result<i64, StoreError> {
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs
            .iter()
            .filter(|job| state.map_or(true, |state| job.state == state))
            .count() as i64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTokenStore {
    records: Mutex<Vec<TokenRecord>>,
    next_id: Mutex<i32>,
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn insert(
        &self,
        comment: &str,
        validity: TokenValidity,
        token: &str,
        created_at: DateTime<Utc>,
    ) -> Result<TokenRecord, StoreError> {
        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        let record = TokenRecord {
            id: *next_id,
            comment: comment.to_string(),
            duration_secs: validity.duration().num_seconds(),
            token: token.to_string(),
            created_at,
        };
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<TokenRecord>, StoreError> {
        Ok(self.records.lock().unwrap().iter().rev().cloned().collect())
    }

    async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|record| record.id != id);
        Ok(records.len() < before)
    }

    async fn contains(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .any(|record| record.token == token))
    }
}
