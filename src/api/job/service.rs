use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use chrono::{Duration, Utc};
use thiserror::Error;
use tracing::{error, info, warn};
use validator::Validate;

use super::models::{CreateJob, Job, JobState, NewJob};
use crate::api::validation::ErrorResponse;
use crate::db::{JobStore, StoreError};

/// Service-level errors
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(i32),

    #[error("Validation error: {0}")]
    InvalidInput(String),

    #[error("Job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: i32,
        from: JobState,
        to: JobState,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResponseError for JobError {
    fn status_code(&self) -> StatusCode {
        match self {
            JobError::NotFound(_) => StatusCode::NOT_FOUND,
            JobError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            JobError::InvalidTransition { .. } => StatusCode::CONFLICT,
            JobError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        match self {
            JobError::Store(e) => {
                error!("Store error: {}", e);
                HttpResponse::build(status).json(ErrorResponse {
                    error: "Failed to process request".to_string(),
                    fields: serde_json::json!({"message": "Store unavailable"}),
                })
            }
            JobError::InvalidInput(msg) => {
                warn!("Validation error: {}", msg);
                HttpResponse::build(status).json(ErrorResponse {
                    error: "Validation failed".to_string(),
                    fields: serde_json::json!({"message": msg}),
                })
            }
            JobError::NotFound(id) => {
                warn!("Job not found: {}", id);
                HttpResponse::build(status).json(ErrorResponse {
                    error: "Not found".to_string(),
                    fields: serde_json::json!({"message": format!("Job with id {} not found", id)}),
                })
            }
            JobError::InvalidTransition { id, from, to } => {
                warn!("Rejected transition of job {}: {} -> {}", id, from, to);
                HttpResponse::build(status).json(ErrorResponse {
                    error: "Invalid transition".to_string(),
                    fields: serde_json::json!({
                        "message": self.to_string(),
                        "state": from,
                    }),
                })
            }
        }
    }
}

/// Outcome of a conditional state change
enum Transition {
    Applied(Job),
    /// The job exists but was not in a state the target can be entered from
    Rejected(Job),
}

/// Job lifecycle controller, the only writer of job state
pub struct JobService {
    store: Arc<dyn JobStore>,
}

impl JobService {
    /// Create a new JobService instance
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Create a single pending job
    ///
    /// # Business Logic
    /// - Validates the payload and rejects blank name or type
    /// - A `state` in the payload is only accepted when it is `pending`
    /// - Identical jobs may be created repeatedly
    pub async fn create_job(&self, payload: &CreateJob) -> Result<Job, JobError> {
        info!("Service: Creating job with name={}", payload.name);

        if let Err(validation_errors) = payload.validate() {
            let messages: Vec<String> = validation_errors
                .field_errors()
                .values()
                .flat_map(|errors| {
                    errors.iter().map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| "Validation error".to_string())
                    })
                })
                .collect();
            return Err(JobError::InvalidInput(messages.join("; ")));
        }

        let name = payload.name.trim();
        let job_type = payload.job_type.trim();
        if name.is_empty() {
            return Err(JobError::InvalidInput("Name must not be blank".to_string()));
        }
        if job_type.is_empty() {
            return Err(JobError::InvalidInput("Type must not be blank".to_string()));
        }
        if let Some(state) = payload.state.filter(|state| *state != JobState::Pending) {
            return Err(JobError::InvalidInput(format!(
                "New jobs start in state pending, got {}",
                state
            )));
        }

        let job = self
            .store
            .insert(&NewJob {
                name: name.to_string(),
                job_type: job_type.to_string(),
                metadata: payload.metadata.clone().unwrap_or_default(),
            })
            .await?;

        info!("Service: Job created successfully with id={}", job.id);
        Ok(job)
    }

    /// Claim the oldest pending job for a worker. `None` when the queue is empty.
    pub async fn claim_next(&self) -> Result<Option<Job>, JobError> {
        let job = self.store.claim_next().await?;
        if let Some(job) = &job {
            info!("Service: Job {} ({}) claimed", job.id, job.name);
        }
        Ok(job)
    }

    /// Move a pending job to in-progress. A job already in progress is returned unchanged.
    pub async fn mark_started(&self, id: i32) -> Result<Job, JobError> {
        match self.transition(id, JobState::InProgress).await? {
            Transition::Applied(job) => Ok(job),
            Transition::Rejected(job) if job.state == JobState::InProgress => {
                info!("Service: Job {} already in progress", id);
                Ok(job)
            }
            Transition::Rejected(job) => Err(rejected(&job, JobState::InProgress)),
        }
    }

    pub async fn mark_complete(&self, id: i32) -> Result<Job, JobError> {
        match self.transition(id, JobState::Complete).await? {
            Transition::Applied(job) => Ok(job),
            Transition::Rejected(job) => Err(rejected(&job, JobState::Complete)),
        }
    }

    pub async fn mark_failed(&self, id: i32) -> Result<Job, JobError> {
        match self.transition(id, JobState::Failed).await? {
            Transition::Applied(job) => Ok(job),
            Transition::Rejected(job) => Err(rejected(&job, JobState::Failed)),
        }
    }

    /// Fail jobs that have been in progress for longer than `timeout`
    pub async fn reap_stale(&self, timeout: Duration) -> Result<Vec<Job>, JobError> {
        let failed = self.store.fail_stale(Utc::now() - timeout).await?;
        for job in &failed {
            warn!(
                "Service: Job {} ({}) exceeded {}s in progress, marked failed",
                job.id,
                job.name,
                timeout.num_seconds()
            );
        }
        Ok(failed)
    }

    pub async fn list_jobs(
        &self,
        state: Option<JobState>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Job>, JobError> {
        Ok(self.store.list(state, limit, offset).await?)
    }

    pub async fn count_jobs(&self, state: Option<JobState>) -> Result<i64, JobError> {
        Ok(self.store.count(state).await?)
    }

    pub async fn next_pending(&self) -> Result<Option<Job>, JobError> {
        Ok(self.store.next_pending().await?)
    }

    pub async fn ping(&self) -> Result<(), JobError> {
        Ok(self.store.ping().await?)
    }

    /// Apply `to` if the job is currently in one of its source states
    async fn transition(&self, id: i32, to: JobState) -> Result<Transition, JobError> {
        let sources = JobState::sources_of(to);
        if let Some(job) = self.store.set_state(id, to, &sources).await? {
            info!("Service: Job {} moved to {}", id, to);
            return Ok(Transition::Applied(job));
        }

        match self.store.get(id).await? {
            Some(job) => Ok(Transition::Rejected(job)),
            None => Err(JobError::NotFound(id)),
        }
    }
}

fn rejected(job: &Job, to: JobState) -> JobError {
    JobError::InvalidTransition {
        id: job.id,
        from: job.state,
        to,
    }
}
