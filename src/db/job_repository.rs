use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{Pool, Postgres};
use tracing::debug;

use crate::api::job::models::{Job, JobState, NewJob};
use crate::db::models::{JobRow, JOB_COLUMNS};
use crate::db::store::{JobStore, StoreError};

/// PostgreSQL-backed job store
#[derive(Clone)]
pub struct JobRepository {
    pool: Pool<Postgres>,
}

impl JobRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn into_jobs(rows: Vec<JobRow>) -> Result<Vec<Job>, StoreError> {
    rows.into_iter().map(Job::try_from).collect()
}

#[async_trait]
impl JobStore for JobRepository {
    async fn insert(&self, job: &NewJob) -> Result<Job, StoreError> {
        debug!("Creating job: name={}, type={}", job.name, job.job_type);

        let sql = format!(
            "INSERT INTO job (name, job_type, metadata) VALUES ($1, $2, $3) RETURNING {}",
            JOB_COLUMNS
        );
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(&job.name)
            .bind(&job.job_type)
            .bind(Json(&job.metadata))
            .fetch_one(&self.pool)
            .await?;

        debug!("Job created with id={}", row.id);
        row.try_into()
    }

    async fn get(&self, id: i32) -> Result<Option<Job>, StoreError> {
        let sql = format!("SELECT {} FROM job WHERE id = $1", JOB_COLUMNS);
        sqlx::query_as::<_, JobRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Job::try_from)
            .transpose()
    }

    async fn next_pending(&self) -> Result<Option<Job>, StoreError> {
        let sql = format!(
            "SELECT {} FROM job WHERE state = 'pending' ORDER BY id ASC LIMIT 1",
            JOB_COLUMNS
        );
        sqlx::query_as::<_, JobRow>(&sql)
            .fetch_optional(&self.pool)
            .await?
            .map(Job::try_from)
            .transpose()
    }

    async fn claim_next(&self) -> Result<Option<Job>, StoreError> {
        // Rows locked by a concurrent claim are skipped, so each caller gets a different job
        let sql = format!(
            r#"
            UPDATE job
            SET state = 'in-progress', started_at = COALESCE(started_at, now())
            WHERE id = (
                SELECT id FROM job
                WHERE state = 'pending'
                ORDER BY id ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            AND state = 'pending'
            RETURNING {}
            "#,
            JOB_COLUMNS
        );
        let claimed = sqlx::query_as::<_, JobRow>(&sql)
            .fetch_optional(&self.pool)
            .await?
            .map(Job::try_from)
            .transpose()?;

        match &claimed {
            Some(job) => debug!("Claimed job id={}", job.id),
            None => debug!("No pending job to claim"),
        }
        Ok(claimed)
    }

    async fn set_state(
        &self,
        id: i32,
        to: JobState,
        allowed_from: &[JobState],
    ) -> Result<Option<Job>, StoreError> {
        debug!("Setting job {} state to {} (from {:?})", id, to, allowed_from);

        let sources: Vec<String> = allowed_from.iter().map(|s| s.as_str().to_string()).collect();
        let sql = format!(
            r#"
            UPDATE job
            SET state = $2::text,
                started_at = CASE WHEN $2::text = 'in-progress'
                                  THEN COALESCE(started_at, now())
                                  ELSE started_at END,
                completed_at = CASE WHEN $2::text = 'complete'
                                    THEN COALESCE(completed_at, now())
                                    ELSE completed_at END
            WHERE id = $1 AND state = ANY($3)
            RETURNING {}
            "#,
            JOB_COLUMNS
        );
        sqlx::query_as::<_, JobRow>(&sql)
            .bind(id)
            .bind(to.as_str())
            .bind(sources)
            .fetch_optional(&self.pool)
            .await?
            .map(Job::try_from)
            .transpose()
    }

    async fn fail_stale(&self, started_before: DateTime<Utc>) -> Result<Vec<Job>, StoreError> {
        let sql = format!(
            r#"
            UPDATE job
            SET state = 'failed'
            WHERE state = 'in-progress' AND started_at < $1
            RETURNING {}
            "#,
            JOB_COLUMNS
        );
        let rows = sqlx::query_as::<_, JobRow>(&sql)
            .bind(started_before)
            .fetch_all(&self.pool)
            .await?;
        into_jobs(rows)
    }

    async fn list(
        &self,
        state: Option<JobState>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Job>, StoreError> {
        let sql = format!(
            r#"
            SELECT {} FROM job
            WHERE ($1::text IS NULL OR state = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            JOB_COLUMNS
        );
        let rows = sqlx::query_as::<_, JobRow>(&sql)
            .bind(state.map(JobState::as_str))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        into_jobs(rows)
    }

    async fn count(&self, state: Option<JobState>) -> Result<i64, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM job WHERE ($1::text IS NULL OR state = $1)")
                .bind(state.map(JobState::as_str))
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
