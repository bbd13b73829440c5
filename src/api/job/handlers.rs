use actix_web::{
    HttpResponse, get, post,
    web::{Data, Path, ServiceConfig, scope},
};
use actix_web_validator::Json;

use super::dto::JobResponse;
use super::models::CreateJob;
use super::service::{JobError, JobService};
use crate::auth::AppCredential;

/// Claim the oldest pending job; 204 when there is nothing to do
#[get("")]
async fn claim_job(
    _app: AppCredential,
    service: Data<JobService>,
) -> Result<HttpResponse, JobError> {
    match service.claim_next().await? {
        Some(job) => Ok(HttpResponse::Ok().json(job)),
        None => Ok(HttpResponse::NoContent().finish()),
    }
}

#[post("")]
async fn create_job(
    _app: AppCredential,
    service: Data<JobService>,
    job: Json<CreateJob>,
) -> Result<HttpResponse, JobError> {
    let job = service.create_job(&job).await?;
    Ok(HttpResponse::Ok().json(JobResponse::new("Job created successfully", job)))
}

#[post("/{id}/started")]
async fn job_started(
    _app: AppCredential,
    service: Data<JobService>,
    id: Path<i32>,
) -> Result<HttpResponse, JobError> {
    let job = service.mark_started(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(JobResponse::new("Job started", job)))
}

#[post("/{id}/complete")]
async fn job_complete(
    _app: AppCredential,
    service: Data<JobService>,
    id: Path<i32>,
) -> Result<HttpResponse, JobError> {
    let job = service.mark_complete(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(JobResponse::new("Job complete", job)))
}

#[post("/{id}/failed")]
async fn job_failed(
    _app: AppCredential,
    service: Data<JobService>,
    id: Path<i32>,
) -> Result<HttpResponse, JobError> {
    let job = service.mark_failed(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(JobResponse::new("Job failed", job)))
}

pub fn job_config(config: &mut ServiceConfig) {
    config.service(
        scope("/api/job")
            .service(claim_job)
            .service(create_job)
            .service(job_started)
            .service(job_complete)
            .service(job_failed),
    );
}
