use actix_web::{HttpResponse, Responder, get, web};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::api::job::JobService;

/// Health check response
#[derive(Serialize, Deserialize)]
struct HealthResponse {
    status: String,
    database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn probe_store(service: &JobService, ok: &str, failed: &str) -> HttpResponse {
    match service.ping().await {
        Ok(()) => HttpResponse::Ok().json(HealthResponse {
            status: ok.to_string(),
            database: "connected".to_string(),
            error: None,
        }),
        Err(e) => {
            error!("Store probe failed: {}", e);
            HttpResponse::ServiceUnavailable().json(HealthResponse {
                status: failed.to_string(),
                database: "disconnected".to_string(),
                error: Some(e.to_string()),
            })
        }
    }
}

/// General health check including store connectivity
#[get("/health")]
async fn health_check(service: web::Data<JobService>) -> impl Responder {
    probe_store(&service, "healthy", "unhealthy").await
}

/// Readiness probe: 503 while the store is unreachable
#[get("/ready")]
async fn readiness_check(service: web::Data<JobService>) -> impl Responder {
    probe_store(&service, "ready", "not_ready").await
}

/// Liveness probe. Does not check dependencies.
#[get("/live")]
async fn liveness_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "alive".to_string(),
        database: "not_checked".to_string(),
        error: None,
    })
}

pub fn health_config(config: &mut web::ServiceConfig) {
    config
        .service(health_check)
        .service(readiness_check)
        .service(liveness_check);
}
