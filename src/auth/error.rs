use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use tracing::{error, warn};

use crate::api::validation::ErrorResponse;
use crate::db::StoreError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("credential missing")]
    MissingCredential,

    #[error("credential signature does not match")]
    InvalidSignature,

    #[error("credential is malformed")]
    Malformed,

    #[error("credential expired")]
    Expired,

    #[error("credential issued for another principal")]
    WrongPrincipal,

    #[error("credential has been revoked")]
    Revoked,

    #[error("username or password is incorrect")]
    BadCredentials,

    #[error("no credential with id {0}")]
    UnknownCredential(i32),

    #[error("failed to sign credential: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("credential service is not registered")]
    NotConfigured,
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::UnknownCredential(_) => StatusCode::NOT_FOUND,
            AuthError::Signing(_) | AuthError::Store(_) | AuthError::NotConfigured => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error = if status == StatusCode::UNAUTHORIZED {
            warn!("Rejected credential: {}", self);
            "unauthorized"
        } else if status == StatusCode::NOT_FOUND {
            warn!("{}", self);
            "not found"
        } else {
            error!("Credential check failed: {}", self);
            "internal error"
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: error.to_string(),
            fields: serde_json::json!({"message": self.to_string()}),
        })
    }
}

/// Dashboard request without a valid session; answered with a redirect to the login page.
/// Server-side failures keep their own status.
#[derive(Debug, Error)]
#[error("login required: {0}")]
pub struct LoginRequired(#[source] pub AuthError);

impl ResponseError for LoginRequired {
    fn status_code(&self) -> StatusCode {
        match self.0.status_code() {
            StatusCode::INTERNAL_SERVER_ERROR => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::SEE_OTHER,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code() != StatusCode::SEE_OTHER {
            return self.0.error_response();
        }
        HttpResponse::SeeOther()
            .insert_header((header::LOCATION, "/login"))
            .finish()
    }
}
