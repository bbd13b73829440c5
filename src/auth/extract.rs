use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use tracing::{debug, error};

use super::error::{AuthError, LoginRequired};
use super::service::TokenService;
use super::token::Claims;

/// Name of the cookie carrying the operator session
pub const SESSION_COOKIE: &str = "jwt";

/// Worker authenticated by an unrevoked app credential in the `Authorization` header
#[derive(Debug, Clone)]
pub struct AppCredential(pub Claims);

/// Operator authenticated by the session cookie
#[derive(Debug, Clone)]
pub struct SessionUser(pub Claims);

fn token_service(req: &HttpRequest) -> Option<web::Data<TokenService>> {
    let service = req.app_data::<web::Data<TokenService>>().cloned();
    if service.is_none() {
        error!("TokenService is not registered as app data");
    }
    service
}

/// Raw header value, with or without a `Bearer ` prefix
fn bearer_token(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then(|| token.to_string())
}

impl FromRequest for AppCredential {
    type Error = AuthError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let service = token_service(req);
        let token = bearer_token(req);

        Box::pin(async move {
            let service = service.ok_or(AuthError::NotConfigured)?;
            let token = token.ok_or(AuthError::MissingCredential)?;
            let claims = service.authorize_app(&token).await?;
            debug!("Authenticated app '{}'", claims.sub);
            Ok(AppCredential(claims))
        })
    }
}

impl FromRequest for SessionUser {
    type Error = LoginRequired;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = (|| -> Result<SessionUser, AuthError> {
            let service = token_service(req).ok_or(AuthError::NotConfigured)?;
            let cookie = req
                .cookie(SESSION_COOKIE)
                .ok_or(AuthError::MissingCredential)?;
            let claims = service.authorize_session(cookie.value())?;
            debug!(
                "Authenticated user '{}', session ends {:?}",
                claims.sub,
                claims.expires_at()
            );
            Ok(SessionUser(claims))
        })()
        .map_err(LoginRequired);

        ready(result)
    }
}
