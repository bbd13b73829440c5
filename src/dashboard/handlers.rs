use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::http::header;
use actix_web::{HttpResponse, delete, get, post, web};
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, warn};

use super::view::{DashboardData, JobStats, JobView, Pagination, TokenView};
use crate::api::job::{JobError, JobService, JobState};
use crate::auth::extract::SESSION_COOKIE;
use crate::auth::token::USER_SESSION_HOURS;
use crate::auth::{AuthError, SessionUser, TokenService, TokenValidity};

const LOGIN_PAGE: &str = include_str!("pages/login.html");
const INDEX_PAGE: &str = include_str!("pages/index.html");
const TOKENS_PAGE: &str = include_str!("pages/tokens.html");

fn html(page: &'static str) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(page)
}

fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

#[get("/login")]
async fn login_page() -> HttpResponse {
    html(LOGIN_PAGE)
}

#[post("/login")]
async fn login(tokens: web::Data<TokenService>, form: web::Form<LoginForm>) -> HttpResponse {
    match tokens.login(&form.username, &form.password) {
        Ok(session) => {
            let cookie = Cookie::build(SESSION_COOKIE, session)
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .max_age(CookieDuration::hours(USER_SESSION_HOURS))
                .finish();
            HttpResponse::SeeOther()
                .insert_header((header::LOCATION, "/"))
                .cookie(cookie)
                .finish()
        }
        Err(AuthError::BadCredentials) => see_other("/login?error=credentials"),
        Err(e) => {
            error!("Login failed: {}", e);
            see_other("/login?error=internal")
        }
    }
}

#[get("/logout")]
async fn logout() -> HttpResponse {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookie.make_removal();
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/login"))
        .cookie(cookie)
        .finish()
}

#[get("/")]
async fn index(_user: SessionUser) -> HttpResponse {
    html(INDEX_PAGE)
}

#[get("/tokens")]
async fn tokens_page(_user: SessionUser) -> HttpResponse {
    html(TOKENS_PAGE)
}

#[derive(Deserialize)]
struct JobsQuery {
    page: Option<String>,
    state: Option<JobState>,
}

/// Paginated job list with aggregate counts
#[get("/dashboard/jobs")]
async fn jobs_data(
    _user: SessionUser,
    service: web::Data<JobService>,
    query: web::Query<JobsQuery>,
) -> Result<HttpResponse, JobError> {
    let requested = query.page.as_deref().and_then(|page| page.parse().ok());
    let total = service.count_jobs(query.state).await?;
    let pagination = Pagination::new(requested, total);

    let now = Utc::now();
    let jobs = service
        .list_jobs(query.state, pagination.page_size, pagination.offset())
        .await?
        .iter()
        .map(|job| JobView::new(job, now))
        .collect();

    Ok(HttpResponse::Ok().json(DashboardData {
        jobs,
        stats: JobStats::collect(&service).await?,
        pagination,
        state_filter: query.state,
        next_pending: service.next_pending().await?.map(|job| job.id),
    }))
}

#[get("/dashboard/tokens")]
async fn tokens_data(
    _user: SessionUser,
    tokens: web::Data<TokenService>,
) -> Result<HttpResponse, AuthError> {
    let now = Utc::now();
    let views: Vec<TokenView> = tokens
        .list_credentials()
        .await?
        .iter()
        .map(|record| TokenView::new(record, now))
        .collect();
    Ok(HttpResponse::Ok().json(views))
}

#[derive(Deserialize)]
struct CreateTokenForm {
    #[serde(default)]
    comment: String,
    #[serde(default)]
    duration: String,
}

#[post("/token")]
async fn create_token(
    user: SessionUser,
    tokens: web::Data<TokenService>,
    form: web::Form<CreateTokenForm>,
) -> HttpResponse {
    let Ok(validity) = form.duration.parse::<TokenValidity>() else {
        warn!("Invalid token duration '{}'", form.duration);
        return see_other("/tokens?error=duration");
    };

    match tokens.create_credential(&form.comment, validity).await {
        Ok(record) => {
            info!("User '{}' created token {}", user.0.sub, record.id);
            see_other("/tokens")
        }
        Err(e) => {
            error!("Failed to create token: {}", e);
            see_other("/tokens?error=create")
        }
    }
}

#[delete("/token/{id}")]
async fn delete_token(
    user: SessionUser,
    tokens: web::Data<TokenService>,
    id: web::Path<i32>,
) -> HttpResponse {
    let id = id.into_inner();
    match tokens.revoke_credential(id).await {
        Ok(()) => {
            info!("User '{}' deleted token {}", user.0.sub, id);
            see_other("/tokens")
        }
        Err(e) => {
            error!("Failed to delete token {}: {}", id, e);
            see_other("/tokens?error=delete")
        }
    }
}

pub fn dashboard_config(config: &mut web::ServiceConfig) {
    config
        .service(login_page)
        .service(login)
        .service(logout)
        .service(index)
        .service(tokens_page)
        .service(jobs_data)
        .service(tokens_data)
        .service(create_token)
        .service(delete_token);
}
