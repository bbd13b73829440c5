use std::path::Path;
use std::sync::Arc;

use actix_web::{App, HttpServer, middleware, web};
use clap::Parser;
use sqlx::{Pool, Postgres};
use tracing::{error, info, warn};

mod api;
mod auth;
mod cli;
mod config;
mod dashboard;
mod db;
mod logging;
mod shutdown;
mod worker;

use crate::api::{health::health_config, job::handlers::job_config, job::JobService, validation};
use crate::auth::{TokenIssuer, TokenService};
use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::dashboard::handlers::dashboard_config;
use crate::db::{JobRepository, TokenRepository};
use crate::shutdown::ShutdownCoordinator;
use crate::worker::StaleJobReaper;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env().map_err(std::io::Error::other)?;
    logging::init(Path::new(&config.log_dir))?;
    config.log_defaults();

    info!("Starting jobledger");
    info!("  - Max payload size: {} bytes", config.max_payload_size);
    info!("  - Max database connections: {}", config.max_db_connections);
    info!("  - Dashboard operator: {}", config.operator.username);

    let pool = db::connection::get_connection(&config.database_url, config.max_db_connections)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            std::io::Error::other(e)
        })?;
    info!("Database connection pool established");

    db::migrations::run_migrations(&pool)
        .await
        .map_err(std::io::Error::other)?;

    let tokens = TokenService::new(
        TokenIssuer::new(&config.jwt_signing_secret),
        Arc::new(TokenRepository::new(pool.clone())),
        config.operator.clone(),
    );

    match cli.command() {
        Command::Migrate => {
            pool.close().await;
            Ok(())
        }
        Command::IssueToken { comment, validity } => {
            let record = tokens
                .create_credential(&comment, validity)
                .await
                .map_err(std::io::Error::other)?;
            println!("{}", record.token);
            pool.close().await;
            Ok(())
        }
        Command::Serve => serve(config, pool, tokens).await,
    }
}

async fn serve(config: Config, pool: Pool<Postgres>, tokens: TokenService) -> std::io::Result<()> {
    let jobs = Arc::new(JobService::new(Arc::new(JobRepository::new(pool.clone()))));
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let mut background_tasks = Vec::new();
    match config.stale_job_timeout.map(chrono::Duration::from_std) {
        Some(Ok(timeout)) => {
            let reaper = StaleJobReaper::new(jobs.clone(), timeout, config.reaper_interval);
            background_tasks.push(tokio::spawn(async move { reaper.run(shutdown_rx).await }));
        }
        Some(Err(e)) => warn!("Stale job timeout out of range, reaper disabled: {}", e),
        None => info!("STALE_JOB_TIMEOUT_SECS not set, stale job reaper disabled"),
    }

    let job_service = web::Data::from(jobs);
    let token_service = web::Data::new(tokens);
    let max_payload_size = config.max_payload_size;

    let server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(job_service.clone())
            .app_data(token_service.clone())
            .app_data(web::PayloadConfig::default().limit(max_payload_size))
            .app_data(validation::json_config())
            .configure(health_config)
            .configure(job_config)
            .configure(dashboard_config)
    });

    info!("Server starting on http://{}:{}", config.bind_host, config.port);
    let server = server.bind((config.bind_host.as_str(), config.port))?.run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    ShutdownCoordinator::new(server_handle, server_task, background_tasks, shutdown_tx, pool)
        .wait_for_shutdown()
        .await
}
