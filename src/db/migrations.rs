use sqlx::{Pool, Postgres};
use tracing::info;

/// Create or upgrade the `job` and `token` tables
///
/// The SQL files under `migrations/` are embedded at compile time. Already
/// applied migrations are tracked by sqlx and skipped.
pub async fn run_migrations(pool: &Pool<Postgres>) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations...");

    sqlx::migrate!("./migrations").run(pool).await?;

    info!("Database migrations completed successfully");
    Ok(())
}
