//! # Database Persistence Layer
//!
//! Optional Postgres persistence for stored policies via SQLx. When
//! `DATABASE_URL` is set, policies survive restarts and are shared between
//! replicas. When absent, the service runs in-memory only.

pub mod policies;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set, running in-memory only. \
                 Uploaded policies will not survive restarts unless UPLOAD_DIR is set."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}
