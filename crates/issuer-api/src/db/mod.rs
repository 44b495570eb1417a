//! # Database Layer
//!
//! Optional Postgres connectivity. Without `DATABASE_URL` the API runs on
//! the in-memory record store alone.

pub mod records;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connect to `DATABASE_URL` and run pending migrations.
///
/// Returns `Ok(None)` when the variable is unset.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        tracing::info!("DATABASE_URL not set, attestation records are kept in memory");
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database connected, migrations applied");

    Ok(Some(pool))
}
