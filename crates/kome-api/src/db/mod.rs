//! # Database Persistence Layer
//!
//! Postgres persistence for dispute records via SQLx.
//!
//! The database is optional. With `DATABASE_URL` set (or
//! `KOME_STORAGE=postgres`), disputes are stored in the `disputes` table
//! through [`disputes::PgDisputeRepository`]. Without it, the API uses the
//! in-memory repository and state does not survive restarts.

pub mod disputes;

use sqlx::postgres::{PgPool, PgPoolOptions};

pub use disputes::PgDisputeRepository;

/// Connect to PostgreSQL and apply embedded migrations.
pub async fn init_pool(url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}
