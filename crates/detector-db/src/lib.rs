//! Detector Database Layer
//!
//! SQLite repositories for users, uploaded images and detection tags.

pub mod db;

use sqlx::migrate::Migrator;
use sqlx::SqlitePool;

pub use db::transaction::with_transaction;
pub use db::{ImageRepository, SqliteImageRepository, UserRepository};

/// Schema migrations embedded at compile time
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Apply any pending migrations.
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    tracing::info!("Running database migrations");
    MIGRATOR.run(pool).await?;
    tracing::info!("Database migrations complete");
    Ok(())
}
