//! Database migration commands.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - Storefront session database
//! - `API_DATABASE_URL` - API database
//!
//! Both fall back to `DATABASE_URL`.
//!
//! # Migration Files
//!
//! API migrations live in `crates/api/migrations/`. The storefront has no
//! migration files: its only table is the one `tower-sessions-sqlx-store`
//! creates.

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

/// Errors from running migrations.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Database URL from `key`, falling back to `DATABASE_URL`.
pub fn database_url(key: &'static str) -> Result<SecretString, MigrationError> {
    let _ = dotenvy::dotenv();

    std::env::var(key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar(key))
}

/// Create the storefront session table.
///
/// # Errors
///
/// Returns an error if the database URL is missing or the table cannot be created.
pub async fn storefront() -> Result<(), MigrationError> {
    let database_url = database_url("STOREFRONT_DATABASE_URL")?;

    tracing::info!("Connecting to storefront database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Storefront migrations complete");
    Ok(())
}

/// Run the API schema migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing or a migration fails.
pub async fn api() -> Result<(), MigrationError> {
    let database_url = database_url("API_DATABASE_URL")?;

    tracing::info!("Connecting to API database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Running API migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("API migrations complete");
    Ok(())
}
