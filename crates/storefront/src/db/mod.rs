//! Storefront `PostgreSQL` access.
//!
//! The storefront owns no business data: carts, customers and orders live in
//! the persistence service. Its database only backs the `tower_sessions`
//! table, which holds the guest cart and the checkout wizard.
//!
//! # Migrations
//!
//! The session table is created by:
//! ```bash
//! cargo run -p tienda-cli -- migrate storefront
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
