//! Persisted cart repository.
//!
//! Each customer has at most one cart, stored whole as JSONB.

use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use tienda_core::{Cart, UserId};

use super::RepositoryError;

/// Repository for persisted carts.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The customer's cart, or the empty cart if they have none.
    ///
    /// Stored content is normalized on read.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` if the stored totals overflow.
    pub async fn get(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let row: Option<(Json<Cart>,)> =
            sqlx::query_as("SELECT content FROM carts WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(self.pool)
                .await?;

        row.map_or_else(
            || Ok(Cart::empty()),
            |(Json(cart),)| {
                cart.normalized().map_err(|e| {
                    RepositoryError::DataCorruption(format!("cart of user {user_id}: {e}"))
                })
            },
        )
    }

    /// Replace the customer's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn save(&self, user_id: UserId, cart: &Cart) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO carts (user_id, content) VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET content = EXCLUDED.content, updated_at = NOW()
            ",
        )
        .bind(user_id)
        .bind(Json(cart))
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Delete the customer's cart inside a transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear_in(
        tx: &mut Transaction<'_, Postgres>,
        user_id: UserId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM carts WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
