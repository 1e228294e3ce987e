//! Saved address repository.
//!
//! Every query is scoped to the owning customer; another customer's address
//! id behaves exactly like a missing one.

use sqlx::PgPool;

use tienda_core::wire::AddressRequest;
use tienda_core::{Address, AddressId, UserId};

use super::RepositoryError;

const ADDRESS_SELECT: &str = r"
    SELECT a.id, a.street, a.number, a.apartment, a.city_id,
           c.name AS city_name, c.state_id, a.is_default
    FROM addresses a
    JOIN cities c ON c.id = a.city_id
";

/// Repository for customer addresses.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The customer's addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let addresses = sqlx::query_as::<_, Address>(&format!(
            "{ADDRESS_SELECT} WHERE a.user_id = $1 ORDER BY a.is_default DESC, a.id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(addresses)
    }

    async fn get(&self, user_id: UserId, id: AddressId) -> Result<Address, RepositoryError> {
        sqlx::query_as::<_, Address>(&format!(
            "{ADDRESS_SELECT} WHERE a.user_id = $1 AND a.id = $2"
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Save a new address. A default address demotes the previous default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn create(
        &self,
        user_id: UserId,
        address: &AddressRequest,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if address.is_default {
            clear_default(&mut tx, user_id).await?;
        }

        let (id,): (AddressId,) = sqlx::query_as(
            r"
            INSERT INTO addresses (user_id, street, number, apartment, city_id, is_default)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(user_id)
        .bind(&address.street)
        .bind(&address.number)
        .bind(&address.apartment)
        .bind(address.city_id)
        .bind(address.is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        self.get(user_id, id).await
    }

    /// Replace a saved address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer has no such address.
    pub async fn update(
        &self,
        user_id: UserId,
        id: AddressId,
        address: &AddressRequest,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if address.is_default {
            clear_default(&mut tx, user_id).await?;
        }

        let result = sqlx::query(
            r"
            UPDATE addresses
            SET street = $3, number = $4, apartment = $5, city_id = $6, is_default = $7
            WHERE user_id = $1 AND id = $2
            ",
        )
        .bind(user_id)
        .bind(id)
        .bind(&address.street)
        .bind(&address.number)
        .bind(&address.apartment)
        .bind(address.city_id)
        .bind(address.is_default)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        self.get(user_id, id).await
    }

    /// Delete a saved address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer has no such address.
    pub async fn delete(&self, user_id: UserId, id: AddressId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM addresses WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

async fn clear_default(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: UserId,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1 AND is_default")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
