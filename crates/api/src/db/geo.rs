//! Geography and shipping-method repository.
//!
//! Each method here is a single query; the shipping resolution chain in
//! [`crate::services::shipping`] composes them.

use sqlx::PgPool;

use tienda_core::{City, CityId, ShippingMethod, ShippingMethodId, State, StateId};

use super::RepositoryError;

/// Repository for regions, cities, and shipping methods.
pub struct GeoRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> GeoRepository<'a> {
    /// Create a new geography repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All regions, in id order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_states(&self) -> Result<Vec<State>, RepositoryError> {
        let states = sqlx::query_as::<_, State>("SELECT id, name FROM states ORDER BY id")
            .fetch_all(self.pool)
            .await?;
        Ok(states)
    }

    /// Id of the region called `name`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn state_id_by_name(&self, name: &str) -> Result<Option<StateId>, RepositoryError> {
        let row: Option<(StateId,)> = sqlx::query_as("SELECT id FROM states WHERE name = $1")
            .bind(name)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(|(id,)| id))
    }

    /// Cities of a region, in row order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn cities_by_state(&self, state_id: StateId) -> Result<Vec<City>, RepositoryError> {
        let cities = sqlx::query_as::<_, City>(
            "SELECT id, name, state_id FROM cities WHERE state_id = $1 ORDER BY id",
        )
        .bind(state_id)
        .fetch_all(self.pool)
        .await?;
        Ok(cities)
    }

    /// Get a city by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_city(&self, city_id: CityId) -> Result<Option<City>, RepositoryError> {
        let city = sqlx::query_as::<_, City>("SELECT id, name, state_id FROM cities WHERE id = $1")
            .bind(city_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(city)
    }

    /// The region owning a city.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn state_id_of_city(&self, city_id: CityId) -> Result<Option<StateId>, RepositoryError> {
        let row: Option<(StateId,)> = sqlx::query_as("SELECT state_id FROM cities WHERE id = $1")
            .bind(city_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(|(id,)| id))
    }

    /// Name of a city.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn city_name(&self, city_id: CityId) -> Result<Option<String>, RepositoryError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT name FROM cities WHERE id = $1")
            .bind(city_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(|(name,)| name))
    }

    /// Ids of the shipping methods linked to a city name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn method_ids_for_city(
        &self,
        city_name: &str,
    ) -> Result<Vec<ShippingMethodId>, RepositoryError> {
        let rows: Vec<(ShippingMethodId,)> = sqlx::query_as(
            r"
            SELECT shipping_method_id FROM shipping_method_cities
            WHERE city_name = $1
            ORDER BY shipping_method_id
            ",
        )
        .bind(city_name)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Shipping methods by id, in id order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn methods_by_ids(
        &self,
        ids: &[ShippingMethodId],
    ) -> Result<Vec<ShippingMethod>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(ShippingMethodId::as_i32).collect();
        let methods = sqlx::query_as::<_, ShippingMethod>(
            r"
            SELECT id, name, description, price FROM shipping_methods
            WHERE id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(raw)
        .fetch_all(self.pool)
        .await?;
        Ok(methods)
    }

    /// Methods offered everywhere outside the metro region, in id order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn nationwide_methods(&self) -> Result<Vec<ShippingMethod>, RepositoryError> {
        let methods = sqlx::query_as::<_, ShippingMethod>(
            r"
            SELECT id, name, description, price FROM shipping_methods
            WHERE nationwide
            ORDER BY id
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(methods)
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Insert a region if missing, returning its id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn upsert_state(&self, name: &str) -> Result<StateId, RepositoryError> {
        let (id,): (StateId,) = sqlx::query_as(
            r"
            INSERT INTO states (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            ",
        )
        .bind(name)
        .fetch_one(self.pool)
        .await?;
        Ok(id)
    }

    /// Insert a city if missing, returning its id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn upsert_city(&self, state_id: StateId, name: &str) -> Result<CityId, RepositoryError> {
        let (id,): (CityId,) = sqlx::query_as(
            r"
            INSERT INTO cities (state_id, name) VALUES ($1, $2)
            ON CONFLICT (state_id, name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            ",
        )
        .bind(state_id)
        .bind(name)
        .fetch_one(self.pool)
        .await?;
        Ok(id)
    }

    /// Insert or update a shipping method and replace its city links.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn upsert_method(
        &self,
        method: &ShippingMethod,
        nationwide: bool,
        city_names: &[String],
    ) -> Result<ShippingMethodId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (id,): (ShippingMethodId,) = sqlx::query_as(
            r"
            INSERT INTO shipping_methods (name, description, price, nationwide)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO UPDATE SET
                description = EXCLUDED.description,
                price = EXCLUDED.price,
                nationwide = EXCLUDED.nationwide
            RETURNING id
            ",
        )
        .bind(&method.name)
        .bind(&method.description)
        .bind(method.price)
        .bind(nationwide)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM shipping_method_cities WHERE shipping_method_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for city_name in city_names {
            sqlx::query(
                "INSERT INTO shipping_method_cities (shipping_method_id, city_name) VALUES ($1, $2)",
            )
            .bind(id)
            .bind(city_name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(id)
    }
}
