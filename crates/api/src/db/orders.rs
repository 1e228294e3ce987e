//! Order repository.
//!
//! Orders are created `pending` and settle exactly once: every settling
//! update is guarded by `status = 'pending'`.

use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use tienda_core::{Cart, OrderId, OrderStatus};

use super::RepositoryError;
use crate::models::{NewOrder, Order};

const ORDER_COLUMNS: &str = r"
    id, user_id, status, amount, cart, checkout, buy_order,
    webpay_token, authorization_code, created_at
";

/// Repository for orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a pending order and assign its `buy_order`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn create_pending(&self, order: &NewOrder<'_>) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (id,): (OrderId,) = sqlx::query_as(
            r"
            INSERT INTO orders (user_id, amount, cart, checkout)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(order.user_id)
        .bind(order.amount)
        .bind(Json(order.cart))
        .bind(Json(order.checkout))
        .fetch_one(&mut *tx)
        .await?;

        let created = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET buy_order = $2 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(Order::buy_order_for(id))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    /// Attach the Webpay token returned for a pending order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_token(&self, id: OrderId, token: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE orders SET webpay_token = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Find an order by its Webpay token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE webpay_token = $1"
        ))
        .bind(token)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// Find an order by its `buy_order`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_buy_order(&self, buy_order: &str) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE buy_order = $1"
        ))
        .bind(buy_order)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// Settle a pending order as failed or aborted.
    ///
    /// Returns `false` if the order had already settled.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn settle(&self, id: OrderId, status: OrderStatus) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .bind(status)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Mark a pending order paid inside `tx`.
    ///
    /// Returns `false` if the order had already settled.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_paid_in(
        tx: &mut Transaction<'_, Postgres>,
        id: OrderId,
        authorization_code: Option<&str>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET status = 'paid', authorization_code = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            ",
        )
        .bind(id)
        .bind(authorization_code)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Take the ordered quantities out of stock inside `tx`.
    ///
    /// Stock never goes below zero; an oversold line is logged by the caller.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if an update fails.
    pub async fn decrement_stock_in(
        tx: &mut Transaction<'_, Postgres>,
        cart: &Cart,
    ) -> Result<(), RepositoryError> {
        for item in &cart.cart_items {
            let quantity = i32::try_from(item.quantity).map_err(|_| {
                RepositoryError::DataCorruption(format!(
                    "quantity {} out of range for product {}",
                    item.quantity, item.product_id
                ))
            })?;
            sqlx::query(
                "UPDATE products SET stock = GREATEST(stock - $2, 0), updated_at = NOW() WHERE id = $1",
            )
            .bind(item.product_id)
            .bind(quantity)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}
