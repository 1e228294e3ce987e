//! Orders created when a Webpay transaction starts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;

use tienda_core::{Cart, CheckoutData, OrderId, OrderStatus, UserId};

/// A stored order.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub status: OrderStatus,
    /// Amount charged, in whole pesos.
    pub amount: Decimal,
    pub cart: Json<Cart>,
    pub checkout: Json<CheckoutData>,
    /// Identifier sent to Webpay as `buy_order`.
    pub buy_order: Option<String>,
    pub webpay_token: Option<String>,
    pub authorization_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An order about to be recorded as pending.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub user_id: Option<UserId>,
    pub amount: Decimal,
    pub cart: &'a Cart,
    pub checkout: &'a CheckoutData,
}

impl Order {
    /// The Webpay `buy_order` for an order id (at most 26 characters).
    #[must_use]
    pub fn buy_order_for(id: OrderId) -> String {
        format!("tienda-{id}")
    }

    /// The Webpay `session_id`: the customer, or the order for guests.
    #[must_use]
    pub fn session_id(&self) -> String {
        self.user_id
            .map_or_else(|| format!("guest-{}", self.id), |user| format!("user-{user}"))
    }
}
