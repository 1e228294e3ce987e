//! Payment initiation and settlement.
//!
//! Starting a payment recomputes the amount server-side (current catalog
//! prices plus the price of a shipping method that really serves the
//! address), records a pending order, and creates the Webpay transaction.
//! Settling classifies how the customer came back from the gateway and
//! updates the order exactly once.

use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use tienda_core::wire::WebpayCreateRequest;
use tienda_core::{
    CheckoutData, CityId, OrderId, OrderStatus, ShippingMethodId, UserId, clp_units, round_clp,
};

use super::cart::{CartService, CartServiceError};
use super::shipping::{ShippingError, ShippingResolver};
use super::webpay::{WebpayClient, WebpayError};
use crate::db::{CartRepository, GeoRepository, OrderRepository, RepositoryError};
use crate::models::{NewOrder, Order};

/// Errors from payment operations.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("checkout is missing the {0} step")]
    IncompleteCheckout(&'static str),

    #[error("cart is empty")]
    EmptyCart,

    #[error("shipping method {0} does not serve the address")]
    ShippingUnavailable(String),

    #[error("amount out of range")]
    InvalidAmount,

    #[error("order not found")]
    OrderNotFound,

    #[error(transparent)]
    Cart(#[from] CartServiceError),

    #[error(transparent)]
    Shipping(#[from] ShippingError),

    #[error(transparent)]
    Webpay(#[from] WebpayError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for PaymentError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Query parameters Webpay sends back to the return URL.
///
/// - normal flow: `token_ws`
/// - customer aborted on the form: `TBK_TOKEN`, `TBK_ORDEN_COMPRA`, `TBK_ID_SESION`
/// - form timed out: `TBK_ORDEN_COMPRA`, `TBK_ID_SESION`
#[derive(Debug, Default, Deserialize)]
pub struct ReturnParams {
    pub token_ws: Option<String>,
    #[serde(rename = "TBK_TOKEN")]
    pub tbk_token: Option<String>,
    #[serde(rename = "TBK_ORDEN_COMPRA")]
    pub tbk_buy_order: Option<String>,
    #[serde(rename = "TBK_ID_SESION")]
    pub tbk_session_id: Option<String>,
}

/// How the customer came back from the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnKind {
    /// Commit the transaction with this token.
    Commit(String),
    /// Cancelled on the form; the order is found by token.
    Aborted(String),
    /// The form timed out; the order is found by buy order.
    TimedOut(String),
    /// Nothing usable in the query string.
    Invalid,
}

impl ReturnParams {
    #[must_use]
    pub fn kind(&self) -> ReturnKind {
        let present = |value: &Option<String>| value.as_deref().filter(|v| !v.is_empty()).map(String::from);

        if let Some(token) = present(&self.tbk_token) {
            return ReturnKind::Aborted(token);
        }
        if let Some(token) = present(&self.token_ws) {
            return ReturnKind::Commit(token);
        }
        if let Some(buy_order) = present(&self.tbk_buy_order) {
            return ReturnKind::TimedOut(buy_order);
        }
        ReturnKind::Invalid
    }
}

/// Final state of a gateway return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub order_id: OrderId,
    pub status: OrderStatus,
}

/// Payment orchestration over the database and Webpay.
pub struct PaymentService<'a> {
    pool: &'a PgPool,
    webpay: &'a WebpayClient,
    metro_region: &'a str,
}

impl<'a> PaymentService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, webpay: &'a WebpayClient, metro_region: &'a str) -> Self {
        Self {
            pool,
            webpay,
            metro_region,
        }
    }

    /// Record a pending order and create its Webpay transaction.
    ///
    /// Returns the gateway URL (with `token_ws`) to send the customer to.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` if the checkout is incomplete, the cart is
    /// empty, the shipping method does not serve the address, or the
    /// database or gateway fails.
    #[instrument(skip(self, request, return_url))]
    pub async fn create(
        &self,
        user_id: Option<UserId>,
        request: WebpayCreateRequest,
        return_url: &str,
    ) -> Result<String, PaymentError> {
        let checkout = request.checkout;
        let (city_id, method_id) = required_steps(&checkout)?;

        let carts = CartService::new(self.pool);
        let cart = match user_id {
            Some(user_id) => carts.get(user_id).await?,
            None => request.cart.normalized().map_err(CartServiceError::from)?,
        };
        if cart.is_empty() {
            return Err(PaymentError::EmptyCart);
        }
        let cart = carts.reprice(&cart).await?;

        let geo = GeoRepository::new(self.pool);
        let shipping = ShippingResolver::new(&geo, self.metro_region)
            .method_for_city(city_id, method_id)
            .await?
            .ok_or_else(|| PaymentError::ShippingUnavailable(method_id.to_string()))?;

        let amount = cart
            .total
            .checked_add(shipping.price)
            .map(round_clp)
            .ok_or(PaymentError::InvalidAmount)?;
        let units = clp_units(amount)
            .filter(|units| *units > 0)
            .ok_or(PaymentError::InvalidAmount)?;

        let orders = OrderRepository::new(self.pool);
        let order = orders
            .create_pending(&NewOrder {
                user_id,
                amount,
                cart: &cart,
                checkout: &checkout,
            })
            .await?;
        let buy_order = order.buy_order.clone().unwrap_or_else(|| Order::buy_order_for(order.id));

        let created = self
            .webpay
            .create_transaction(&buy_order, &order.session_id(), units, return_url)
            .await?;
        orders.set_token(order.id, &created.token).await?;

        tracing::info!(
            order_id = %order.id,
            amount = units,
            shipping = %shipping.name,
            "Webpay transaction created"
        );
        Ok(created.redirect_url())
    }

    /// Settle the order a gateway return refers to.
    ///
    /// A return for an order that already settled reports its status
    /// without touching it again.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::OrderNotFound` if the return matches no order,
    /// or `PaymentError::Repository` if the database fails.
    #[instrument(skip(self, params))]
    pub async fn complete(&self, params: &ReturnParams) -> Result<PaymentOutcome, PaymentError> {
        let orders = OrderRepository::new(self.pool);

        let (order, aborted) = match params.kind() {
            ReturnKind::Commit(token) => (orders.find_by_token(&token).await?, false),
            ReturnKind::Aborted(token) => (orders.find_by_token(&token).await?, true),
            ReturnKind::TimedOut(buy_order) => (orders.find_by_buy_order(&buy_order).await?, true),
            ReturnKind::Invalid => (None, false),
        };
        let order = order.ok_or(PaymentError::OrderNotFound)?;

        if !order.status.is_pending() {
            tracing::info!(order_id = %order.id, status = %order.status, "Order already settled");
            return Ok(PaymentOutcome {
                order_id: order.id,
                status: order.status,
            });
        }

        if aborted {
            orders.settle(order.id, OrderStatus::Aborted).await?;
            tracing::info!(order_id = %order.id, "Payment aborted on the Webpay form");
            return Ok(PaymentOutcome {
                order_id: order.id,
                status: OrderStatus::Aborted,
            });
        }

        let token = order.webpay_token.clone().unwrap_or_default();
        let status = match self.webpay.commit_transaction(&token).await {
            Ok(committed) if committed.is_approved() => {
                self.mark_paid(&order, committed.authorization_code.as_deref())
                    .await?;
                OrderStatus::Paid
            }
            Ok(committed) => {
                tracing::info!(
                    order_id = %order.id,
                    response_code = ?committed.response_code,
                    "Payment rejected"
                );
                orders.settle(order.id, OrderStatus::Failed).await?;
                OrderStatus::Failed
            }
            Err(e) => {
                tracing::error!(order_id = %order.id, "Webpay commit failed: {e}");
                orders.settle(order.id, OrderStatus::Failed).await?;
                OrderStatus::Failed
            }
        };

        Ok(PaymentOutcome {
            order_id: order.id,
            status,
        })
    }

    /// Mark paid, take stock, and clear the customer's cart in one transaction.
    async fn mark_paid(&self, order: &Order, authorization_code: Option<&str>) -> Result<(), PaymentError> {
        let mut tx = self.pool.begin().await?;

        if OrderRepository::mark_paid_in(&mut tx, order.id, authorization_code).await? {
            OrderRepository::decrement_stock_in(&mut tx, &order.cart.0).await?;
            if let Some(user_id) = order.user_id {
                CartRepository::clear_in(&mut tx, user_id).await?;
            }
        }

        tx.commit().await?;
        tracing::info!(order_id = %order.id, amount = %order.amount, "Order paid");
        Ok(())
    }
}

/// The city and shipping method a payable checkout has chosen.
fn required_steps(checkout: &CheckoutData) -> Result<(CityId, ShippingMethodId), PaymentError> {
    if checkout.contact.is_none() {
        return Err(PaymentError::IncompleteCheckout("contact"));
    }
    let address = checkout
        .address
        .as_ref()
        .ok_or(PaymentError::IncompleteCheckout("address"))?;
    let shipping = checkout
        .shipping
        .as_ref()
        .ok_or(PaymentError::IncompleteCheckout("shipping"))?;
    Ok((address.city_id, shipping.method_id))
}
