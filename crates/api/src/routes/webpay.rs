//! Webpay Plus hand-off.
//!
//! `create` is called by the storefront; `return` is where the gateway sends
//! the customer's browser afterwards, so it answers with a redirect back to
//! the storefront rather than JSON.

use axum::{
    Form, Json, Router,
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
};
use tracing::instrument;

use tienda_core::OrderStatus;
use tienda_core::wire::{WebpayCreateRequest, WebpayCreateResponse};

use crate::error::Result;
use crate::middleware::OptionalUser;
use crate::services::{PaymentError, PaymentOutcome, ReturnParams};
use crate::state::AppState;

/// Build the Webpay router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webpay/create", post(create))
        .route("/webpay/return", get(return_get).post(return_post))
}

#[instrument(skip(state, user, body), fields(lines = body.cart.cart_items.len()))]
async fn create(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Json(body): Json<WebpayCreateRequest>,
) -> Result<Json<WebpayCreateResponse>> {
    let return_url = state.config().webpay_return_url();
    let redirect_path = state
        .payments()
        .create(user.map(|customer| customer.id), body, &return_url)
        .await?;
    Ok(Json(WebpayCreateResponse { redirect_path }))
}

async fn return_get(State(state): State<AppState>, Query(params): Query<ReturnParams>) -> Redirect {
    settle(&state, &params).await
}

/// Aborted and timed-out payments can come back as a form post.
async fn return_post(State(state): State<AppState>, Form(params): Form<ReturnParams>) -> Redirect {
    settle(&state, &params).await
}

/// Settle the order and send the browser to the storefront's result page.
///
/// The customer always lands on the storefront; failures become a
/// `failed` result there.
#[instrument(skip(state, params))]
async fn settle(state: &AppState, params: &ReturnParams) -> Redirect {
    let outcome = match state.payments().complete(params).await {
        Ok(outcome) => Some(outcome),
        Err(PaymentError::OrderNotFound) => {
            tracing::warn!(kind = ?params.kind(), "Webpay return matched no order");
            None
        }
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            tracing::error!(error = %e, sentry_event_id = %event_id, "Failed to settle Webpay return");
            None
        }
    };

    Redirect::to(&result_url(&state.config().storefront_url, outcome))
}

fn result_url(storefront_url: &str, outcome: Option<PaymentOutcome>) -> String {
    match outcome {
        Some(outcome) => format!(
            "{storefront_url}/checkout/result?status={}&order={}",
            outcome.status, outcome.order_id
        ),
        None => format!(
            "{storefront_url}/checkout/result?status={}",
            OrderStatus::Failed
        ),
    }
}

#[cfg(test)]
mod tests {
    use tienda_core::OrderId;

    use super::*;

    #[test]
    fn test_result_url() {
        let paid = PaymentOutcome {
            order_id: OrderId::new(7),
            status: OrderStatus::Paid,
        };
        assert_eq!(
            result_url("http://localhost:3000", Some(paid)),
            "http://localhost:3000/checkout/result?status=paid&order=7"
        );
        assert_eq!(
            result_url("http://localhost:3000", None),
            "http://localhost:3000/checkout/result?status=failed"
        );
    }
}
