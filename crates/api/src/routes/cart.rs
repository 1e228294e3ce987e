//! Cart route handlers.
//!
//! Guests send their cart with every mutation and get the new one back.
//! Customers' carts are persisted here.

use axum::{Json, Router, extract::State, routing::{get, post}};
use tracing::instrument;

use tienda_core::wire::{
    AddToCartRequest, AddToCartResponse, CartResponse, RemoveFromCartRequest, SyncCartRequest,
};

use crate::error::Result;
use crate::middleware::{OptionalUser, RequireUser};
use crate::services::CartService;
use crate::state::AppState;

/// Build the cart router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cart/", get(show))
        .route("/cart/add-to-cart", post(add))
        .route("/cart/remove-from-cart", post(remove))
        .route("/cart/sync-cart", post(sync))
}

/// The customer's persisted cart.
#[instrument(skip(state, user), fields(user_id = %user.customer.id))]
async fn show(State(state): State<AppState>, user: RequireUser) -> Result<Json<CartResponse>> {
    let cart = CartService::new(state.pool()).get(user.customer.id).await?;
    Ok(Json(CartResponse { cart }))
}

#[instrument(skip(state, user, body), fields(product_id = %body.product_id, quantity = body.quantity))]
async fn add(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Json(body): Json<AddToCartRequest>,
) -> Result<Json<AddToCartResponse>> {
    let (cart, item) = CartService::new(state.pool())
        .add(
            user.map(|customer| customer.id),
            body.cart,
            body.product_id,
            body.quantity,
        )
        .await?;
    Ok(Json(AddToCartResponse { cart, item }))
}

#[instrument(skip(state, user, body), fields(product_id = %body.product_id))]
async fn remove(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Json(body): Json<RemoveFromCartRequest>,
) -> Result<Json<CartResponse>> {
    let cart = CartService::new(state.pool())
        .remove(user.map(|customer| customer.id), body.cart, body.product_id)
        .await?;
    Ok(Json(CartResponse { cart }))
}

/// Merge the guest cart the storefront held before login.
#[instrument(skip(state, user, body), fields(user_id = %user.customer.id))]
async fn sync(
    State(state): State<AppState>,
    user: RequireUser,
    Json(body): Json<SyncCartRequest>,
) -> Result<Json<CartResponse>> {
    let cart = CartService::new(state.pool())
        .sync(user.customer.id, &body.cart)
        .await?;
    Ok(Json(CartResponse { cart }))
}
