//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page (catalog)
//! GET  /health                 - Health check
//! GET  /health/ready           - Readiness check
//!
//! # Products
//! GET  /products/{slug}        - Product detail
//! GET  /search?q=              - Product search
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart (returns count badge, triggers cart-updated)
//! POST /cart/remove            - Remove line (returns cart_items fragment)
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout
//! GET  /checkout               - Checkout wizard
//! POST /checkout/contact       - Submit contact step
//! POST /checkout/address       - Submit address step
//! POST /checkout/shipping      - Submit shipping step
//! POST /checkout/payment       - Create Webpay transaction and redirect
//! POST /checkout/edit/{step}   - Go back to an earlier step
//! GET  /checkout/cities        - City options for a region (fragment)
//! GET  /checkout/result        - Landing page after Webpay
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! GET  /auth/register          - Register page
//! POST /auth/register          - Register action
//! POST /auth/logout            - Logout action
//!
//! # Account (requires auth)
//! GET  /account                       - Account overview
//! GET  /account/addresses             - Address book
//! POST /account/addresses             - Save address
//! POST /account/addresses/{id}/delete - Delete address
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod forms;
pub mod home;
pub mod products;
pub mod search;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .route("/contact", post(checkout::contact))
        .route("/address", post(checkout::address))
        .route("/shipping", post(checkout::shipping))
        .route("/payment", post(checkout::payment))
        .route("/edit/{step}", post(checkout::edit))
        .route("/cities", get(checkout::cities))
        .route("/result", get(checkout::result))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route(
            "/addresses",
            get(account::addresses).post(account::create_address),
        )
        .route("/addresses/{id}/delete", post(account::delete_address))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        .route("/products/{slug}", get(products::show))
        .route("/search", get(search::search))
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/account", account_routes())
        .nest("/auth", auth_routes())
}
