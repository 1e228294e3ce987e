//! HTTP route handlers for the persistence service.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                                   - Health check
//! GET    /health/ready                             - Readiness check
//!
//! # Cart (guest snapshot or bearer token)
//! GET    /cart/                                    - Persisted cart (auth)
//! POST   /cart/add-to-cart                         - Add units of a product
//! POST   /cart/remove-from-cart                    - Remove a product line
//! POST   /cart/sync-cart                           - Merge guest cart after login (auth)
//!
//! # Users
//! GET    /user/verify-token                        - Is the bearer token valid
//! POST   /user/login                               - Credentials for a token
//! POST   /user/register                            - Create account, get a token
//! POST   /user/logout                              - Revoke the token (auth)
//!
//! # Customer (auth)
//! GET    /customer                                 - Profile
//! GET    /customer/address                         - Saved addresses
//! POST   /customer/address                         - Save address
//! PUT    /customer/address/{id}                    - Replace address
//! DELETE /customer/address/{id}                    - Delete address
//!
//! # Geography & shipping
//! GET    /state/get-states/                        - Regions
//! GET    /city/get-cities-by-state/{state_id}      - Cities of a region
//! GET    /shipping-method/get-shipping-methods/{city_id}
//!
//! # Products
//! GET    /product/                                 - Catalog
//! GET    /product/search?q=                        - Search
//! GET    /product/{slug}                           - Product detail
//! POST   /product/check-stock                      - Stock check before payment
//!
//! # Webpay
//! POST   /webpay/create                            - Start a payment
//! GET    /webpay/return                            - Gateway return (also POST)
//! ```

pub mod cart;
pub mod customer;
pub mod geo;
pub mod product;
pub mod user;
pub mod webpay;

use axum::Router;

use crate::state::AppState;

/// Create all routes for the persistence service.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(cart::router())
        .merge(user::router())
        .merge(customer::router())
        .merge(geo::router())
        .merge(product::router())
        .merge(webpay::router())
}
