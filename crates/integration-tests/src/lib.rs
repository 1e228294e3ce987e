//! Integration tests for Tienda.
//!
//! # Running Tests
//!
//! ```bash
//! # Databases, migrations, and seed data
//! cargo run -p tienda-cli -- migrate all
//! cargo run -p tienda-cli -- seed data/seed.yaml
//!
//! # Both services
//! cargo run -p tienda-api &
//! cargo run -p tienda-storefront &
//!
//! # The tests are ignored by default
//! cargo test -p tienda-integration-tests -- --ignored
//! ```
//!
//! The tests assume the seed file's Santiago (Metropolitana) and Temuco
//! (Araucanía) cities and at least one product in stock.

use reqwest::Client;
use uuid::Uuid;

use tienda_core::Product;
use tienda_core::wire::{AuthResponse, ProductsResponse, RegisterRequest};

/// Base URL of the persistence service.
#[must_use]
pub fn api_base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// Base URL of the storefront.
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A client that keeps cookies, like a browser, and does not follow redirects.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn browser() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// An email no earlier run has registered.
#[must_use]
pub fn unique_email() -> String {
    format!("test-{}@tienda.test", Uuid::new_v4().simple())
}

/// A registration body that passes every field validator.
#[must_use]
pub fn registration(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: "Secreta123".to_string(),
        confirm_password: "Secreta123".to_string(),
        first_name: "Ana".to_string(),
        last_name: "Soto".to_string(),
        phone: Some("+56912345678".to_string()),
        rut: None,
    }
}

/// Register a fresh customer directly against the API.
///
/// # Panics
///
/// Panics if registration fails.
pub async fn register_customer(client: &Client) -> AuthResponse {
    let email = unique_email();
    let resp = client
        .post(format!("{}/user/register", api_base_url()))
        .json(&registration(&email))
        .send()
        .await
        .expect("Failed to register");
    assert!(resp.status().is_success(), "register returned {}", resp.status());
    resp.json().await.expect("Failed to parse auth response")
}

/// A product with at least `quantity` units in stock.
///
/// # Panics
///
/// Panics if the catalog cannot be read or has no such product.
pub async fn product_in_stock(client: &Client, quantity: i32) -> Product {
    let products: ProductsResponse = client
        .get(format!("{}/product/", api_base_url()))
        .send()
        .await
        .expect("Failed to list products")
        .json()
        .await
        .expect("Failed to parse products");

    products
        .products
        .into_iter()
        .find(|product| product.stock >= quantity)
        .expect("Seed data has no product in stock")
}
