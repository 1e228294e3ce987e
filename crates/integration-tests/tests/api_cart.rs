//! Integration tests for the persistence service's cart endpoints.
//!
//! These tests require a running `tienda-api` with seeded data.

use reqwest::{Client, StatusCode};

use tienda_core::wire::{AddToCartRequest, AddToCartResponse, CartResponse, SyncCartRequest};
use tienda_core::{Cart, ProductId};
use tienda_integration_tests::{api_base_url, product_in_stock, register_customer};

async fn add(
    client: &Client,
    token: Option<&str>,
    cart: Cart,
    product_id: ProductId,
    quantity: u32,
) -> reqwest::Response {
    let mut request = client
        .post(format!("{}/cart/add-to-cart", api_base_url()))
        .json(&AddToCartRequest {
            cart,
            product_id,
            quantity,
        });
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    request.send().await.expect("Failed to add to cart")
}

#[tokio::test]
#[ignore = "Requires running tienda-api with seed data"]
async fn test_guest_add_returns_repriced_cart() {
    let client = Client::new();
    let product = product_in_stock(&client, 2).await;

    let resp = add(&client, None, Cart::empty(), product.id, 2).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: AddToCartResponse = resp.json().await.expect("Failed to parse response");
    assert_eq!(body.item.quantity, 2);
    assert_eq!(body.item.metadata.unit_price, product.price);
    assert_eq!(body.cart.quantity, 2);
    assert!(body.cart.is_consistent());
}

#[tokio::test]
#[ignore = "Requires running tienda-api with seed data"]
async fn test_add_beyond_stock_is_conflict() {
    let client = Client::new();
    let product = product_in_stock(&client, 1).await;
    let too_many = u32::try_from(product.stock).expect("stock fits u32") + 1;

    let resp = add(&client, None, Cart::empty(), product.id, too_many).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running tienda-api with seed data"]
async fn test_unknown_product_is_not_found() {
    let client = Client::new();
    let resp = add(&client, None, Cart::empty(), ProductId::new(i32::MAX), 1).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running tienda-api with seed data"]
async fn test_customer_cart_persists_and_merges_guest_cart() {
    let client = Client::new();
    let auth = register_customer(&client).await;
    let product = product_in_stock(&client, 3).await;

    // Authenticated add ignores the snapshot and persists
    let resp = add(&client, Some(&auth.token), Cart::empty(), product.id, 1).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Guest cart built before login
    let guest: AddToCartResponse = add(&client, None, Cart::empty(), product.id, 2)
        .await
        .json()
        .await
        .expect("Failed to parse guest cart");

    let merged: CartResponse = client
        .post(format!("{}/cart/sync-cart", api_base_url()))
        .bearer_auth(&auth.token)
        .json(&SyncCartRequest { cart: guest.cart })
        .send()
        .await
        .expect("Failed to sync cart")
        .json()
        .await
        .expect("Failed to parse merged cart");
    assert_eq!(merged.cart.item(product.id).map(|item| item.quantity), Some(3));

    let persisted: CartResponse = client
        .get(format!("{}/cart/", api_base_url()))
        .bearer_auth(&auth.token)
        .send()
        .await
        .expect("Failed to get cart")
        .json()
        .await
        .expect("Failed to parse cart");
    assert_eq!(persisted.cart, merged.cart);
}

#[tokio::test]
#[ignore = "Requires running tienda-api"]
async fn test_persisted_cart_requires_token() {
    let resp = Client::new()
        .get(format!("{}/cart/", api_base_url()))
        .send()
        .await
        .expect("Failed to get cart");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
