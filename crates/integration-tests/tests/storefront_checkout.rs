//! Integration tests for the storefront checkout wizard.
//!
//! These tests require:
//! - A running `tienda-api` with seed data (Santiago in Metropolitana)
//! - A running `tienda-storefront` pointed at it
//! - Webpay integration credentials (the defaults) for the payment test

use reqwest::{Client, StatusCode, header::LOCATION};

use tienda_core::wire::{CitiesResponse, ShippingMethodsResponse, StatesResponse};
use tienda_integration_tests::{api_base_url, browser, product_in_stock, storefront_base_url};

async fn post_form(client: &Client, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
    client
        .post(format!("{}{path}", storefront_base_url()))
        .form(form)
        .send()
        .await
        .expect("Failed to post form")
}

fn assert_accepted(resp: &reqwest::Response) {
    assert!(
        resp.status().is_success() || resp.status().is_redirection(),
        "unexpected status {}",
        resp.status()
    );
}

/// Region, city, and first shipping method for Santiago.
async fn santiago(client: &Client) -> (String, String, String) {
    let states: StatesResponse = client
        .get(format!("{}/state/get-states/", api_base_url()))
        .send()
        .await
        .expect("Failed to get states")
        .json()
        .await
        .expect("Failed to parse states");
    let metro = states
        .states
        .into_iter()
        .find(|state| state.name == "Metropolitana")
        .expect("Metropolitana missing from seed data");

    let cities: CitiesResponse = client
        .get(format!("{}/city/get-cities-by-state/{}", api_base_url(), metro.id))
        .send()
        .await
        .expect("Failed to get cities")
        .json()
        .await
        .expect("Failed to parse cities");
    let city = cities
        .cities
        .into_iter()
        .find(|city| city.name == "Santiago")
        .expect("Santiago missing from seed data");

    let methods: ShippingMethodsResponse = client
        .get(format!(
            "{}/shipping-method/get-shipping-methods/{}",
            api_base_url(),
            city.id
        ))
        .send()
        .await
        .expect("Failed to get shipping methods")
        .json()
        .await
        .expect("Failed to parse shipping methods");
    let method = methods
        .shipping_methods
        .first()
        .expect("Santiago has no shipping methods");

    (metro.id.to_string(), city.id.to_string(), method.id.to_string())
}

#[tokio::test]
#[ignore = "Requires running tienda-storefront"]
async fn test_invalid_contact_is_rerendered() {
    let client = browser();

    let resp = post_form(
        &client,
        "/checkout/contact",
        &[
            ("email", "no-es-un-correo"),
            ("first_name", "Ana"),
            ("last_name", "Soto"),
            ("phone", "+56912345678"),
        ],
    )
    .await;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("Ana"));
}

#[tokio::test]
#[ignore = "Requires running tienda-storefront, tienda-api, and Webpay integration"]
async fn test_guest_checkout_reaches_webpay() {
    let client = browser();
    let api = Client::new();
    let product = product_in_stock(&api, 1).await;
    let (state_id, city_id, method_id) = santiago(&api).await;

    let resp = post_form(
        &client,
        "/cart/add",
        &[("product_id", &product.id.to_string()), ("quantity", "1")],
    )
    .await;
    assert_accepted(&resp);

    let resp = post_form(
        &client,
        "/checkout/contact",
        &[
            ("email", "invitado@tienda.test"),
            ("first_name", "Ana"),
            ("last_name", "Soto"),
            ("phone", "+56912345678"),
            ("rut", ""),
        ],
    )
    .await;
    assert_accepted(&resp);

    let resp = post_form(
        &client,
        "/checkout/address",
        &[
            ("street", "Los Carrera"),
            ("number", "1450"),
            ("apartment", ""),
            ("state_id", &state_id),
            ("city_id", &city_id),
        ],
    )
    .await;
    assert_accepted(&resp);

    let resp = post_form(&client, "/checkout/shipping", &[("method_id", &method_id)]).await;
    assert_accepted(&resp);

    let resp = post_form(&client, "/checkout/payment", &[]).await;
    assert!(resp.status().is_redirection(), "payment returned {}", resp.status());
    let location = resp
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("Payment redirect has no location");
    assert!(location.contains("token_ws="));
}

#[tokio::test]
#[ignore = "Requires running tienda-api"]
async fn test_unmatched_webpay_return_lands_on_failed_result() {
    let resp = browser()
        .get(format!("{}/webpay/return", api_base_url()))
        .query(&[("TBK_ORDEN_COMPRA", "tienda-0"), ("TBK_ID_SESION", "guest-0")])
        .send()
        .await
        .expect("Failed to call webpay return");

    assert!(resp.status().is_redirection());
    let location = resp
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("Return redirect has no location");
    assert!(location.ends_with("/checkout/result?status=failed"));
}
