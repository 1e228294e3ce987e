//! Integration tests for geography and shipping resolution.
//!
//! These tests require a running `tienda-api` seeded with Santiago in the
//! Metropolitana region and Temuco in Araucanía.

use reqwest::{Client, StatusCode};

use tienda_core::wire::{CitiesResponse, ShippingMethodsResponse, StatesResponse};
use tienda_core::{City, State};
use tienda_integration_tests::api_base_url;

async fn state_named(client: &Client, name: &str) -> State {
    let states: StatesResponse = client
        .get(format!("{}/state/get-states/", api_base_url()))
        .send()
        .await
        .expect("Failed to get states")
        .json()
        .await
        .expect("Failed to parse states");
    states
        .states
        .into_iter()
        .find(|state| state.name == name)
        .expect("Region missing from seed data")
}

async fn city_named(client: &Client, state: &State, name: &str) -> City {
    let cities: CitiesResponse = client
        .get(format!("{}/city/get-cities-by-state/{}", api_base_url(), state.id))
        .send()
        .await
        .expect("Failed to get cities")
        .json()
        .await
        .expect("Failed to parse cities");
    cities
        .cities
        .into_iter()
        .find(|city| city.name == name)
        .expect("City missing from seed data")
}

async fn methods_for(client: &Client, city: &City) -> ShippingMethodsResponse {
    client
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
        .expect("Failed to parse shipping methods")
}

#[tokio::test]
#[ignore = "Requires running tienda-api with seed data"]
async fn test_metro_and_regional_cities_get_different_methods() {
    let client = Client::new();

    let metro = state_named(&client, "Metropolitana").await;
    let santiago = city_named(&client, &metro, "Santiago").await;
    let metro_methods = methods_for(&client, &santiago).await.shipping_methods;

    let araucania = state_named(&client, "Araucanía").await;
    let temuco = city_named(&client, &araucania, "Temuco").await;
    let regional_methods = methods_for(&client, &temuco).await.shipping_methods;

    assert!(!metro_methods.is_empty());
    assert!(!regional_methods.is_empty());
    assert_ne!(metro_methods, regional_methods);

    assert!(metro_methods.iter().map(|method| method.id).is_sorted());
}

#[tokio::test]
#[ignore = "Requires running tienda-api"]
async fn test_unknown_city_is_not_found() {
    let resp = Client::new()
        .get(format!(
            "{}/shipping-method/get-shipping-methods/{}",
            api_base_url(),
            i32::MAX
        ))
        .send()
        .await
        .expect("Failed to get shipping methods");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
