//! Integration tests for registration, login, tokens, and addresses.
//!
//! These tests require a running `tienda-api` with seeded geography.

use reqwest::{Client, StatusCode};

use tienda_core::wire::{
    AddressRequest, AddressResponse, AddressesResponse, AuthResponse, CitiesResponse,
    CustomerResponse, LoginRequest, StatesResponse, VerifyTokenResponse,
};
use tienda_integration_tests::{api_base_url, register_customer, registration, unique_email};

async fn verify(client: &Client, token: &str) -> bool {
    let body: VerifyTokenResponse = client
        .get(format!("{}/user/verify-token", api_base_url()))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to verify token")
        .json()
        .await
        .expect("Failed to parse verify response");
    body.is_authenticated
}

#[tokio::test]
#[ignore = "Requires running tienda-api"]
async fn test_register_login_logout() {
    let client = Client::new();
    let email = unique_email();

    let resp = client
        .post(format!("{}/user/register", api_base_url()))
        .json(&registration(&email))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let again = client
        .post(format!("{}/user/register", api_base_url()))
        .json(&registration(&email))
        .send()
        .await
        .expect("Failed to register twice");
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let login: AuthResponse = client
        .post(format!("{}/user/login", api_base_url()))
        .json(&LoginRequest {
            email: email.clone(),
            password: "Secreta123".to_string(),
        })
        .send()
        .await
        .expect("Failed to log in")
        .json()
        .await
        .expect("Failed to parse login");
    assert_eq!(login.user.email.as_str(), email);
    assert!(verify(&client, &login.token).await);

    let profile: CustomerResponse = client
        .get(format!("{}/customer", api_base_url()))
        .bearer_auth(&login.token)
        .send()
        .await
        .expect("Failed to get profile")
        .json()
        .await
        .expect("Failed to parse profile");
    assert_eq!(profile.user.id, login.user.id);

    let logout = client
        .post(format!("{}/user/logout", api_base_url()))
        .bearer_auth(&login.token)
        .send()
        .await
        .expect("Failed to log out");
    assert_eq!(logout.status(), StatusCode::NO_CONTENT);
    assert!(!verify(&client, &login.token).await);
}

#[tokio::test]
#[ignore = "Requires running tienda-api"]
async fn test_bad_password_is_unauthorized() {
    let client = Client::new();
    let auth = register_customer(&client).await;

    let resp = client
        .post(format!("{}/user/login", api_base_url()))
        .json(&LoginRequest {
            email: auth.user.email.as_str().to_string(),
            password: "Incorrecta1".to_string(),
        })
        .send()
        .await
        .expect("Failed to log in");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running tienda-api"]
async fn test_weak_password_is_rejected() {
    let client = Client::new();
    let mut body = registration(&unique_email());
    body.password = "corta".to_string();
    body.confirm_password = "corta".to_string();

    let resp = client
        .post(format!("{}/user/register", api_base_url()))
        .json(&body)
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[ignore = "Requires running tienda-api with seed data"]
async fn test_address_book() {
    let client = Client::new();
    let auth = register_customer(&client).await;

    let states: StatesResponse = client
        .get(format!("{}/state/get-states/", api_base_url()))
        .send()
        .await
        .expect("Failed to get states")
        .json()
        .await
        .expect("Failed to parse states");
    let state = states.states.first().expect("Seed data has no regions");

    let cities: CitiesResponse = client
        .get(format!("{}/city/get-cities-by-state/{}", api_base_url(), state.id))
        .send()
        .await
        .expect("Failed to get cities")
        .json()
        .await
        .expect("Failed to parse cities");
    let city = cities.cities.first().expect("Region has no cities");

    let created: AddressResponse = client
        .post(format!("{}/customer/address", api_base_url()))
        .bearer_auth(&auth.token)
        .json(&AddressRequest {
            street: "Los Carrera".to_string(),
            number: "1450".to_string(),
            apartment: None,
            city_id: city.id,
            is_default: true,
        })
        .send()
        .await
        .expect("Failed to create address")
        .json()
        .await
        .expect("Failed to parse address");
    assert_eq!(created.address.city_name, city.name);

    let listed: AddressesResponse = client
        .get(format!("{}/customer/address", api_base_url()))
        .bearer_auth(&auth.token)
        .send()
        .await
        .expect("Failed to list addresses")
        .json()
        .await
        .expect("Failed to parse addresses");
    assert_eq!(listed.addresses, vec![created.address.clone()]);

    let deleted = client
        .delete(format!(
            "{}/customer/address/{}",
            api_base_url(),
            created.address.id
        ))
        .bearer_auth(&auth.token)
        .send()
        .await
        .expect("Failed to delete address");
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let missing = client
        .delete(format!(
            "{}/customer/address/{}",
            api_base_url(),
            created.address.id
        ))
        .bearer_auth(&auth.token)
        .send()
        .await
        .expect("Failed to delete address twice");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}
