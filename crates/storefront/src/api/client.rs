//! Persistence-service client implementation.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use tienda_core::wire::{
    AddToCartRequest, AddToCartResponse, AddressRequest, AddressResponse, AddressesResponse,
    AuthResponse, CartResponse, CheckStockRequest, CheckStockResponse, CitiesResponse,
    CustomerResponse, ErrorBody, LoginRequest, ProductResponse, ProductsResponse,
    RegisterRequest, RemoveFromCartRequest, ShippingMethodsResponse, StatesResponse,
    SyncCartRequest, VerifyTokenResponse, WebpayCreateRequest, WebpayCreateResponse,
};
use tienda_core::{
    Address, AddressId, Cart, City, CityId, Customer, Product, ShippingMethod, State, StateId,
};

use super::ApiError;
use super::cache::{CacheKey, CacheValue};
use crate::config::ApiConfig;
use crate::models::AccessToken;

/// How much of an unexpected body to keep in logs and errors.
const BODY_SNIPPET_LEN: usize = 200;

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the Tienda persistence service.
///
/// Cheap to clone; all clones share one connection pool and one cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                cache,
            }),
        })
    }

    fn request(&self, method: Method, path: &str, token: Option<&AccessToken>) -> RequestBuilder {
        let url = format!("{}{path}", self.inner.base_url);
        let builder = self.inner.client.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token.expose()),
            None => builder,
        }
    }

    /// Send a request and decode its JSON body.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        check_status(status, &body)?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %snippet(&body),
                "Failed to parse persistence service response"
            );
            ApiError::Parse(e)
        })
    }

    /// Send a request whose success response has no meaningful body.
    async fn send_empty(&self, request: RequestBuilder) -> Result<(), ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        check_status(status, &body)
    }

    async fn cached<T, F>(
        &self,
        key: CacheKey,
        unwrap: fn(CacheValue) -> Option<T>,
        wrap: fn(T) -> CacheValue,
        fetch: F,
    ) -> Result<T, ApiError>
    where
        T: Clone,
        F: Future<Output = Result<T, ApiError>>,
    {
        if let Some(value) = self.inner.cache.get(&key).await.and_then(unwrap) {
            debug!(?key, "Cache hit");
            return Ok(value);
        }

        let value = fetch.await?;
        self.inner.cache.insert(key, wrap(value.clone())).await;
        Ok(value)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Fetch the persisted cart of the token's owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the token is rejected.
    #[instrument(skip(self, token))]
    pub async fn get_cart(&self, token: &AccessToken) -> Result<Cart, ApiError> {
        let response: CartResponse = self
            .send(self.request(Method::GET, "/cart/", Some(token)))
            .await?;
        Ok(response.cart)
    }

    /// Add a product to a cart.
    ///
    /// Guests send their snapshot; authenticated callers mutate their
    /// persisted cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the product cannot be added.
    #[instrument(skip(self, token, body), fields(product_id = %body.product_id, quantity = body.quantity))]
    pub async fn add_to_cart(
        &self,
        token: Option<&AccessToken>,
        body: &AddToCartRequest,
    ) -> Result<AddToCartResponse, ApiError> {
        self.send(
            self.request(Method::POST, "/cart/add-to-cart", token)
                .json(body),
        )
        .await
    }

    /// Remove a product line from a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token, body), fields(product_id = %body.product_id))]
    pub async fn remove_from_cart(
        &self,
        token: Option<&AccessToken>,
        body: &RemoveFromCartRequest,
    ) -> Result<Cart, ApiError> {
        let response: CartResponse = self
            .send(
                self.request(Method::POST, "/cart/remove-from-cart", token)
                    .json(body),
            )
            .await?;
        Ok(response.cart)
    }

    /// Merge a guest cart into the persisted cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the token is rejected.
    #[instrument(skip(self, token, cart), fields(lines = cart.cart_items.len()))]
    pub async fn sync_cart(&self, token: &AccessToken, cart: &Cart) -> Result<Cart, ApiError> {
        let body = SyncCartRequest { cart: cart.clone() };
        let response: CartResponse = self
            .send(
                self.request(Method::POST, "/cart/sync-cart", Some(token))
                    .json(&body),
            )
            .await?;
        Ok(response.cart)
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Ask the persistence service whether a token is still valid.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn verify_token(&self, token: &AccessToken) -> Result<bool, ApiError> {
        match self
            .send::<VerifyTokenResponse>(self.request(Method::GET, "/user/verify-token", Some(token)))
            .await
        {
            Ok(response) => Ok(response.is_authenticated),
            Err(ApiError::Unauthorized) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Exchange credentials for a token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for bad credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send(self.request(Method::POST, "/user/login", None).json(&body))
            .await
    }

    /// Create an account and log it in.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the email is taken.
    #[instrument(skip(self, body), fields(email = %body.email))]
    pub async fn register(&self, body: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.send(self.request(Method::POST, "/user/register", None).json(body))
            .await
    }

    /// Revoke a token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn logout(&self, token: &AccessToken) -> Result<(), ApiError> {
        self.send_empty(self.request(Method::POST, "/user/logout", Some(token)))
            .await
    }

    // =========================================================================
    // Customer
    // =========================================================================

    /// Fetch the profile of the token's owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the token is rejected.
    #[instrument(skip(self, token))]
    pub async fn get_customer(&self, token: &AccessToken) -> Result<Customer, ApiError> {
        let response: CustomerResponse = self
            .send(self.request(Method::GET, "/customer", Some(token)))
            .await?;
        Ok(response.user)
    }

    /// List saved addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the token is rejected.
    #[instrument(skip(self, token))]
    pub async fn get_addresses(&self, token: &AccessToken) -> Result<Vec<Address>, ApiError> {
        let response: AddressesResponse = self
            .send(self.request(Method::GET, "/customer/address", Some(token)))
            .await?;
        Ok(response.addresses)
    }

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the address is rejected.
    #[instrument(skip(self, token, body))]
    pub async fn create_address(
        &self,
        token: &AccessToken,
        body: &AddressRequest,
    ) -> Result<Address, ApiError> {
        let response: AddressResponse = self
            .send(
                self.request(Method::POST, "/customer/address", Some(token))
                    .json(body),
            )
            .await?;
        Ok(response.address)
    }

    /// Delete a saved address.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the address does not exist.
    #[instrument(skip(self, token))]
    pub async fn delete_address(&self, token: &AccessToken, id: AddressId) -> Result<(), ApiError> {
        self.send_empty(self.request(
            Method::DELETE,
            &format!("/customer/address/{id}"),
            Some(token),
        ))
        .await
    }

    // =========================================================================
    // Geography & shipping
    // =========================================================================

    /// All regions.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_states(&self) -> Result<Vec<State>, ApiError> {
        self.cached(
            CacheKey::States,
            |value| match value {
                CacheValue::States(states) => Some(states),
                _ => None,
            },
            CacheValue::States,
            async {
                let response: StatesResponse = self
                    .send(self.request(Method::GET, "/state/get-states/", None))
                    .await?;
                Ok(response.states)
            },
        )
        .await
    }

    /// Cities of a region, in the order the persistence service returns them.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_cities_by_state(&self, state_id: StateId) -> Result<Vec<City>, ApiError> {
        self.cached(
            CacheKey::Cities(state_id),
            |value| match value {
                CacheValue::Cities(cities) => Some(cities),
                _ => None,
            },
            CacheValue::Cities,
            async {
                let response: CitiesResponse = self
                    .send(self.request(
                        Method::GET,
                        &format!("/city/get-cities-by-state/{state_id}"),
                        None,
                    ))
                    .await?;
                Ok(response.cities)
            },
        )
        .await
    }

    /// Shipping methods that deliver to a city. An empty list is valid.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown city.
    #[instrument(skip(self))]
    pub async fn get_shipping_methods(
        &self,
        city_id: CityId,
    ) -> Result<Vec<ShippingMethod>, ApiError> {
        self.cached(
            CacheKey::ShippingMethods(city_id),
            |value| match value {
                CacheValue::ShippingMethods(methods) => Some(methods),
                _ => None,
            },
            CacheValue::ShippingMethods,
            async {
                let response: ShippingMethodsResponse = self
                    .send(self.request(
                        Method::GET,
                        &format!("/shipping-method/get-shipping-methods/{city_id}"),
                        None,
                    ))
                    .await?;
                Ok(response.shipping_methods)
            },
        )
        .await
    }

    // =========================================================================
    // Payment
    // =========================================================================

    /// Create a Webpay transaction and get the gateway redirect.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the gateway rejects it.
    #[instrument(skip(self, token, body), fields(lines = body.cart.cart_items.len()))]
    pub async fn create_webpay_transaction(
        &self,
        token: Option<&AccessToken>,
        body: &WebpayCreateRequest,
    ) -> Result<WebpayCreateResponse, ApiError> {
        self.send(self.request(Method::POST, "/webpay/create", token).json(body))
            .await
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// The full catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        self.cached(
            CacheKey::Products,
            |value| match value {
                CacheValue::Products(products) => Some(products),
                _ => None,
            },
            CacheValue::Products,
            async {
                let response: ProductsResponse = self
                    .send(self.request(Method::GET, "/product/", None))
                    .await?;
                Ok(response.products)
            },
        )
        .await
    }

    /// Full-text product search. Never cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn search_products(&self, query: &str) -> Result<Vec<Product>, ApiError> {
        let response: ProductsResponse = self
            .send(
                self.request(Method::GET, "/product/search", None)
                    .query(&[("q", query)]),
            )
            .await?;
        Ok(response.products)
    }

    /// A product by slug.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] if no product has the slug.
    #[instrument(skip(self))]
    pub async fn get_product(&self, slug: &str) -> Result<Product, ApiError> {
        self.cached(
            CacheKey::Product(slug.to_string()),
            |value| match value {
                CacheValue::Product(product) => Some(*product),
                _ => None,
            },
            |product| CacheValue::Product(Box::new(product)),
            async {
                let response: ProductResponse = self
                    .send(self.request(Method::GET, &format!("/product/{slug}"), None))
                    .await?;
                Ok(response.product)
            },
        )
        .await
    }

    /// Check that every cart line is in stock.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, cart))]
    pub async fn check_stock(&self, cart: &Cart) -> Result<CheckStockResponse, ApiError> {
        let body = CheckStockRequest::from(cart);
        self.send(
            self.request(Method::POST, "/product/check-stock", None)
                .json(&body),
        )
        .await
    }

    /// Liveness of the persistence service.
    ///
    /// # Errors
    ///
    /// Returns an error if the service is unreachable or unhealthy.
    pub async fn ping(&self) -> Result<(), ApiError> {
        self.send_empty(self.request(Method::GET, "/health", None))
            .await
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Map a non-success status to an [`ApiError`].
fn check_status(status: StatusCode, body: &str) -> Result<(), ApiError> {
    if status.is_success() {
        return Ok(());
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .map_or_else(|_| snippet(body), |error| error.error);

    match status {
        StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
        StatusCode::NOT_FOUND => Err(ApiError::NotFound(message)),
        _ => {
            tracing::warn!(status = %status, message = %message, "Persistence service returned an error");
            Err(ApiError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_LEN).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::Path;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;

    static CITY_CALLS: AtomicUsize = AtomicUsize::new(0);

    async fn serve(router: Router) -> ApiClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        ApiClient::new(&ApiConfig {
            base_url: format!("http://{addr}"),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_cities_by_state_keep_row_order_and_are_cached() {
        let router = Router::new().route(
            "/city/get-cities-by-state/{state_id}",
            get(|Path(state_id): Path<i32>| async move {
                CITY_CALLS.fetch_add(1, Ordering::SeqCst);
                Json(json!({
                    "cities": [
                        { "id": 81, "name": "Temuco", "state_id": state_id },
                        { "id": 82, "name": "Villarrica", "state_id": state_id },
                    ]
                }))
            }),
        );
        let api = serve(router).await;

        let cities = api.get_cities_by_state(StateId::new(8)).await.unwrap();
        assert_eq!(cities.len(), 2);
        assert_eq!(cities[0].name, "Temuco");
        assert_eq!(cities[1].name, "Villarrica");

        api.get_cities_by_state(StateId::new(8)).await.unwrap();
        assert_eq!(CITY_CALLS.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let router = Router::new()
            .route(
                "/product/{slug}",
                get(|| async {
                    (
                        AxumStatus::NOT_FOUND,
                        Json(json!({ "error": "Product not found" })),
                    )
                }),
            )
            .route("/customer", get(|| async { AxumStatus::UNAUTHORIZED }))
            .route(
                "/state/get-states/",
                get(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "boom") }),
            );
        let api = serve(router).await;
        let token = AccessToken::new("t".to_string());

        let err = api.get_product("missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("Product not found"));

        assert!(matches!(
            api.get_customer(&token).await.unwrap_err(),
            ApiError::Unauthorized
        ));

        match api.get_states().await.unwrap_err() {
            ApiError::Status { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_verify_token_treats_401_as_unauthenticated() {
        let router = Router::new().route(
            "/user/verify-token",
            get(|| async { AxumStatus::UNAUTHORIZED }),
        );
        let api = serve(router).await;

        let valid = api
            .verify_token(&AccessToken::new("expired".to_string()))
            .await
            .unwrap();
        assert!(!valid);
    }

    #[tokio::test]
    async fn test_connection_refused_is_http_error() {
        let api = ApiClient::new(&ApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(2),
        })
        .unwrap();

        assert!(matches!(
            api.list_products().await.unwrap_err(),
            ApiError::Http(_)
        ));
    }
}
