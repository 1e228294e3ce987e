//! In-memory collaborators for service tests.

#![allow(clippy::unwrap_used)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;

use tienda_core::wire::{
    AddToCartRequest, AddToCartResponse, RemoveFromCartRequest, WebpayCreateRequest,
    WebpayCreateResponse,
};
use tienda_core::{Cart, CartItemMetadata, Customer, Email, ProductId, UserId};

use super::cart::CartBackend;
use super::checkout::PaymentGateway;
use super::session_auth::SessionAuth;
use crate::api::ApiError;
use crate::models::AccessToken;

// =============================================================================
// Auth
// =============================================================================

pub struct FakeAuth {
    customer: Option<Customer>,
    profile_fetches: AtomicUsize,
}

impl FakeAuth {
    pub fn guest() -> Self {
        Self {
            customer: None,
            profile_fetches: AtomicUsize::new(0),
        }
    }

    pub fn customer() -> Self {
        Self {
            customer: Some(Customer {
                id: UserId::new(7),
                email: Email::parse("cliente@tienda.cl").unwrap(),
                first_name: "Camila".to_string(),
                last_name: "Soto".to_string(),
                phone: Some("+56987654321".to_string()),
                rut: None,
            }),
            profile_fetches: AtomicUsize::new(0),
        }
    }

    pub fn profile_fetches(&self) -> usize {
        self.profile_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionAuth for FakeAuth {
    async fn is_authenticated(&self) -> bool {
        self.customer.is_some()
    }

    async fn current_user(&self) -> Result<Option<Customer>, ApiError> {
        self.profile_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.customer.clone())
    }

    async fn access_token(&self) -> Option<AccessToken> {
        self.customer
            .as_ref()
            .map(|_| AccessToken::new("token".to_string()))
    }
}

// =============================================================================
// Cart backend
// =============================================================================

/// Applies cart mutations the way the API does; every product costs $1.000.
pub struct FakeBackend {
    persisted: Mutex<Cart>,
    calls: Mutex<Vec<&'static str>>,
    failing: bool,
}

fn metadata(product_id: ProductId) -> CartItemMetadata {
    CartItemMetadata {
        name: format!("Producto {product_id}"),
        slug: format!("producto-{product_id}"),
        unit_price: Decimal::new(1_000, 0),
        image_url: None,
    }
}

fn unavailable() -> ApiError {
    ApiError::Status {
        status: 503,
        message: "unavailable".to_string(),
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            persisted: Mutex::new(Cart::empty()),
            calls: Mutex::new(Vec::new()),
            failing: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new()
        }
    }

    pub fn seed_persisted(&self, product_id: ProductId, quantity: u32) {
        self.persisted
            .lock()
            .unwrap()
            .add_item(product_id, metadata(product_id), quantity)
            .unwrap();
    }

    pub fn persisted(&self) -> Cart {
        self.persisted.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(call);
        if self.failing { Err(unavailable()) } else { Ok(()) }
    }
}

#[async_trait]
impl CartBackend for FakeBackend {
    async fn fetch_cart(&self, _token: &AccessToken) -> Result<Cart, ApiError> {
        self.record("fetch_cart")?;
        Ok(self.persisted())
    }

    async fn add_to_cart(
        &self,
        token: Option<&AccessToken>,
        request: &AddToCartRequest,
    ) -> Result<AddToCartResponse, ApiError> {
        self.record("add_to_cart")?;
        let mut cart = match token {
            Some(_) => self.persisted(),
            None => request.cart.clone(),
        };
        let item = cart
            .add_item(request.product_id, metadata(request.product_id), request.quantity)
            .map_err(|e| ApiError::Status {
                status: 400,
                message: e.to_string(),
            })?;
        if token.is_some() {
            *self.persisted.lock().unwrap() = cart.clone();
        }
        Ok(AddToCartResponse { cart, item })
    }

    async fn remove_from_cart(
        &self,
        token: Option<&AccessToken>,
        request: &RemoveFromCartRequest,
    ) -> Result<Cart, ApiError> {
        self.record("remove_from_cart")?;
        let mut cart = match token {
            Some(_) => self.persisted(),
            None => request.cart.clone(),
        };
        cart.remove_item(request.product_id).unwrap();
        if token.is_some() {
            *self.persisted.lock().unwrap() = cart.clone();
        }
        Ok(cart)
    }

    async fn sync_cart(&self, _token: &AccessToken, guest: &Cart) -> Result<Cart, ApiError> {
        self.record("sync_cart")?;
        let mut persisted = self.persisted.lock().unwrap();
        for line in &guest.cart_items {
            persisted
                .add_item(line.product_id, line.metadata.clone(), line.quantity)
                .unwrap();
        }
        Ok(persisted.clone())
    }
}

// =============================================================================
// Payment gateway
// =============================================================================

pub struct FakeGateway {
    requests: Mutex<Vec<WebpayCreateRequest>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<WebpayCreateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_payment(
        &self,
        _token: Option<&AccessToken>,
        request: &WebpayCreateRequest,
    ) -> Result<WebpayCreateResponse, ApiError> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        Ok(WebpayCreateResponse {
            redirect_path: format!(
                "https://webpay3gint.transbank.cl/webpayserver/initTransaction?token_ws=tok-{}",
                requests.len()
            ),
        })
    }
}
