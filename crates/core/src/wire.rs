//! JSON bodies exchanged between the storefront and the API.
//!
//! Both sides (de)serialize these exact types, so a field renamed here is
//! renamed on the wire for both.

use serde::{Deserialize, Serialize};

use crate::cart::{Cart, CartItem};
use crate::catalog::{Address, City, Customer, Product, ShippingMethod, State};
use crate::checkout::CheckoutData;
use crate::types::{CityId, ProductId};

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToCartRequest {
    /// The caller's current cart; ignored for authenticated callers.
    pub cart: Cart,
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToCartResponse {
    pub cart: Cart,
    /// The line as it stands after the add.
    pub item: CartItem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveFromCartRequest {
    pub cart: Cart,
    pub product_id: ProductId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartResponse {
    pub cart: Cart,
}

/// Guest cart to merge into the persisted one after login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCartRequest {
    pub cart: Cart,
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyTokenResponse {
    #[serde(rename = "isAuthenticated")]
    pub is_authenticated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub rut: Option<String>,
}

/// Returned by login and registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: Customer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerResponse {
    pub user: Customer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressesResponse {
    pub addresses: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressResponse {
    pub address: Address,
}

/// Create or replace a saved address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRequest {
    pub street: String,
    pub number: String,
    #[serde(default)]
    pub apartment: Option<String>,
    pub city_id: CityId,
    #[serde(default)]
    pub is_default: bool,
}

// =============================================================================
// Geography & shipping
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatesResponse {
    pub states: Vec<State>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitiesResponse {
    pub cities: Vec<City>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingMethodsResponse {
    pub shipping_methods: Vec<ShippingMethod>,
}

// =============================================================================
// Payment
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebpayCreateRequest {
    pub cart: Cart,
    pub checkout: CheckoutData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebpayCreateResponse {
    /// Full gateway URL including the `token_ws` query parameter.
    #[serde(rename = "redirectPath")]
    pub redirect_path: String,
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductResponse {
    pub product: Product,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStockRequest {
    pub items: Vec<StockItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockShortage {
    pub product_id: ProductId,
    pub requested: u32,
    pub available: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStockResponse {
    pub available: bool,
    pub shortages: Vec<StockShortage>,
}

impl From<&Cart> for CheckStockRequest {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart
                .cart_items
                .iter()
                .map(|item| StockItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                })
                .collect(),
        }
    }
}

/// Body of every API error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_fields() {
        let json = serde_json::to_value(VerifyTokenResponse {
            is_authenticated: true,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "isAuthenticated": true }));

        let parsed: WebpayCreateResponse =
            serde_json::from_str(r#"{"redirectPath":"https://pay.example/?token_ws=t"}"#).unwrap();
        assert_eq!(parsed.redirect_path, "https://pay.example/?token_ws=t");
    }

    #[test]
    fn test_add_to_cart_request_accepts_partial_cart() {
        let parsed: AddToCartRequest =
            serde_json::from_str(r#"{"cart":{"cart_items":[]},"product_id":3,"quantity":2}"#).unwrap();
        assert_eq!(parsed.cart, Cart::empty());
        assert_eq!(parsed.product_id, ProductId::new(3));
    }
}
