//! Catalog, customer, and geography records.
//!
//! These are owned by the persistence service; the storefront only ever sees
//! them through the JSON wire types in [`crate::wire`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{AddressId, CityId, Email, ProductId, ShippingMethodId, StateId, UserId};

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    /// Units available for sale.
    pub stock: i32,
    pub image_url: Option<String>,
    pub category: Option<String>,
}

impl Product {
    /// Whether `quantity` units can be sold right now.
    #[must_use]
    pub fn has_stock_for(&self, quantity: u32) -> bool {
        i64::from(self.stock) >= i64::from(quantity)
    }
}

/// A registered customer's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub rut: Option<String>,
}

impl Customer {
    /// "First Last", trimmed.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A saved delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Address {
    pub id: AddressId,
    pub street: String,
    pub number: String,
    pub apartment: Option<String>,
    pub city_id: CityId,
    pub city_name: String,
    pub state_id: StateId,
    pub is_default: bool,
}

/// A region (first level of the geography).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct State {
    pub id: StateId,
    pub name: String,
}

/// A city (commune) belonging to a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct City {
    pub id: CityId,
    pub name: String,
    pub state_id: StateId,
}

/// A delivery option offered for some set of cities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct ShippingMethod {
    pub id: ShippingMethodId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
}
