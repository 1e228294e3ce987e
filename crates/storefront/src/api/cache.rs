//! Cache types for persistence-service responses.

use tienda_core::{City, CityId, Product, ShippingMethod, State, StateId};

/// Cache key for catalog and geography lookups.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products,
    Product(String),
    States,
    Cities(StateId),
    ShippingMethods(CityId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Vec<Product>),
    Product(Box<Product>),
    States(Vec<State>),
    Cities(Vec<City>),
    ShippingMethods(Vec<ShippingMethod>),
}
