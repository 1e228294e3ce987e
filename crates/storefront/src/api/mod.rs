//! HTTP client for the Tienda persistence service.
//!
//! # Architecture
//!
//! - Plain JSON over `reqwest`; request and response bodies are the shared
//!   types in [`tienda_core::wire`]
//! - Authenticated calls send `Authorization: Bearer <token>`
//! - Catalog and geography lookups are cached in memory via `moka`
//!   (5 minute TTL); carts, customers, and payments never are
//!
//! # Example
//!
//! ```rust,ignore
//! use tienda_storefront::api::ApiClient;
//!
//! let api = ApiClient::new(&config.api)?;
//! let cities = api.get_cities_by_state(StateId::new(8)).await?;
//! ```

mod cache;
mod client;

pub use client::ApiClient;

use thiserror::Error;

/// Errors that can occur when calling the persistence service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (connection refused, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status other than 401/404.
    #[error("API returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing, invalid, or expired bearer token.
    #[error("Unauthorized")]
    Unauthorized,
}

impl ApiError {
    /// Whether the error means the requested record does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
