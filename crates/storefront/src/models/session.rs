//! Session-related types.
//!
//! Types stored in the session for authentication state, plus the keys under
//! which the guest cart and the checkout wizard are kept.

use serde::{Deserialize, Serialize};

use tienda_core::{Customer, Email, UserId};

/// Bearer token issued by the persistence service at login.
///
/// `Debug` is redacted so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self(token)
    }

    /// The raw token, for the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Session-stored customer identity.
///
/// Minimal data stored in the session to identify the logged-in customer.
/// The profile itself is always fetched fresh from the persistence service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentCustomer {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub token: AccessToken,
}

impl CurrentCustomer {
    #[must_use]
    pub fn new(customer: &Customer, token: AccessToken) -> Self {
        Self {
            id: customer.id,
            email: customer.email.clone(),
            first_name: customer.first_name.clone(),
            token,
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in customer.
    pub const CURRENT_CUSTOMER: &str = "current_customer";

    /// Key for the guest cart (JSON-encoded string).
    pub const CART: &str = "cart";

    /// Key for the checkout wizard state.
    pub const CHECKOUT: &str = "checkout";
}
