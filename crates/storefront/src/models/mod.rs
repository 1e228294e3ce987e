//! Session-held models for the storefront.
//!
//! Catalog, cart, and checkout types live in `tienda-core`; this module only
//! holds what the storefront keeps in its own session.

pub mod session;

pub use session::{AccessToken, CurrentCustomer, keys as session_keys};
