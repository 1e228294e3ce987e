//! Business logic services for the storefront.
//!
//! Each service borrows its collaborators as trait objects so handlers can
//! wire in session- and HTTP-backed implementations while tests use fakes.
//!
//! # Services
//!
//! - [`cart_store`] - Guest cart persistence (`CartStore`)
//! - [`session_auth`] - Authentication capability (`SessionAuth`)
//! - [`notifier`] - Cart-changed broadcast channel
//! - [`cart`] - Cart reconciliation between guest and persisted carts
//! - [`checkout`] - Checkout wizard driver and payment hand-off

pub mod cart;
pub mod cart_store;
pub mod checkout;
pub mod notifier;
pub mod session_auth;

#[cfg(test)]
pub(crate) mod fakes;

pub use cart::{CartBackend, CartError, CartReconciler};
pub use cart_store::{CartStore, CartStoreError, MemoryCartStore, SessionCartStore};
pub use checkout::{CheckoutError, CheckoutFlow, PaymentGateway};
pub use notifier::{CartAction, CartChanged, CartNotifier};
pub use session_auth::{ApiSessionAuth, SessionAuth};
