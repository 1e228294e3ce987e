//! Tienda Core - Shared domain library.
//!
//! This crate provides the domain shared by all Tienda components:
//! - `storefront` - Public-facing server-rendered shop
//! - `api` - Persistence service (carts, users, geography, payments)
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. The `postgres` feature adds `sqlx` encodings for
//! the API.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, money, RUT, and statuses
//! - [`catalog`] - Products, customers, addresses, and geography
//! - [`cart`] - Cart model and its arithmetic
//! - [`checkout`] - Checkout wizard state machine
//! - [`validation`] - Form field validators
//! - [`wire`] - JSON bodies exchanged between storefront and API

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod types;
pub mod validation;
pub mod wire;

pub use cart::{Cart, CartItem, CartItemMetadata, CartMutationError};
pub use catalog::{Address, City, Customer, Product, ShippingMethod, State};
pub use checkout::{
    AddressData, Checkout, CheckoutData, CheckoutEvent, CheckoutStep, ContactData, PaymentData,
    ShippingData, StepView, TransitionError, transition,
};
pub use types::*;
pub use validation::{FieldContext, can_continue, is_valid_field};
