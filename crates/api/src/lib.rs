//! Tienda API - Persistence service library.
//!
//! Owns the shop's data: catalog, customers and their tokens, carts,
//! geography and shipping, and orders paid through Webpay Plus. The
//! storefront is its only intended caller.
//!
//! # Modules
//!
//! - [`config`] - Environment configuration
//! - [`db`] - Repositories over `PostgreSQL`
//! - [`services`] - Auth, carts, shipping resolution, payments
//! - [`middleware`] - Bearer-token extractors
//! - [`routes`] - JSON handlers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
