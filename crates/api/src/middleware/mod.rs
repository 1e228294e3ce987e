//! HTTP middleware for the persistence service.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, one transaction per request)
//! 2. `TraceLayer` (request spans)
//!
//! Authentication is per-route, through the extractors in [`auth`].

pub mod auth;

pub use auth::{AuthRejection, OptionalUser, RequireUser};
