//! Records owned by the persistence service alone.
//!
//! Shared records (products, customers, geography) live in `tienda-core`.

pub mod order;

pub use order::{NewOrder, Order};
