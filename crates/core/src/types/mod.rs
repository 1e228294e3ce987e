//! Newtypes shared by the storefront and the API.

pub mod email;
pub mod id;
pub mod money;
pub mod rut;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{clp_units, format_clp, round_clp};
pub use rut::{Rut, RutError};
pub use status::OrderStatus;
