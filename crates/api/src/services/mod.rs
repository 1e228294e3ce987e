//! Business logic for the persistence service.
//!
//! Route handlers stay thin: they extract, call one service, and map the
//! result to JSON. Services own validation and multi-step database work.

pub mod auth;
pub mod cart;
pub mod payment;
pub mod shipping;
pub mod webpay;

pub use auth::{AuthError, AuthService};
pub use cart::{CartService, CartServiceError};
pub use payment::{PaymentError, PaymentOutcome, PaymentService, ReturnParams};
pub use shipping::{ShippingDirectory, ShippingError, ShippingResolver};
pub use webpay::{WebpayClient, WebpayError};
