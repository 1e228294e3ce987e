//! Unified error handling with Sentry integration.
//!
//! Every error leaves the service as `{"error": "<message>"}` with a status
//! the storefront maps back to its own errors. Server-side failures are
//! captured to Sentry and answered with a generic message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use tienda_core::wire::ErrorBody;

use crate::db::RepositoryError;
use crate::services::{AuthError, CartServiceError, PaymentError, ShippingError};

/// Application-level error type for the persistence service.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartServiceError),

    #[error("Shipping error: {0}")]
    Shipping(#[from] ShippingError),

    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Missing, invalid, or expired bearer token.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::InvalidFields(_) | AuthError::InvalidEmail(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Cart(err) | Self::Payment(PaymentError::Cart(err)) => match err {
                CartServiceError::ProductNotFound(_) => StatusCode::NOT_FOUND,
                CartServiceError::InsufficientStock { .. } => StatusCode::CONFLICT,
                CartServiceError::Mutation(_) => StatusCode::BAD_REQUEST,
                CartServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Shipping(err) | Self::Payment(PaymentError::Shipping(err)) => match err {
                ShippingError::CityNotFound(_) => StatusCode::NOT_FOUND,
                ShippingError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Payment(err) => match err {
                PaymentError::IncompleteCheckout(_)
                | PaymentError::EmptyCart
                | PaymentError::InvalidAmount => StatusCode::BAD_REQUEST,
                PaymentError::ShippingUnavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
                PaymentError::OrderNotFound => StatusCode::NOT_FOUND,
                PaymentError::Webpay(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Repository(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Repository(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// The message put in the response body.
    fn public_message(&self) -> String {
        let status = self.status();
        if status.is_server_error() {
            return match status {
                StatusCode::BAD_GATEWAY => "payment gateway unavailable".to_string(),
                _ => "internal server error".to_string(),
            };
        }

        match self {
            Self::Auth(err) => err.to_string(),
            Self::Cart(err) => err.to_string(),
            Self::Shipping(err) => err.to_string(),
            Self::Payment(err) => err.to_string(),
            Self::Repository(RepositoryError::NotFound) => "not found".to_string(),
            Self::Repository(err) => err.to_string(),
            Self::Unauthorized => "unauthorized".to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::BadRequest(message) | Self::Internal(message) => message.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (
            status,
            Json(ErrorBody {
                error: self.public_message(),
            }),
        )
            .into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tienda_core::{CartMutationError, CityId, ProductId};

    use super::*;

    fn status_of(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(status_of(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::UserAlreadyExists), StatusCode::CONFLICT);
        assert_eq!(
            status_of(AuthError::InvalidFields(vec!["password".to_string()])),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(CartServiceError::ProductNotFound(ProductId::new(9))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(CartServiceError::InsufficientStock {
                product_id: ProductId::new(9),
                available: 1,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(CartServiceError::Mutation(CartMutationError::Overflow)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(PaymentError::Cart(CartServiceError::Mutation(
                CartMutationError::Overflow
            ))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ShippingError::CityNotFound(CityId::new(999))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(PaymentError::IncompleteCheckout("shipping")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(PaymentError::Shipping(ShippingError::CityNotFound(CityId::new(1)))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(RepositoryError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(RepositoryError::DataCorruption("bad".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let err = AppError::Repository(RepositoryError::DataCorruption(
            "cart for user 7 is not JSON".to_string(),
        ));
        assert_eq!(err.public_message(), "internal server error");
    }

    #[test]
    fn test_client_errors_explain_themselves() {
        let err = AppError::from(AuthError::InvalidFields(vec![
            "email".to_string(),
            "password".to_string(),
        ]));
        assert_eq!(err.public_message(), "invalid fields: email, password");
    }
}
