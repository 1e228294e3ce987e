//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding. Customers only ever see generic Spanish
//! messages, never backend detail.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::ApiError;
use crate::services::{CartError, CheckoutError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Persistence service call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout operation failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Api(err) | Self::Checkout(CheckoutError::Api(err)) | Self::Cart(CartError::Backend(err)) => {
                match err {
                    ApiError::NotFound(_) => StatusCode::NOT_FOUND,
                    ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
                    _ => StatusCode::BAD_GATEWAY,
                }
            }
            Self::Checkout(CheckoutError::Transition(_)) => StatusCode::CONFLICT,
            Self::Checkout(CheckoutError::EmptyCart) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Cart(CartError::Invalid(_)) => StatusCode::BAD_GATEWAY,
            Self::Cart(CartError::Store(_)) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// What the customer is told.
    fn public_message(&self) -> &'static str {
        match self {
            Self::Cart(_) => "No pudimos actualizar tu carro. Inténtalo nuevamente.",
            Self::Checkout(CheckoutError::EmptyCart) => "Tu carro está vacío.",
            Self::Checkout(CheckoutError::Transition(_)) => {
                "Completa los pasos anteriores antes de continuar."
            }
            Self::NotFound(_) => "No encontramos lo que buscabas.",
            Self::BadRequest(_) => "La solicitud no es válida.",
            _ => match self.status() {
                StatusCode::NOT_FOUND => "No encontramos lo que buscabas.",
                StatusCode::UNAUTHORIZED => "Debes iniciar sesión para continuar.",
                StatusCode::BAD_GATEWAY => {
                    "El servicio no está disponible en este momento. Inténtalo más tarde."
                }
                _ => "Ocurrió un error inesperado.",
            },
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

        (status, self.public_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context after login.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on logout.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a customer action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data.unwrap_or_default() {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("producto cafe".to_string());
        assert_eq!(err.to_string(), "Not found: producto cafe");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            status_of(AppError::Api(ApiError::NotFound("x".to_string()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Api(ApiError::Unauthorized)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Cart(CartError::Backend(ApiError::Status {
                status: 500,
                message: "db down".to_string(),
            }))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(AppError::Checkout(CheckoutError::EmptyCart)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Internal("x".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_backend_detail_is_not_exposed() {
        let err = AppError::Api(ApiError::Status {
            status: 500,
            message: "relation \"carts\" does not exist".to_string(),
        });
        assert!(!err.public_message().contains("carts"));
    }
}
