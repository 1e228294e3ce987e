//! Bearer-token extractors.
//!
//! The storefront sends `Authorization: Bearer <token>` on a customer's
//! behalf. Tokens are looked up by digest on every request; nothing is
//! cached.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};

use tienda_core::Customer;
use tienda_core::wire::ErrorBody;

use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(RequireUser { customer, .. }: RequireUser) -> Json<CustomerResponse> {
///     Json(CustomerResponse { user: customer })
/// }
/// ```
pub struct RequireUser {
    pub customer: Customer,
    /// The raw token, for logout.
    pub token: String,
}

/// Extractor for routes that serve guests and customers alike.
///
/// No `Authorization` header means a guest. A header with a token that does
/// not resolve is rejected rather than downgraded, so the storefront learns
/// its token went stale.
pub struct OptionalUser(pub Option<Customer>);

/// Rejection for the auth extractors.
#[derive(Debug)]
pub enum AuthRejection {
    /// Missing, malformed, expired, or revoked token.
    Unauthorized,
    /// Token lookup failed.
    Unavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "authentication unavailable"),
        };
        (
            status,
            Json(ErrorBody {
                error: message.to_string(),
            }),
        )
            .into_response()
    }
}

/// The token from an `Authorization: Bearer` header.
///
/// Returns `Ok(None)` when the header is absent and `Err` when it is present
/// but not a bearer token.
fn bearer_token(parts: &Parts) -> Result<Option<String>, AuthRejection> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AuthRejection::Unauthorized)?;
    let (scheme, token) = value.split_once(' ').ok_or(AuthRejection::Unauthorized)?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthRejection::Unauthorized);
    }
    Ok(Some(token.to_string()))
}

async fn resolve(state: &AppState, token: &str) -> Result<Customer, AuthRejection> {
    match state.auth().authenticate(token).await {
        Ok(Some(customer)) => Ok(customer),
        Ok(None) => Err(AuthRejection::Unauthorized),
        Err(e) => {
            tracing::error!("Token lookup failed: {e}");
            Err(AuthRejection::Unavailable)
        }
    }
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(AuthRejection::Unauthorized)?;
        let customer = resolve(state, &token).await?;
        Ok(Self { customer, token })
    }
}

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => Ok(Self(Some(resolve(state, &token).await?))),
            None => Ok(Self(None)),
        }
    }
}
