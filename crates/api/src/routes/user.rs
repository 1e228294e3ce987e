//! Account route handlers: token check, login, registration, logout.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::{get, post},
};
use tracing::instrument;

use tienda_core::wire::{AuthResponse, LoginRequest, RegisterRequest, VerifyTokenResponse};

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::state::AppState;

/// Build the user router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/verify-token", get(verify_token))
        .route("/user/login", post(login))
        .route("/user/register", post(register))
        .route("/user/logout", post(logout))
}

/// Whether the bearer token still resolves to a customer.
///
/// Always 200; a missing or stale token answers `false`.
async fn verify_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<VerifyTokenResponse>> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    let is_authenticated = match token {
        Some(token) => state.auth().authenticate(token).await?.is_some(),
        None => false,
    };
    Ok(Json(VerifyTokenResponse { is_authenticated }))
}

#[instrument(skip(state, body), fields(email = %body.email))]
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let (user, token) = state.auth().login(&body.email, &body.password).await?;
    tracing::info!(user_id = %user.id, "Customer logged in");
    Ok(Json(AuthResponse { token, user }))
}

#[instrument(skip(state, body), fields(email = %body.email))]
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let (user, token) = state.auth().register(&body).await?;
    tracing::info!(user_id = %user.id, "Customer registered");
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

#[instrument(skip(state, user), fields(user_id = %user.customer.id))]
async fn logout(State(state): State<AppState>, user: RequireUser) -> Result<StatusCode> {
    state.auth().logout(&user.token).await?;
    Ok(StatusCode::NO_CONTENT)
}
