//! Customer profile and saved-address handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use tracing::instrument;

use tienda_core::AddressId;
use tienda_core::validation::{FieldContext, invalid_fields};
use tienda_core::wire::{AddressRequest, AddressResponse, AddressesResponse, CustomerResponse};

use crate::db::{AddressRepository, GeoRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::state::AppState;

/// Build the customer router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/customer", get(profile))
        .route("/customer/address", get(list_addresses).post(create_address))
        .route(
            "/customer/address/{id}",
            put(update_address).delete(delete_address),
        )
}

async fn profile(user: RequireUser) -> Json<CustomerResponse> {
    Json(CustomerResponse {
        user: user.customer,
    })
}

#[instrument(skip(state, user), fields(user_id = %user.customer.id))]
async fn list_addresses(
    State(state): State<AppState>,
    user: RequireUser,
) -> Result<Json<AddressesResponse>> {
    let addresses = AddressRepository::new(state.pool())
        .list(user.customer.id)
        .await?;
    Ok(Json(AddressesResponse { addresses }))
}

#[instrument(skip(state, user, body), fields(user_id = %user.customer.id))]
async fn create_address(
    State(state): State<AppState>,
    user: RequireUser,
    Json(body): Json<AddressRequest>,
) -> Result<(StatusCode, Json<AddressResponse>)> {
    check_address(&state, &body).await?;
    let address = AddressRepository::new(state.pool())
        .create(user.customer.id, &body)
        .await?;
    Ok((StatusCode::CREATED, Json(AddressResponse { address })))
}

#[instrument(skip(state, user, body), fields(user_id = %user.customer.id))]
async fn update_address(
    State(state): State<AppState>,
    user: RequireUser,
    Path(id): Path<AddressId>,
    Json(body): Json<AddressRequest>,
) -> Result<Json<AddressResponse>> {
    check_address(&state, &body).await?;
    let address = AddressRepository::new(state.pool())
        .update(user.customer.id, id, &body)
        .await?;
    Ok(Json(AddressResponse { address }))
}

#[instrument(skip(state, user), fields(user_id = %user.customer.id))]
async fn delete_address(
    State(state): State<AppState>,
    user: RequireUser,
    Path(id): Path<AddressId>,
) -> Result<StatusCode> {
    AddressRepository::new(state.pool())
        .delete(user.customer.id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reject malformed fields and unknown cities before touching the table.
async fn check_address(state: &AppState, body: &AddressRequest) -> Result<()> {
    let apartment = body.apartment.as_deref().unwrap_or_default();
    let mut fields = vec![("address", body.street.as_str()), ("address_number", body.number.as_str())];
    if !apartment.trim().is_empty() {
        fields.push(("apartment", apartment));
    }

    let invalid = invalid_fields(&fields, &FieldContext::default());
    if !invalid.is_empty() {
        return Err(AppError::BadRequest(format!(
            "invalid fields: {}",
            invalid.join(", ")
        )));
    }

    GeoRepository::new(state.pool())
        .get_city(body.city_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("city {}", body.city_id)))?;
    Ok(())
}
