//! Geography and shipping lookups. Public; no token needed.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use tracing::instrument;

use tienda_core::wire::{CitiesResponse, ShippingMethodsResponse, StatesResponse};
use tienda_core::{CityId, StateId};

use crate::db::GeoRepository;
use crate::error::Result;
use crate::services::ShippingResolver;
use crate::state::AppState;

/// Build the geography router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/state/get-states/", get(states))
        .route("/city/get-cities-by-state/{state_id}", get(cities_by_state))
        .route(
            "/shipping-method/get-shipping-methods/{city_id}",
            get(shipping_methods),
        )
}

async fn states(State(state): State<AppState>) -> Result<Json<StatesResponse>> {
    let states = GeoRepository::new(state.pool()).list_states().await?;
    Ok(Json(StatesResponse { states }))
}

/// Cities of a region in row order. An unknown region has no cities.
#[instrument(skip(state))]
async fn cities_by_state(
    State(state): State<AppState>,
    Path(state_id): Path<StateId>,
) -> Result<Json<CitiesResponse>> {
    let geo = GeoRepository::new(state.pool());
    let cities = ShippingResolver::new(&geo, &state.config().metro_region)
        .fetch_cities_by_state_id(state_id)
        .await?;
    Ok(Json(CitiesResponse { cities }))
}

/// Methods serving a city; 404 for an unknown city, `[]` for one nobody serves.
#[instrument(skip(state))]
async fn shipping_methods(
    State(state): State<AppState>,
    Path(city_id): Path<CityId>,
) -> Result<Json<ShippingMethodsResponse>> {
    let geo = GeoRepository::new(state.pool());
    let shipping_methods = ShippingResolver::new(&geo, &state.config().metro_region)
        .fetch_shipping_methods(city_id)
        .await?;
    Ok(Json(ShippingMethodsResponse { shipping_methods }))
}
