//! Account route handlers.
//!
//! All routes require an authenticated customer. A token the API no longer
//! accepts logs the customer out and sends them to the login page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use tienda_core::validation::FieldContext;
use tienda_core::wire::AddressRequest;
use tienda_core::{Address, AddressId, CityId, StateId};

use super::forms::{FieldErrors, check, optional};
use crate::api::ApiError;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, clear_current_customer};
use crate::models::CurrentCustomer;
use crate::state::AppState;

// =============================================================================
// Views and Templates
// =============================================================================

/// Saved address display data for templates.
#[derive(Clone)]
pub struct AddressView {
    pub id: AddressId,
    pub line: String,
    pub city_name: String,
    pub is_default: bool,
}

impl From<&Address> for AddressView {
    fn from(address: &Address) -> Self {
        let line = match &address.apartment {
            Some(apartment) => format!("{} {}, {apartment}", address.street, address.number),
            None => format!("{} {}", address.street, address.number),
        };
        Self {
            id: address.id,
            line,
            city_name: address.city_name.clone(),
            is_default: address.is_default,
        }
    }
}

/// A region option for the new-address form.
#[derive(Clone)]
pub struct RegionOption {
    pub value: String,
    pub label: String,
}

/// New address form data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressForm {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub apartment: String,
    #[serde(default)]
    pub state_id: String,
    #[serde(default)]
    pub city_id: String,
    pub is_default: Option<String>,
}

impl AddressForm {
    fn validate(&self) -> std::result::Result<AddressRequest, FieldErrors> {
        let street = self.street.trim();
        let number = self.number.trim();
        let apartment = self.apartment.trim();
        check(
            &[
                ("address", street),
                ("address_number", number),
                ("apartment", apartment),
                ("state_id", self.state_id.trim()),
                ("city_id", self.city_id.trim()),
            ],
            &["address", "address_number", "state_id", "city_id"],
            &FieldContext::default(),
        )?;

        if self.state_id.trim().parse::<StateId>().is_err() {
            return Err(FieldErrors::single("state_id"));
        }
        let city_id = self
            .city_id
            .trim()
            .parse::<CityId>()
            .map_err(|_| FieldErrors::single("city_id"))?;

        Ok(AddressRequest {
            street: street.to_string(),
            number: number.to_string(),
            apartment: optional(Some(apartment)),
            city_id,
            is_default: self.is_default.is_some(),
        })
    }
}

/// Account overview template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountTemplate {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub rut: Option<String>,
}

/// Address book template.
#[derive(Template, WebTemplate)]
#[template(path = "account/addresses.html")]
pub struct AddressesTemplate {
    pub addresses: Vec<AddressView>,
    pub states: Vec<RegionOption>,
    pub form: AddressForm,
    pub errors: FieldErrors,
}

/// Log out a customer whose token was rejected.
async fn expired(session: &Session) -> Response {
    if let Err(e) = clear_current_customer(session).await {
        tracing::error!("Failed to clear session: {e}");
    }
    Redirect::to("/auth/login?next=/account").into_response()
}

async fn region_options(state: &AppState) -> Vec<RegionOption> {
    match state.api().get_states().await {
        Ok(states) => states
            .into_iter()
            .map(|s| RegionOption {
                value: s.id.to_string(),
                label: s.name,
            })
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to load regions: {e}");
            Vec::new()
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Account overview.
#[instrument(skip(state, session, customer))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
) -> Result<Response> {
    match state.api().get_customer(&customer.token).await {
        Ok(profile) => Ok(AccountTemplate {
            full_name: profile.full_name(),
            email: profile.email.to_string(),
            phone: profile.phone,
            rut: profile.rut,
        }
        .into_response()),
        Err(ApiError::Unauthorized) => Ok(expired(&session).await),
        Err(e) => Err(e.into()),
    }
}

/// Address book.
#[instrument(skip(state, session, customer))]
pub async fn addresses(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
) -> Result<Response> {
    let addresses = match state.api().get_addresses(&customer.token).await {
        Ok(addresses) => addresses,
        Err(ApiError::Unauthorized) => return Ok(expired(&session).await),
        Err(e) => return Err(e.into()),
    };

    Ok(AddressesTemplate {
        addresses: addresses.iter().map(AddressView::from).collect(),
        states: region_options(&state).await,
        form: AddressForm::default(),
        errors: FieldErrors::default(),
    }
    .into_response())
}

/// Re-render the address book with the submitted form.
async fn rerender(
    state: &AppState,
    customer: &CurrentCustomer,
    form: AddressForm,
    errors: FieldErrors,
) -> Result<Response> {
    let addresses = state.api().get_addresses(&customer.token).await?;
    let page = AddressesTemplate {
        addresses: addresses.iter().map(AddressView::from).collect(),
        states: region_options(state).await,
        form,
        errors,
    };
    Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
}

/// Save a new address.
#[instrument(skip(state, session, customer, form))]
pub async fn create_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    Form(form): Form<AddressForm>,
) -> Result<Response> {
    let request = match form.validate() {
        Ok(request) => request,
        Err(errors) => return rerender(&state, &customer, form, errors).await,
    };

    match state.api().create_address(&customer.token, &request).await {
        Ok(address) => {
            tracing::info!(address_id = %address.id, "Address saved");
            Ok(Redirect::to("/account/addresses").into_response())
        }
        Err(ApiError::Unauthorized) => Ok(expired(&session).await),
        Err(ApiError::NotFound(_)) => {
            let errors = FieldErrors::single("city_id");
            rerender(&state, &customer, form, errors).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete a saved address.
#[instrument(skip(state, session, customer))]
pub async fn delete_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<Response> {
    match state.api().delete_address(&customer.token, id).await {
        Ok(()) => {
            tracing::info!(address_id = %id, "Address deleted");
            Ok(Redirect::to("/account/addresses").into_response())
        }
        Err(ApiError::Unauthorized) => Ok(expired(&session).await),
        Err(ApiError::NotFound(_)) => Err(AppError::NotFound(format!("address {id}"))),
        Err(e) => Err(e.into()),
    }
}
