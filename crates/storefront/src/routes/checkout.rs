//! Checkout route handlers.
//!
//! The wizard lives in the session under `"checkout"`. Every POST loads it,
//! applies one [`CheckoutEvent`] and redirects back to `GET /checkout`, which
//! renders each step as an editor, a summary, or a pending placeholder.
//! Forms that fail validation are re-rendered with the failing fields marked
//! and the wizard left where it was.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use tienda_core::validation::FieldContext;
use tienda_core::{
    AddressData, Cart, Checkout, CheckoutEvent, CheckoutStep, City, CityId, ContactData,
    OrderId, ShippingData, ShippingMethodId, StateId, StepView, format_clp, transition,
};

use super::cart::{CartView, load_cart_view};
use super::forms::{FieldErrors, check, optional};
use crate::error::{AppError, Result};
use crate::models::{CurrentCustomer, session_keys};
use crate::services::{CartReconciler, CheckoutError, CheckoutFlow};
use crate::state::AppState;

// =============================================================================
// Session Helpers
// =============================================================================

/// The visitor's checkout, or a fresh one.
async fn load_checkout(session: &Session) -> Checkout {
    session
        .get::<Checkout>(session_keys::CHECKOUT)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Whether a customer is logged in, so the contact step comes from their
/// profile and cannot be edited.
async fn has_customer(session: &Session) -> bool {
    session
        .get::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
        .await
        .ok()
        .flatten()
        .is_some()
}

async fn save_checkout(
    session: &Session,
    checkout: &Checkout,
) -> std::result::Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CHECKOUT, checkout).await
}

/// Forget the checkout (completed payment, logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_checkout(
    session: &Session,
) -> std::result::Result<(), tower_sessions::session::Error> {
    session.remove::<Checkout>(session_keys::CHECKOUT).await?;
    Ok(())
}

/// Apply `event`, store the result and go back to the wizard.
async fn advance(session: &Session, checkout: Checkout, event: CheckoutEvent) -> Result<Response> {
    let checkout = transition(checkout, event).map_err(CheckoutError::from)?;
    save_checkout(session, &checkout).await?;
    tracing::debug!(step = %checkout.step, "Checkout advanced");
    Ok(Redirect::to("/checkout").into_response())
}

// =============================================================================
// Form Values
// =============================================================================

/// Contact form values as typed, for re-rendering.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactValues {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub rut: String,
}

impl ContactValues {
    fn trimmed(self) -> Self {
        Self {
            email: self.email.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            rut: self.rut.trim().to_string(),
        }
    }

    fn validate(&self) -> std::result::Result<ContactData, FieldErrors> {
        check(
            &[
                ("email", &self.email),
                ("first_name", &self.first_name),
                ("last_name", &self.last_name),
                ("phone", &self.phone),
                ("rut", &self.rut),
            ],
            &["email", "first_name", "last_name", "phone"],
            &FieldContext::default(),
        )?;

        Ok(ContactData {
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            rut: optional(Some(&self.rut)),
        })
    }
}

impl From<&ContactData> for ContactValues {
    fn from(contact: &ContactData) -> Self {
        Self {
            email: contact.email.clone(),
            first_name: contact.first_name.clone(),
            last_name: contact.last_name.clone(),
            phone: contact.phone.clone(),
            rut: contact.rut.clone().unwrap_or_default(),
        }
    }
}

/// Address form values as typed, for re-rendering.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressValues {
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
}

impl AddressValues {
    fn trimmed(self) -> Self {
        Self {
            street: self.street.trim().to_string(),
            number: self.number.trim().to_string(),
            apartment: self.apartment.trim().to_string(),
            state_id: self.state_id.trim().to_string(),
            city_id: self.city_id.trim().to_string(),
        }
    }

    fn state(&self) -> Option<StateId> {
        self.state_id.parse().ok()
    }

    fn city(&self) -> Option<CityId> {
        self.city_id.parse().ok()
    }

    /// Check the text fields and the region/city selection.
    ///
    /// `cities` are the cities of the selected region; the chosen city must
    /// be one of them.
    fn validate(&self, cities: &[City]) -> std::result::Result<AddressData, FieldErrors> {
        let fields = check(
            &[
                ("address", &self.street),
                ("address_number", &self.number),
                ("apartment", &self.apartment),
                ("state_id", &self.state_id),
                ("city_id", &self.city_id),
            ],
            &["address", "address_number", "state_id", "city_id"],
            &FieldContext::default(),
        );

        let state_id = self.state();
        let city = self
            .city()
            .and_then(|id| cities.iter().find(|city| city.id == id));

        match (fields, state_id, city) {
            (Ok(()), Some(state_id), Some(city)) => Ok(AddressData {
                street: self.street.clone(),
                number: self.number.clone(),
                apartment: optional(Some(&self.apartment)),
                state_id,
                city_id: city.id,
                city_name: city.name.clone(),
            }),
            (Ok(()), None, _) => Err(FieldErrors::single("state_id")),
            (Ok(()), Some(_), None) => Err(FieldErrors::single("city_id")),
            (Err(errors), _, _) => Err(errors),
        }
    }
}

impl From<&AddressData> for AddressValues {
    fn from(address: &AddressData) -> Self {
        Self {
            street: address.street.clone(),
            number: address.number.clone(),
            apartment: address.apartment.clone().unwrap_or_default(),
            state_id: address.state_id.to_string(),
            city_id: address.city_id.to_string(),
        }
    }
}

/// Shipping form data.
#[derive(Debug, Deserialize)]
pub struct ShippingForm {
    pub method_id: Option<ShippingMethodId>,
}

/// Cities fragment query parameters.
#[derive(Debug, Deserialize)]
pub struct CitiesQuery {
    #[serde(default)]
    pub state_id: String,
}

/// Payment result query parameters, set by the API's Webpay return handler.
#[derive(Debug, Deserialize)]
pub struct ResultQuery {
    pub status: Option<String>,
    pub order: Option<OrderId>,
}

// =============================================================================
// Views and Templates
// =============================================================================

/// One wizard step as rendered.
#[derive(Clone)]
pub struct StepPanel {
    pub step: &'static str,
    pub title: &'static str,
    pub editor: bool,
    pub summary: Vec<String>,
    /// Offer a "change" button.
    pub editable: bool,
}

/// A `<select>` option.
#[derive(Clone)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// A shipping method radio button.
#[derive(Clone)]
pub struct ShippingOptionView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub selected: bool,
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub panels: Vec<StepPanel>,
    pub contact: ContactValues,
    pub address: AddressValues,
    pub states: Vec<OptionView>,
    pub cities: Vec<OptionView>,
    pub shipping_methods: Vec<ShippingOptionView>,
    pub errors: FieldErrors,
    pub cart: CartView,
    pub shipping_price: String,
    pub grand_total: String,
    pub message: Option<String>,
}

/// City `<option>` list fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/city_options.html")]
pub struct CityOptionsTemplate {
    pub cities: Vec<OptionView>,
}

/// Payment result page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/result.html")]
pub struct ResultTemplate {
    pub paid: bool,
    pub message: String,
    pub order: Option<String>,
}

const fn step_title(step: CheckoutStep) -> &'static str {
    match step {
        CheckoutStep::Contact => "Datos de contacto",
        CheckoutStep::Address => "Dirección de despacho",
        CheckoutStep::Shipping => "Método de envío",
        CheckoutStep::Payment | CheckoutStep::Complete => "Pago",
    }
}

fn step_summary(checkout: &Checkout, step: CheckoutStep) -> Vec<String> {
    let data = &checkout.data;
    match step {
        CheckoutStep::Contact => data.contact.as_ref().map_or_else(Vec::new, |c| {
            let mut lines = vec![
                format!("{} {}", c.first_name, c.last_name),
                c.email.clone(),
                c.phone.clone(),
            ];
            lines.extend(c.rut.clone());
            lines
        }),
        CheckoutStep::Address => data.address.as_ref().map_or_else(Vec::new, |a| {
            let street = match &a.apartment {
                Some(apartment) => format!("{} {}, {apartment}", a.street, a.number),
                None => format!("{} {}", a.street, a.number),
            };
            vec![street, a.city_name.clone()]
        }),
        CheckoutStep::Shipping => data
            .shipping
            .as_ref()
            .map_or_else(Vec::new, |s| vec![format!("{} ({})", s.name, format_clp(s.price))]),
        CheckoutStep::Payment | CheckoutStep::Complete => Vec::new(),
    }
}

/// Step panels in wizard order.
#[must_use]
pub fn panels(checkout: &Checkout, contact_locked: bool) -> Vec<StepPanel> {
    CheckoutStep::FORM_STEPS
        .iter()
        .map(|&step| {
            let view = checkout.view(step);
            StepPanel {
                step: step.as_str(),
                title: step_title(step),
                editor: view == StepView::Editor,
                summary: if view == StepView::Summary {
                    step_summary(checkout, step)
                } else {
                    Vec::new()
                },
                editable: view == StepView::Summary
                    && step.is_editable()
                    && !(contact_locked && step == CheckoutStep::Contact),
            }
        })
        .collect()
}

fn city_options(cities: &[City], selected: Option<CityId>) -> Vec<OptionView> {
    cities
        .iter()
        .map(|city| OptionView {
            value: city.id.to_string(),
            label: city.name.clone(),
            selected: Some(city.id) == selected,
        })
        .collect()
}

/// What the visitor just submitted, if it is being re-rendered.
enum Submitted {
    Nothing,
    Contact(ContactValues, FieldErrors),
    Address(AddressValues, FieldErrors),
    Shipping(FieldErrors),
}

/// Build the checkout page, loading only the lists the active step needs.
async fn render(
    state: &AppState,
    checkout: &Checkout,
    cart: &Cart,
    cart_view: CartView,
    submitted: Submitted,
    message: Option<String>,
    contact_locked: bool,
) -> Result<CheckoutTemplate> {
    let data = &checkout.data;
    let (contact, address, errors) = match submitted {
        Submitted::Nothing => (None, None, FieldErrors::default()),
        Submitted::Contact(values, errors) => (Some(values), None, errors),
        Submitted::Address(values, errors) => (None, Some(values), errors),
        Submitted::Shipping(errors) => (None, None, errors),
    };
    let contact = contact
        .or_else(|| data.contact.as_ref().map(ContactValues::from))
        .unwrap_or_default();
    let address = address
        .or_else(|| data.address.as_ref().map(AddressValues::from))
        .unwrap_or_default();

    let mut states = Vec::new();
    let mut cities = Vec::new();
    if checkout.step == CheckoutStep::Address {
        let selected = address.state();
        states = state
            .api()
            .get_states()
            .await?
            .into_iter()
            .map(|s| OptionView {
                value: s.id.to_string(),
                selected: Some(s.id) == selected,
                label: s.name,
            })
            .collect();
        if let Some(state_id) = selected {
            cities = city_options(
                &state.api().get_cities_by_state(state_id).await?,
                address.city(),
            );
        }
    }

    let mut shipping_methods = Vec::new();
    if checkout.step == CheckoutStep::Shipping
        && let Some(destination) = &data.address
    {
        let chosen = data.shipping.as_ref().map(|s| s.method_id);
        shipping_methods = state
            .api()
            .get_shipping_methods(destination.city_id)
            .await?
            .into_iter()
            .map(|m| ShippingOptionView {
                id: m.id.to_string(),
                selected: Some(m.id) == chosen,
                name: m.name,
                description: m.description.unwrap_or_default(),
                price: format_clp(m.price),
            })
            .collect();
    }

    Ok(CheckoutTemplate {
        panels: panels(checkout, contact_locked),
        contact,
        address,
        states,
        cities,
        shipping_methods,
        errors,
        cart: cart_view,
        shipping_price: format_clp(checkout.shipping_price()),
        grand_total: cart
            .total
            .checked_add(checkout.shipping_price())
            .map(format_clp)
            .unwrap_or_default(),
        message,
    })
}

/// Re-render the wizard in place after a rejected submission.
async fn rerender(
    state: &AppState,
    session: &Session,
    checkout: &Checkout,
    submitted: Submitted,
    message: Option<String>,
) -> Result<Response> {
    let (cart, cart_view) = load_cart_view(state, session).await;
    let locked = has_customer(session).await;
    let page = render(state, checkout, &cart, cart_view, submitted, message, locked).await?;
    Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the checkout wizard.
///
/// An empty cart goes back to the cart page. An authenticated visitor at the
/// contact step is moved past it using their profile. A completed checkout
/// seen here was abandoned at Webpay and reopens at the payment step.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Response> {
    let (cart, cart_view) = load_cart_view(&state, &session).await;
    if cart.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    let checkout = load_checkout(&session).await;
    let message = checkout
        .is_complete()
        .then(|| "Tu pago no se completó. Puedes intentarlo nuevamente.".to_string());

    let auth = state.session_auth(&session);
    let flow = CheckoutFlow::new(&auth, state.api());
    let checkout = flow.enter(checkout).await?;
    save_checkout(&session, &checkout).await?;

    let locked = has_customer(&session).await;
    let page = render(
        &state,
        &checkout,
        &cart,
        cart_view,
        Submitted::Nothing,
        message,
        locked,
    )
    .await?;
    Ok(page.into_response())
}

/// Submit the contact step.
#[instrument(skip(state, session, form))]
pub async fn contact(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ContactValues>,
) -> Result<Response> {
    let checkout = load_checkout(&session).await;
    let values = form.trimmed();

    match values.validate() {
        Ok(contact) => advance(&session, checkout, CheckoutEvent::ContactSubmitted(contact)).await,
        Err(errors) => {
            rerender(&state, &session, &checkout, Submitted::Contact(values, errors), None).await
        }
    }
}

/// Submit the address step.
#[instrument(skip(state, session, form))]
pub async fn address(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddressValues>,
) -> Result<Response> {
    let checkout = load_checkout(&session).await;
    let values = form.trimmed();

    let cities = match values.state() {
        Some(state_id) => state.api().get_cities_by_state(state_id).await?,
        None => Vec::new(),
    };

    match values.validate(&cities) {
        Ok(address) => advance(&session, checkout, CheckoutEvent::AddressSubmitted(address)).await,
        Err(errors) => {
            rerender(&state, &session, &checkout, Submitted::Address(values, errors), None).await
        }
    }
}

/// Submit the shipping step.
///
/// The method must be one the API offers for the chosen city; its price is
/// taken from the API, not the form.
#[instrument(skip(state, session))]
pub async fn shipping(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ShippingForm>,
) -> Result<Response> {
    let checkout = load_checkout(&session).await;
    let Some(destination) = checkout.data.address.as_ref() else {
        return Err(CheckoutError::from(tienda_core::TransitionError::InvalidEvent {
            from: checkout.step,
            event: "shipping_selected",
        })
        .into());
    };

    let methods = state.api().get_shipping_methods(destination.city_id).await?;
    let chosen = form
        .method_id
        .and_then(|id| methods.into_iter().find(|method| method.id == id));

    match chosen {
        Some(method) => {
            let shipping = ShippingData {
                method_id: method.id,
                name: method.name,
                price: method.price,
            };
            advance(&session, checkout, CheckoutEvent::ShippingSelected(shipping)).await
        }
        None => {
            let errors = FieldErrors::single("method_id");
            rerender(&state, &session, &checkout, Submitted::Shipping(errors), None).await
        }
    }
}

/// Hand the order off to Webpay.
///
/// Stock is checked first; on success the visitor is redirected to the
/// gateway.
#[instrument(skip(state, session))]
pub async fn payment(State(state): State<AppState>, session: Session) -> Result<Response> {
    let store = state.cart_store(&session);
    let auth = state.session_auth(&session);
    let carts = CartReconciler::new(&store, &auth, state.api(), state.notifier());
    let cart = carts.load().await?;
    let checkout = load_checkout(&session).await;

    if !cart.is_empty() {
        let stock = state.api().check_stock(&cart).await?;
        if !stock.available {
            tracing::info!(shortages = stock.shortages.len(), "Checkout blocked by stock");
            let message = "Algunos productos ya no tienen stock suficiente. Revisa tu carro.";
            return rerender(
                &state,
                &session,
                &checkout,
                Submitted::Nothing,
                Some(message.to_string()),
            )
            .await;
        }
    }

    let flow = CheckoutFlow::new(&auth, state.api());
    let checkout = flow.initiate_payment(checkout, &cart).await?;
    save_checkout(&session, &checkout).await?;

    let redirect = checkout
        .data
        .payment
        .map(|payment| payment.redirect_path)
        .ok_or_else(|| AppError::Internal("payment completed without redirect".to_string()))?;

    tracing::info!(total = %cart.total, "Payment initiated");
    Ok(Redirect::to(&redirect).into_response())
}

/// Go back to an earlier step.
#[instrument(skip(session))]
pub async fn edit(session: Session, Path(step): Path<String>) -> Result<Response> {
    let target = step
        .parse::<CheckoutStep>()
        .map_err(AppError::BadRequest)?;
    if target == CheckoutStep::Contact && has_customer(&session).await {
        return Ok(Redirect::to("/checkout").into_response());
    }
    let checkout = load_checkout(&session).await;
    advance(&session, checkout, CheckoutEvent::Edit(target)).await
}

/// City options for a region (HTMX).
#[instrument(skip(state))]
pub async fn cities(
    State(state): State<AppState>,
    Query(query): Query<CitiesQuery>,
) -> impl IntoResponse {
    let Ok(state_id) = query.state_id.trim().parse::<StateId>() else {
        return CityOptionsTemplate { cities: Vec::new() };
    };

    match state.api().get_cities_by_state(state_id).await {
        Ok(cities) => CityOptionsTemplate {
            cities: city_options(&cities, None),
        },
        Err(e) => {
            tracing::warn!("Failed to load cities for region {state_id}: {e}");
            CityOptionsTemplate { cities: Vec::new() }
        }
    }
}

/// Landing page after Webpay.
///
/// A paid order clears the guest cart and the checkout. Any other outcome
/// returns the checkout to the payment step so the visitor can try again.
#[instrument(skip(state, session))]
pub async fn result(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ResultQuery>,
) -> Result<Response> {
    let status = query.status.as_deref().unwrap_or("failed");
    let paid = status == "paid";

    if paid {
        let store = state.cart_store(&session);
        let auth = state.session_auth(&session);
        let carts = CartReconciler::new(&store, &auth, state.api(), state.notifier());
        carts.forget_local().await?;
        clear_checkout(&session).await?;
        crate::error::add_breadcrumb("checkout", "Payment confirmed", None);
    } else {
        let checkout = load_checkout(&session).await;
        if checkout.is_complete() {
            let checkout = transition(checkout, CheckoutEvent::PaymentFailed)
                .map_err(CheckoutError::from)?;
            save_checkout(&session, &checkout).await?;
        }
        tracing::info!(status, "Payment not completed");
    }

    let message = match status {
        "paid" => "¡Gracias por tu compra! Tu pago fue aprobado.",
        "aborted" => "Cancelaste el pago. Tu carro sigue disponible.",
        _ => "Tu pago fue rechazado. Puedes intentarlo nuevamente.",
    };

    Ok(ResultTemplate {
        paid,
        message: message.to_string(),
        order: query.order.map(|id| id.to_string()),
    }
    .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use tienda_core::PaymentData;

    use super::*;

    fn contact_values() -> ContactValues {
        ContactValues {
            email: " ana@example.cl ".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Rojas".to_string(),
            phone: "+56 9 1234 5678".to_string(),
            rut: String::new(),
        }
    }

    fn cities() -> Vec<City> {
        vec![
            City {
                id: CityId::new(81),
                name: "Temuco".to_string(),
                state_id: StateId::new(8),
            },
            City {
                id: CityId::new(82),
                name: "Villarrica".to_string(),
                state_id: StateId::new(8),
            },
        ]
    }

    fn address_data() -> AddressData {
        AddressData {
            street: "Av. Alemania".to_string(),
            number: "0671".to_string(),
            apartment: None,
            state_id: StateId::new(8),
            city_id: CityId::new(81),
            city_name: "Temuco".to_string(),
        }
    }

    #[test]
    fn test_contact_values_validate() {
        let contact = contact_values().trimmed().validate().unwrap();
        assert_eq!(contact.email, "ana@example.cl");
        assert_eq!(contact.rut, None);

        let mut values = contact_values().trimmed();
        values.phone = "12345".to_string();
        let errors = values.validate().unwrap_err();
        assert!(errors.has("phone"));
    }

    #[test]
    fn test_address_requires_city_of_selected_region() {
        let values = AddressValues {
            street: "Av. Alemania".to_string(),
            number: "0671".to_string(),
            apartment: String::new(),
            state_id: "8".to_string(),
            city_id: "82".to_string(),
        };
        let address = values.validate(&cities()).unwrap();
        assert_eq!(address.city_name, "Villarrica");
        assert_eq!(address.apartment, None);

        let elsewhere = AddressValues {
            city_id: "131".to_string(),
            ..values.clone()
        };
        assert_eq!(
            elsewhere.validate(&cities()).unwrap_err(),
            FieldErrors::single("city_id")
        );

        let blank = AddressValues {
            street: String::new(),
            ..values
        };
        assert!(blank.validate(&cities()).unwrap_err().has("address"));
    }

    #[test]
    fn test_panels_follow_step_views() {
        let checkout = transition(
            Checkout::new(),
            CheckoutEvent::ContactSubmitted(contact_values().trimmed().validate().unwrap()),
        )
        .unwrap();

        let panels = panels(&checkout, false);
        assert_eq!(panels.len(), 4);
        assert_eq!(panels[0].step, "contact");
        assert!(!panels[0].editor);
        assert!(panels[0].editable);
        assert_eq!(panels[0].summary[0], "Ana Rojas");
        assert!(panels[1].editor);
        assert!(panels[2].summary.is_empty());
        assert!(!panels[3].editor);
    }

    #[test]
    fn test_profile_contact_summary_is_not_editable() {
        let checkout = transition(
            Checkout::new(),
            CheckoutEvent::ProfileLoaded(contact_values().trimmed().validate().unwrap()),
        )
        .unwrap();
        let checkout = transition(checkout, CheckoutEvent::AddressSubmitted(address_data()))
            .unwrap();

        let panels = panels(&checkout, true);
        assert_eq!(panels[0].step, "contact");
        assert!(!panels[0].summary.is_empty());
        assert!(!panels[0].editable);
        assert_eq!(panels[1].step, "address");
        assert!(panels[1].editable);

        let guest = super::panels(&checkout, false);
        assert!(guest[0].editable);
    }

    #[test]
    fn test_shipping_summary_shows_price() {
        let mut checkout = Checkout::new();
        checkout.step = CheckoutStep::Payment;
        checkout.data.shipping = Some(ShippingData {
            method_id: ShippingMethodId::new(2),
            name: "Despacho express".to_string(),
            price: Decimal::new(3_990, 0),
        });
        checkout.data.payment = Some(PaymentData {
            redirect_path: String::new(),
        });

        assert_eq!(
            step_summary(&checkout, CheckoutStep::Shipping),
            vec!["Despacho express ($3.990)".to_string()]
        );
        assert!(step_summary(&checkout, CheckoutStep::Payment).is_empty());
    }

    #[test]
    fn test_city_options_mark_selection() {
        let options = city_options(&cities(), Some(CityId::new(81)));
        assert_eq!(options[0].label, "Temuco");
        assert!(options[0].selected);
        assert!(!options[1].selected);
    }
}
