//! Checkout wizard state machine.
//!
//! Checkout is a linear sequence of steps:
//!
//! ```text
//! Contact -> Address -> Shipping -> Payment -> Complete
//! ```
//!
//! [`transition`] is the only way to move between steps. It is a pure
//! function: it takes the current [`Checkout`] and an event and returns the
//! next [`Checkout`] or a [`TransitionError`]. Handlers persist the result in
//! the session; nothing here performs I/O.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CityId, ShippingMethodId, StateId};

// =============================================================================
// Steps
// =============================================================================

/// A step of the checkout wizard, in wizard order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    Contact,
    Address,
    Shipping,
    Payment,
    Complete,
}

impl CheckoutStep {
    /// The steps that render a form, in order.
    pub const FORM_STEPS: [Self; 4] = [Self::Contact, Self::Address, Self::Shipping, Self::Payment];

    /// Whether a customer may jump back to this step to change it.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Contact | Self::Address | Self::Shipping)
    }

    /// Stable identifier used in URLs and element ids.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::Address => "address",
            Self::Shipping => "shipping",
            Self::Payment => "payment",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CheckoutStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contact" => Ok(Self::Contact),
            "address" => Ok(Self::Address),
            "shipping" => Ok(Self::Shipping),
            "payment" => Ok(Self::Payment),
            "complete" => Ok(Self::Complete),
            _ => Err(format!("invalid checkout step: {s}")),
        }
    }
}

/// How a step should be rendered given the active step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepView {
    /// The step is active; render its form.
    Editor,
    /// A later step is active and this step has data; render a summary.
    Summary,
    /// Not reached yet.
    Pending,
}

// =============================================================================
// Step data
// =============================================================================

/// Contact details, from the form or the customer's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactData {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    #[serde(default)]
    pub rut: Option<String>,
}

/// Delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressData {
    pub street: String,
    pub number: String,
    #[serde(default)]
    pub apartment: Option<String>,
    pub state_id: StateId,
    pub city_id: CityId,
    pub city_name: String,
}

/// The chosen shipping method, priced at selection time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingData {
    pub method_id: ShippingMethodId,
    pub name: String,
    pub price: Decimal,
}

/// Where to send the customer to pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentData {
    pub redirect_path: String,
}

/// Data collected so far, one slot per form step.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutData {
    pub contact: Option<ContactData>,
    pub address: Option<AddressData>,
    pub shipping: Option<ShippingData>,
    pub payment: Option<PaymentData>,
}

impl CheckoutData {
    /// Whether the slot for `step` is filled.
    #[must_use]
    pub const fn has(&self, step: CheckoutStep) -> bool {
        match step {
            CheckoutStep::Contact => self.contact.is_some(),
            CheckoutStep::Address => self.address.is_some(),
            CheckoutStep::Shipping => self.shipping.is_some(),
            CheckoutStep::Payment => self.payment.is_some(),
            CheckoutStep::Complete => false,
        }
    }
}

// =============================================================================
// Machine
// =============================================================================

/// The wizard: active step plus collected data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    pub step: CheckoutStep,
    #[serde(default)]
    pub data: CheckoutData,
}

impl Default for Checkout {
    fn default() -> Self {
        Self::new()
    }
}

impl Checkout {
    /// A fresh checkout at the contact step.
    #[must_use]
    pub fn new() -> Self {
        Self {
            step: CheckoutStep::Contact,
            data: CheckoutData::default(),
        }
    }

    /// How `step` renders right now.
    #[must_use]
    pub fn view(&self, step: CheckoutStep) -> StepView {
        if step == self.step {
            StepView::Editor
        } else if self.step > step && self.data.has(step) {
            StepView::Summary
        } else {
            StepView::Pending
        }
    }

    /// Whether payment has been handed off to the gateway.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.step == CheckoutStep::Complete
    }

    /// Shipping price chosen so far, zero if none.
    #[must_use]
    pub fn shipping_price(&self) -> Decimal {
        self.data
            .shipping
            .as_ref()
            .map_or(Decimal::ZERO, |shipping| shipping.price)
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutEvent {
    /// The contact form was submitted.
    ContactSubmitted(ContactData),
    /// The contact step was satisfied from an authenticated profile.
    ProfileLoaded(ContactData),
    AddressSubmitted(AddressData),
    ShippingSelected(ShippingData),
    /// The gateway returned a redirect target.
    PaymentInitiated(PaymentData),
    /// The gateway declined or the customer aborted; pay again.
    PaymentFailed,
    /// Jump back to an earlier step to change it.
    Edit(CheckoutStep),
}

impl CheckoutEvent {
    const fn name(&self) -> &'static str {
        match self {
            Self::ContactSubmitted(_) => "contact_submitted",
            Self::ProfileLoaded(_) => "profile_loaded",
            Self::AddressSubmitted(_) => "address_submitted",
            Self::ShippingSelected(_) => "shipping_selected",
            Self::PaymentInitiated(_) => "payment_initiated",
            Self::PaymentFailed => "payment_failed",
            Self::Edit(_) => "edit",
        }
    }
}

/// Rejected transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("event {event} is not valid in step {from}")]
    InvalidEvent {
        from: CheckoutStep,
        event: &'static str,
    },
    #[error("cannot edit step {target} from step {from}")]
    NotEditable {
        from: CheckoutStep,
        target: CheckoutStep,
    },
}

/// Apply `event` to `checkout`.
///
/// Editing an earlier step keeps the collected data so the form is prefilled,
/// but drops any payment target since the order details may change. Submitting
/// an address for a different city drops the shipping choice, because methods
/// are resolved per city.
///
/// # Errors
///
/// Returns [`TransitionError`] when the event does not apply to the current
/// step.
pub fn transition(mut checkout: Checkout, event: CheckoutEvent) -> Result<Checkout, TransitionError> {
    use CheckoutStep as S;

    let from = checkout.step;
    let invalid = |event: &CheckoutEvent| TransitionError::InvalidEvent {
        from,
        event: event.name(),
    };

    match (from, event) {
        (S::Contact, CheckoutEvent::ContactSubmitted(contact) | CheckoutEvent::ProfileLoaded(contact)) => {
            checkout.data.contact = Some(contact);
            checkout.step = S::Address;
        }
        (S::Address, CheckoutEvent::AddressSubmitted(address)) => {
            let city_changed = checkout
                .data
                .address
                .as_ref()
                .is_some_and(|previous| previous.city_id != address.city_id);
            if city_changed {
                checkout.data.shipping = None;
            }
            checkout.data.address = Some(address);
            checkout.step = S::Shipping;
        }
        (S::Shipping, CheckoutEvent::ShippingSelected(shipping)) => {
            checkout.data.shipping = Some(shipping);
            checkout.step = S::Payment;
        }
        (S::Payment, CheckoutEvent::PaymentInitiated(payment)) => {
            checkout.data.payment = Some(payment);
            checkout.step = S::Complete;
        }
        (S::Complete, CheckoutEvent::PaymentFailed) => {
            checkout.data.payment = None;
            checkout.step = S::Payment;
        }
        (_, CheckoutEvent::Edit(target)) => {
            if !target.is_editable() || from == S::Complete || target >= from {
                return Err(TransitionError::NotEditable { from, target });
            }
            checkout.data.payment = None;
            checkout.step = target;
        }
        (_, event) => return Err(invalid(&event)),
    }

    Ok(checkout)
}
