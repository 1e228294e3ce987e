//! Checkout driver.
//!
//! [`tienda_core::checkout`] decides which transitions are legal; this
//! module performs the I/O around the two transitions that need it: loading
//! the customer's profile when checkout is entered, and creating the Webpay
//! transaction at the payment step.

use async_trait::async_trait;

use tienda_core::wire::{WebpayCreateRequest, WebpayCreateResponse};
use tienda_core::{
    Cart, Checkout, CheckoutEvent, CheckoutStep, ContactData, Customer, PaymentData,
    TransitionError, transition,
};

use super::session_auth::SessionAuth;
use crate::api::{ApiClient, ApiError};
use crate::models::AccessToken;

/// Errors from checkout operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("checkout backend error: {0}")]
    Api(#[from] ApiError),

    #[error("cannot pay for an empty cart")]
    EmptyCart,
}

/// Creates payments with the gateway behind the persistence service.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment(
        &self,
        token: Option<&AccessToken>,
        request: &WebpayCreateRequest,
    ) -> Result<WebpayCreateResponse, ApiError>;
}

#[async_trait]
impl PaymentGateway for ApiClient {
    async fn create_payment(
        &self,
        token: Option<&AccessToken>,
        request: &WebpayCreateRequest,
    ) -> Result<WebpayCreateResponse, ApiError> {
        self.create_webpay_transaction(token, request).await
    }
}

/// Contact details prefilled from a customer profile.
#[must_use]
pub fn contact_from_profile(customer: &Customer) -> ContactData {
    ContactData {
        email: customer.email.to_string(),
        first_name: customer.first_name.clone(),
        last_name: customer.last_name.clone(),
        phone: customer.phone.clone().unwrap_or_default(),
        rut: customer.rut.clone(),
    }
}

/// Drives a [`Checkout`] through its I/O-bound transitions.
pub struct CheckoutFlow<'a> {
    auth: &'a dyn SessionAuth,
    gateway: &'a dyn PaymentGateway,
}

impl<'a> CheckoutFlow<'a> {
    #[must_use]
    pub const fn new(auth: &'a dyn SessionAuth, gateway: &'a dyn PaymentGateway) -> Self {
        Self { auth, gateway }
    }

    /// Prepare a checkout for display.
    ///
    /// An authenticated visitor at the contact step never sees the contact
    /// form: their profile is fetched and applied as `ProfileLoaded`.
    ///
    /// A `Complete` checkout seen again means the visitor left the Webpay
    /// form without Webpay sending them back. It returns to the payment step
    /// as `PaymentFailed` so they can pay again.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile cannot be fetched.
    pub async fn enter(&self, checkout: Checkout) -> Result<Checkout, CheckoutError> {
        if checkout.is_complete() {
            tracing::info!("Webpay form abandoned, returning to payment step");
            return Ok(transition(checkout, CheckoutEvent::PaymentFailed)?);
        }

        if checkout.step != CheckoutStep::Contact || !self.auth.is_authenticated().await {
            return Ok(checkout);
        }

        match self.auth.current_user().await? {
            Some(customer) => {
                tracing::debug!(customer_id = %customer.id, "Contact step filled from profile");
                Ok(transition(
                    checkout,
                    CheckoutEvent::ProfileLoaded(contact_from_profile(&customer)),
                )?)
            }
            None => Ok(checkout),
        }
    }

    /// Create the payment and move the checkout to `Complete`.
    ///
    /// The caller redirects to the returned checkout's
    /// `data.payment.redirect_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkout is not at the payment step, the cart
    /// is empty, or the gateway rejects the payment.
    pub async fn initiate_payment(
        &self,
        checkout: Checkout,
        cart: &Cart,
    ) -> Result<Checkout, CheckoutError> {
        if checkout.step != CheckoutStep::Payment {
            return Err(TransitionError::InvalidEvent {
                from: checkout.step,
                event: "payment_initiated",
            }
            .into());
        }
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let token = if self.auth.is_authenticated().await {
            self.auth.access_token().await
        } else {
            None
        };

        let request = WebpayCreateRequest {
            cart: cart.clone(),
            checkout: checkout.data.clone(),
        };
        let response = self.gateway.create_payment(token.as_ref(), &request).await?;

        Ok(transition(
            checkout,
            CheckoutEvent::PaymentInitiated(PaymentData {
                redirect_path: response.redirect_path,
            }),
        )?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use tienda_core::{
        AddressData, CartItemMetadata, CityId, ProductId, ShippingData, ShippingMethodId,
        StateId, StepView,
    };

    use super::*;
    use crate::services::fakes::{FakeAuth, FakeGateway};

    fn cart() -> Cart {
        let mut cart = Cart::empty();
        cart.add_item(
            ProductId::new(1),
            CartItemMetadata {
                name: "Café".to_string(),
                slug: "cafe".to_string(),
                unit_price: Decimal::new(5_000, 0),
                image_url: None,
            },
            1,
        )
        .unwrap();
        cart
    }

    fn at_payment() -> Checkout {
        let contact = ContactData {
            email: "ana@example.cl".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Rojas".to_string(),
            phone: "+56912345678".to_string(),
            rut: None,
        };
        let address = AddressData {
            street: "Av. Alemania".to_string(),
            number: "0671".to_string(),
            apartment: None,
            state_id: StateId::new(8),
            city_id: CityId::new(81),
            city_name: "Temuco".to_string(),
        };
        let shipping = ShippingData {
            method_id: ShippingMethodId::new(3),
            name: "Envío nacional".to_string(),
            price: Decimal::new(4_990, 0),
        };

        let checkout = transition(Checkout::new(), CheckoutEvent::ContactSubmitted(contact)).unwrap();
        let checkout = transition(checkout, CheckoutEvent::AddressSubmitted(address)).unwrap();
        transition(checkout, CheckoutEvent::ShippingSelected(shipping)).unwrap()
    }

    #[tokio::test]
    async fn test_authenticated_contact_step_is_skipped() {
        let auth = FakeAuth::customer();
        let gateway = FakeGateway::new();
        let flow = CheckoutFlow::new(&auth, &gateway);

        let checkout = flow.enter(Checkout::new()).await.unwrap();

        assert_eq!(checkout.step, CheckoutStep::Address);
        assert_eq!(checkout.view(CheckoutStep::Contact), StepView::Summary);
        assert_eq!(auth.profile_fetches(), 1);
        let contact = checkout.data.contact.unwrap();
        assert_eq!(contact.email, "cliente@tienda.cl");
        assert_eq!(contact.first_name, "Camila");
    }

    #[tokio::test]
    async fn test_guest_stays_on_contact_step() {
        let auth = FakeAuth::guest();
        let gateway = FakeGateway::new();
        let flow = CheckoutFlow::new(&auth, &gateway);

        let checkout = flow.enter(Checkout::new()).await.unwrap();
        assert_eq!(checkout.step, CheckoutStep::Contact);
        assert_eq!(checkout.view(CheckoutStep::Contact), StepView::Editor);
        assert_eq!(auth.profile_fetches(), 0);
    }

    #[tokio::test]
    async fn test_enter_later_step_does_not_refetch_profile() {
        let auth = FakeAuth::customer();
        let gateway = FakeGateway::new();
        let flow = CheckoutFlow::new(&auth, &gateway);

        let checkout = flow.enter(at_payment()).await.unwrap();
        assert_eq!(checkout.step, CheckoutStep::Payment);
        assert_eq!(auth.profile_fetches(), 0);
    }

    #[tokio::test]
    async fn test_initiate_payment_completes_with_redirect() {
        let auth = FakeAuth::guest();
        let gateway = FakeGateway::new();
        let flow = CheckoutFlow::new(&auth, &gateway);

        let checkout = flow.initiate_payment(at_payment(), &cart()).await.unwrap();

        assert!(checkout.is_complete());
        assert_eq!(
            checkout.data.payment.unwrap().redirect_path,
            "https://webpay3gint.transbank.cl/webpayserver/initTransaction?token_ws=tok-1"
        );
        let sent = gateway.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].cart.quantity, 1);
        assert!(sent[0].checkout.shipping.is_some());
    }

    #[tokio::test]
    async fn test_abandoned_payment_returns_to_payment_step() {
        let auth = FakeAuth::customer();
        let gateway = FakeGateway::new();
        let flow = CheckoutFlow::new(&auth, &gateway);
        let complete = flow.initiate_payment(at_payment(), &cart()).await.unwrap();

        let checkout = flow.enter(complete).await.unwrap();

        assert_eq!(checkout.step, CheckoutStep::Payment);
        assert!(checkout.data.payment.is_none());
        assert!(checkout.data.shipping.is_some());
        assert_eq!(auth.profile_fetches(), 0);

        // Paying again is allowed
        let again = flow.initiate_payment(checkout, &cart()).await.unwrap();
        assert!(again.is_complete());
        assert_eq!(gateway.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_initiate_payment_guards() {
        let auth = FakeAuth::guest();
        let gateway = FakeGateway::new();
        let flow = CheckoutFlow::new(&auth, &gateway);

        let err = flow
            .initiate_payment(Checkout::new(), &cart())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Transition(_)));

        let err = flow
            .initiate_payment(at_payment(), &Cart::empty())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));

        assert!(gateway.requests().is_empty());
    }
}
