//! Authentication route handlers.
//!
//! Handles login, registration and logout against the persistence service.
//! A successful login stores the issued token in the session and merges the
//! guest cart into the customer's persisted cart.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use tienda_core::validation::FieldContext;
use tienda_core::wire::{AuthResponse, RegisterRequest};

use super::forms::{FieldErrors, check, optional};
use crate::api::ApiError;
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_customer, set_current_customer};
use crate::models::{AccessToken, CurrentCustomer, session_keys};
use crate::services::CartReconciler;
use crate::state::AppState;

const BAD_CREDENTIALS: &str = "Correo o contraseña incorrectos.";
const SERVICE_DOWN: &str = "No pudimos completar la solicitud. Inténtalo más tarde.";
const EMAIL_TAKEN: &str = "Ya existe una cuenta con ese correo.";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub rut: String,
}

impl RegisterForm {
    fn trimmed(self) -> Self {
        Self {
            email: self.email.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            rut: self.rut.trim().to_string(),
            ..self
        }
    }

    fn validate(&self) -> Result<RegisterRequest, FieldErrors> {
        check(
            &[
                ("email", &self.email),
                ("password", &self.password),
                ("confirm_password", &self.confirm_password),
                ("first_name", &self.first_name),
                ("last_name", &self.last_name),
                ("phone", &self.phone),
                ("rut", &self.rut),
            ],
            &[
                "email",
                "password",
                "confirm_password",
                "first_name",
                "last_name",
            ],
            &FieldContext::with_password(&self.password),
        )?;

        Ok(RegisterRequest {
            email: self.email.clone(),
            password: self.password.clone(),
            confirm_password: self.confirm_password.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: optional(Some(&self.phone)),
            rut: optional(Some(&self.rut)),
        })
    }

    /// The form as re-rendered: passwords are never echoed back.
    fn redisplay(self) -> Self {
        Self {
            password: String::new(),
            confirm_password: String::new(),
            ..self
        }
    }
}

// =============================================================================
// Query Types
// =============================================================================

/// Login page query parameters.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// Only same-site paths are followed after login.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/account",
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub email: String,
    pub next: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub error: Option<String>,
    pub form: RegisterForm,
    pub errors: FieldErrors,
}

// =============================================================================
// Shared
// =============================================================================

/// Store the customer in the session and merge their guest cart.
///
/// A failed merge is logged and the guest cart kept; the customer is logged
/// in either way.
async fn start_session(
    state: &AppState,
    session: &Session,
    auth: AuthResponse,
) -> Result<(), tower_sessions::session::Error> {
    let token = AccessToken::new(auth.token);
    let current = CurrentCustomer::new(&auth.user, token.clone());

    set_current_customer(session, &current).await?;
    set_sentry_user(&current.id, Some(current.email.as_str()));

    let store = state.cart_store(session);
    let session_auth = state.session_auth(session);
    let carts = CartReconciler::new(&store, &session_auth, state.api(), state.notifier());
    match carts.sync_after_login(&token).await {
        Ok(cart) => tracing::info!(
            customer_id = %current.id,
            cart_quantity = cart.quantity,
            "Customer logged in"
        ),
        Err(e) => tracing::warn!(
            customer_id = %current.id,
            "Guest cart merge failed, retrying on next load: {e}"
        ),
    }

    Ok(())
}

fn session_failed(e: &tower_sessions::session::Error) -> Response {
    tracing::error!("Failed to set session: {e}");
    (StatusCode::INTERNAL_SERVER_ERROR, SERVICE_DOWN).into_response()
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(Query(query): Query<LoginQuery>) -> impl IntoResponse {
    LoginTemplate {
        error: None,
        email: String::new(),
        next: safe_next(query.next.as_deref()).to_string(),
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref()).to_string();

    match state.api().login(form.email.trim(), &form.password).await {
        Ok(auth) => match start_session(&state, &session, auth).await {
            Ok(()) => Redirect::to(&next).into_response(),
            Err(e) => session_failed(&e),
        },
        Err(e) => {
            let error = match &e {
                ApiError::Unauthorized | ApiError::NotFound(_) => BAD_CREDENTIALS,
                ApiError::Status { status, .. } if (400..500).contains(status) => BAD_CREDENTIALS,
                _ => {
                    tracing::warn!("Login failed: {e}");
                    SERVICE_DOWN
                }
            };
            (
                StatusCode::UNAUTHORIZED,
                LoginTemplate {
                    error: Some(error.to_string()),
                    email: form.email,
                    next,
                },
            )
                .into_response()
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page() -> impl IntoResponse {
    RegisterTemplate {
        error: None,
        form: RegisterForm::default(),
        errors: FieldErrors::default(),
    }
}

/// Handle registration form submission.
///
/// Fields are checked with the same validators as the checkout forms; a
/// successful registration logs the customer in.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let form = form.trimmed();
    let request = match form.validate() {
        Ok(request) => request,
        Err(errors) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                RegisterTemplate {
                    error: None,
                    form: form.redisplay(),
                    errors,
                },
            )
                .into_response();
        }
    };

    match state.api().register(&request).await {
        Ok(auth) => match start_session(&state, &session, auth).await {
            Ok(()) => Redirect::to("/account").into_response(),
            Err(e) => session_failed(&e),
        },
        Err(e) => {
            let error = match &e {
                ApiError::Status { status: 409, .. } => EMAIL_TAKEN,
                _ => {
                    tracing::warn!("Registration failed: {e}");
                    SERVICE_DOWN
                }
            };
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                RegisterTemplate {
                    error: Some(error.to_string()),
                    form: form.redisplay(),
                    errors: FieldErrors::default(),
                },
            )
                .into_response()
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
///
/// Revokes the token (best effort), drops the guest cart and destroys the
/// session.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    if let Ok(Some(customer)) = session
        .get::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
        .await
        && let Err(e) = state.api().logout(&customer.token).await
    {
        tracing::warn!("Failed to revoke access token: {e}");
    }

    let store = state.cart_store(&session);
    let auth = state.session_auth(&session);
    let carts = CartReconciler::new(&store, &auth, state.api(), state.notifier());
    if let Err(e) = carts.forget_local().await {
        tracing::error!("Failed to clear guest cart: {e}");
    }

    if let Err(e) = clear_current_customer(&session).await {
        tracing::error!("Failed to clear session: {e}");
    }

    // Also destroy the entire session
    if let Err(e) = session.flush().await {
        tracing::error!("Failed to flush session: {e}");
    }
    clear_sentry_user();

    Redirect::to("/").into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> RegisterForm {
        RegisterForm {
            email: "  nuevo@tienda.cl ".to_string(),
            password: "Abcdefg1".to_string(),
            confirm_password: "Abcdefg1".to_string(),
            first_name: "Tomás".to_string(),
            last_name: "Pérez".to_string(),
            phone: String::new(),
            rut: "12.345.678-5".to_string(),
        }
    }

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/checkout")), "/checkout");
        assert_eq!(safe_next(Some("//evil.example")), "/account");
        assert_eq!(safe_next(Some("https://evil.example")), "/account");
        assert_eq!(safe_next(None), "/account");
    }

    #[test]
    fn test_register_form_builds_request() {
        let request = form().trimmed().validate().unwrap();
        assert_eq!(request.email, "nuevo@tienda.cl");
        assert_eq!(request.phone, None);
        assert_eq!(request.rut.as_deref(), Some("12.345.678-5"));
    }

    #[test]
    fn test_register_form_rejects_weak_or_mismatched_password() {
        let weak = RegisterForm {
            password: "abcdefgh".to_string(),
            confirm_password: "abcdefgh".to_string(),
            ..form()
        };
        assert!(weak.trimmed().validate().unwrap_err().has("password"));

        let mismatch = RegisterForm {
            confirm_password: "Abcdefg2".to_string(),
            ..form()
        };
        let errors = mismatch.trimmed().validate().unwrap_err();
        assert!(errors.has("confirm_password"));
        assert!(!errors.has("password"));
    }

    #[test]
    fn test_redisplay_drops_passwords() {
        let shown = form().redisplay();
        assert!(shown.password.is_empty());
        assert!(shown.confirm_password.is_empty());
        assert_eq!(shown.first_name, "Tomás");
    }
}
