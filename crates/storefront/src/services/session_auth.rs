//! Authentication capability.
//!
//! Everything that needs to know who the visitor is asks a [`SessionAuth`]
//! instead of reading the session or calling the persistence service itself.

use async_trait::async_trait;
use tower_sessions::Session;

use tienda_core::Customer;

use crate::api::{ApiClient, ApiError};
use crate::middleware::clear_current_customer;
use crate::models::{AccessToken, CurrentCustomer, session_keys};

/// Who the visitor is, as far as the persistence service is concerned.
#[async_trait]
pub trait SessionAuth: Send + Sync {
    /// Whether the visitor holds a token the persistence service accepts.
    async fn is_authenticated(&self) -> bool;

    /// The visitor's profile, or `None` for guests.
    async fn current_user(&self) -> Result<Option<Customer>, ApiError>;

    /// The visitor's bearer token, if logged in.
    async fn access_token(&self) -> Option<AccessToken>;
}

/// [`SessionAuth`] backed by the session and the persistence service.
pub struct ApiSessionAuth {
    session: Session,
    api: ApiClient,
}

impl ApiSessionAuth {
    #[must_use]
    pub const fn new(session: Session, api: ApiClient) -> Self {
        Self { session, api }
    }

    async fn current_customer(&self) -> Option<CurrentCustomer> {
        self.session
            .get::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
            .await
            .ok()
            .flatten()
    }

    async fn forget(&self) {
        if let Err(e) = clear_current_customer(&self.session).await {
            tracing::warn!(error = %e, "Failed to clear rejected customer from session");
        }
    }
}

#[async_trait]
impl SessionAuth for ApiSessionAuth {
    async fn is_authenticated(&self) -> bool {
        let Some(token) = self.access_token().await else {
            return false;
        };

        match self.api.verify_token(&token).await {
            Ok(true) => true,
            Ok(false) => {
                tracing::debug!("Stored token rejected, logging customer out");
                self.forget().await;
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token verification failed");
                false
            }
        }
    }

    async fn current_user(&self) -> Result<Option<Customer>, ApiError> {
        let Some(token) = self.access_token().await else {
            return Ok(None);
        };

        match self.api.get_customer(&token).await {
            Ok(customer) => Ok(Some(customer)),
            Err(ApiError::Unauthorized) => {
                self.forget().await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn access_token(&self) -> Option<AccessToken> {
        self.current_customer().await.map(|customer| customer.token)
    }
}
