//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use tower_sessions::Session;

use crate::api::{ApiClient, ApiError};
use crate::config::StorefrontConfig;
use crate::services::{ApiSessionAuth, CartNotifier, SessionCartStore};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// session database, the persistence-service client, and the cart notifier.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    api: ApiClient,
    notifier: CartNotifier,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the persistence-service client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config.api)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                api,
                notifier: CartNotifier::new(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the session database pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the persistence-service client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the cart-changed channel.
    #[must_use]
    pub fn notifier(&self) -> &CartNotifier {
        &self.inner.notifier
    }

    /// Authentication capability for one request.
    #[must_use]
    pub fn session_auth(&self, session: &Session) -> ApiSessionAuth {
        ApiSessionAuth::new(session.clone(), self.inner.api.clone())
    }

    /// Guest cart store for one request.
    #[must_use]
    pub fn cart_store(&self, session: &Session) -> SessionCartStore {
        SessionCartStore::new(session.clone())
    }
}
