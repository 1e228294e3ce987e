//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::{AuthService, PaymentService, WebpayClient, WebpayError};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; holds the database pool and the Webpay client.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    webpay: WebpayClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the Webpay HTTP client cannot be built.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, WebpayError> {
        let webpay = WebpayClient::new(&config.webpay)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                webpay,
            }),
        })
    }

    /// Get a reference to the service configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Authentication service over the shared pool.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(&self.inner.pool, self.inner.config.token_ttl)
    }

    /// Payment service over the shared pool and Webpay client.
    #[must_use]
    pub fn payments(&self) -> PaymentService<'_> {
        PaymentService::new(
            &self.inner.pool,
            &self.inner.webpay,
            &self.inner.config.metro_region,
        )
    }
}
