//! Webpay Plus REST client (Transbank API v1.2).
//!
//! Two calls are used:
//!
//! - `POST /rswebpaytransaction/api/webpay/v1.2/transactions` creates a
//!   transaction and returns the form URL and token the customer is sent to
//! - `PUT /rswebpaytransaction/api/webpay/v1.2/transactions/{token}` commits
//!   it once the customer comes back
//!
//! Every request carries the `Tbk-Api-Key-Id` (commerce code) and
//! `Tbk-Api-Key-Secret` headers.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::config::WebpayConfig;

const TRANSACTIONS_PATH: &str = "/rswebpaytransaction/api/webpay/v1.2/transactions";

/// Errors from the Webpay gateway.
#[derive(Debug, Error)]
pub enum WebpayError {
    /// Transport failure (connection refused, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway answered with a non-success status.
    #[error("Webpay returned {status}: {message}")]
    Gateway { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct CreateTransactionRequest<'a> {
    buy_order: &'a str,
    session_id: &'a str,
    amount: u64,
    return_url: &'a str,
}

/// A created transaction: where to send the customer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedTransaction {
    pub token: String,
    pub url: String,
}

impl CreatedTransaction {
    /// The payment form URL with the token attached.
    #[must_use]
    pub fn redirect_url(&self) -> String {
        format!("{}?token_ws={}", self.url, self.token)
    }
}

/// Result of committing a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommittedTransaction {
    pub status: String,
    pub response_code: Option<i32>,
    pub buy_order: Option<String>,
    pub authorization_code: Option<String>,
    pub amount: Option<u64>,
}

impl CommittedTransaction {
    /// Whether the issuer approved the payment.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.status == "AUTHORIZED" && self.response_code == Some(0)
    }
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    error_message: String,
}

/// Client for Webpay Plus.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct WebpayClient {
    inner: Arc<WebpayClientInner>,
}

struct WebpayClientInner {
    client: reqwest::Client,
    base_url: String,
    commerce_code: String,
    api_key: SecretString,
}

impl WebpayClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &WebpayConfig) -> Result<Self, WebpayError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            inner: Arc::new(WebpayClientInner {
                client,
                base_url: config.base_url.clone(),
                commerce_code: config.commerce_code.clone(),
                api_key: config.api_key.clone(),
            }),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.inner
            .client
            .request(method, format!("{}{path}", self.inner.base_url))
            .header("Tbk-Api-Key-Id", &self.inner.commerce_code)
            .header("Tbk-Api-Key-Secret", self.inner.api_key.expose_secret())
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, WebpayError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<GatewayErrorBody>(&body)
                .map_or_else(|_| body.chars().take(200).collect(), |e| e.error_message);
            tracing::warn!(status = %status, message = %message, "Webpay returned an error");
            return Err(WebpayError::Gateway {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Create a transaction for `amount` whole pesos.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway rejects the request or is unreachable.
    #[instrument(skip(self, return_url))]
    pub async fn create_transaction(
        &self,
        buy_order: &str,
        session_id: &str,
        amount: u64,
        return_url: &str,
    ) -> Result<CreatedTransaction, WebpayError> {
        let body = CreateTransactionRequest {
            buy_order,
            session_id,
            amount,
            return_url,
        };
        self.send(self.request(Method::POST, TRANSACTIONS_PATH).json(&body))
            .await
    }

    /// Commit a transaction after the customer returns from the form.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway rejects the commit or is unreachable.
    #[instrument(skip(self, token))]
    pub async fn commit_transaction(&self, token: &str) -> Result<CommittedTransaction, WebpayError> {
        self.send(self.request(Method::PUT, &format!("{TRANSACTIONS_PATH}/{token}")))
            .await
    }
}
