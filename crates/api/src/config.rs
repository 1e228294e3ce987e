//! Persistence service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `API_DATABASE_URL` - `PostgreSQL` URL (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Where customers land after paying
//!
//! ## Optional
//! - `API_HOST` - Bind address (default: 127.0.0.1)
//! - `API_PORT` - Listen port (default: 3001)
//! - `API_PUBLIC_URL` - URL Webpay redirects back to (default: <http://127.0.0.1:3001>)
//! - `SHIPPING_METRO_REGION` - Region with per-city shipping (default: Metropolitana)
//! - `AUTH_TOKEN_TTL_HOURS` - Bearer token lifetime (default: 168)
//! - `WEBPAY_ENVIRONMENT` - `integration` or `production` (default: integration)
//! - `WEBPAY_COMMERCE_CODE` - Commerce code (default: the public integration code)
//! - `WEBPAY_API_KEY` - API key secret (default: the public integration key)
//! - `WEBPAY_BASE_URL` - Override the gateway host (local testing)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

/// Commerce code Transbank publishes for the integration environment.
const INTEGRATION_COMMERCE_CODE: &str = "597055555532";

/// API key Transbank publishes for the integration environment.
const INTEGRATION_API_KEY: &str = "579B532A7440BB0C9079DED94D31EA1615BACEB56610332264630D42D0A36B1C";

const INTEGRATION_HOST: &str = "https://webpay3gint.transbank.cl";
const PRODUCTION_HOST: &str = "https://webpay3g.transbank.cl";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Persistence service configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public storefront URL, without trailing slash
    pub storefront_url: String,
    /// Public URL of this service, without trailing slash
    pub public_url: String,
    /// Name of the region whose cities have their own shipping methods
    pub metro_region: String,
    /// Lifetime of issued bearer tokens
    pub token_ttl: Duration,
    /// Webpay Plus credentials
    pub webpay: WebpayConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production")
    pub sentry_environment: Option<String>,
}

/// Which Transbank environment transactions go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebpayEnvironment {
    Integration,
    Production,
}

impl std::str::FromStr for WebpayEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "integration" | "test" => Ok(Self::Integration),
            "production" => Ok(Self::Production),
            other => Err(format!("unknown Webpay environment: {other}")),
        }
    }
}

/// Webpay Plus credentials and endpoint.
#[derive(Debug, Clone)]
pub struct WebpayConfig {
    pub environment: WebpayEnvironment,
    pub commerce_code: String,
    pub api_key: SecretString,
    /// Gateway host, without trailing slash
    pub base_url: String,
    /// Timeout applied to every gateway call
    pub timeout: Duration,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if production Webpay is configured with the public integration
    /// credentials.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("API_DATABASE_URL")?;
        let host = parse_env("API_HOST", "127.0.0.1")?;
        let port = parse_env("API_PORT", "3001")?;
        let storefront_url = parse_url("STOREFRONT_BASE_URL", &get_required_env("STOREFRONT_BASE_URL")?)?;
        let public_url = parse_url(
            "API_PUBLIC_URL",
            &get_env_or_default("API_PUBLIC_URL", "http://127.0.0.1:3001"),
        )?;
        let ttl_hours: u64 = parse_env("AUTH_TOKEN_TTL_HOURS", "168")?;

        Ok(Self {
            database_url,
            host,
            port,
            storefront_url,
            public_url,
            metro_region: get_env_or_default("SHIPPING_METRO_REGION", "Metropolitana"),
            token_ttl: Duration::from_secs(ttl_hours * 3600),
            webpay: WebpayConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Where Webpay sends the customer after the payment form.
    #[must_use]
    pub fn webpay_return_url(&self) -> String {
        format!("{}/webpay/return", self.public_url)
    }
}

impl WebpayConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let environment: WebpayEnvironment = parse_env("WEBPAY_ENVIRONMENT", "integration")?;
        let commerce_code = get_env_or_default("WEBPAY_COMMERCE_CODE", INTEGRATION_COMMERCE_CODE);
        let api_key = get_env_or_default("WEBPAY_API_KEY", INTEGRATION_API_KEY);
        validate_webpay_credentials(environment, &commerce_code, &api_key)?;

        let default_host = match environment {
            WebpayEnvironment::Integration => INTEGRATION_HOST,
            WebpayEnvironment::Production => PRODUCTION_HOST,
        };
        let base_url = parse_url(
            "WEBPAY_BASE_URL",
            &get_env_or_default("WEBPAY_BASE_URL", default_host),
        )?;
        let timeout_secs: u64 = parse_env("WEBPAY_TIMEOUT_SECS", "30")?;

        Ok(Self {
            environment,
            commerce_code,
            api_key: SecretString::from(api_key),
            base_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, using `default` when it is unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Check that `value` is an absolute URL and strip its trailing slash.
fn parse_url(key: &str, value: &str) -> Result<String, ConfigError> {
    url::Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    Ok(value.trim_end_matches('/').to_string())
}

/// Database URL with fallback to the generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Production must not run on the published integration credentials.
fn validate_webpay_credentials(
    environment: WebpayEnvironment,
    commerce_code: &str,
    api_key: &str,
) -> Result<(), ConfigError> {
    if environment != WebpayEnvironment::Production {
        return Ok(());
    }
    if commerce_code == INTEGRATION_COMMERCE_CODE {
        return Err(ConfigError::InsecureSecret(
            "WEBPAY_COMMERCE_CODE".to_string(),
            "production cannot use the integration commerce code".to_string(),
        ));
    }
    if api_key == INTEGRATION_API_KEY {
        return Err(ConfigError::InsecureSecret(
            "WEBPAY_API_KEY".to_string(),
            "production cannot use the integration API key".to_string(),
        ));
    }
    Ok(())
}
