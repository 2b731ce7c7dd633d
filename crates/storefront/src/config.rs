//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (`https://` enables secure cookies)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_LOGIN_URL` - Where shoppers re-authenticate after a 401 (default: /login)
//! - `ORDER_SERVICE_URL` - Order backend REST base URL (default: <http://localhost:8080/api>)
//! - `ORDER_SERVICE_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `STOREFRONT_DELIVERY_FEE` - Flat delivery fee (default: 5.00)
//! - `STOREFRONT_TAX_RATE` - Tax as a fraction of the subtotal (default: 0.10)
//! - `STOREFRONT_CURRENCY` - Currency code (default: INR)
//! - `CHECKOUT_PAYMENT_TIMEOUT_SECS` - Idle period before an unanswered payment
//!   fails; `0` waits indefinitely (default: 900)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;
use url::Url;

use food_order_core::CurrencyCode;

use crate::pricing::PricingConfig;

/// Default payment idle timeout (15 minutes).
pub const DEFAULT_PAYMENT_TIMEOUT_SECS: u64 = 900;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Re-authentication redirect target
    pub login_url: String,
    /// Order backend configuration
    pub order_service: OrderServiceConfig,
    /// Delivery fee, tax rate and currency
    pub pricing: PricingConfig,
    /// How long an open payment may go unanswered; `None` waits indefinitely
    pub payment_timeout: Option<Duration>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Order backend configuration.
#[derive(Debug, Clone)]
pub struct OrderServiceConfig {
    /// REST base URL, e.g. `http://localhost:8080/api`
    pub base_url: Url,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_parsed_or_default("STOREFRONT_HOST", "127.0.0.1")?;
        let port = get_parsed_or_default("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;
        let login_url = get_env_or_default("STOREFRONT_LOGIN_URL", "/login");

        let order_service = OrderServiceConfig::from_env()?;
        let pricing = pricing_from_env()?;

        let timeout_secs: u64 = get_parsed_or_default(
            "CHECKOUT_PAYMENT_TIMEOUT_SECS",
            &DEFAULT_PAYMENT_TIMEOUT_SECS.to_string(),
        )?;
        let payment_timeout = payment_timeout(timeout_secs);

        Ok(Self {
            host,
            port,
            base_url,
            login_url,
            order_service,
            pricing,
            payment_timeout,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_parsed_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: get_parsed_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies should carry the `Secure` flag.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl OrderServiceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: get_parsed_or_default("ORDER_SERVICE_URL", "http://localhost:8080/api")?,
            timeout_secs: get_parsed_or_default("ORDER_SERVICE_TIMEOUT_SECS", "30")?,
        })
    }
}

fn pricing_from_env() -> Result<PricingConfig, ConfigError> {
    let delivery_fee: Decimal = get_parsed_or_default("STOREFRONT_DELIVERY_FEE", "5.00")?;
    let tax_rate: Decimal = get_parsed_or_default("STOREFRONT_TAX_RATE", "0.10")?;
    let currency: CurrencyCode = get_parsed_or_default("STOREFRONT_CURRENCY", "INR")?;

    if delivery_fee.is_sign_negative() {
        return Err(ConfigError::InvalidEnvVar(
            "STOREFRONT_DELIVERY_FEE".to_string(),
            "must not be negative".to_string(),
        ));
    }
    if tax_rate.is_sign_negative() || tax_rate > Decimal::ONE {
        return Err(ConfigError::InvalidEnvVar(
            "STOREFRONT_TAX_RATE".to_string(),
            "must be a fraction between 0 and 1".to_string(),
        ));
    }

    Ok(PricingConfig {
        delivery_fee,
        tax_rate,
        currency,
    })
}

/// `0` disables the payment timer.
const fn payment_timeout(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable (or its default) parsed into `T`.
fn get_parsed_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    parse_var(key, &get_env_or_default(key, default))
}

/// Parse a raw value, naming the variable in the error.
fn parse_var<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
