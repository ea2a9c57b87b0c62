//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SOLEMATE_API_URL` - Base URL of the commerce backend (e.g. `https://api.solemate.shop/api`)
//!
//! ## Optional
//! - `SOLEMATE_API_TOKEN` - Bearer token sent with every backend request
//! - `SOLEMATE_FREE_SHIPPING_THRESHOLD` - Subtotal above which shipping is free (default: 500)
//! - `SOLEMATE_FLAT_SHIPPING_FEE` - Shipping fee below the threshold (default: 50)
//! - `SOLEMATE_CURRENCY` - Display currency (default: INR)
//! - `SOLEMATE_PRODUCT_CACHE_TTL_SECS` - Product cache TTL (default: 300)
//! - `SOLEMATE_REQUEST_TIMEOUT_SECS` - Backend request timeout (default: 15)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `LOG_FORMAT` - `pretty` or `json` (default: pretty)

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use solemate_core::{CurrencyCode, ShippingRule};
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected 'pretty' or 'json', got '{other}'")),
        }
    }
}

/// Storefront configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Backend base URL
    pub api_url: Url,
    /// Bearer token for backend requests
    pub api_token: Option<SecretString>,
    /// Free-shipping threshold and flat fee
    pub shipping: ShippingRule,
    /// Display currency
    pub currency: CurrencyCode,
    /// Product cache time-to-live
    pub product_cache_ttl: Duration,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Log output format
    pub log_format: LogFormat,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("shipping", &self.shipping)
            .field("currency", &self.currency)
            .field("product_cache_ttl", &self.product_cache_ttl)
            .field("request_timeout", &self.request_timeout)
            .field("sentry_dsn", &self.sentry_dsn)
            .field("sentry_environment", &self.sentry_environment)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or any value
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);

        let api_url = parse_api_url(&env.required("SOLEMATE_API_URL")?)?;
        let api_token = env
            .optional("SOLEMATE_API_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from);

        let defaults = ShippingRule::default();
        let shipping = ShippingRule::new(
            env.parsed_or("SOLEMATE_FREE_SHIPPING_THRESHOLD", defaults.free_threshold)?,
            env.parsed_or("SOLEMATE_FLAT_SHIPPING_FEE", defaults.flat_fee)?,
        );
        if shipping.free_threshold.is_sign_negative() || shipping.flat_fee.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "SOLEMATE_FLAT_SHIPPING_FEE".to_string(),
                "shipping amounts must not be negative".to_string(),
            ));
        }

        let currency = env.parsed_or("SOLEMATE_CURRENCY", CurrencyCode::default())?;
        let product_cache_ttl =
            Duration::from_secs(env.parsed_or("SOLEMATE_PRODUCT_CACHE_TTL_SECS", 300_u64)?);
        let request_timeout =
            Duration::from_secs(env.parsed_or("SOLEMATE_REQUEST_TIMEOUT_SECS", 15_u64)?);
        let log_format = env.parsed_or("LOG_FORMAT", LogFormat::default())?;

        Ok(Self {
            api_url,
            api_token,
            shipping,
            currency,
            product_cache_ttl,
            request_timeout,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
            log_format,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Lookup<F>(F);

impl<F: Fn(&str) -> Option<String>> Lookup<F> {
    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable, treating empty values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.is_empty())
    }

    /// Parse a variable, falling back to a default when unset.
    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }
}

/// Parse the backend URL so that relative paths append to it.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar("SOLEMATE_API_URL".to_string(), e.to_string()))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "SOLEMATE_API_URL".to_string(),
            "must be an http(s) URL".to_string(),
        ));
    }
    Ok(url)
}

/// Parse a decimal amount (used by the CLI for overrides).
///
/// # Errors
///
/// Returns the parse error message.
pub fn parse_amount(raw: &str) -> Result<Decimal, String> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|e| format!("invalid amount '{raw}': {e}"))
}
