//! Relay configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `RELAY_UPSTREAM_URL` - Base URL of the upstream commerce API
//! - `RELAY_STORE_URL` - Base URL of the record store REST gateway
//! - `RELAY_STORE_SERVICE_KEY` - Record store service credential
//! - `RELAY_EMAIL_API_KEY` - Transactional email provider API key
//! - `RELAY_EMAIL_FROM` - Sender address for customer notifications
//!
//! ## Optional
//! - `RELAY_HOST` - Bind address (default: 0.0.0.0)
//! - `RELAY_PORT` - Listen port (default: 8080)
//! - `RELAY_EMAIL_API_URL` - Email provider base URL (default: <https://api.resend.com>)
//! - `RELAY_ALLOWED_ORIGIN` - CORS allowed origin (default: *)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0-1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0-1.0 (default: 0.0)

use std::net::{IpAddr, SocketAddr};

use orders_relay_core::Email;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_EMAIL_API_URL: &str = "https://api.resend.com";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Relay application configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Value for `Access-Control-Allow-Origin`
    pub allowed_origin: String,
    /// Upstream commerce API
    pub upstream: UpstreamConfig,
    /// Record store gateway
    pub store: StoreConfig,
    /// Transactional email provider
    pub email: EmailConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry transaction sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Upstream commerce API configuration.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL; its origin doubles as the upstream's own origin.
    pub base_url: Url,
}

impl UpstreamConfig {
    /// The upstream's origin without a trailing slash, e.g. `https://shop.example`.
    #[must_use]
    pub fn origin(&self) -> String {
        self.base_url.origin().ascii_serialization()
    }
}

/// Record store configuration.
///
/// `SecretString` redacts the service key in `Debug` output.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the REST gateway
    pub url: Url,
    /// Service role key, sent as `apikey` and bearer token
    pub service_key: SecretString,
}

/// Email provider configuration.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Provider base URL
    pub api_url: Url,
    /// Provider API key
    pub api_key: SecretString,
    /// Sender address
    pub from_address: Email,
}

impl RelayConfig {
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

        let host = get_env_or_default("RELAY_HOST", "0.0.0.0")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("RELAY_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("RELAY_PORT", "8080")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("RELAY_PORT".to_string(), e.to_string()))?;

        Ok(Self {
            host,
            port,
            allowed_origin: get_env_or_default("RELAY_ALLOWED_ORIGIN", "*"),
            upstream: UpstreamConfig {
                base_url: get_required_url("RELAY_UPSTREAM_URL")?,
            },
            store: StoreConfig {
                url: get_required_url("RELAY_STORE_URL")?,
                service_key: get_required_secret("RELAY_STORE_SERVICE_KEY")?,
            },
            email: EmailConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_sample_rate("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: get_sample_rate("SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let from = get_required_env("RELAY_EMAIL_FROM")?;
        let from_address = Email::parse(&from)
            .map_err(|e| ConfigError::InvalidEnvVar("RELAY_EMAIL_FROM".to_string(), e.to_string()))?;
        let api_url = match get_optional_env("RELAY_EMAIL_API_URL") {
            Some(value) => parse_http_url("RELAY_EMAIL_API_URL", &value)?,
            None => parse_http_url("RELAY_EMAIL_API_URL", DEFAULT_EMAIL_API_URL)?,
        };

        Ok(Self {
            api_url,
            api_key: get_required_secret("RELAY_EMAIL_API_KEY")?,
            from_address,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get a required environment variable as an absolute http(s) URL.
fn get_required_url(key: &str) -> Result<Url, ConfigError> {
    let value = get_required_env(key)?;
    parse_http_url(key, &value)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a sampling rate in `0.0..=1.0`.
fn get_sample_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    let Some(value) = get_optional_env(key) else {
        return Ok(default);
    };
    let rate = value
        .parse::<f32>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0 (got {rate})"),
        ));
    }
    Ok(rate)
}

/// Parse a URL, requiring the http or https scheme and a host.
fn parse_http_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }
    Ok(url)
}
