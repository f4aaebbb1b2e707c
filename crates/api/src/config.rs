//! Application configuration loaded from environment variables.

use std::time::Duration;

use domain::Money;
use settlement::RazorpayConfig;
use settlement::gateway::razorpay::DEFAULT_API_BASE;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be set together with {other}")]
    IncompleteCredentials {
        name: &'static str,
        other: &'static str,
    },

    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` (default `"0.0.0.0"`), `PORT` (default `3000`)
/// - `RUST_LOG` (default `"info"`), `LOG_FORMAT` (`json` for JSON logs)
/// - `DATABASE_URL` (in-memory store when unset), `DATABASE_MAX_CONNECTIONS` (default `5`)
/// - `RAZORPAY_KEY_ID` / `RAZORPAY_KEY_SECRET` (sandbox gateway when unset),
///   `RAZORPAY_API_BASE`, `GATEWAY_TIMEOUT_MS` (default `10000`)
/// - `STORE_CURRENCY` (default `"INR"`), `TRIAL_PRICE_MINOR` (default `100`)
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_json: bool,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub razorpay_key_id: Option<String>,
    pub razorpay_key_secret: Option<String>,
    pub razorpay_api_base: String,
    pub gateway_timeout: Duration,
    pub currency: String,
    pub trial_price: Money,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let razorpay_key_id = var("RAZORPAY_KEY_ID");
        let razorpay_key_secret = var("RAZORPAY_KEY_SECRET");
        match (&razorpay_key_id, &razorpay_key_secret) {
            (Some(_), None) => {
                return Err(ConfigError::IncompleteCredentials {
                    name: "RAZORPAY_KEY_ID",
                    other: "RAZORPAY_KEY_SECRET",
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::IncompleteCredentials {
                    name: "RAZORPAY_KEY_SECRET",
                    other: "RAZORPAY_KEY_ID",
                });
            }
            _ => {}
        }

        let gateway_timeout_ms = positive(&var, "GATEWAY_TIMEOUT_MS")?.unwrap_or(10_000);
        let trial_price_minor = positive(&var, "TRIAL_PRICE_MINOR")?.unwrap_or(100);

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_json: var("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            database_url: var("DATABASE_URL"),
            database_max_connections: positive(&var, "DATABASE_MAX_CONNECTIONS")?
                .map_or(defaults.database_max_connections, |n| {
                    u32::try_from(n).unwrap_or(u32::MAX)
                }),
            razorpay_key_id,
            razorpay_key_secret,
            razorpay_api_base: var("RAZORPAY_API_BASE").unwrap_or(defaults.razorpay_api_base),
            gateway_timeout: Duration::from_millis(gateway_timeout_ms),
            currency: var("STORE_CURRENCY")
                .map(|c| c.trim().to_ascii_uppercase())
                .unwrap_or(defaults.currency),
            trial_price: Money::from_minor(i64::try_from(trial_price_minor).unwrap_or(i64::MAX)),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Razorpay settings, when both credentials are present.
    pub fn razorpay(&self) -> Option<RazorpayConfig> {
        let key_id = self.razorpay_key_id.as_ref()?;
        let key_secret = self.razorpay_key_secret.as_ref()?;
        Some(
            RazorpayConfig::new(key_id.as_str(), key_secret.as_str())
                .with_api_base(self.razorpay_api_base.as_str())
                .with_timeout(self.gateway_timeout),
        )
    }
}

fn positive(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<u64>, ConfigError> {
    let Some(value) = var(name) else {
        return Ok(None);
    };
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(ConfigError::InvalidNumber { name, value }),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_json: false,
            database_url: None,
            database_max_connections: 5,
            razorpay_key_id: None,
            razorpay_key_secret: None,
            razorpay_api_base: DEFAULT_API_BASE.to_string(),
            gateway_timeout: Duration::from_secs(10),
            currency: "INR".to_string(),
            trial_price: Money::from_minor(100),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("log_json", &self.log_json)
            .field("database_url", &self.database_url.as_ref().map(|_| "[redacted]"))
            .field("database_max_connections", &self.database_max_connections)
            .field("razorpay_key_id", &self.razorpay_key_id)
            .field(
                "razorpay_key_secret",
                &self.razorpay_key_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("razorpay_api_base", &self.razorpay_api_base)
            .field("gateway_timeout", &self.gateway_timeout)
            .field("currency", &self.currency)
            .field("trial_price", &self.trial_price)
            .finish()
    }
}
