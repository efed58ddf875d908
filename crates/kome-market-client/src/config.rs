//! Marketplace API client configuration.

use url::Url;

/// Connection settings for the marketplace API.
///
/// Custom `Debug` implementation redacts the `api_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct MarketApiConfig {
    /// Base URL of the marketplace, e.g. `https://api.kome.market`.
    pub base_url: Url,
    /// Bearer token for service-to-service calls, if the marketplace
    /// requires one.
    pub api_token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for MarketApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketApiConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl MarketApiConfig {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

    /// Build a configuration for `base_url` with no token and the default
    /// timeout.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_url("base_url", base_url)?,
            api_token: None,
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `MARKET_API_URL` (required)
    /// - `MARKET_API_TOKEN` (optional)
    /// - `MARKET_TIMEOUT_SECS` (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var("MARKET_API_URL").map_err(|_| ConfigError::MissingUrl)?;
        Ok(Self {
            base_url: parse_url("MARKET_API_URL", &raw)?,
            api_token: std::env::var("MARKET_API_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            timeout_secs: std::env::var("MARKET_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Self::DEFAULT_TIMEOUT_SECS),
        })
    }
}

fn parse_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("MARKET_API_URL environment variable is required")]
    MissingUrl,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("API token contains characters not allowed in an HTTP header")]
    InvalidToken,
}
