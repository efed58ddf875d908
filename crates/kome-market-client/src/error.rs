//! Marketplace API client error types.

/// Errors from marketplace API calls.
#[derive(Debug, thiserror::Error)]
pub enum MarketApiError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The marketplace returned a non-2xx status other than 404.
    #[error("marketplace {endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

impl From<MarketApiError> for kome_dispute::DirectoryError {
    fn from(e: MarketApiError) -> Self {
        kome_dispute::DirectoryError(e.to_string())
    }
}
