use reqwest::header::InvalidHeaderValue;
use shared_utils::env::EnvError;
use thiserror::Error;

/// Errors that can occur within a terminal capability implementation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout).
    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The terminal answered with an error status or an error payload.
    #[error("API error: {0}")]
    Api(String),

    /// The request parameters were invalid for this terminal.
    #[error("Invalid parameters for provider: {0}")]
    Validation(String),

    /// The terminal returned something we could not turn into bars.
    #[error("Internal provider error: {0}")]
    Internal(String),

    /// The terminal session is down.
    #[error("Terminal is not connected")]
    NotConnected,
}

/// Errors raised while constructing a provider.
#[derive(Debug, Error)]
pub enum ProviderInitError {
    #[error(transparent)]
    Env(#[from] EnvError),

    #[error("Token is not a valid header value")]
    Header(#[from] InvalidHeaderValue),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid gateway URL {url:?}: {message}")]
    BaseUrl { url: String, message: String },
}
