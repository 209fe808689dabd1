//! Error hierarchy for the configuration client.
//!
//! Backend failures are absorbed by the resolver and the watch loop and turned
//! into availability changes; only configuration loading and client
//! construction surface [`Error`] to callers.

use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Remote key-value backend failures
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Configuration source or deserialization failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration loaded but rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Connection refused, DNS failure, reset, ...
    #[error("Backend unreachable: {source}")]
    Unreachable {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Request did not complete in time
    #[error("Backend request timed out after {0:?}")]
    Timeout(Duration),

    /// Backend answered with a status the client does not understand
    #[error("Unexpected status {status} for {path}")]
    UnexpectedStatus { status: u16, path: String },

    /// Response body or headers could not be decoded
    #[error("Failed to decode backend response: {0}")]
    Decode(String),

    /// Malformed backend address
    #[error("Invalid backend address: {0}")]
    InvalidAddress(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else if err.is_builder() {
            GatewayError::InvalidAddress(err.to_string())
        } else {
            GatewayError::Unreachable {
                source: Box::new(err),
            }
        }
    }
}
