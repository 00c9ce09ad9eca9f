//! Relay startup errors.

use thiserror::Error;

/// Startup and runtime errors for the relay server.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}
