//! Unified error handling for the client.

use thiserror::Error;

/// Application error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The underlying channel failed (connect, send, or protocol).
    #[error("transport error: {0}")]
    Transport(String),

    /// An authoritative fetch (seed or poll tick) failed.
    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// A push envelope failed validation.
    #[error("invalid envelope: {0}")]
    Envelope(#[from] tether_core::Error),

    /// The session was configured with an unusable value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
