//! Error types for certgrant

use std::io;

use thiserror::Error;

/// Result type alias for certgrant
pub type Result<T> = std::result::Result<T, Error>;

/// certgrant errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TLS setup error
    #[error("TLS error: {0}")]
    Tls(String),

    /// Token issuance or validation error
    #[error("Token error: {0}")]
    Token(String),

    /// A malformed credential reached the validator.
    ///
    /// This is a caller-contract violation (internal wiring bug), not an
    /// authentication failure, and must never be conflated with an ordinary
    /// rejection.
    #[error("Invalid credential reached the validator: {0}")]
    InvalidCredential(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
