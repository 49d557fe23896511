//! Error Types
//!
//! This module defines the crate-level error type used by the server bootstrap and
//! configuration layers. Per-message failures never surface here: malformed
//! structured payloads are reported to the client by the session, and transport
//! failures end the session with a [`crate::session::CloseReason`].

use thiserror::Error;

/// The main Error type for the server
#[derive(Error, Debug)]
pub enum Error {
    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors (binding the listener, serving connections)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-related errors
    #[error("Transport error: {0}")]
    Transport(String),
}

impl Error {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config(message.into())
    }

    /// Create a transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Error::Transport(message.into())
    }
}
