//! Crate-wide error type and machine-readable error codes.
//!
//! Component errors stay local to their modules ([`DecodeError`],
//! [`TransportError`], [`ServerError`]). Decode and server errors never
//! leave the router or the relay; they are logged with their code. Session
//! setup reports through [`BoardError`].

use serde::Serialize;
use thiserror::Error;

use crate::api::ServerError;
use crate::envelope::DecodeError;
use crate::transport::TransportError;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    fn code(&self) -> &'static str;
}

impl ErrorCode for DecodeError {
    fn code(&self) -> &'static str {
        match self {
            Self::MalformedEnvelope(_) => "malformed_envelope",
        }
    }
}

impl ErrorCode for TransportError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "invalid_url",
            Self::UnsupportedScheme(_) => "unsupported_scheme",
        }
    }
}

impl ErrorCode for ServerError {
    fn code(&self) -> &'static str {
        match self {
            Self::Bind(_) => "bind_failed",
            Self::NoAvailablePort { .. } => "no_available_port",
            Self::Configuration(_) => "configuration_error",
        }
    }
}

/// Error raised while setting up a board session.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum BoardError {
    /// The relay connection could not be set up.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A configuration value is out of range.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl BoardError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport_error",
            Self::Configuration(_) => "configuration_error",
        }
    }
}

/// Convenient Result alias for session setup.
pub type BoardResult<T> = Result<T, BoardError>;

impl From<TransportError> for BoardError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err.to_string())
    }
}
