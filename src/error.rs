//! Error handling for the account client

use account_rust_auth::AuthError;
use account_rust_store::StoreError;
use std::fmt;
use thiserror::Error;

/// Unified error type for the account client
#[derive(Error, Debug)]
pub enum Error {
    /// No connectivity or transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response or server-reported failure
    #[error("Server error: {message}")]
    Server { message: String, code: Option<u16> },

    /// Missing or rejected credential
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Local read/write failure
    #[error("Cache error: {0}")]
    Cache(#[from] StoreError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new authentication error
    pub fn auth<T: fmt::Display>(msg: T) -> Self {
        Error::Auth(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Message suitable for display, without the category prefix.
    pub fn message(&self) -> String {
        match self {
            Error::Network(message) | Error::Auth(message) | Error::Config(message) => {
                message.clone()
            }
            Error::Server { message, .. } => message.clone(),
            Error::Cache(err) => err.to_string(),
        }
    }

    /// Status code reported by the server, if any.
    pub fn code(&self) -> Option<u16> {
        match self {
            Error::Server { code, .. } => *code,
            _ => None,
        }
    }
}

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        if err.is_auth_failure() && !matches!(err, AuthError::Server { .. }) {
            return Error::Auth(err.message());
        }
        match err {
            AuthError::Network(_) => Error::Network(err.message()),
            AuthError::Url(_) => Error::Config(err.message()),
            _ => Error::Server {
                code: err.status(),
                message: err.message(),
            },
        }
    }
}

/// Result alias used throughout the facade crate
pub type Result<T> = std::result::Result<T, Error>;
