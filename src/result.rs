//! Outcome of a single remote operation

use crate::error::Error;

/// Result of one repository call. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResult<T> {
    Success(T),
    Error { message: String, code: Option<u16> },
    Loading,
}

impl<T> ApiResult<T> {
    pub fn error(message: impl Into<String>) -> Self {
        ApiResult::Error {
            message: message.into(),
            code: None,
        }
    }

    /// Convert a failure, replacing an empty message with `fallback`.
    pub fn from_error(err: &Error, fallback: &str) -> Self {
        let message = err.message();
        ApiResult::Error {
            message: if message.trim().is_empty() {
                fallback.to_string()
            } else {
                message
            },
            code: err.code(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResult::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ApiResult::Error { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ApiResult::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            ApiResult::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ApiResult::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ApiResult<U> {
        match self {
            ApiResult::Success(data) => ApiResult::Success(f(data)),
            ApiResult::Error { message, code } => ApiResult::Error { message, code },
            ApiResult::Loading => ApiResult::Loading,
        }
    }
}
