use thiserror::Error;

/// エラー型
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Missing credential")]
    MissingCredential,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

impl AuthError {
    /// The human readable message without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Network(err) => err.to_string(),
            Self::Server { message, .. } => message.clone(),
            Self::Serialization(err) => err.to_string(),
            Self::Url(err) => err.to_string(),
            Self::MissingCredential => "Missing credential".to_string(),
            Self::InvalidToken(message) => message.clone(),
        }
    }

    /// HTTP status reported by the server, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the failure means the credential was missing or rejected.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential | Self::InvalidToken(_) | Self::Server { status: 401, .. }
        )
    }
}
