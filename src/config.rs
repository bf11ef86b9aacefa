//! Configuration options for the account client

use crate::controller::ControllerOptions;
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.example.com/";

/// Configuration options for the account client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL of the account service
    pub base_url: String,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// Whether the user cache and session survive restarts
    pub persist_session: bool,

    /// Directory for `users.json` / `session.json` when persisting
    pub data_dir: Option<PathBuf>,

    /// Session controller behaviour
    pub controller: ControllerOptions,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Some(Duration::from_secs(30)),
            persist_session: false,
            data_dir: None,
            controller: ControllerOptions::default(),
        }
    }
}

impl ClientOptions {
    /// Read `ACCOUNT_API_URL`, `ACCOUNT_DATA_DIR` and
    /// `ACCOUNT_REQUEST_TIMEOUT_SECS`, keeping defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        let mut options = Self::default();

        if let Ok(url) = std::env::var("ACCOUNT_API_URL") {
            options = options.with_base_url(&url);
        }

        if let Ok(dir) = std::env::var("ACCOUNT_DATA_DIR") {
            options = options.with_data_dir(dir);
        }

        if let Ok(secs) = std::env::var("ACCOUNT_REQUEST_TIMEOUT_SECS") {
            let secs = secs.parse::<u64>().map_err(|_| {
                Error::config(format!("ACCOUNT_REQUEST_TIMEOUT_SECS is not a number: {}", secs))
            })?;
            options = options.with_request_timeout(Some(Duration::from_secs(secs)));
        }

        Ok(options)
    }

    /// Set the base URL of the account service
    pub fn with_base_url(mut self, value: &str) -> Self {
        self.base_url = value.to_string();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set whether to persist the session
    pub fn with_persist_session(mut self, value: bool) -> Self {
        self.persist_session = value;
        self
    }

    /// Persist into `dir`; implies `persist_session`
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self.persist_session = true;
        self
    }

    /// Set the session controller options
    pub fn with_controller(mut self, value: ControllerOptions) -> Self {
        self.controller = value;
        self
    }
}
