//! Account session client for Rust
//!
//! Keeps an authenticated user in sync between a remote account service and
//! a local cache, and exposes the session as observable state for a UI.
//!
//! ```no_run
//! use account_rust::{Account, AuthUiState, ClientOptions};
//!
//! # async fn run() -> account_rust::error::Result<()> {
//! let account = Account::new(ClientOptions::from_env()?).await?;
//! let mut state = account.controller().ui_state();
//!
//! account.controller().login("user@example.com", "password");
//! let state = state
//!     .wait_for(|s| !matches!(s, AuthUiState::Loading))
//!     .await
//!     .map(|s| s.clone());
//! println!("{:?}", state);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod repository;
pub mod result;

use std::sync::Arc;

pub use account_rust_auth::{
    AuthClient, AuthError, AuthResponse, Avatar, LoginRequest, RegisterRequest, RemoteClient, User,
};
pub use account_rust_store::{
    Credentials, FileSessionStore, FileUserStore, MemorySessionStore, MemoryUserStore,
    SessionStore, StoreError, UserStore,
};
pub use config::ClientOptions;
pub use controller::{AuthController, AuthUiState, ControllerOptions};
pub use error::Error;
pub use repository::SessionRepository;
pub use result::ApiResult;

use crate::error::Result;
use log::info;

/// The main entry point: repository plus the controller driving it
pub struct Account {
    repository: Arc<SessionRepository>,
    controller: AuthController,
    options: ClientOptions,
}

impl Account {
    /// Build the HTTP client and stores described by `options`.
    ///
    /// File-backed stores are used when `persist_session` is set, which
    /// requires a `data_dir`; otherwise everything is kept in memory.
    pub async fn new(options: ClientOptions) -> Result<Self> {
        let remote = match options.request_timeout {
            Some(timeout) => AuthClient::with_timeout(&options.base_url, timeout)?,
            None => AuthClient::new(&options.base_url)?,
        };

        let (users, sessions) = if options.persist_session {
            let dir = options
                .data_dir
                .as_ref()
                .ok_or_else(|| Error::config("persist_session requires data_dir"))?;
            info!("Persisting session data in {}", dir.display());
            let users: Arc<dyn UserStore> = Arc::new(FileUserStore::open(dir).await?);
            let sessions: Arc<dyn SessionStore> = Arc::new(FileSessionStore::open(dir).await?);
            (users, sessions)
        } else {
            let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
            let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
            (users, sessions)
        };

        Ok(Self::with_parts(Arc::new(remote), users, sessions, options).await)
    }

    /// Assemble an account from explicit collaborators.
    pub async fn with_parts(
        remote: Arc<dyn RemoteClient>,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        options: ClientOptions,
    ) -> Self {
        let repository = Arc::new(SessionRepository::new(remote, users, sessions));
        let controller = AuthController::new(Arc::clone(&repository), options.controller).await;

        Self {
            repository,
            controller,
            options,
        }
    }

    pub fn repository(&self) -> &Arc<SessionRepository> {
        &self.repository
    }

    pub fn controller(&self) -> &AuthController {
        &self.controller
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }
}
