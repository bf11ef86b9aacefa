use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::RwLock;

/// Identifier and bearer credential of the active session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user_id: String,
    pub token: String,
}

impl Credentials {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
        }
    }
}

// Keep tokens out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Source of the active session identifier and credential.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<Credentials>, StoreError>;

    async fn save(&self, credentials: Credentials) -> Result<(), StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;
}

/// Session store that forgets everything when dropped.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    current: RwLock<Option<Credentials>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already active session.
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            current: RwLock::new(Some(credentials)),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<Credentials>, StoreError> {
        Ok(self.current.read().await.clone())
    }

    async fn save(&self, credentials: Credentials) -> Result<(), StoreError> {
        *self.current.write().await = Some(credentials);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.current.write().await = None;
        Ok(())
    }
}
