//! JSON-file backed stores
//!
//! Each store keeps one snapshot file. Writes go to a sibling temp file that
//! is then renamed over the snapshot, and in-memory state is only updated
//! once the rename succeeded.

use crate::error::StoreError;
use crate::session::{Credentials, SessionStore};
use crate::user::{MemoryUserStore, Records, UserStore};
use account_rust_auth::User;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use log::{debug, info};
use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};

pub const USERS_FILE: &str = "users.json";
pub const SESSION_FILE: &str = "session.json";

#[derive(Debug)]
struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn read<T: DeserializeOwned>(&self) -> Result<Option<T>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write<T: Serialize>(&self, value: &T) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(value)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("Wrote {}", self.path.display());
        Ok(())
    }

    async fn remove(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// User store persisted to `users.json`.
#[derive(Debug)]
pub struct FileUserStore {
    file: JsonFile,
    memory: MemoryUserStore,
    write_lock: Mutex<()>,
}

impl FileUserStore {
    /// Open the store in `dir`, loading the snapshot if one exists.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let file = JsonFile::new(dir.as_ref().join(USERS_FILE));
        let users: Vec<User> = file.read().await?.unwrap_or_default();
        info!("Opened user store {} ({} records)", file.path.display(), users.len());

        let records = users
            .into_iter()
            .map(|user| (user.id.clone(), user))
            .collect::<Records>();

        Ok(Self {
            file,
            memory: MemoryUserStore::with_records(records),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }

    async fn apply(&self, change: impl FnOnce(&mut Records)) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut next = self.memory.snapshot();
        change(&mut next);
        let users = next.values().collect::<Vec<_>>();
        self.file.write(&users).await?;
        self.memory.commit(next);
        Ok(())
    }
}

#[async_trait]
impl UserStore for FileUserStore {
    async fn upsert(&self, user: User) -> Result<(), StoreError> {
        self.apply(|records| {
            records.insert(user.id.clone(), user);
        })
        .await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.memory.find_by_id(id).await
    }

    async fn exists_by_id(&self, id: &str) -> Result<bool, StoreError> {
        self.memory.exists_by_id(id).await
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        self.apply(|records| records.clear()).await
    }

    fn observe_by_id(&self, id: &str) -> BoxStream<'static, Option<User>> {
        self.memory.observe_by_id(id)
    }

    fn observe_all(&self) -> BoxStream<'static, Vec<User>> {
        self.memory.observe_all()
    }
}

/// Session store persisted to `session.json`.
#[derive(Debug)]
pub struct FileSessionStore {
    file: JsonFile,
    current: RwLock<Option<Credentials>>,
}

impl FileSessionStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let file = JsonFile::new(dir.as_ref().join(SESSION_FILE));
        let current = file.read::<Credentials>().await?;
        info!(
            "Opened session store {} (active: {})",
            file.path.display(),
            current.is_some()
        );

        Ok(Self {
            file,
            current: RwLock::new(current),
        })
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<Credentials>, StoreError> {
        Ok(self.current.read().await.clone())
    }

    async fn save(&self, credentials: Credentials) -> Result<(), StoreError> {
        let mut current = self.current.write().await;
        self.file.write(&credentials).await?;
        *current = Some(credentials);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut current = self.current.write().await;
        self.file.remove().await?;
        *current = None;
        Ok(())
    }
}
