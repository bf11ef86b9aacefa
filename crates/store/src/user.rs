use crate::error::StoreError;
use account_rust_auth::User;
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use log::debug;
use std::collections::BTreeMap;
use tokio::sync::watch;

pub(crate) type Records = BTreeMap<String, User>;

/// Local cache of user records keyed by id.
///
/// Writes replace on conflict: at most one record exists per id.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert the record, replacing any record with the same id.
    async fn upsert(&self, user: User) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn exists_by_id(&self, id: &str) -> Result<bool, StoreError>;

    async fn delete_all(&self) -> Result<(), StoreError>;

    /// Current record for `id`, then every distinct change to it.
    fn observe_by_id(&self, id: &str) -> BoxStream<'static, Option<User>>;

    /// All records ordered by id, then the full list after every change.
    fn observe_all(&self) -> BoxStream<'static, Vec<User>>;
}

/// In-memory user store.
///
/// The records live in a `watch` channel so observers always see the latest
/// snapshot and late subscribers start from it.
#[derive(Debug)]
pub struct MemoryUserStore {
    records: watch::Sender<Records>,
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::with_records(Records::new())
    }

    pub(crate) fn with_records(records: Records) -> Self {
        let (records, _) = watch::channel(records);
        Self { records }
    }

    pub(crate) fn snapshot(&self) -> Records {
        self.records.borrow().clone()
    }

    /// Replace the whole map, notifying observers only if it changed.
    pub(crate) fn commit(&self, next: Records) {
        self.records.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn upsert(&self, user: User) -> Result<(), StoreError> {
        debug!("Upserting user {}", user.id);
        self.records.send_if_modified(|records| {
            if records.get(&user.id) == Some(&user) {
                return false;
            }
            records.insert(user.id.clone(), user);
            true
        });
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.records.borrow().get(id).cloned())
    }

    async fn exists_by_id(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.records.borrow().contains_key(id))
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        self.records.send_if_modified(|records| {
            let changed = !records.is_empty();
            records.clear();
            changed
        });
        Ok(())
    }

    fn observe_by_id(&self, id: &str) -> BoxStream<'static, Option<User>> {
        observe_record(self.records.subscribe(), id.to_string())
    }

    fn observe_all(&self) -> BoxStream<'static, Vec<User>> {
        observe_records(self.records.subscribe())
    }
}

pub(crate) fn observe_records(rx: watch::Receiver<Records>) -> BoxStream<'static, Vec<User>> {
    stream::unfold((rx, true), |(mut rx, first)| async move {
        if !first {
            // Sender dropped: the store is gone, end the stream.
            rx.changed().await.ok()?;
        }
        let users = rx.borrow_and_update().values().cloned().collect::<Vec<_>>();
        Some((users, (rx, false)))
    })
    .boxed()
}

pub(crate) fn observe_record(
    rx: watch::Receiver<Records>,
    id: String,
) -> BoxStream<'static, Option<User>> {
    stream::unfold(
        (rx, id, None::<Option<User>>),
        |(mut rx, id, last)| async move {
            loop {
                if last.is_some() {
                    rx.changed().await.ok()?;
                }
                let current = rx.borrow_and_update().get(&id).cloned();
                if last.as_ref() != Some(&current) {
                    return Some((current.clone(), (rx, id, Some(current))));
                }
            }
        },
    )
    .boxed()
}
