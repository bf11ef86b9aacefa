use account_rust_auth::User;
use account_rust_store::{
    Credentials, FileSessionStore, FileUserStore, SessionStore, StoreError, UserStore, USERS_FILE,
};
use futures_util::StreamExt;
use tempfile::tempdir;

#[tokio::test]
async fn test_missing_file_opens_empty() {
    let dir = tempdir().unwrap();
    let store = FileUserStore::open(dir.path()).await.unwrap();

    assert_eq!(store.find_by_id("1").await.unwrap(), None);
    assert!(!store.path().exists());
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let dir = tempdir().unwrap();
    let user = User::new("1", "a@b.com", "A").with_avatar_url("https://cdn.example.com/a.png");

    {
        let store = FileUserStore::open(dir.path()).await.unwrap();
        store.upsert(user.clone()).await.unwrap();
        store.upsert(User::new("2", "c@d.com", "C")).await.unwrap();
    }

    let reopened = FileUserStore::open(dir.path()).await.unwrap();
    assert_eq!(reopened.find_by_id("1").await.unwrap(), Some(user));
    assert!(reopened.exists_by_id("2").await.unwrap());
}

#[tokio::test]
async fn test_delete_all_persists() {
    let dir = tempdir().unwrap();
    let store = FileUserStore::open(dir.path()).await.unwrap();
    store.upsert(User::new("1", "a@b.com", "A")).await.unwrap();
    store.delete_all().await.unwrap();

    let reopened = FileUserStore::open(dir.path()).await.unwrap();
    let mut all = reopened.observe_all();
    assert!(all.next().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_observers_follow_file_store_writes() {
    let dir = tempdir().unwrap();
    let store = FileUserStore::open(dir.path()).await.unwrap();
    let mut updates = store.observe_by_id("1");
    assert_eq!(updates.next().await.unwrap(), None);

    let user = User::new("1", "a@b.com", "A");
    store.upsert(user.clone()).await.unwrap();
    assert_eq!(updates.next().await.unwrap(), Some(user));
}

#[tokio::test]
async fn test_corrupt_snapshot_is_serialization_error() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join(USERS_FILE), b"not json").unwrap();

    let result = FileUserStore::open(dir.path()).await;
    assert!(matches!(result, Err(StoreError::Serialization(_))));
}

#[tokio::test]
async fn test_failed_write_leaves_memory_unchanged() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    let store = FileUserStore::open(&data).await.unwrap();

    // A plain file where the data directory should be makes every write fail.
    std::fs::write(&data, b"").unwrap();

    let write = store.upsert(User::new("1", "a@b.com", "A")).await;
    assert!(matches!(write, Err(StoreError::Io(_))));
    assert!(!store.exists_by_id("1").await.unwrap());
}

#[tokio::test]
async fn test_session_survives_reopen_and_clear() {
    let dir = tempdir().unwrap();

    {
        let sessions = FileSessionStore::open(dir.path()).await.unwrap();
        assert_eq!(sessions.load().await.unwrap(), None);
        sessions.save(Credentials::new("1", "tok")).await.unwrap();
    }

    let sessions = FileSessionStore::open(dir.path()).await.unwrap();
    assert_eq!(sessions.load().await.unwrap(), Some(Credentials::new("1", "tok")));

    sessions.clear().await.unwrap();
    // Clearing twice is fine.
    sessions.clear().await.unwrap();

    let reopened = FileSessionStore::open(dir.path()).await.unwrap();
    assert_eq!(reopened.load().await.unwrap(), None);
}
