#![allow(dead_code)]

use account_rust::{
    AuthError, AuthResponse, Avatar, LoginRequest, RegisterRequest, RemoteClient, StoreError,
    User, UserStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, BoxStream, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Semaphore;

pub fn init_logger() {
    let _ = pretty_env_logger::try_init();
}

/// A fixed instant so separately built fixtures compare equal.
pub fn fixed_time() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
}

pub fn user(id: &str, email: &str, name: &str) -> User {
    let mut user = User::new(id, email, name);
    user.created_at = fixed_time();
    user.last_login_at = fixed_time();
    user
}

pub fn test_user() -> User {
    user("1", "a@b.com", "A")
}

pub fn auth_response() -> AuthResponse {
    AuthResponse {
        user: test_user(),
        token: "tok".to_string(),
    }
}

type Reply<T> = Box<dyn Fn() -> Result<T, AuthError> + Send + Sync>;

/// Remote client answering from canned replies.
///
/// When built with `gated()`, every auth call waits for `release()` before
/// answering so tests can observe the in-flight state.
pub struct FakeRemote {
    auth: Reply<AuthResponse>,
    profile: Reply<User>,
    gate: Option<Semaphore>,
    calls: AtomicUsize,
    tokens: Mutex<Vec<String>>,
}

impl FakeRemote {
    pub fn succeeding(response: AuthResponse) -> Self {
        let user = response.user.clone();
        Self {
            auth: Box::new(move || Ok(response.clone())),
            profile: Box::new(move || Ok(user.clone())),
            gate: None,
            calls: AtomicUsize::new(0),
            tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16, message: &str) -> Self {
        let message = message.to_string();
        let profile_message = message.clone();
        Self {
            auth: Box::new(move || {
                Err(AuthError::Server {
                    status,
                    message: message.clone(),
                })
            }),
            profile: Box::new(move || {
                Err(AuthError::Server {
                    status,
                    message: profile_message.clone(),
                })
            }),
            gate: None,
            calls: AtomicUsize::new(0),
            tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    async fn answer_auth(&self) -> Result<AuthResponse, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        (self.auth)()
    }

    fn answer_profile(&self, token: &str) -> Result<User, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().push(token.to_string());
        (self.profile)()
    }
}

#[async_trait]
impl RemoteClient for FakeRemote {
    async fn register(&self, _request: &RegisterRequest) -> Result<AuthResponse, AuthError> {
        self.answer_auth().await
    }

    async fn login(&self, _request: &LoginRequest) -> Result<AuthResponse, AuthError> {
        self.answer_auth().await
    }

    async fn fetch_profile(&self, token: &str) -> Result<User, AuthError> {
        self.answer_profile(token)
    }

    async fn update_profile(&self, token: &str, user: &User) -> Result<User, AuthError> {
        self.answer_profile(token).map(|_| user.clone())
    }

    async fn upload_avatar(&self, token: &str, _avatar: Avatar) -> Result<User, AuthError> {
        self.answer_profile(token)
    }
}

/// User store whose every operation fails.
#[derive(Default)]
pub struct BrokenUserStore;

fn broken() -> StoreError {
    StoreError::Unavailable("disk on fire".to_string())
}

#[async_trait]
impl UserStore for BrokenUserStore {
    async fn upsert(&self, _user: User) -> Result<(), StoreError> {
        Err(broken())
    }

    async fn find_by_id(&self, _id: &str) -> Result<Option<User>, StoreError> {
        Err(broken())
    }

    async fn exists_by_id(&self, _id: &str) -> Result<bool, StoreError> {
        Err(broken())
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        Err(broken())
    }

    fn observe_by_id(&self, _id: &str) -> BoxStream<'static, Option<User>> {
        stream::pending().boxed()
    }

    fn observe_all(&self) -> BoxStream<'static, Vec<User>> {
        stream::pending().boxed()
    }
}
