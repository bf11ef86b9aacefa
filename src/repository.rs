//! Session repository: reconciles the remote service with the local cache
//!
//! This is the only component that writes to the user store. Nothing fallible
//! escapes it: remote calls come back as [`ApiResult`], cache maintenance
//! falls back to a safe default and logs the failure.

use crate::error::{Error, Result};
use crate::result::ApiResult;
use account_rust_auth::{AuthResponse, Avatar, LoginRequest, RegisterRequest, RemoteClient, User};
use account_rust_store::{Credentials, SessionStore, UserStore};
use futures_util::stream::{self, BoxStream, StreamExt};
use log::{debug, error, info};
use std::sync::Arc;
use tokio::sync::watch;

const REGISTER_FAILED: &str = "Registration failed";
const LOGIN_FAILED: &str = "Login failed";
const FETCH_PROFILE_FAILED: &str = "Failed to fetch user profile";
const UPDATE_PROFILE_FAILED: &str = "Failed to update user profile";
const UPLOAD_AVATAR_FAILED: &str = "Failed to upload avatar";
const MISSING_SESSION: &str = "Missing session";

pub struct SessionRepository {
    remote: Arc<dyn RemoteClient>,
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    /// Last value handed to subscribers. `None` until the first lookup or
    /// write, so a restored session still reports its first change.
    current_user: Arc<watch::Sender<Option<Option<User>>>>,
}

impl SessionRepository {
    pub fn new(
        remote: Arc<dyn RemoteClient>,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let (current_user, _) = watch::channel(None);
        Self {
            remote,
            users,
            sessions,
            current_user: Arc::new(current_user),
        }
    }

    /// ユーザー登録
    pub async fn register(&self, request: RegisterRequest) -> ApiResult<AuthResponse> {
        match self.remote.register(&request).await {
            Ok(response) => {
                info!("Registered user {}", response.user.id);
                self.start_session(&response).await;
                ApiResult::Success(response)
            }
            Err(err) => {
                let err = Error::from(err);
                error!("Registration failed: {}", err);
                ApiResult::from_error(&err, REGISTER_FAILED)
            }
        }
    }

    /// ログイン
    pub async fn login(&self, request: LoginRequest) -> ApiResult<AuthResponse> {
        match self.remote.login(&request).await {
            Ok(response) => {
                info!("Logged in user {}", response.user.id);
                self.start_session(&response).await;
                ApiResult::Success(response)
            }
            Err(err) => {
                let err = Error::from(err);
                error!("Login failed: {}", err);
                ApiResult::from_error(&err, LOGIN_FAILED)
            }
        }
    }

    /// Best effort: clears cached users and the active session, logging failures.
    pub async fn logout(&self) {
        self.clear_local_user_data().await;
        match self.sessions.clear().await {
            Ok(()) => info!("Logged out"),
            Err(err) => error!("Failed to clear session: {}", err),
        }
        self.publish_current_user().await;
    }

    /// Current user of the active session.
    ///
    /// The first item is a fresh lookup in the local store; after that every
    /// change the repository makes is delivered. A failed lookup yields
    /// `None` instead of ending the stream.
    pub fn current_user(&self) -> BoxStream<'static, Option<User>> {
        // Subscribe before the lookup so no write can slip in between.
        let updates = self.current_user.subscribe();
        let users = Arc::clone(&self.users);
        let sessions = Arc::clone(&self.sessions);
        let seed = Arc::clone(&self.current_user);

        let initial = stream::once(async move {
            let user = lookup_current_user(users.as_ref(), sessions.as_ref()).await;
            // Record what was handed out without waking other subscribers.
            // A write published in the meantime takes precedence.
            seed.send_if_modified(|current| {
                if current.is_none() {
                    *current = Some(user.clone());
                }
                false
            });
            user
        });

        let changes = stream::unfold(updates, |mut rx| async move {
            loop {
                rx.changed().await.ok()?;
                let delivered = rx.borrow_and_update().clone();
                if let Some(user) = delivered {
                    return Some((user, rx));
                }
            }
        });

        initial.chain(changes).boxed()
    }

    /// プロフィール取得
    pub async fn get_user_profile(&self) -> ApiResult<User> {
        let result = match self.active_credentials().await {
            Ok(credentials) => self
                .remote
                .fetch_profile(&credentials.token)
                .await
                .map_err(Error::from),
            Err(err) => Err(err),
        };
        self.cache_profile(result, FETCH_PROFILE_FAILED).await
    }

    /// プロフィール更新
    pub async fn update_user_profile(&self, user: User) -> ApiResult<User> {
        let result = match self.active_credentials().await {
            Ok(credentials) => self
                .remote
                .update_profile(&credentials.token, &user)
                .await
                .map_err(Error::from),
            Err(err) => Err(err),
        };
        self.cache_profile(result, UPDATE_PROFILE_FAILED).await
    }

    pub async fn upload_avatar(&self, avatar: Avatar) -> ApiResult<User> {
        let result = match self.active_credentials().await {
            Ok(credentials) => self
                .remote
                .upload_avatar(&credentials.token, avatar)
                .await
                .map_err(Error::from),
            Err(err) => Err(err),
        };
        self.cache_profile(result, UPLOAD_AVATAR_FAILED).await
    }

    /// Whether a cached record exists for the active session. Failures read as `false`.
    pub async fn is_user_logged_in(&self) -> bool {
        let user_id = match self.sessions.load().await {
            Ok(Some(credentials)) => credentials.user_id,
            Ok(None) => return false,
            Err(err) => {
                error!("Failed to check login status: {}", err);
                return false;
            }
        };

        match self.users.exists_by_id(&user_id).await {
            Ok(exists) => exists,
            Err(err) => {
                error!("Failed to check login status: {}", err);
                false
            }
        }
    }

    pub async fn save_user_to_local(&self, user: User) {
        let user_id = user.id.clone();
        match self.users.upsert(user).await {
            Ok(()) => debug!("Saved user {} locally", user_id),
            Err(err) => error!("Failed to save user {} locally: {}", user_id, err),
        }
        self.publish_current_user().await;
    }

    pub async fn get_user_from_local(&self, user_id: &str) -> Option<User> {
        match self.users.find_by_id(user_id).await {
            Ok(user) => user,
            Err(err) => {
                error!("Failed to read user {} locally: {}", user_id, err);
                None
            }
        }
    }

    pub async fn clear_local_user_data(&self) {
        match self.users.delete_all().await {
            Ok(()) => debug!("Cleared local user data"),
            Err(err) => error!("Failed to clear local user data: {}", err),
        }
        self.publish_current_user().await;
    }

    async fn start_session(&self, response: &AuthResponse) {
        let credentials = Credentials::new(response.user.id.clone(), response.token.clone());
        if let Err(err) = self.sessions.save(credentials).await {
            error!("Failed to save session for {}: {}", response.user.id, err);
        }
        self.save_user_to_local(response.user.clone()).await;
    }

    async fn cache_profile(&self, result: Result<User>, fallback: &str) -> ApiResult<User> {
        match result {
            Ok(user) => {
                self.save_user_to_local(user.clone()).await;
                ApiResult::Success(user)
            }
            Err(err) => {
                error!("{}: {}", fallback, err);
                ApiResult::from_error(&err, fallback)
            }
        }
    }

    async fn active_credentials(&self) -> Result<Credentials> {
        self.sessions
            .load()
            .await?
            .ok_or_else(|| Error::auth(MISSING_SESSION))
    }

    async fn publish_current_user(&self) {
        let user = lookup_current_user(self.users.as_ref(), self.sessions.as_ref()).await;
        self.current_user.send_if_modified(|current| {
            if current.as_ref() == Some(&user) {
                false
            } else {
                *current = Some(user);
                true
            }
        });
    }
}

async fn lookup_current_user(users: &dyn UserStore, sessions: &dyn SessionStore) -> Option<User> {
    match resolve_current_user(users, sessions).await {
        Ok(user) => user,
        Err(err) => {
            error!("Failed to load current user: {}", err);
            None
        }
    }
}

async fn resolve_current_user(
    users: &dyn UserStore,
    sessions: &dyn SessionStore,
) -> Result<Option<User>> {
    match sessions.load().await? {
        Some(credentials) => Ok(users.find_by_id(&credentials.user_id).await?),
        None => Ok(None),
    }
}
