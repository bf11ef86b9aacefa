//! Session controller: observable authentication state for a UI

use crate::repository::SessionRepository;
use crate::result::ApiResult;
use account_rust_auth::{AuthResponse, LoginRequest, RegisterRequest, User};
use futures_util::StreamExt;
use log::{debug, info, warn};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinSet};

/// 認証 UI 状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthUiState {
    Initial,
    Loading,
    Success(User),
    Error(String),
}

impl AuthUiState {
    pub fn is_loading(&self) -> bool {
        matches!(self, AuthUiState::Loading)
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            AuthUiState::Success(user) => Some(user),
            _ => None,
        }
    }
}

/// Session controller options
#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerOptions {
    /// Abort an in-flight login/register when a new one is submitted.
    /// When off, concurrent submissions race and the last to finish wins.
    pub cancel_superseded: bool,
}

impl ControllerOptions {
    pub fn with_cancel_superseded(mut self, value: bool) -> Self {
        self.cancel_superseded = value;
        self
    }
}

/// Drives the repository and publishes [`AuthUiState`] and the current user.
///
/// Work runs on tasks owned by the controller. Dropping the controller (or
/// calling [`AuthController::close`]) aborts everything still in flight.
pub struct AuthController {
    repository: Arc<SessionRepository>,
    options: ControllerOptions,
    ui_state: Arc<watch::Sender<AuthUiState>>,
    current_user: Arc<watch::Sender<Option<User>>>,
    tasks: Mutex<JoinSet<()>>,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl AuthController {
    /// Subscribe to the repository's current user and run the initial login
    /// check. Must be called from within a tokio runtime.
    pub async fn new(repository: Arc<SessionRepository>, options: ControllerOptions) -> Self {
        let (ui_state, _) = watch::channel(AuthUiState::Initial);
        let (current_user, _) = watch::channel(None);

        let controller = Self {
            repository,
            options,
            ui_state: Arc::new(ui_state),
            current_user: Arc::new(current_user),
            tasks: Mutex::new(JoinSet::new()),
            in_flight: Mutex::new(None),
        };

        controller.observe_current_user();
        controller.check_login_status().await;
        controller
    }

    pub fn ui_state(&self) -> watch::Receiver<AuthUiState> {
        self.ui_state.subscribe()
    }

    pub fn current_user(&self) -> watch::Receiver<Option<User>> {
        self.current_user.subscribe()
    }

    pub fn ui_state_now(&self) -> AuthUiState {
        self.ui_state.borrow().clone()
    }

    pub fn current_user_now(&self) -> Option<User> {
        self.current_user.borrow().clone()
    }

    pub fn repository(&self) -> &Arc<SessionRepository> {
        &self.repository
    }

    /// ユーザー登録
    pub fn register(&self, email: &str, password: &str, name: &str) {
        let request = RegisterRequest::new(email, password, name);
        self.submit(move |repository| async move { repository.register(request).await });
    }

    /// ログイン
    pub fn login(&self, email: &str, password: &str) {
        let request = LoginRequest::new(email, password);
        self.submit(move |repository| async move { repository.login(request).await });
    }

    /// ログアウト
    pub fn logout(&self) {
        let repository = Arc::clone(&self.repository);
        let ui_state = Arc::clone(&self.ui_state);
        let current_user = Arc::clone(&self.current_user);

        self.spawn(async move {
            repository.logout().await;
            current_user.send_replace(None);
            ui_state.send_replace(AuthUiState::Initial);
        });
    }

    /// エラー状態のクリア
    pub fn clear_error(&self) {
        self.ui_state.send_replace(AuthUiState::Initial);
    }

    /// Abort every task still running on behalf of this controller.
    pub fn close(&self) {
        debug!("Closing auth controller");
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .abort_all();
    }

    fn submit<F, Fut>(&self, call: F)
    where
        F: FnOnce(Arc<SessionRepository>) -> Fut + Send + 'static,
        Fut: Future<Output = ApiResult<AuthResponse>> + Send + 'static,
    {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if self.options.cancel_superseded {
            if let Some(previous) = in_flight.take() {
                if !previous.is_finished() {
                    warn!("Cancelling superseded auth request");
                    previous.abort();
                }
            }
        }

        self.ui_state.send_replace(AuthUiState::Loading);

        let repository = Arc::clone(&self.repository);
        let ui_state = Arc::clone(&self.ui_state);
        let current_user = Arc::clone(&self.current_user);

        let handle = self.spawn(async move {
            let next = match call(repository).await {
                ApiResult::Success(response) => {
                    current_user.send_replace(Some(response.user.clone()));
                    AuthUiState::Success(response.user)
                }
                ApiResult::Error { message, .. } => AuthUiState::Error(message),
                ApiResult::Loading => AuthUiState::Loading,
            };
            ui_state.send_replace(next);
        });

        *in_flight = Some(handle);
    }

    fn observe_current_user(&self) {
        let mut updates = self.repository.current_user();
        let ui_state = Arc::clone(&self.ui_state);
        let current_user = Arc::clone(&self.current_user);

        self.spawn(async move {
            while let Some(user) = updates.next().await {
                current_user.send_replace(user.clone());
                match user {
                    Some(user) => {
                        ui_state.send_replace(AuthUiState::Success(user));
                    }
                    // A signed-in state cannot outlive its user record.
                    None => {
                        ui_state.send_if_modified(|state| {
                            if matches!(state, AuthUiState::Success(_)) {
                                *state = AuthUiState::Initial;
                                true
                            } else {
                                false
                            }
                        });
                    }
                }
            }
            debug!("Current user stream ended");
        });
    }

    async fn check_login_status(&self) {
        let logged_in = self.repository.is_user_logged_in().await;
        info!("Existing session: {}", logged_in);
        if !logged_in {
            self.ui_state.send_replace(AuthUiState::Initial);
        }
    }

    fn spawn<F>(&self, task: F) -> AbortHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        // Reap finished tasks so the set does not grow without bound.
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task)
    }
}
