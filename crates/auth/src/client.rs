use crate::error::AuthError;
use crate::fetch::Fetch;
use crate::models::{AuthResponse, Avatar, LoginRequest, RegisterRequest, User};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Remote account service.
///
/// Each call either yields a value or fails with a transport,
/// deserialization or server error. No retries and no timeouts are applied
/// at this level; the HTTP client decides the timeout policy.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// ユーザー登録
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, AuthError>;

    /// ログイン
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, AuthError>;

    /// プロフィール取得
    async fn fetch_profile(&self, token: &str) -> Result<User, AuthError>;

    /// プロフィール更新
    async fn update_profile(&self, token: &str, user: &User) -> Result<User, AuthError>;

    /// アバター画像のアップロード
    async fn upload_avatar(&self, token: &str, avatar: Avatar) -> Result<User, AuthError>;
}

/// Auth クライアント
#[derive(Debug, Clone)]
pub struct AuthClient {
    base_url: Url,
    http_client: Client,
}

impl AuthClient {
    /// 新しい Auth クライアントを作成
    pub fn new(base_url: &str) -> Result<Self, AuthError> {
        Self::with_http_client(base_url, Client::new())
    }

    /// Create a client whose requests time out after `timeout`.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, AuthError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Self::with_http_client(base_url, http_client)
    }

    /// Create a client on top of an existing reqwest client.
    pub fn with_http_client(base_url: &str, http_client: Client) -> Result<Self, AuthError> {
        // `Url::join` drops the last segment unless the base ends with a slash.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)?;
        info!("Auth client targeting {}", base_url);

        Ok(Self {
            base_url,
            http_client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        Ok(self.base_url.join(path)?)
    }
}

#[async_trait]
impl RemoteClient for AuthClient {
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, AuthError> {
        debug!("Registering {}", request.email);
        Fetch::post(&self.http_client, self.endpoint("auth/register")?)
            .json(request)?
            .execute::<AuthResponse>()
            .await
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, AuthError> {
        debug!("Logging in {}", request.email);
        Fetch::post(&self.http_client, self.endpoint("auth/login")?)
            .json(request)?
            .execute::<AuthResponse>()
            .await
    }

    async fn fetch_profile(&self, token: &str) -> Result<User, AuthError> {
        Fetch::get(&self.http_client, self.endpoint("user/profile")?)
            .bearer_auth(token)?
            .execute::<User>()
            .await
    }

    async fn update_profile(&self, token: &str, user: &User) -> Result<User, AuthError> {
        Fetch::put(&self.http_client, self.endpoint("user/profile")?)
            .bearer_auth(token)?
            .json(user)?
            .execute::<User>()
            .await
    }

    async fn upload_avatar(&self, token: &str, avatar: Avatar) -> Result<User, AuthError> {
        let part = Part::bytes(avatar.bytes)
            .file_name(avatar.file_name)
            .mime_str(&avatar.content_type)?;
        let form = Form::new().part("avatar", part);

        Fetch::post(&self.http_client, self.endpoint("user/avatar")?)
            .bearer_auth(token)?
            .multipart(form)
            .execute::<User>()
            .await
    }
}
