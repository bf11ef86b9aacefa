use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// ユーザー情報
///
/// Records are keyed by `id`; writing a record with an existing `id`
/// replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_email_verified: bool,
    #[serde(default = "now_millis", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "now_millis", with = "chrono::serde::ts_milliseconds")]
    pub last_login_at: DateTime<Utc>,
}

// Timestamps travel as epoch milliseconds, so keep them at that precision.
fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

impl User {
    /// Create a user with default avatar, verification flag and timestamps.
    pub fn new(id: impl Into<String>, email: impl Into<String>, name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: id.into(),
            email: email.into(),
            name: name.into(),
            avatar_url: None,
            is_email_verified: false,
            created_at: now,
            last_login_at: now,
        }
    }

    /// Blank placeholder record.
    pub fn empty() -> Self {
        Self::new("", "", "")
    }

    pub fn with_avatar_url(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = Some(avatar_url.into());
        self
    }

    pub fn with_email_verified(mut self, verified: bool) -> Self {
        self.is_email_verified = verified;
        self
    }
}

/// ユーザー登録リクエスト
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl RegisterRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            name: name.into(),
        }
    }
}

/// ログインリクエスト
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// 認証レスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// Avatar image sent to `user/avatar`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Avatar {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Avatar {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}
