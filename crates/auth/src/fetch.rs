//! HTTP request helper shared by the auth client

use crate::error::AuthError;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{multipart::Form, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

pub(crate) const CLIENT_INFO: &str = concat!("account-rust/", env!("CARGO_PKG_VERSION"));

enum Body {
    Json(Vec<u8>),
    Multipart(Form),
}

/// Helper for building and executing HTTP requests
pub(crate) struct FetchBuilder<'a> {
    client: &'a Client,
    url: Url,
    method: Method,
    headers: HeaderMap,
    body: Option<Body>,
}

impl<'a> FetchBuilder<'a> {
    fn new(client: &'a Client, url: Url, method: Method) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert("x-client-info", HeaderValue::from_static(CLIENT_INFO));

        Self {
            client,
            url,
            method,
            headers,
            body: None,
        }
    }

    /// Add bearer token authentication to the request
    pub(crate) fn bearer_auth(mut self, token: &str) -> Result<Self, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::MissingCredential);
        }
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| AuthError::InvalidToken("token contains invalid characters".to_string()))?;
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    /// Add a JSON body to the request
    pub(crate) fn json<T: Serialize>(mut self, body: &T) -> Result<Self, AuthError> {
        let json = serde_json::to_vec(body)?;
        self.body = Some(Body::Json(json));
        Ok(self)
    }

    /// Add a multipart body to the request
    pub(crate) fn multipart(mut self, form: Form) -> Self {
        self.body = Some(Body::Multipart(form));
        self
    }

    fn build(self) -> RequestBuilder {
        let mut req = self
            .client
            .request(self.method, self.url.as_str())
            .headers(self.headers);

        match self.body {
            Some(Body::Json(bytes)) => {
                req = req
                    .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                    .body(bytes);
            }
            Some(Body::Multipart(form)) => {
                req = req.multipart(form);
            }
            None => {
                req = req.header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
        }

        req
    }

    /// Execute the request and parse the response as JSON
    pub(crate) async fn execute<T: DeserializeOwned>(self) -> Result<T, AuthError> {
        let method = self.method.clone();
        let url = self.url.clone();
        debug!("{} {}", method, url);

        let response = self.build().send().await?;

        if !response.status().is_success() {
            let err = server_error(response).await;
            warn!("{} {} failed: {}", method, url, err);
            return Err(err);
        }

        let bytes = response.bytes().await?;
        let result = serde_json::from_slice::<T>(&bytes)?;
        Ok(result)
    }
}

/// Turn a non-2xx response into `AuthError::Server`, preferring the
/// `message` (or `error`) field of a JSON body over the raw text.
async fn server_error(response: Response) -> AuthError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    let from_json = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|body| {
            ["message", "error", "msg"]
                .iter()
                .find_map(|key| body.get(*key).and_then(|v| v.as_str()).map(str::to_string))
        });

    let message = match from_json {
        Some(message) => message,
        None if !text.trim().is_empty() => text.trim().to_string(),
        None => status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string(),
    };

    AuthError::Server {
        status: status.as_u16(),
        message,
    }
}

/// Helper for creating HTTP requests
pub(crate) struct Fetch;

impl Fetch {
    /// Create a GET request
    pub(crate) fn get(client: &Client, url: Url) -> FetchBuilder<'_> {
        FetchBuilder::new(client, url, Method::GET)
    }

    /// Create a POST request
    pub(crate) fn post(client: &Client, url: Url) -> FetchBuilder<'_> {
        FetchBuilder::new(client, url, Method::POST)
    }

    /// Create a PUT request
    pub(crate) fn put(client: &Client, url: Url) -> FetchBuilder<'_> {
        FetchBuilder::new(client, url, Method::PUT)
    }
}
