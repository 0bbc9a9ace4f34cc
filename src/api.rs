use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Body of `POST /login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// One-time code from the authenticator app.
    #[serde(rename = "token")]
    pub auth_code: String,
}

/// Successful response of `POST /login`.
#[derive(Debug, Clone, Default, Deserialize)]
#[non_exhaustive]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl LoginResponse {
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            message: None,
        }
    }
}

/// Body of `POST /register`. Fields are sent already normalized.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Successful response of `POST /register`.
///
/// Any other fields the server adds are ignored; setup instructions are a
/// client-side constant.
#[derive(Debug, Clone, Default, Deserialize)]
#[non_exhaustive]
pub struct RegisterResponse {
    #[serde(default, rename = "secretKey")]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RegisterResponse {
    #[must_use]
    pub fn with_secret_key(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: Some(secret_key.into()),
            message: None,
        }
    }
}

/// Remote authentication operations the session store depends on.
///
/// [`ApiClient`](crate::client::ApiClient) is the HTTP implementation.
/// Implementations return `Error::Api` for non-2xx responses (with the
/// server's `message` when present) and `Error::Http`/`Error::Network` for
/// transport failures.
///
/// # Example
///
/// ```rust,ignore
/// impl AuthApi for FixedBackend {
///     async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, Error> {
///         Ok(LoginResponse::with_token(self.token.clone()))
///     }
///
///     async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, Error> {
///         Ok(RegisterResponse::with_secret_key("JBSWY3DPEHPK3PXP"))
///     }
/// }
/// ```
pub trait AuthApi: Send + Sync + 'static {
    /// `POST /login`.
    fn login(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<LoginResponse, Error>> + Send;

    /// `POST /register`.
    fn register(
        &self,
        request: &RegisterRequest,
    ) -> impl Future<Output = Result<RegisterResponse, Error>> + Send;
}

/// Extracts the `message` field from a JSON error body.
pub(crate) fn error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
}
