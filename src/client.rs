use std::time::Instant;

use serde::Serialize;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;

use crate::api::{AuthApi, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, error_message};
use crate::config::{ClientConfig, endpoint};
use crate::error::Error;
use crate::stats::{LogRecord, LogSource, LogStatRecord};
use crate::types::{Credential, UserId};

/// HTTP client for the authentication, log and rate-limit backends.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ClientConfig,
    http: reqwest::Client,
}

/// Client-side event reported to `POST /frontend-logs`.
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct FrontendLog {
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_interaction_data: Option<serde_json::Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl FrontendLog {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            user_id: None,
            component_name: None,
            action_description: None,
            page_url: None,
            error_message: None,
            stack_trace: None,
            user_interaction_data: None,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    #[must_use]
    pub fn with_user_id(mut self, id: UserId) -> Self {
        self.user_id = Some(id);
        self
    }

    #[must_use]
    pub fn with_component(mut self, name: impl Into<String>) -> Self {
        self.component_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_action(mut self, description: impl Into<String>) -> Self {
        self.action_description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_interaction_data(mut self, data: serde_json::Value) -> Self {
        self.user_interaction_data = Some(data);
        self
    }
}

impl ApiClient {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch every raw log record from the security backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, [`Error::Api`] on a non-2xx
    /// response, or [`Error::Decode`] if the body is not an array of records.
    pub async fn fetch_logs(&self) -> Result<Vec<LogRecord>, Error> {
        let url = endpoint(&self.config.api_url, "/logs/all")?;
        let request = self.http.get(url);
        self.send_json(request, "fetch logs").await
    }

    /// Fetch aggregated log statistics from one backend.
    ///
    /// `credential` is attached as a bearer header when present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, [`Error::Api`] on a non-2xx
    /// response, or [`Error::Decode`] if a row is malformed.
    pub async fn fetch_log_stats(
        &self,
        source: LogSource,
        credential: Option<&Credential>,
    ) -> Result<Vec<LogStatRecord>, Error> {
        let base = match source {
            LogSource::Security => &self.config.api_url,
            LogSource::RateLimit => &self.config.rate_limit_url,
        };
        let url = endpoint(base, source.stats_path())?;
        let mut request = self.http.get(url);
        if let Some(credential) = credential {
            request = request.bearer_auth(credential.as_str());
        }
        self.send_json(request, "fetch log stats").await
    }

    /// Report a client-side event. Best effort: failures are logged, never returned.
    pub async fn log_event(&self, event: &FrontendLog) {
        let url = match endpoint(&self.config.api_url, "/frontend-logs") {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot build frontend log URL");
                return;
            }
        };
        let result = self.http.post(url).json(event).send().await;
        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(
                    status = response.status().as_u16(),
                    event_type = %event.event_type,
                    "Frontend log rejected"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, event_type = %event.event_type, "Failed to send frontend log");
            }
        }
    }

    /// Sends the request, checks the status and decodes the JSON body.
    async fn send_json<R: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> Result<R, Error> {
        let started = Instant::now();
        let response = request.send().await?;
        tracing::debug!(
            operation,
            status = response.status().as_u16(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Backend responded"
        );

        let response = Self::ensure_success(response, operation).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Decode(format!("{operation}: {e}")))
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(Error::Api {
            operation,
            status,
            message: error_message(&body),
        })
    }
}

impl AuthApi for ApiClient {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, Error> {
        let url = endpoint(&self.config.api_url, "/login")?;
        self.send_json(self.http.post(url).json(request), "login").await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, Error> {
        let url = endpoint(&self.config.api_url, "/register")?;
        self.send_json(self.http.post(url).json(request), "register").await
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> ApiClient {
        let url: url::Url = server.uri().parse().unwrap();
        ApiClient::new(
            ClientConfig::new()
                .with_api_url(url.clone())
                .with_rate_limit_url(url),
        )
    }

    #[tokio::test]
    async fn login_posts_credentials_and_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_json(serde_json::json!({
                "email": "a@b.com", "password": "pw", "token": "123456"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "t"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let response = client
            .login(&LoginRequest {
                email: "a@b.com".into(),
                password: "pw".into(),
                auth_code: "123456".into(),
            })
            .await
            .unwrap();
        assert_eq!(response.token.as_deref(), Some("t"));
    }

    #[tokio::test]
    async fn non_success_carries_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"message": "Email already registered"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .register(&RegisterRequest {
                email: "a@b.com".into(),
                username: "bob".into(),
                password: "secret1".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.server_message(), Some("Email already registered"));
    }

    #[tokio::test]
    async fn log_stats_use_bearer_and_backend_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rate/logs/stats"))
            .and(header("authorization", "Bearer cred"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"status_code": 429, "count": "3", "method": "GET", "path": "/login"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let rows = client
            .fetch_log_stats(LogSource::RateLimit, Some(&Credential::from("cred")))
            .await
            .unwrap();
        assert_eq!(rows, vec![LogStatRecord::new(429, 3).with_method("GET").with_path("/login")]);
    }

    #[tokio::test]
    async fn malformed_stats_are_decode_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logs/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"oops": 1})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.fetch_log_stats(LogSource::Security, None).await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[tokio::test]
    async fn fetch_logs_returns_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logs/all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 1, "method": "POST", "path": "/login", "status_code": 200}
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let logs = client.fetch_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].path.as_deref(), Some("/login"));
    }

    #[tokio::test]
    async fn log_event_swallows_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/frontend-logs"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .log_event(&FrontendLog::new("click").with_component("LoginForm"))
            .await;
    }

    #[test]
    fn frontend_log_serializes_rfc3339_timestamp() {
        let event = FrontendLog::new("error").with_error("boom");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "error");
        assert_eq!(json["error_message"], "boom");
        assert!(json.get("component_name").is_none());
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }
}
