use std::env;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as ReqwestClient, Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use time::OffsetDateTime;
use url::Url;

use crate::backend::ChatBackend;
use crate::connection::ConnectionStatus;
use crate::error::{Error, Result, UNREACHABLE_MESSAGE};
use crate::request_log::{RequestLogger, RequestOutcome, RequestTracker, TracingLogger};
use crate::types::{ChatHistory, ChatRequest, ChatResponse, ClearAck, HealthStatus, ModelInfo};
use crate::utils::time::format_timestamp;

const DEFAULT_API_URL: &str = "http://localhost:8000/";
const DEFAULT_CLIENT_NAME: &str = "novachat";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Environment variable consulted for the base URL.
pub const API_URL_ENV: &str = "NOVA_API_URL";

/// Header naming the client application.
pub const CLIENT_HEADER: &str = "x-nova-client";
/// Header carrying the client version.
pub const VERSION_HEADER: &str = "x-nova-version";
/// Header carrying the time the request was built, RFC 3339.
pub const TIMESTAMP_HEADER: &str = "x-request-timestamp";

/// Settings for a [`NovaClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the NOVA API.
    pub base_url: String,

    /// Value of the client identity header.
    pub client_name: String,

    /// Value of the client version header.
    pub client_version: String,

    /// Timeout for chat, history and model calls.
    pub timeout: Duration,

    /// Timeout for health checks.
    pub health_timeout: Duration,
}

impl ClientConfig {
    /// Creates a config with the default settings.
    ///
    /// Defaults:
    /// - Base URL: `http://localhost:8000/`
    /// - Client name: `novachat`
    /// - Timeout: 30 seconds (5 seconds for health checks)
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            client_version: CLIENT_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
        }
    }

    /// Creates the default config, taking the base URL from `NOVA_API_URL`
    /// when it is set.
    pub fn from_env() -> Self {
        let config = Self::new();
        match env::var(API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => config.with_base_url(url),
            _ => config,
        }
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the client identity header value.
    pub fn with_client_name(mut self, client_name: impl Into<String>) -> Self {
        self.client_name = client_name.into();
        self
    }

    /// Sets the timeout for chat, history and model calls.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the timeout for health checks.
    pub fn with_health_timeout(mut self, health_timeout: Duration) -> Self {
        self.health_timeout = health_timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Client for the NOVA chat API.
///
/// The client holds the active session id: it is assigned by the first
/// successful chat response and used by every later chat and history call.
/// Every failed call that reached for the network marks the shared
/// [`ConnectionStatus`] disconnected.
pub struct NovaClient {
    client: ReqwestClient,
    base_url: Url,
    headers: HeaderMap,
    timeout: Duration,
    health_timeout: Duration,
    session_id: RwLock<Option<String>>,
    connection: ConnectionStatus,
    tracker: RequestTracker,
}

impl NovaClient {
    /// Create a new client that records reachability into `connection`.
    pub fn new(config: ClientConfig, connection: ConnectionStatus) -> Result<Self> {
        let mut base_url = Url::parse(config.base_url.trim())?;
        if base_url.cannot_be_a_base() {
            return Err(Error::configuration(
                format!("{} cannot be used as a base URL", config.base_url),
                None,
            ));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let headers = Self::default_headers(&config)?;
        let client = ReqwestClient::builder().build().map_err(|e| {
            Error::configuration(
                format!("Failed to build HTTP client: {}", e),
                Some(Box::new(e)),
            )
        })?;

        Ok(Self {
            client,
            base_url,
            headers,
            timeout: config.timeout,
            health_timeout: config.health_timeout,
            session_id: RwLock::new(None),
            connection,
            tracker: RequestTracker::new(Arc::new(TracingLogger)),
        })
    }

    /// Replaces the request logger.  The default logs through `tracing`.
    pub fn with_logger(mut self, logger: Arc<dyn RequestLogger>) -> Self {
        self.tracker.set_logger(logger);
        self
    }

    /// Returns the base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the connection status this client updates.
    pub fn connection(&self) -> &ConnectionStatus {
        &self.connection
    }

    /// Returns the number of requests dispatched but not yet resolved.
    pub fn active_requests(&self) -> usize {
        self.tracker.active()
    }

    /// Returns the active session id.
    pub fn session_id(&self) -> Option<String> {
        self.session_id.read().clone()
    }

    /// Forgets the active session id; the next chat starts a new session.
    pub fn reset_session(&self) {
        *self.session_id.write() = None;
    }

    /// Calls `GET /health`.
    pub async fn check_health(&self) -> Result<HealthStatus> {
        self.execute::<HealthStatus, ()>(Method::GET, &["health"], None, self.health_timeout)
            .await
    }

    /// Send a message with `POST /chat`.
    ///
    /// A session id in the response becomes the active session id.
    pub async fn send_message(&self, text: &str, user_id: &str) -> Result<ChatResponse> {
        let request = ChatRequest::new(text)
            .with_user_id(user_id)
            .with_session_id(self.session_id());
        let response: ChatResponse = self
            .execute(Method::POST, &["chat"], Some(&request), self.timeout)
            .await?;
        if let Some(session_id) = response.session_id.as_deref().filter(|s| !s.is_empty()) {
            let mut slot = self.session_id.write();
            if slot.as_deref() != Some(session_id) {
                tracing::debug!(session_id, "NOVA session assigned");
                *slot = Some(session_id.to_string());
            }
        }
        Ok(response)
    }

    /// Fetch the active session's history with `GET /chat/history/{id}`.
    ///
    /// Fails without a network call when no session is active.
    pub async fn chat_history(&self) -> Result<ChatHistory> {
        let session_id = self.session_id().ok_or_else(Error::no_active_session)?;
        let raw: Value = self
            .execute::<Value, ()>(
                Method::GET,
                &["chat", "history", session_id.as_str()],
                None,
                self.timeout,
            )
            .await?;
        Ok(ChatHistory::from_value(raw))
    }

    /// Delete the active session's history with `DELETE /chat/history/{id}`.
    ///
    /// Fails without a network call when no session is active.  Any success
    /// body is accepted, including an empty one.
    pub async fn clear_history(&self) -> Result<ClearAck> {
        let session_id = self.session_id().ok_or_else(Error::no_active_session)?;
        let raw: Value = self
            .execute::<Value, ()>(
                Method::DELETE,
                &["chat", "history", session_id.as_str()],
                None,
                self.timeout,
            )
            .await?;
        Ok(ClearAck::from_value(&raw))
    }

    /// List available models with `GET /ai/models`.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        self.execute::<Vec<ModelInfo>, ()>(Method::GET, &["ai", "models"], None, self.timeout)
            .await
    }

    /// Create and return the headers sent with every request, except the
    /// per-request timestamp.
    fn default_headers(config: &ClientConfig) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in [
            (CLIENT_HEADER, &config.client_name),
            (VERSION_HEADER, &config.client_version),
        ] {
            let value = HeaderValue::from_str(value).map_err(|e| {
                Error::configuration(
                    format!("Invalid value for {name}: {e}"),
                    Some(Box::new(e)),
                )
            })?;
            headers.insert(HeaderName::from_static(name), value);
        }
        Ok(headers)
    }

    fn request_headers(&self) -> Result<HeaderMap> {
        let mut headers = self.headers.clone();
        let now = format_timestamp(&OffsetDateTime::now_utc());
        let value = HeaderValue::from_str(&now).map_err(|e| {
            Error::configuration(
                format!("Invalid request timestamp {now}: {e}"),
                Some(Box::new(e)),
            )
        })?;
        headers.insert(HeaderName::from_static(TIMESTAMP_HEADER), value);
        Ok(headers)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                Error::configuration(format!("{} cannot be used as a base URL", self.base_url), None)
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Issue one request: attach headers, apply the timeout, log the outcome,
    /// and mark the connection lost on failure.
    async fn execute<T, B>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
        timeout: Duration,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(segments)?;
        let in_flight = self.tracker.start(method.as_str(), url.path());

        let result = self.dispatch(method, url, body, timeout).await;
        match &result {
            Ok((status_code, _)) => in_flight.finish(RequestOutcome::Success {
                status_code: *status_code,
            }),
            Err(err) => {
                in_flight.finish(RequestOutcome::Failure {
                    status_code: err.status_code(),
                    message: err.message().to_string(),
                });
                if err.affects_connection() {
                    self.connection.set(false);
                }
            }
        }
        result.map(|(_, value)| value)
    }

    async fn dispatch<T, B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        timeout: Duration,
    ) -> Result<(u16, T)>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut request = self
            .client
            .request(method, url)
            .headers(self.request_headers()?)
            .timeout(timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status_code = response.status().as_u16();
        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, timeout))?;
        let decoded = if bytes.iter().all(u8::is_ascii_whitespace) {
            serde_json::from_value::<T>(Value::Null)
        } else {
            serde_json::from_slice::<T>(&bytes)
        };
        let value = decoded.map_err(|e| {
            Error::decode(
                status_code,
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })?;
        Ok((status_code, value))
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();
        let detail = match response.text().await {
            Ok(body) => extract_detail(&body),
            Err(_) => None,
        };
        Error::from_status(status_code, detail.as_deref())
    }
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> Error {
    let message = if err.is_timeout() {
        format!(
            "The NOVA API did not answer within {} seconds",
            timeout.as_secs_f64()
        )
    } else {
        UNREACHABLE_MESSAGE.to_string()
    };
    Error::transport(message, Some(Box::new(err)))
}

/// Pull the human-readable `detail` out of an error body.
///
/// FastAPI sends `{"detail": "..."}` for raised errors and
/// `{"detail": [{"msg": "...", ...}]}` for validation failures.
fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(detail) => Some(detail.clone()),
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}

#[async_trait::async_trait]
impl ChatBackend for NovaClient {
    async fn check_health(&self) -> Result<HealthStatus> {
        NovaClient::check_health(self).await
    }

    async fn send_message(&self, text: &str, user_id: &str) -> Result<ChatResponse> {
        NovaClient::send_message(self, text, user_id).await
    }

    async fn chat_history(&self) -> Result<ChatHistory> {
        NovaClient::chat_history(self).await
    }

    async fn clear_history(&self) -> Result<ClearAck> {
        NovaClient::clear_history(self).await
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        NovaClient::list_models(self).await
    }

    fn session_id(&self) -> Option<String> {
        NovaClient::session_id(self)
    }

    fn reset_session(&self) {
        NovaClient::reset_session(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = NovaClient::new(ClientConfig::new(), ConnectionStatus::new()).unwrap();
        assert_eq!(client.base_url().as_str(), DEFAULT_API_URL);
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);
        assert_eq!(client.health_timeout, DEFAULT_HEALTH_TIMEOUT);
        assert!(client.session_id().is_none());
        assert_eq!(client.active_requests(), 0);

        let config = ClientConfig::new()
            .with_base_url("https://nova.example.com/api")
            .with_timeout(Duration::from_secs(10))
            .with_health_timeout(Duration::from_secs(1));
        let client = NovaClient::new(config, ConnectionStatus::new()).unwrap();
        assert_eq!(client.base_url().as_str(), "https://nova.example.com/api/");
        assert_eq!(client.timeout, Duration::from_secs(10));
        assert_eq!(client.health_timeout, Duration::from_secs(1));
    }

    #[test]
    fn endpoints_are_joined_under_base_path() {
        let config = ClientConfig::new().with_base_url("https://nova.example.com/api/");
        let client = NovaClient::new(config, ConnectionStatus::new()).unwrap();
        assert_eq!(
            client.endpoint(&["chat"]).unwrap().as_str(),
            "https://nova.example.com/api/chat"
        );
        assert_eq!(
            client.endpoint(&["chat", "history", "a b/c"]).unwrap().as_str(),
            "https://nova.example.com/api/chat/history/a%20b%2Fc"
        );

        let client = NovaClient::new(ClientConfig::new(), ConnectionStatus::new()).unwrap();
        assert_eq!(
            client.endpoint(&["ai", "models"]).unwrap().as_str(),
            "http://localhost:8000/ai/models"
        );
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let bad_url = ClientConfig::new().with_base_url("not a url");
        let err = NovaClient::new(bad_url, ConnectionStatus::new()).err().unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);

        let bad_header = ClientConfig::new().with_client_name("line\nbreak");
        let err = NovaClient::new(bad_header, ConnectionStatus::new())
            .err()
            .unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[test]
    fn request_headers_carry_identity_and_timestamp() {
        let config = ClientConfig::new().with_client_name("test-suite");
        let client = NovaClient::new(config, ConnectionStatus::new()).unwrap();
        let headers = client.request_headers().unwrap();
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers[CLIENT_HEADER], "test-suite");
        assert_eq!(headers[VERSION_HEADER], CLIENT_VERSION);
        let stamp = headers[TIMESTAMP_HEADER].to_str().unwrap();
        assert!(crate::utils::time::parse_timestamp(stamp).is_ok());
    }

    #[tokio::test]
    async fn history_calls_need_a_session() {
        let status = ConnectionStatus::new();
        status.set(true);
        let client = NovaClient::new(ClientConfig::new(), status.clone()).unwrap();

        let err = client.chat_history().await.unwrap_err();
        assert!(err.is_no_active_session());
        let err = client.clear_history().await.unwrap_err();
        assert!(err.is_no_active_session());

        // Nothing was dispatched, so the connection is untouched.
        assert!(status.get());
        assert_eq!(client.active_requests(), 0);
    }

    #[test]
    fn detail_extraction() {
        assert_eq!(
            extract_detail(r#"{"detail": "Session non trouvée"}"#).as_deref(),
            Some("Session non trouvée")
        );
        assert_eq!(
            extract_detail(
                r#"{"detail": [{"loc": ["body", "message"], "msg": "field required"}]}"#
            )
            .as_deref(),
            Some("field required")
        );
        assert_eq!(extract_detail("Internal Server Error"), None);
        assert_eq!(extract_detail(r#"{"error": "x"}"#), None);
    }
}
