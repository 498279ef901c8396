use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::retry::{retry_with_backoff, RetryConfig, RetryDecision};
use crate::domain::DomainError;

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout_secs: u64,
    pub retry: RetryConfig,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 100,
            retry: RetryConfig::default(),
            user_agent: format!("kernel-connectors/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// How a connector authenticates against its vendor.
#[derive(Clone)]
pub enum Auth {
    None,
    Bearer(String),
    Header { name: String, value: String },
}

impl Auth {
    pub fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Header {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Bearer auth, or none when the key is empty (local servers).
    pub fn bearer_if_set(key: Option<String>) -> Self {
        match key {
            Some(k) if !k.is_empty() => Self::Bearer(k),
            _ => Self::None,
        }
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bearer(_) => f.write_str("Bearer(***)"),
            Self::Header { name, .. } => write!(f, "Header({name}: ***)"),
        }
    }
}

/// One failed attempt, plus the server's requested back-off if any.
struct AttemptFailure {
    error: DomainError,
    retry_after: Option<Duration>,
}

impl AttemptFailure {
    fn new(error: DomainError) -> Self {
        Self {
            error,
            retry_after: None,
        }
    }

    fn decision(&self) -> RetryDecision {
        if !self.error.is_transient() {
            return RetryDecision::Stop;
        }
        match self.retry_after {
            Some(d) => RetryDecision::RetryAfter(d),
            None => RetryDecision::Retry,
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

/// JSON-over-HTTP client shared by every connector.
///
/// Adds auth and static headers, retries transient failures with backoff and
/// turns vendor error bodies into [`DomainError::Service`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    auth: Auth,
    headers: Vec<(String, String)>,
    retry: RetryConfig,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        auth: Auth,
        config: HttpClientConfig,
    ) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| DomainError::internal(format!("Failed to build HTTP client: {e}")))?;

        let base: String = base_url.into();
        Ok(Self {
            client,
            base_url: base.trim_end_matches('/').to_string(),
            auth,
            headers: Vec::new(),
            retry: config.retry,
        })
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.is_empty() {
            return self.base_url.clone();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self.client.request(method, self.url(path));
        builder = match &self.auth {
            Auth::None => builder,
            Auth::Bearer(key) => builder.bearer_auth(key),
            Auth::Header { name, value } => builder.header(name.as_str(), value.as_str()),
        };
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }

    /// Send with retries. `accept` decides which statuses are handed back to
    /// the caller instead of being turned into errors.
    async fn execute<F, A>(
        &self,
        method: Method,
        path: &str,
        build: F,
        accept: A,
    ) -> Result<Response, DomainError>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
        A: Fn(StatusCode) -> bool,
    {
        debug!("{} {}", method, self.url(path));

        let result = retry_with_backoff(
            || {
                let request = build(self.request(method.clone(), path));
                let accept = &accept;
                async move {
                    let response = request
                        .send()
                        .await
                        .map_err(|e| AttemptFailure::new(DomainError::from(e)))?;
                    if accept(response.status()) {
                        Ok(response)
                    } else {
                        Err(failure_from_response(response).await)
                    }
                }
            },
            &self.retry,
            AttemptFailure::decision,
        )
        .await;

        result.map_err(|failure| {
            warn!("{} {} failed: {}", method, self.url(path), failure.error);
            failure.error
        })
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, DomainError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = match body {
            Some(b) => Some(Bytes::from(serde_json::to_vec(b)?)),
            None => None,
        };
        let response = self
            .execute(
                method,
                path,
                |rb| match &payload {
                    Some(p) => rb.header(CONTENT_TYPE, "application/json").body(p.clone()),
                    None => rb,
                },
                |s| s.is_success(),
            )
            .await?;
        parse_json(response).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DomainError> {
        self.send_json::<(), T>(Method::GET, path, None).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, DomainError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, path, Some(body)).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, DomainError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PUT, path, Some(body)).await
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DomainError> {
        self.send_json::<(), T>(Method::DELETE, path, None).await
    }

    /// DELETE that ignores the response body.
    pub async fn delete(&self, path: &str) -> Result<(), DomainError> {
        self.execute(Method::DELETE, path, |rb| rb, |s| s.is_success())
            .await
            .map(|_| ())
    }

    /// POST JSON and return the raw response bytes (binary payloads such as audio).
    pub async fn post_json_raw<B>(&self, path: &str, body: &B) -> Result<Bytes, DomainError>
    where
        B: Serialize + ?Sized,
    {
        let payload = Bytes::from(serde_json::to_vec(body)?);
        let response = self
            .execute(
                Method::POST,
                path,
                |rb| {
                    rb.header(CONTENT_TYPE, "application/json")
                        .body(payload.clone())
                },
                |s| s.is_success(),
            )
            .await?;
        response
            .bytes()
            .await
            .map_err(|e| DomainError::transport(format!("Failed to read response body: {e}")))
    }

    /// POST a multipart form. `form` is invoked once per attempt since forms
    /// cannot be cloned.
    pub async fn post_multipart<T, F>(&self, path: &str, form: F) -> Result<T, DomainError>
    where
        T: DeserializeOwned,
        F: Fn() -> Result<Form, DomainError>,
    {
        // Validate up front so a bad form is reported instead of retried.
        form()?;
        let response = self
            .execute(
                Method::POST,
                path,
                |rb| match form() {
                    Ok(f) => rb.multipart(f),
                    Err(_) => rb,
                },
                |s| s.is_success(),
            )
            .await?;
        parse_json(response).await
    }

    /// POST JSON and hand back the response for incremental reading.
    ///
    /// Only establishing the response is retried; the body is the caller's.
    pub async fn post_stream<B>(&self, path: &str, body: &B) -> Result<Response, DomainError>
    where
        B: Serialize + ?Sized,
    {
        let payload = Bytes::from(serde_json::to_vec(body)?);
        self.execute(
            Method::POST,
            path,
            |rb| {
                rb.header(CONTENT_TYPE, "application/json")
                    .header(reqwest::header::ACCEPT, "text/event-stream")
                    .body(payload.clone())
            },
            |s| s.is_success(),
        )
        .await
    }

    /// Send and return status plus body without failing on client errors such
    /// as 404. Transient statuses are still retried.
    pub async fn send_raw<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(StatusCode, String), DomainError>
    where
        B: Serialize + ?Sized,
    {
        let payload = match body {
            Some(b) => Some(Bytes::from(serde_json::to_vec(b)?)),
            None => None,
        };
        let response = self
            .execute(
                method,
                path,
                |rb| match &payload {
                    Some(p) => rb.header(CONTENT_TYPE, "application/json").body(p.clone()),
                    None => rb,
                },
                |s| !is_transient_status(s),
            )
            .await?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DomainError::transport(format!("Failed to read response body: {e}")))?;
        Ok((status, text))
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    let code = status.as_u16();
    code == 408 || code == 429 || status.is_server_error()
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, DomainError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| DomainError::transport(format!("Failed to read response body: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| {
        DomainError::parse(format!(
            "Failed to parse response: {e}: {}",
            String::from_utf8_lossy(&bytes)
        ))
    })
}

async fn failure_from_response(response: Response) -> AttemptFailure {
    let status = response.status();
    let retry_after = retry_after(response.headers());
    let body = response.text().await.unwrap_or_default();
    AttemptFailure {
        error: DomainError::service(status.as_u16(), error_message(status, &body)),
        retry_after: if status == StatusCode::TOO_MANY_REQUESTS
            || status == StatusCode::SERVICE_UNAVAILABLE
        {
            retry_after
        } else {
            None
        },
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    if let Some(ms) = headers
        .get("retry-after-ms")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
    {
        return Some(Duration::from_millis(ms));
    }
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

/// Pull a human-readable message out of the error shapes vendors use.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    let fallback = || {
        if body.trim().is_empty() {
            status.to_string()
        } else {
            body.trim().to_string()
        }
    };

    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return fallback();
    };

    let candidates = [
        value.pointer("/error/message"),
        value.pointer("/message"),
        value.pointer("/error/0/message"),
        value.pointer("/status/error"),
        value.pointer("/detail"),
        value.get("error"),
    ];
    let found = candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str().map(str::to_string));
    found.unwrap_or_else(fallback)
}
