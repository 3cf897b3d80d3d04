//! HTTP transport abstraction.
//!
//! Adapters never talk to `reqwest` directly: they go through the
//! [`HttpClient`] trait so every fetch path can be exercised offline with a
//! scripted transport. [`RetryingClient`] wraps any transport with the
//! retry/backoff/jitter policy shared by the whole pipeline.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::retry::RetryConfig;

/// HTTP request envelope used by adapter transport calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub timeout_ms: u64,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            timeout_ms: 90_000,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// HTTP response envelope returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

impl HttpResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            content_type: None,
        }
    }

    pub fn with_status(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
            content_type: None,
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Transport-level HTTP error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    message: String,
    retryable: bool,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Transport contract implemented by real and scripted clients.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: Arc::new(
                reqwest::Client::builder()
                    .user_agent("caribdata/0.1 (+github.com/CaribData)")
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            ),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .get(&request.url)
                .timeout(Duration::from_millis(request.timeout_ms));
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    HttpError::new(format!("request timeout: {e}"))
                } else if e.is_connect() {
                    HttpError::new(format!("connection failed: {e}"))
                } else {
                    HttpError::new(format!("request failed: {e}"))
                }
            })?;

            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let body = response
                .bytes()
                .await
                .map_err(|e| HttpError::new(format!("failed to read response body: {e}")))?
                .to_vec();

            Ok(HttpResponse {
                status,
                body,
                content_type,
            })
        })
    }
}

type Script = Mutex<Vec<(String, VecDeque<Result<HttpResponse, HttpError>>)>>;

/// Scripted transport for deterministic offline tests.
///
/// Responses are matched by URL substring and consumed in order; the last
/// response of a route is repeated once its queue drains. Unmatched URLs
/// fail with a non-retryable error so a missing fixture surfaces loudly.
#[derive(Debug, Default)]
pub struct ScriptedHttpClient {
    routes: Script,
    requests: Mutex<Vec<String>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, pattern: impl Into<String>, response: Result<HttpResponse, HttpError>) -> Self {
        self.route_sequence(pattern, vec![response])
    }

    pub fn route_sequence(
        self,
        pattern: impl Into<String>,
        responses: Vec<Result<HttpResponse, HttpError>>,
    ) -> Self {
        self.routes
            .lock()
            .expect("route table should not be poisoned")
            .push((pattern.into(), responses.into_iter().collect()));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("request log should not be poisoned")
            .clone()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        self.requests
            .lock()
            .expect("request log should not be poisoned")
            .push(request.url.clone());

        let mut routes = self.routes.lock().expect("route table should not be poisoned");
        let response = routes
            .iter_mut()
            .find(|(pattern, _)| request.url.contains(pattern.as_str()))
            .map(|(_, queue)| {
                if queue.len() > 1 {
                    queue.pop_front().expect("queue is non-empty")
                } else {
                    queue
                        .front()
                        .cloned()
                        .unwrap_or_else(|| Err(HttpError::non_retryable("scripted queue drained")))
                }
            })
            .unwrap_or_else(|| {
                Err(HttpError::non_retryable(format!(
                    "no scripted response for url '{}'",
                    request.url
                )))
            });
        drop(routes);

        Box::pin(async move { response })
    }
}

/// Transport decorator owning the retry loop and the pre-request jitter.
///
/// A successful non-2xx status that is not in the retryable list (or that
/// survives every retry) is surfaced as an [`HttpError`] so callers only
/// ever see successful responses on the `Ok` path.
#[derive(Clone)]
pub struct RetryingClient {
    inner: Arc<dyn HttpClient>,
    config: RetryConfig,
}

impl RetryingClient {
    pub fn new(inner: Arc<dyn HttpClient>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        self.get_with_timeout(url, self.config.timeout).await
    }

    pub async fn get_with_timeout(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<HttpResponse, HttpError> {
        let mut last_error: Option<HttpError> = None;

        for attempt in 0..=self.config.max_retries {
            if self.config.request_jitter {
                // Small random delay so repeated pulls never hit third-party
                // APIs in a tight burst.
                let jitter = Duration::from_millis(fastrand::u64(50..=250));
                tokio::time::sleep(jitter).await;
            }

            let request = HttpRequest::get(url)
                .with_timeout_ms(timeout.as_millis().min(u128::from(u64::MAX)) as u64);

            match self.inner.execute(request).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => {
                    let error = HttpError::new(format!(
                        "upstream returned status {} for {url}",
                        response.status
                    ));
                    if !self.config.should_retry_status(response.status) {
                        return Err(HttpError::non_retryable(error.message()));
                    }
                    last_error = Some(error);
                }
                Err(error) => {
                    if !error.retryable() {
                        return Err(error);
                    }
                    last_error = Some(error);
                }
            }

            if attempt < self.config.max_retries {
                tokio::time::sleep(self.config.delay_for_attempt(attempt)).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| HttpError::new(format!("request to {url} failed with no attempts"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::Backoff;

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            backoff: Backoff::Fixed {
                delay: Duration::from_millis(1),
            },
            request_jitter: false,
            ..RetryConfig::default()
        }
    }

    #[tokio::test]
    async fn retries_transient_status_then_succeeds() {
        let transport = ScriptedHttpClient::new().route_sequence(
            "example.test",
            vec![
                Ok(HttpResponse::with_status(503, "busy")),
                Ok(HttpResponse::with_status(503, "busy")),
                Ok(HttpResponse::ok("payload")),
            ],
        );
        let client = RetryingClient::new(Arc::new(transport), fast_config(4));

        let response = client
            .get("https://example.test/data")
            .await
            .expect("third attempt should succeed");
        assert_eq!(response.body, b"payload");
    }

    #[tokio::test]
    async fn exhausted_retries_surface_transport_error() {
        let transport =
            ScriptedHttpClient::new().route("example.test", Err(HttpError::new("connection reset")));
        let client = RetryingClient::new(Arc::new(transport), fast_config(2));

        let error = client
            .get("https://example.test/data")
            .await
            .expect_err("all attempts fail");
        assert!(error.message().contains("connection reset"));
    }

    #[tokio::test]
    async fn non_retryable_status_fails_immediately() {
        let transport = ScriptedHttpClient::new().route_sequence(
            "example.test",
            vec![
                Ok(HttpResponse::with_status(404, "missing")),
                Ok(HttpResponse::ok("never reached")),
            ],
        );
        let inner = Arc::new(transport);
        let client = RetryingClient::new(inner.clone(), fast_config(4));

        let error = client
            .get("https://example.test/data")
            .await
            .expect_err("404 is terminal");
        assert!(!error.retryable());
        assert_eq!(inner.requests().len(), 1);
    }
}
