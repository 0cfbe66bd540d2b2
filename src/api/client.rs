use super::ApiError;
use crate::config::Settings;
use crate::utils::truncate_str;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_retry::RetryIf;
use tracing::{debug, info, warn};

const INITIAL_BACKOFF_MS: u64 = 1000;
const MAX_ERROR_BODY_CHARS: usize = 500;

/// A fully resolved request handed to the transport
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Query pairs, absent values already dropped
    pub query: Vec<(String, String)>,
    /// JSON body
    pub body: Option<Value>,
}

/// Raw answer of the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

/// One HTTP round trip, no retries
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform the request. Only connectivity problems are errors, any
    /// status code is a successful round trip.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// `reqwest` backed transport with a per-request timeout
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport whose requests never outlive `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Transport` if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .header(CONTENT_TYPE, "application/json");

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

/// Client for the content service.
///
/// Every call goes through [`ApiClient::request`], which retries transport
/// failures with exponential backoff (1s, 2s, 4s, ...) and classifies
/// everything else immediately.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    attempts: u32,
    initial_backoff: Duration,
}

impl ApiClient {
    /// Build a client from settings
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Transport` if the HTTP client cannot be built.
    pub fn new(settings: &Settings) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(settings.api_timeout())?;
        Ok(Self::with_transport(
            Arc::new(transport),
            &settings.api_base_url,
            settings.api_attempts(),
        ))
    }

    /// Build a client on top of an arbitrary transport
    #[must_use]
    pub fn with_transport(transport: Arc<dyn HttpTransport>, base_url: &str, attempts: u32) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            attempts: attempts.max(1),
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Perform a request against the content service.
    ///
    /// Query pairs with a `None` value are left out. A 2xx answer with an
    /// empty body yields `Value::Null`.
    ///
    /// # Errors
    ///
    /// * `ApiError::Client` for any non-2xx answer, without retrying
    /// * `ApiError::Transport` once every attempt failed to reach the service
    /// * `ApiError::Decode` if a 2xx body is not JSON
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        query: &[(&str, Option<String>)],
    ) -> Result<Value, ApiError> {
        let request = HttpRequest {
            method,
            url: self.url(path),
            query: query
                .iter()
                .filter_map(|(key, value)| value.as_ref().map(|v| ((*key).to_string(), v.clone())))
                .collect(),
            body,
        };

        let mut attempt = 0u32;
        let max_attempts = self.attempts;
        let result = RetryIf::spawn(
            backoff_schedule(self.initial_backoff, self.attempts),
            || {
                attempt += 1;
                let current = attempt;
                let request = request.clone();
                let transport = Arc::clone(&self.transport);
                async move {
                    let start = Instant::now();
                    let url = request.url.clone();
                    let result = transport.execute(request).await.and_then(classify);
                    match &result {
                        Ok(_) if current > 1 => info!(
                            url = %url,
                            attempt = current,
                            duration_ms = start.elapsed().as_millis(),
                            "API retry succeeded"
                        ),
                        Ok(_) => debug!(
                            url = %url,
                            duration_ms = start.elapsed().as_millis(),
                            "API request completed"
                        ),
                        Err(e) => warn!(
                            url = %url,
                            attempt = current,
                            max_attempts = max_attempts,
                            error = %e,
                            "API request failed"
                        ),
                    }
                    result
                }
            },
            |e: &ApiError| e.is_retryable(),
        )
        .await;

        if let Err(ApiError::Transport(e)) = &result {
            warn!(path = path, attempts = attempt, error = %e, "API retries exhausted");
        }
        result
    }
}

/// Delays between consecutive attempts: `initial * 2^n`, one fewer than attempts
fn backoff_schedule(initial: Duration, attempts: u32) -> impl Iterator<Item = Duration> {
    (0..attempts.saturating_sub(1)).map(move |n| initial.saturating_mul(2u32.saturating_pow(n)))
}

fn classify(response: HttpResponse) -> Result<Value, ApiError> {
    if !(200..300).contains(&response.status) {
        return Err(ApiError::Client {
            status: response.status,
            message: error_message(&response.body),
        });
    }

    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
}

fn error_message(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        match map.get("detail") {
            Some(Value::String(detail)) => return detail.clone(),
            Some(detail) => return detail.to_string(),
            None => {}
        }
    }

    let trimmed = body.trim_start();
    // Proxies answer with HTML pages
    if trimmed.starts_with("<!DOCTYPE") || trimmed.starts_with("<html") || trimmed.starts_with("<HTML") {
        return "Server returned HTML error page".to_string();
    }
    if trimmed.is_empty() {
        return "Unknown error".to_string();
    }
    if body.chars().count() > MAX_ERROR_BODY_CHARS {
        return format!("{}... (truncated)", truncate_str(body, MAX_ERROR_BODY_CHARS));
    }
    body.to_string()
}
