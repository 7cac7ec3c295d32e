//! HTTP transport for the remote catalog

use super::retry::{decision_from_http_status, parse_retry_after, RetryDecision, RetryPolicy};
use crate::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ETAG, IF_NONE_MATCH, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Header carrying the next page cursor when the body omits it
pub const NEXT_CURSOR_HEADER: &str = "x-next-cursor";
pub const TENANT_MODE_HEADER: &str = "x-tenant-mode";
pub const AUDIENCE_SCOPE_HEADER: &str = "x-audience-scope";

/// Connection settings for the catalog API
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub tenant_mode: String,
    pub audience_scope: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.echoridge.example".to_string(),
            tenant_mode: "universal".to_string(),
            audience_scope: "public".to_string(),
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// A successful (2xx or 304) response
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    /// `None` on 304
    pub body: Option<Value>,
    pub etag: Option<String>,
    pub next_cursor: Option<String>,
    pub not_modified: bool,
}

/// GET-only JSON client with retry/backoff
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    client: Client,
    retry: RetryPolicy,
}

fn header_value(value: &str, name: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| Error::Config(format!("invalid {} header value: {:?}", name, value)))
}

fn header_string(headers: &HeaderMap, name: impl reqwest::header::AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .filter(|v| !v.is_empty())
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        url::Url::parse(&config.base_url)
            .map_err(|e| Error::Config(format!("invalid api_base_url {:?}: {}", config.base_url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(TENANT_MODE_HEADER, header_value(&config.tenant_mode, TENANT_MODE_HEADER)?);
        headers.insert(AUDIENCE_SCOPE_HEADER, header_value(&config.audience_scope, AUDIENCE_SCOPE_HEADER)?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            retry: config.retry.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` with `query`, revalidating against `etag` when given.
    ///
    /// Transport failures, 5xx and 429 are retried per the policy and end in
    /// `Error::Transport`; any other non-success status is `Error::Client`.
    pub async fn get(&self, path: &str, query: &[(String, String)], etag: Option<&str>) -> Result<RawResponse> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0;

        loop {
            let mut request = self.client.get(&url).query(query);
            if let Some(tag) = etag {
                request = request.header(IF_NONE_MATCH, tag);
            }

            let (decision, err) = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let headers = response.headers().clone();

                    if status == StatusCode::NOT_MODIFIED {
                        return Ok(RawResponse {
                            body: None,
                            etag: header_string(&headers, ETAG).or_else(|| etag.map(str::to_string)),
                            next_cursor: None,
                            not_modified: true,
                        });
                    }

                    if status.is_success() {
                        let body: Value = response
                            .json()
                            .await
                            .map_err(|e| Error::Decode(format!("GET {}: {}", path, e)))?;
                        return Ok(RawResponse {
                            body: Some(body),
                            etag: header_string(&headers, ETAG),
                            next_cursor: header_string(&headers, NEXT_CURSOR_HEADER),
                            not_modified: false,
                        });
                    }

                    let retry_after = header_string(&headers, RETRY_AFTER)
                        .as_deref()
                        .and_then(parse_retry_after);
                    let message = response.text().await.unwrap_or_default();
                    let decision = decision_from_http_status(status.as_u16(), retry_after);
                    if !decision.is_retryable() {
                        return Err(Error::Client {
                            status: status.as_u16(),
                            message,
                        });
                    }
                    (decision, Error::Transport(format!("GET {}: HTTP {} {}", path, status.as_u16(), message)))
                }
                Err(e) => (RetryDecision::Backoff, Error::Transport(format!("GET {}: {}", path, e))),
            };

            match self.retry.next_delay(attempt, decision) {
                Some(delay) => {
                    tracing::warn!(
                        "Request failed (attempt {}/{}), retrying in {:?}: {}",
                        attempt + 1,
                        self.retry.max_attempts,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => return Err(err),
            }
        }
    }
}
