use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER};
use serde_json::{Map, Value};
use tracing::debug;

use super::{Fetcher, Granularity};
use crate::error::{FetchError, FetchResult};
use crate::timestamp_parser::{local_now, TimestampParser};

pub const DEFAULT_BASE_URL: &str = "https://right.codes";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// reqwest-backed [`Fetcher`] authenticated with a bearer token
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> FetchResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.get(&url).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            let detail = if e.is_timeout() {
                "network error: timeout"
            } else if e.is_connect() {
                "network error: connection failed"
            } else {
                "network error"
            };
            debug!(path, error = %e, "request did not complete");
            FetchError::RequestFailed(detail.to_string())
        })?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(|e| {
            debug!(path, error = %e, "failed to read response body");
            FetchError::RequestFailed("network error: body".to_string())
        })?;

        debug!(path, status, bytes = body.len(), "response received");
        classify_response(status, retry_after.as_deref(), &body, local_now())
    }
}

#[async_trait]
impl Fetcher for ApiClient {
    async fn fetch_profile(&self) -> FetchResult<Value> {
        self.get_json("/auth/me", &[]).await
    }

    async fn fetch_subscriptions(&self) -> FetchResult<Value> {
        self.get_json("/subscriptions/list", &[]).await
    }

    async fn fetch_stats_overview(&self) -> FetchResult<Value> {
        self.get_json("/use-log/stats/overall", &[]).await
    }

    async fn fetch_stats_range(&self, start: &str, end: &str) -> FetchResult<Value> {
        let query = [("start_date", start.to_string()), ("end_date", end.to_string())];
        self.get_json("/use-log/stats", &query).await
    }

    async fn fetch_stats_advanced(
        &self,
        start: &str,
        end: &str,
        granularity: Granularity,
    ) -> FetchResult<Value> {
        let query = [
            ("start_date", start.to_string()),
            ("end_date", end.to_string()),
            ("granularity", granularity.as_str().to_string()),
        ];
        self.get_json("/use-log/stats/advanced", &query).await
    }

    async fn fetch_usage_log_page(
        &self,
        page: u32,
        page_size: u32,
        start: Option<&str>,
        end: Option<&str>,
    ) -> FetchResult<Value> {
        let mut query = vec![("page", page.to_string()), ("page_size", page_size.to_string())];
        if let Some(start) = start.filter(|s| !s.is_empty()) {
            query.push(("start_date", start.to_string()));
        }
        if let Some(end) = end.filter(|s| !s.is_empty()) {
            query.push(("end_date", end.to_string()));
        }
        self.get_json("/use-log/list", &query).await
    }
}

/// Map an HTTP status, `Retry-After` header and body onto the fetch taxonomy
pub fn classify_response(
    status: u16,
    retry_after: Option<&str>,
    body: &[u8],
    now: NaiveDateTime,
) -> FetchResult<Value> {
    match status {
        401 | 403 => Err(FetchError::Unauthenticated),
        429 => Err(FetchError::RateLimited {
            retry_at: retry_after.and_then(|raw| parse_retry_after(raw, now)),
        }),
        200..=299 => Ok(body_to_object(body)),
        other => Err(FetchError::RequestFailed(format!("HTTP {other}"))),
    }
}

/// `Retry-After` as delta-seconds or an HTTP-date; negative, out-of-range or garbage yields `None`
pub fn parse_retry_after(raw: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(seconds) = raw.parse::<i64>() {
        if seconds < 0 {
            return None;
        }
        return chrono::Duration::try_seconds(seconds).and_then(|delta| now.checked_add_signed(delta));
    }
    TimestampParser::parse_http_date(raw).ok()
}

fn body_to_object(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Object(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => value,
        _ => Value::Object(Map::new()),
    }
}
