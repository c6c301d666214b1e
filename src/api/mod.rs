//! Access to the right.codes HTTP API
//!
//! [`Fetcher`] is the seam between the dashboard core and the network. The
//! production implementation is [`ApiClient`]; tests substitute scripted
//! in-memory fetchers.

pub mod client;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::FetchResult;

pub use client::{classify_response, parse_retry_after, ApiClient};

/// Bucket size for the advanced stats endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Hour,
    Day,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hour => "hour",
            Granularity::Day => "day",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only operations against the account.
///
/// Every successful call yields a JSON object (`{}` when the body was empty
/// or not an object); failures are already classified into [`crate::error::FetchError`].
/// Window bounds are local times formatted with [`crate::timestamp_parser::WINDOW_FORMAT`].
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_profile(&self) -> FetchResult<Value>;

    async fn fetch_subscriptions(&self) -> FetchResult<Value>;

    async fn fetch_stats_overview(&self) -> FetchResult<Value>;

    async fn fetch_stats_range(&self, start: &str, end: &str) -> FetchResult<Value>;

    async fn fetch_stats_advanced(
        &self,
        start: &str,
        end: &str,
        granularity: Granularity,
    ) -> FetchResult<Value>;

    async fn fetch_usage_log_page(
        &self,
        page: u32,
        page_size: u32,
        start: Option<&str>,
        end: Option<&str>,
    ) -> FetchResult<Value>;
}
