//! Core Data Models
//!
//! This module defines the typed records produced from right.codes API payloads
//! and the derived metrics computed from them.
//!
//! ## Data Flow
//!
//! 1. **Raw Data**: JSON objects returned by the API (`serde_json::Value`)
//! 2. **Normalization**: [`SubscriptionRecord`], [`StatsTotals`], [`ModelUsageRow`],
//!    [`UseLogRow`] - built by [`crate::normalizer`]
//! 3. **Derivation**: [`EffectiveQuota`], [`QuotaSummary`], [`BurnRate`],
//!    [`EtaProjection`] - built by [`crate::quota`] and [`crate::burn_rate`]
//!
//! Every numeric field that the API may omit is an `Option<f64>`: "not measured"
//! and "measured as zero" are different states and are rendered differently.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A timestamp field that keeps the raw upstream text even when it cannot be parsed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimestampField {
    pub raw: Option<String>,
    pub parsed: Option<NaiveDateTime>,
}

impl TimestampField {
    /// Display text: parsed value to the minute, else the raw string, else "—"
    pub fn display(&self) -> String {
        match (&self.parsed, &self.raw) {
            (Some(parsed), _) => parsed.format("%Y-%m-%d %H:%M").to_string(),
            (None, Some(raw)) => raw.clone(),
            (None, None) => "—".to_string(),
        }
    }
}

/// One normalized subscription package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub tier_id: String,
    pub total_quota: Option<f64>,
    pub remaining_quota: Option<f64>,
    pub reset_today: Option<bool>,
    pub obtained_at: TimestampField,
    pub expires_at: TimestampField,
}

/// Per-subscription quota values derived from a record with both quota fields
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EffectiveQuota {
    pub total: f64,
    pub remaining: f64,
    pub used: f64,
    /// Always within `[0, 1]`; `None` when `total <= 0`
    pub used_pct: Option<f64>,
}

/// Aggregated quota across all subscriptions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuotaSummary {
    pub total_sum: Option<f64>,
    pub remaining_sum: Option<f64>,
    pub used_sum: Option<f64>,
    pub degraded: bool,
    pub degraded_reason: Option<String>,
}

impl QuotaSummary {
    /// Overall used fraction, when sums are known and the total is positive
    pub fn used_pct(&self) -> Option<f64> {
        match (self.used_sum, self.total_sum) {
            (Some(used), Some(total)) if total > 0.0 => Some(used / total),
            _ => None,
        }
    }
}

/// Range totals reported by the stats endpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatsTotals {
    pub tokens: Option<f64>,
    pub cost: Option<f64>,
    pub requests: Option<f64>,
}

impl StatsTotals {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_none() && self.cost.is_none() && self.requests.is_none()
    }
}

/// One time-sliced usage sample from the advanced stats endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Bucket {
    pub tokens: Option<f64>,
    pub cost: Option<f64>,
}

/// Consumption rate derived from time-bucketed samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BurnRate {
    pub tokens_per_hour: Option<f64>,
    pub cost_per_day: Option<f64>,
    pub hours_in_window: f64,
}

impl BurnRate {
    pub fn cost_per_hour(&self) -> Option<f64> {
        self.cost_per_day.map(|per_day| per_day / 24.0)
    }
}

/// Projection of when the remaining quota runs out
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EtaProjection {
    pub target_time: Option<NaiveDateTime>,
    /// Remaining quota expressed in tokens at the recent average price
    pub remaining_quantity_estimate: Option<f64>,
}

/// Which measure the per-model share percentages are computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareBasis {
    Cost,
    Tokens,
}

/// Usage aggregated per model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelUsageRow {
    pub model: String,
    pub requests: Option<f64>,
    pub tokens: Option<f64>,
    pub cost: Option<f64>,
    pub share: Option<f64>,
    pub share_basis: Option<ShareBasis>,
}

/// One entry of the paginated usage log, already reduced to display fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UseLogRow {
    pub time: Option<String>,
    pub key_name: Option<String>,
    pub model: Option<String>,
    pub channel: Option<String>,
    pub tokens: Option<f64>,
    pub billing_rate: Option<f64>,
    pub billing_source: Option<String>,
    pub cost: Option<f64>,
    pub ip: Option<String>,
}

/// Pagination metadata echoed by `/use-log/list`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: u32,
    pub page_size: u32,
    pub total: Option<u64>,
}

impl PageInfo {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
            total: None,
        }
    }

    /// Number of pages, once the server has told us the item total
    pub fn max_page(&self) -> Option<u32> {
        let total = self.total?;
        let size = u64::from(self.page_size.max(1));
        let pages = total.div_ceil(size).max(1);
        Some(u32::try_from(pages).unwrap_or(u32::MAX))
    }
}
