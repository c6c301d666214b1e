//! Payload normalization
//!
//! The right.codes API is not consistent about field names: the same quantity
//! shows up as `tokens`, `total_tokens` or `token_count` depending on the
//! endpoint and its version. Every extractor here consults an ordered list of
//! candidate keys and takes the first value that coerces to the wanted type.
//!
//! All functions are total: malformed or missing data yields `None` / empty
//! collections, never an error. Booleans are never read as numbers.

use serde_json::{Map, Value};

use crate::models::{
    Bucket, ModelUsageRow, PageInfo, ShareBasis, StatsTotals, SubscriptionRecord,
    TimestampField, UseLogRow,
};
use crate::timestamp_parser::TimestampParser;

pub type JsonObject = Map<String, Value>;

const BUCKET_CONTAINER_KEYS: &[&str] = &["data", "items", "series", "buckets", "trend"];
const USE_LOG_CONTAINER_KEYS: &[&str] = &["items", "logs", "data"];

const BUCKET_TOKEN_KEYS: &[&str] = &["tokens", "total_tokens", "token_count"];
const BUCKET_COST_KEYS: &[&str] = &["cost", "total_cost", "amount"];

const TOTALS_TOKEN_KEYS: &[&str] = &["total_tokens", "tokens", "token_count"];
const TOTALS_COST_KEYS: &[&str] = &["total_cost", "cost", "amount"];
const TOTALS_REQUEST_KEYS: &[&str] = &[
    "total_requests",
    "requests",
    "request_count",
    "request_count_total",
];

const MODEL_NAME_KEYS: &[&str] = &["model", "name", "model_name"];
const MODEL_REQUEST_KEYS: &[&str] = &[
    "requests",
    "total_requests",
    "request_count",
    "request_count_total",
];

const BALANCE_KEYS: &[&str] = &["balance", "remaining_balance", "wallet_balance", "credit"];

const OBTAINED_AT_KEYS: &[&str] = &["created_at", "obtained_at"];
const EXPIRES_AT_KEYS: &[&str] = &["expired_at"];

const LOG_TIME_KEYS: &[&str] = &["time", "ts", "timestamp", "date", "request_time", "created_at"];
const LOG_KEY_NAME_KEYS: &[&str] = &["api_key_name", "key_name", "api_key", "key", "key_id"];
const LOG_MODEL_KEYS: &[&str] = &["model", "model_name", "model_id"];
const LOG_CHANNEL_KEYS: &[&str] = &[
    "upstream_prefix",
    "channel",
    "source",
    "provider",
    "app",
    "type",
    "path",
    "route",
];
const LOG_USAGE_TOKEN_KEYS: &[&str] = &["total_tokens", "tokens", "token_count", "usage_tokens", "totalTokens"];
const LOG_TOKEN_KEYS: &[&str] = &["total_tokens", "tokens", "token_count", "usage_tokens"];
const LOG_RATE_KEYS: &[&str] = &[
    "billing_rate",
    "billing_multiplier",
    "rate_multiplier",
    "multiplier",
    "ratio",
];
const LOG_SOURCE_KEYS: &[&str] = &[
    "billing_source",
    "deduct_source",
    "quota_source",
    "deduct_from",
    "balance_type",
    "note",
];
const LOG_COST_KEYS: &[&str] = &["cost", "total_cost", "amount", "charged", "fee"];
const LOG_IP_KEYS: &[&str] = &["ip", "client_ip", "ip_address"];

/// Maximum number of points kept for the trend sparkline
pub const TREND_MAX_POINTS: usize = 120;

/// Coerce a JSON value into a finite number.
///
/// Accepts JSON numbers and numeric strings, including thousands separators
/// (`"1,234"`). Booleans, empty strings and unparsable text yield `None`.
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => {
            let text = s.trim().replace(',', "");
            if text.is_empty() {
                return None;
            }
            text.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

/// First value among `keys` that coerces to a number
pub fn first_number(obj: &JsonObject, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| obj.get(*key).and_then(parse_number))
}

/// First value among `keys` that is a non-blank string, trimmed
pub fn first_str(obj: &JsonObject, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

/// First entry among `container_keys` holding a list whose elements are all objects
fn first_object_list<'a>(payload: &'a Value, container_keys: &[&str]) -> Option<Vec<&'a JsonObject>> {
    let obj = payload.as_object()?;
    container_keys.iter().find_map(|key| {
        let items = obj.get(*key)?.as_array()?;
        items.iter().map(Value::as_object).collect::<Option<Vec<_>>>()
    })
}

fn timestamp_field(obj: &JsonObject, keys: &[&str]) -> TimestampField {
    let raw = first_str(obj, keys);
    let parsed = raw
        .as_deref()
        .and_then(|text| TimestampParser::parse_local(text).ok());
    TimestampField { raw, parsed }
}

/// Normalize one item of `/subscriptions/list`
pub fn normalize_subscription(item: &JsonObject) -> SubscriptionRecord {
    let tier_id = match item.get("tier_id") {
        None | Some(Value::Null) => "—".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    SubscriptionRecord {
        tier_id,
        total_quota: item.get("total_quota").and_then(parse_number),
        remaining_quota: item.get("remaining_quota").and_then(parse_number),
        reset_today: item.get("reset_today").and_then(Value::as_bool),
        obtained_at: timestamp_field(item, OBTAINED_AT_KEYS),
        expires_at: timestamp_field(item, EXPIRES_AT_KEYS),
    }
}

/// Normalize every object in a raw subscription list; non-objects are skipped
pub fn normalize_subscriptions<'a, I>(items: I) -> Vec<SubscriptionRecord>
where
    I: IntoIterator<Item = &'a Value>,
{
    items
        .into_iter()
        .filter_map(Value::as_object)
        .map(normalize_subscription)
        .collect()
}

/// Subscription records from a full `/subscriptions/list` response
pub fn subscriptions_from_payload(payload: &Value) -> Vec<SubscriptionRecord> {
    match payload.get("subscriptions").and_then(Value::as_array) {
        Some(items) => normalize_subscriptions(items),
        None => Vec::new(),
    }
}

/// Range totals from `/use-log/stats` or `/use-log/stats/overall`
pub fn extract_stats_totals(payload: &Value) -> StatsTotals {
    let Some(obj) = payload.as_object() else {
        return StatsTotals::default();
    };
    StatsTotals {
        tokens: first_number(obj, TOTALS_TOKEN_KEYS),
        cost: first_number(obj, TOTALS_COST_KEYS),
        requests: first_number(obj, TOTALS_REQUEST_KEYS),
    }
}

/// Account balance from the `/auth/me` profile
pub fn extract_balance(profile: &Value) -> Option<f64> {
    first_number(profile.as_object()?, BALANCE_KEYS)
}

/// Time-bucketed samples from `/use-log/stats/advanced`.
///
/// Returns `None` when no known container key holds a list of objects.
pub fn extract_buckets(payload: &Value) -> Option<Vec<Bucket>> {
    let items = first_object_list(payload, BUCKET_CONTAINER_KEYS)?;
    Some(
        items
            .into_iter()
            .map(|item| Bucket {
                tokens: first_number(item, BUCKET_TOKEN_KEYS),
                cost: first_number(item, BUCKET_COST_KEYS),
            })
            .collect(),
    )
}

/// Token values of the trend buckets in time order, capped to the newest points
pub fn extract_trend_series(payload: &Value) -> Vec<f64> {
    let series: Vec<f64> = extract_buckets(payload)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|bucket| bucket.tokens)
        .collect();
    let skip = series.len().saturating_sub(TREND_MAX_POINTS);
    series.into_iter().skip(skip).collect()
}

/// Per-model usage rows with share percentages, sorted by cost then tokens
pub fn extract_model_usage_rows(payload: &Value) -> Vec<ModelUsageRow> {
    let Some(obj) = payload.as_object() else {
        return Vec::new();
    };

    let mut rows: Vec<ModelUsageRow> = obj
        .get("details_by_model")
        .and_then(Value::as_array)
        .map(|details| {
            details
                .iter()
                .filter_map(Value::as_object)
                .map(|item| ModelUsageRow {
                    model: model_name(item),
                    requests: first_number(item, MODEL_REQUEST_KEYS),
                    tokens: first_number(item, BUCKET_TOKEN_KEYS),
                    cost: first_number(item, BUCKET_COST_KEYS),
                    share: None,
                    share_basis: None,
                })
                .collect()
        })
        .unwrap_or_default();

    if rows.is_empty() {
        if let Some(by_model) = obj.get("tokens_by_model").and_then(Value::as_object) {
            rows = by_model
                .iter()
                .filter_map(|(model, value)| match value {
                    Value::Number(n) => n.as_f64().map(|tokens| ModelUsageRow {
                        model: model.clone(),
                        requests: None,
                        tokens: Some(tokens),
                        cost: None,
                        share: None,
                        share_basis: None,
                    }),
                    _ => None,
                })
                .collect();
        }
    }

    apply_shares(&mut rows);

    rows.sort_by(|a, b| {
        let key = |r: &ModelUsageRow| (r.cost.unwrap_or(0.0), r.tokens.unwrap_or(0.0));
        let (a_cost, a_tokens) = key(a);
        let (b_cost, b_tokens) = key(b);
        b_cost
            .total_cmp(&a_cost)
            .then(b_tokens.total_cmp(&a_tokens))
            .then_with(|| b.model.cmp(&a.model))
    });
    rows
}

fn model_name(item: &JsonObject) -> String {
    MODEL_NAME_KEYS
        .iter()
        .find_map(|key| match item.get(*key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        })
        .unwrap_or_else(|| "—".to_string())
}

/// Share basis is cost when any positive cost was observed, else tokens, else none
fn apply_shares(rows: &mut [ModelUsageRow]) {
    let cost_total: f64 = rows.iter().filter_map(|r| r.cost).sum();
    let tokens_total: f64 = rows.iter().filter_map(|r| r.tokens).sum();
    let cost_seen = rows.iter().any(|r| r.cost.is_some());
    let tokens_seen = rows.iter().any(|r| r.tokens.is_some());

    let basis = if cost_seen && cost_total > 0.0 {
        Some(ShareBasis::Cost)
    } else if tokens_seen && tokens_total > 0.0 {
        Some(ShareBasis::Tokens)
    } else {
        None
    };

    for row in rows.iter_mut() {
        row.share_basis = basis;
        row.share = match basis {
            Some(ShareBasis::Cost) => row.cost.map(|c| c / cost_total),
            Some(ShareBasis::Tokens) => row.tokens.map(|t| t / tokens_total),
            None => None,
        };
    }
}

/// Raw items of a `/use-log/list` page; empty when the shape is unknown
pub fn extract_use_log_items(payload: &Value) -> Vec<&JsonObject> {
    first_object_list(payload, USE_LOG_CONTAINER_KEYS).unwrap_or_default()
}

/// Token count of one use-log entry, preferring the nested `usage` object
pub fn extract_use_log_tokens(item: &JsonObject) -> Option<f64> {
    if let Some(usage) = item.get("usage").and_then(Value::as_object) {
        if let Some(tokens) = first_number(usage, LOG_USAGE_TOKEN_KEYS) {
            return Some(tokens);
        }
    }
    first_number(item, LOG_TOKEN_KEYS)
}

/// Reduce a raw use-log entry to its display fields
pub fn use_log_row(item: &JsonObject) -> UseLogRow {
    UseLogRow {
        time: first_str(item, LOG_TIME_KEYS),
        key_name: first_str(item, LOG_KEY_NAME_KEYS),
        model: first_str(item, LOG_MODEL_KEYS),
        channel: first_str(item, LOG_CHANNEL_KEYS),
        tokens: extract_use_log_tokens(item),
        billing_rate: first_number(item, LOG_RATE_KEYS),
        billing_source: first_str(item, LOG_SOURCE_KEYS),
        cost: first_number(item, LOG_COST_KEYS),
        ip: first_str(item, LOG_IP_KEYS),
    }
}

/// Use-log rows of a `/use-log/list` page
pub fn extract_use_log_rows(payload: &Value) -> Vec<UseLogRow> {
    extract_use_log_items(payload)
        .into_iter()
        .map(use_log_row)
        .collect()
}

/// Pagination echoed by the server, falling back to what was requested
pub fn extract_page_info(payload: &Value, requested: PageInfo) -> PageInfo {
    let mut info = requested;
    let Some(obj) = payload.as_object() else {
        return info;
    };
    if let Some(total) = obj.get("total").and_then(Value::as_u64) {
        info.total = Some(total);
    }
    if let Some(page) = obj.get("page").and_then(Value::as_u64) {
        info.page = u32::try_from(page).unwrap_or(info.page).max(1);
    }
    if let Some(size) = obj.get("page_size").and_then(Value::as_u64) {
        info.page_size = u32::try_from(size).unwrap_or(info.page_size).max(1);
    }
    info
}

/// Friendly label for the billing source of a use-log entry
pub fn billing_source_label(value: Option<&str>) -> String {
    match value.map(str::trim) {
        None | Some("") => "—".to_string(),
        Some(text) => match text.to_lowercase().as_str() {
            "subscription" => "Subscription".to_string(),
            "balance" | "wallet" => "Balance".to_string(),
            _ => text.to_string(),
        },
    }
}

/// Billing multiplier in the `x1.00` style used by the web panel
pub fn billing_rate_label(rate: Option<f64>) -> String {
    match rate {
        Some(rate) => format!("x{rate:.2}"),
        None => "—".to_string(),
    }
}
