//! Presentation model
//!
//! [`DashboardMetrics`] is derived once per successful snapshot. The ETA target
//! is anchored at the snapshot time so the countdown shrinks between refreshes.
//! [`DashboardView`] adds the per-tick status fields on top and is what the
//! renderer consumes. Nothing in here touches the terminal.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::burn_rate::{calculate_burn_rate, project_eta};
use crate::models::{
    BurnRate, EffectiveQuota, EtaProjection, ModelUsageRow, PageInfo, QuotaSummary, StatsTotals,
    SubscriptionRecord, UseLogRow,
};
use crate::normalizer;
use crate::privacy::mask_key;
use crate::quota::{compute_effective_quota, summarize};
use crate::scheduler::{Banner, RefreshState};
use crate::snapshot::Snapshot;

pub const MODEL_ROW_LIMIT: usize = 12;
pub const USE_LOG_ROW_LIMIT: usize = 18;
pub const PLACEHOLDER: &str = "—";

/// One subscription package as displayed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionCard {
    pub record: SubscriptionRecord,
    pub effective: Option<EffectiveQuota>,
}

impl SubscriptionCard {
    pub fn quota_line(&self) -> String {
        match &self.effective {
            Some(eff) => format!("{} / {}", fmt_money(eff.remaining), fmt_money(eff.total)),
            None => PLACEHOLDER.to_string(),
        }
    }

    pub fn used_pct(&self) -> Option<f64> {
        self.effective.and_then(|eff| eff.used_pct)
    }
}

/// Metrics derived from one snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub fetched_at: NaiveDateTime,
    pub balance: Option<f64>,
    pub quota: QuotaSummary,
    pub subscriptions: Vec<SubscriptionCard>,
    pub burn: Option<BurnRate>,
    pub eta: EtaProjection,
    pub models: Vec<ModelUsageRow>,
    pub totals: StatsTotals,
    pub trend: Vec<f64>,
    pub use_logs: Vec<UseLogRow>,
    pub use_log_page: PageInfo,
}

impl DashboardMetrics {
    pub fn from_snapshot(snapshot: &Snapshot, rate_window_secs: i64) -> Self {
        let records = normalizer::subscriptions_from_payload(&snapshot.subscriptions);
        let quota = summarize(&records);
        let subscriptions = records
            .into_iter()
            .map(|record| SubscriptionCard {
                effective: compute_effective_quota(&record),
                record,
            })
            .collect();

        let rate_buckets = normalizer::extract_buckets(&snapshot.advanced_rate);
        let burn = calculate_burn_rate(rate_buckets.as_deref(), rate_window_secs);
        let eta = project_eta(quota.remaining_sum, burn.as_ref(), snapshot.fetched_at);

        let use_logs = normalizer::extract_use_log_rows(&snapshot.use_logs)
            .into_iter()
            .map(|mut row| {
                row.key_name = row.key_name.as_deref().map(mask_key);
                row
            })
            .collect();

        Self {
            fetched_at: snapshot.fetched_at,
            balance: normalizer::extract_balance(&snapshot.profile),
            quota,
            subscriptions,
            burn,
            eta,
            models: normalizer::extract_model_usage_rows(&snapshot.advanced_trend),
            totals: normalizer::extract_stats_totals(&snapshot.stats),
            trend: normalizer::extract_trend_series(&snapshot.advanced_trend),
            use_logs,
            use_log_page: normalizer::extract_page_info(&snapshot.use_logs, snapshot.requested_page),
        }
    }

    pub fn quota_label(&self) -> String {
        match (self.quota.used_sum, self.quota.total_sum) {
            (Some(used), Some(total)) => format!("{} / {}", fmt_money(used), fmt_money(total)),
            _ => format!("{PLACEHOLDER} / {PLACEHOLDER}"),
        }
    }
}

/// Scheduler-derived status line fields
#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub last_success_at: Option<NaiveDateTime>,
    pub next_refresh_at: Option<NaiveDateTime>,
    pub backoff_attempt: u32,
    pub backoff_next_retry_at: Option<NaiveDateTime>,
    pub stale_for: Option<Duration>,
    pub degraded_reason: Option<String>,
    pub range_label: String,
    pub fetching: bool,
}

impl StatusLine {
    pub fn render(&self) -> String {
        let backoff = match self.backoff_next_retry_at {
            Some(next) => format!("attempt={} next={}", self.backoff_attempt, fmt_clock(next)),
            None => PLACEHOLDER.to_string(),
        };
        let stale = match self.stale_for {
            Some(delta) => format!("yes ({}s)", delta.num_seconds()),
            None => "no".to_string(),
        };
        let next_refresh = if self.fetching {
            "fetching…".to_string()
        } else {
            fmt_opt_clock(self.next_refresh_at)
        };
        format!(
            "Last OK: {} | Next refresh: {} | Backoff: {} | Stale: {} | Degraded: {} | Range: {}",
            fmt_opt_clock(self.last_success_at),
            next_refresh,
            backoff,
            stale,
            self.degraded_reason.as_deref().unwrap_or(PLACEHOLDER),
            self.range_label,
        )
    }
}

/// Everything the renderer needs for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub now: NaiveDateTime,
    pub metrics: Option<DashboardMetrics>,
    pub status: StatusLine,
    pub banner: Option<Banner>,
}

impl DashboardView {
    pub fn build(
        metrics: Option<&DashboardMetrics>,
        state: &RefreshState,
        banner: Option<&Banner>,
        range_label: &str,
        now: NaiveDateTime,
    ) -> Self {
        let status = StatusLine {
            last_success_at: state.last_success_at,
            next_refresh_at: state.next_refresh_at,
            backoff_attempt: state.backoff_attempt,
            backoff_next_retry_at: state.backoff_next_retry_at,
            stale_for: state.stale_for(now),
            degraded_reason: metrics.and_then(|m| m.quota.degraded_reason.clone()),
            range_label: range_label.to_string(),
            fetching: state.in_flight,
        };
        Self {
            now,
            metrics: metrics.cloned(),
            status,
            banner: banner.cloned(),
        }
    }

    pub fn is_stale(&self) -> bool {
        self.status.stale_for.is_some()
    }

    /// Live countdown to the ETA target
    pub fn eta_countdown(&self) -> String {
        match self.metrics.as_ref().and_then(|m| m.eta.target_time) {
            Some(target) => fmt_countdown(target - self.now),
            None => PLACEHOLDER.to_string(),
        }
    }

    pub fn burn_line(&self) -> String {
        let burn = self.metrics.as_ref().and_then(|m| m.burn);
        let tph = burn
            .and_then(|b| b.tokens_per_hour)
            .map(|v| format!("{} tokens/h", group_thousands(v.round() as i64)))
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        let cph = burn
            .and_then(|b| b.cost_per_hour())
            .map(|v| format!("{v:.4}/h"))
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        format!("Burn: {tph}   Cost rate: {cph}")
    }

    pub fn eta_line(&self) -> String {
        let target = self
            .metrics
            .as_ref()
            .and_then(|m| m.eta.target_time)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        format!("ETA: {target}  (countdown {})", self.eta_countdown())
    }

    pub fn remaining_tokens_line(&self) -> String {
        let estimate = self
            .metrics
            .as_ref()
            .and_then(|m| m.eta.remaining_quantity_estimate)
            .map(|v| group_thousands(v.round() as i64))
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        format!("≈ Remaining tokens (at recent average price): {estimate}")
    }

    pub fn page_note(&self) -> String {
        let Some(page) = self.metrics.as_ref().map(|m| m.use_log_page) else {
            return PLACEHOLDER.to_string();
        };
        match page.max_page() {
            Some(max) => format!("page {} / {}", page.page, max),
            None => format!("page {}", page.page),
        }
    }
}

/// Countdown as `HH:MM:SS`; `0s` once elapsed and whole hours beyond 99h
pub fn fmt_countdown(delta: Duration) -> String {
    let seconds = delta.num_seconds();
    if seconds <= 0 {
        return "0s".to_string();
    }
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 99 {
        return format!("{h}h");
    }
    format!("{h:02}:{m:02}:{s:02}")
}

fn fmt_clock(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn fmt_opt_clock(t: Option<NaiveDateTime>) -> String {
    t.map(fmt_clock).unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// Insert `,` between groups of three digits
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if value < 0 {
        out.insert(0, '-');
    }
    out
}

fn group_decimal(text: &str) -> String {
    let (sign, body) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (body, None),
    };
    let grouped = int_part
        .parse::<i64>()
        .map(group_thousands)
        .unwrap_or_else(|_| int_part.to_string());
    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Quota amount: whole numbers without decimals, otherwise five places
pub fn fmt_money(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        return format!("${}", group_thousands(value.round() as i64));
    }
    format!("${}", group_decimal(&format!("{value:.5}")))
}

/// Balance with up to eight decimals and trailing zeros trimmed
pub fn fmt_balance(value: Option<f64>) -> String {
    match value {
        Some(v) => {
            let text = format!("{v:.8}");
            let trimmed = text.trim_end_matches('0').trim_end_matches('.');
            format!("${}", group_decimal(trimmed))
        }
        None => PLACEHOLDER.to_string(),
    }
}

/// Cost with six decimals
pub fn fmt_cost(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("${v:.6}"),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn fmt_count(value: Option<f64>) -> String {
    match value {
        Some(v) => group_thousands(v.trunc() as i64),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn fmt_pct_short(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.0}%", v * 100.0),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn fmt_share(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v * 100.0),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn reset_today_label(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "reset",
        Some(false) => "not reset",
        None => PLACEHOLDER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{RefreshScheduler, SchedulerConfig};
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 7)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            fetched_at: t0(),
            profile: json!({"balance": "5.700100"}),
            subscriptions: json!({"subscriptions": [
                {"tier_id": "pro", "total_quota": 100, "remaining_quota": 40},
                {"tier_id": "lite", "total_quota": 50}
            ]}),
            advanced_rate: json!({"data": [{"tokens": 600, "cost": 3.0}, {"tokens": 600, "cost": 3.0}]}),
            advanced_trend: json!({
                "trend": [{"tokens": 1}, {"tokens": 2}],
                "details_by_model": [{"model": "gpt-5.2", "total_cost": 1.0, "total_tokens": 10}]
            }),
            stats: json!({"total_tokens": 1200, "total_cost": 6.0, "total_requests": 4}),
            use_logs: json!({"items": [{"api_key_name": "default-key-9876", "model": "gpt-5.2"}], "total": 41}),
            requested_page: PageInfo::new(1, 20),
        }
    }

    #[test]
    fn test_metrics_from_snapshot() {
        let metrics = DashboardMetrics::from_snapshot(&snapshot(), 6 * 3600);
        assert_eq!(metrics.balance, Some(5.7001));
        assert_eq!(metrics.quota.used_sum, Some(60.0));
        assert!(metrics.quota.degraded);
        assert_eq!(metrics.subscriptions.len(), 2);
        assert_eq!(metrics.subscriptions[0].quota_line(), "$40 / $100");
        assert_eq!(metrics.subscriptions[1].quota_line(), "—");
        assert_eq!(metrics.quota_label(), "$60 / $100");

        // 6.0 cost over 6h is 1.0 per hour, so 40 remaining lasts 40h
        assert_eq!(metrics.eta.target_time, Some(t0() + Duration::hours(40)));
        assert_eq!(metrics.trend, vec![1.0, 2.0]);
        assert_eq!(metrics.use_logs[0].key_name.as_deref(), Some("de…9876"));
        assert_eq!(metrics.use_log_page.max_page(), Some(3));
    }

    #[test]
    fn test_countdown_uses_snapshot_anchor() {
        let metrics = DashboardMetrics::from_snapshot(&snapshot(), 6 * 3600);
        let scheduler = RefreshScheduler::with_rng(SchedulerConfig::default(), t0(), StdRng::seed_from_u64(1));

        let early = DashboardView::build(Some(&metrics), scheduler.state(), None, "24h", t0());
        let later = DashboardView::build(
            Some(&metrics),
            scheduler.state(),
            None,
            "24h",
            t0() + Duration::seconds(1),
        );
        assert_eq!(early.eta_countdown(), "40:00:00");
        assert_eq!(later.eta_countdown(), "39:59:59");
        assert!(early.status.degraded_reason.is_some());
    }

    #[test]
    fn test_view_without_data_uses_placeholders() {
        let scheduler = RefreshScheduler::with_rng(SchedulerConfig::default(), t0(), StdRng::seed_from_u64(1));
        let view = DashboardView::build(None, scheduler.state(), None, "today", t0());
        assert_eq!(view.eta_countdown(), "—");
        assert_eq!(view.page_note(), "—");
        assert!(view.burn_line().contains("Burn: —"));
        assert!(view.status.render().contains("Stale: no"));
        assert!(view.status.render().ends_with("Range: today"));
    }

    #[test]
    fn test_fmt_countdown() {
        assert_eq!(fmt_countdown(Duration::seconds(-5)), "0s");
        assert_eq!(fmt_countdown(Duration::seconds(0)), "0s");
        assert_eq!(fmt_countdown(Duration::seconds(3661)), "01:01:01");
        assert_eq!(fmt_countdown(Duration::hours(100)), "100h");
    }

    #[test]
    fn test_money_formats() {
        assert_eq!(fmt_money(1234.0), "$1,234");
        assert_eq!(fmt_money(12.5), "$12.50000");
        assert_eq!(fmt_money(1234567.25), "$1,234,567.25000");
        assert_eq!(fmt_balance(Some(5.7001)), "$5.7001");
        assert_eq!(fmt_balance(Some(2.0)), "$2");
        assert_eq!(fmt_balance(None), "—");
        assert_eq!(fmt_cost(Some(0.25)), "$0.250000");
        assert_eq!(fmt_count(Some(1500.0)), "1,500");
        assert_eq!(group_thousands(-1234567), "-1,234,567");
        assert_eq!(fmt_share(Some(0.9)), "90.0%");
    }
}
