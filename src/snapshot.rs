//! One complete fetch cycle
//!
//! A [`Snapshot`] holds the raw payloads of every endpoint the dashboard needs,
//! fetched in a fixed order. Any failure aborts the cycle, except a plain
//! request failure on the use-log page which only empties that section.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use chrono::{Duration, NaiveDateTime};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::api::{Fetcher, Granularity};
use crate::error::FetchResult;
use crate::models::PageInfo;
use crate::timestamp_parser::{parse_duration_secs, TimestampParser};

/// Ranges up to this many seconds use hourly buckets under `auto`
const AUTO_HOURLY_LIMIT_SECS: i64 = 48 * 3600;

/// Time range of the stats, trend and use-log sections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeMode {
    /// The last N seconds up to now
    Rolling(i64),
    /// Since local midnight
    Today,
}

impl RangeMode {
    pub fn start(&self, now: NaiveDateTime) -> NaiveDateTime {
        match self {
            RangeMode::Rolling(secs) => seconds_before(now, *secs),
            RangeMode::Today => now.date().and_hms_opt(0, 0, 0).unwrap_or(now),
        }
    }

    /// Nominal length used for granularity selection
    pub fn nominal_secs(&self) -> i64 {
        match self {
            RangeMode::Rolling(secs) => *secs,
            RangeMode::Today => 24 * 3600,
        }
    }
}

impl FromStr for RangeMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        if matches!(text.to_lowercase().as_str(), "today" | "td") {
            return Ok(RangeMode::Today);
        }
        let secs = parse_duration_secs(text)?;
        if secs <= 0 {
            bail!("Range must be positive: {}", text);
        }
        Ok(RangeMode::Rolling(secs))
    }
}

impl fmt::Display for RangeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeMode::Today => f.write_str("today"),
            RangeMode::Rolling(secs) if secs % 86_400 == 0 => write!(f, "{}d", secs / 86_400),
            RangeMode::Rolling(secs) if secs % 3600 == 0 => write!(f, "{}h", secs / 3600),
            RangeMode::Rolling(secs) if secs % 60 == 0 => write!(f, "{}m", secs / 60),
            RangeMode::Rolling(secs) => write!(f, "{secs}s"),
        }
    }
}

/// Requested bucket size for the trend section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GranularitySetting {
    Auto,
    Fixed(Granularity),
}

impl GranularitySetting {
    pub fn resolve(&self, range: &RangeMode) -> Granularity {
        match self {
            GranularitySetting::Fixed(granularity) => *granularity,
            GranularitySetting::Auto if range.nominal_secs() <= AUTO_HOURLY_LIMIT_SECS => {
                Granularity::Hour
            }
            GranularitySetting::Auto => Granularity::Day,
        }
    }
}

impl FromStr for GranularitySetting {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(GranularitySetting::Auto),
            "hour" => Ok(GranularitySetting::Fixed(Granularity::Hour)),
            "day" => Ok(GranularitySetting::Fixed(Granularity::Day)),
            other => bail!("Unknown granularity '{}' (use auto, hour or day)", other),
        }
    }
}

/// Everything a fetch cycle needs to know besides the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPlan {
    pub range: RangeMode,
    pub rate_window_secs: i64,
    pub granularity: GranularitySetting,
    pub page: u32,
    pub page_size: u32,
}

impl FetchPlan {
    pub fn windows(&self, now: NaiveDateTime) -> FetchWindows {
        FetchWindows {
            range_start: TimestampParser::format_window(self.range.start(now)),
            rate_start: TimestampParser::format_window(seconds_before(now, self.rate_window_secs)),
            end: TimestampParser::format_window(now),
        }
    }
}

/// `now - secs`, clamped to the earliest representable time
fn seconds_before(now: NaiveDateTime, secs: i64) -> NaiveDateTime {
    Duration::try_seconds(secs)
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Formatted query bounds of one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchWindows {
    pub range_start: String,
    pub rate_start: String,
    pub end: String,
}

/// Raw payloads of one successful fetch cycle
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub fetched_at: NaiveDateTime,
    pub profile: Value,
    pub subscriptions: Value,
    pub advanced_rate: Value,
    pub advanced_trend: Value,
    pub stats: Value,
    pub use_logs: Value,
    pub requested_page: PageInfo,
}

/// Run one fetch cycle against `fetcher`.
///
/// Calls are sequential: profile, subscriptions, rate-window stats, trend
/// stats, range stats, then the use-log page. Any failure of the use-log page
/// leaves that section empty instead of failing the cycle.
pub async fn fetch_snapshot(
    fetcher: &dyn Fetcher,
    plan: &FetchPlan,
    now: NaiveDateTime,
) -> FetchResult<Snapshot> {
    let windows = plan.windows(now);
    let granularity = plan.granularity.resolve(&plan.range);
    debug!(
        range_start = %windows.range_start,
        rate_start = %windows.rate_start,
        end = %windows.end,
        granularity = %granularity,
        page = plan.page,
        "fetching snapshot"
    );

    let profile = fetcher.fetch_profile().await?;
    let subscriptions = fetcher.fetch_subscriptions().await?;
    let advanced_rate = fetcher
        .fetch_stats_advanced(&windows.rate_start, &windows.end, Granularity::Hour)
        .await?;
    let advanced_trend = fetcher
        .fetch_stats_advanced(&windows.range_start, &windows.end, granularity)
        .await?;
    let stats = fetcher
        .fetch_stats_range(&windows.range_start, &windows.end)
        .await?;

    let use_logs = match fetcher
        .fetch_usage_log_page(
            plan.page,
            plan.page_size,
            Some(&windows.range_start),
            Some(&windows.end),
        )
        .await
    {
        Ok(payload) => payload,
        Err(error) => {
            warn!(kind = error.kind(), error = %error, "use-log page unavailable, continuing without it");
            Value::Object(Map::new())
        }
    };

    Ok(Snapshot {
        fetched_at: now,
        profile,
        subscriptions,
        advanced_rate,
        advanced_trend,
        stats,
        use_logs,
        requested_page: PageInfo::new(plan.page, plan.page_size),
    })
}
