//! Burn-rate and depletion estimates
//!
//! Rates are derived from the bucketed samples of the advanced stats endpoint
//! over a fixed look-back window. The ETA shown on the dashboard is monetary:
//! remaining quota divided by the recent cost per hour.

use chrono::{Duration, NaiveDateTime};

use crate::models::{BurnRate, Bucket, EtaProjection};

/// Rates over `window_seconds`; `None` without buckets or with a non-positive window.
///
/// Each rate is only present when at least one bucket reported that measure.
pub fn calculate_burn_rate(buckets: Option<&[Bucket]>, window_seconds: i64) -> Option<BurnRate> {
    let buckets = buckets.filter(|b| !b.is_empty())?;
    if window_seconds <= 0 {
        return None;
    }
    let hours = window_seconds as f64 / 3600.0;

    let sum = |values: Vec<f64>| (!values.is_empty()).then(|| values.iter().sum::<f64>());
    let tokens = sum(buckets.iter().filter_map(|b| b.tokens).collect());
    let cost = sum(buckets.iter().filter_map(|b| b.cost).collect());

    Some(BurnRate {
        tokens_per_hour: tokens.map(|t| t / hours),
        cost_per_day: cost.map(|c| c / hours * 24.0),
        hours_in_window: hours,
    })
}

/// Time at which `remaining` runs out at `rate_per_hour`
pub fn estimate_eta(
    remaining: Option<f64>,
    rate_per_hour: Option<f64>,
    now: NaiveDateTime,
) -> Option<NaiveDateTime> {
    let remaining = remaining?;
    let rate = rate_per_hour.filter(|r| *r > 0.0)?;
    let hours = remaining / rate;
    if !hours.is_finite() || hours <= 0.0 {
        return None;
    }
    let millis = (hours * 3_600_000.0).round();
    if millis >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(millis as i64).and_then(|delta| now.checked_add_signed(delta))
}

/// Monetary ETA plus the remaining quota expressed in tokens at the recent price
pub fn project_eta(
    remaining_sum: Option<f64>,
    burn: Option<&BurnRate>,
    now: NaiveDateTime,
) -> EtaProjection {
    let Some(burn) = burn else {
        return EtaProjection::default();
    };
    let cost_per_hour = burn.cost_per_hour();
    let target_time = estimate_eta(remaining_sum, cost_per_hour, now);

    let cost_per_token = match (cost_per_hour, burn.tokens_per_hour) {
        (Some(cph), Some(tph)) if tph > 0.0 && cph > 0.0 => Some(cph / tph),
        _ => None,
    };
    // Only meaningful once the cost ETA itself is valid
    let remaining_quantity_estimate = match (target_time, remaining_sum, cost_per_token) {
        (Some(_), Some(remaining), Some(cpt)) if remaining > 0.0 && cpt > 0.0 => Some(remaining / cpt),
        _ => None,
    };

    EtaProjection {
        target_time,
        remaining_quantity_estimate,
    }
}
