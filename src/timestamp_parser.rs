use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

/// Wire format the API expects for `start_date` / `end_date` query values
pub const WINDOW_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Handles parsing timestamps from the formats seen in right.codes payloads.
///
/// All results are local wall-clock times without an offset, which is what the
/// API expects back in its query windows and what the dashboard displays.
pub struct TimestampParser;

impl TimestampParser {
    /// Parse an ISO-8601-like string into a local naive datetime.
    /// Handles `Z` suffix, explicit offsets, naive timestamps and bare dates.
    pub fn parse_local(timestamp_str: &str) -> Result<NaiveDateTime> {
        let text = timestamp_str.trim();

        // Handle both Z suffix and timezone info
        let timestamp = match text.strip_suffix('Z') {
            Some(stripped) => format!("{stripped}+00:00"),
            None => text.to_string(),
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(&timestamp) {
            return Ok(dt.with_timezone(&Local).naive_local());
        }

        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(&timestamp, format) {
                return Ok(naive);
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(&timestamp, "%Y-%m-%d") {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(midnight);
            }
        }

        anyhow::bail!("Failed to parse timestamp: {}", timestamp_str)
    }

    /// Parse an HTTP-date (RFC 2822 / IMF-fixdate), e.g. a `Retry-After` value
    pub fn parse_http_date(value: &str) -> Result<NaiveDateTime> {
        let dt = DateTime::parse_from_rfc2822(value.trim())?;
        Ok(dt.with_timezone(&Local).naive_local())
    }

    /// Format a local time for the API's query window parameters
    pub fn format_window(dt: NaiveDateTime) -> String {
        dt.format(WINDOW_FORMAT).to_string()
    }
}

/// Current local wall-clock time
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Longest accepted duration: ten years
pub const MAX_DURATION_SECS: i64 = 3650 * 86_400;

/// Parse a short duration such as `30s`, `15m`, `6h` or `7d` into seconds.
/// A bare number is taken as seconds.
pub fn parse_duration_secs(text: &str) -> Result<i64> {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        anyhow::bail!("Empty duration");
    }
    let (digits, unit) = match text.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((idx, _)) => text.split_at(idx),
        None => (text.as_str(), "s"),
    };
    let value: i64 = digits
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid duration: {}", text))?;
    let multiplier = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        _ => anyhow::bail!("Unsupported duration unit in '{}' (use s, m, h or d)", text),
    };
    value
        .checked_mul(multiplier)
        .filter(|secs| *secs <= MAX_DURATION_SECS)
        .ok_or_else(|| anyhow::anyhow!("Duration too large: {} (at most 3650d)", text))
}
