//! Quota aggregation across subscription packages

use crate::models::{EffectiveQuota, QuotaSummary, SubscriptionRecord};

const MISSING_FIELDS_REASON: &str = "some subscriptions are missing total_quota/remaining_quota";

/// Effective quota of one subscription, when both quota fields are known.
///
/// `reset_today` and the expiry date do not influence the result.
pub fn compute_effective_quota(record: &SubscriptionRecord) -> Option<EffectiveQuota> {
    let total = record.total_quota?;
    let remaining = record.remaining_quota?;
    let used = (total - remaining).max(0.0);
    let used_pct = (total > 0.0).then(|| (used / total).clamp(0.0, 1.0));

    Some(EffectiveQuota {
        total,
        remaining,
        used,
        used_pct,
    })
}

/// Sum the effective quotas of every record that has both quota fields.
///
/// Records missing a field are left out of the sums and mark the summary as
/// degraded; sums stay `None` only when no record qualified at all.
pub fn summarize(records: &[SubscriptionRecord]) -> QuotaSummary {
    let mut summary = QuotaSummary::default();
    let mut reasons: Vec<&str> = Vec::new();

    for record in records {
        match compute_effective_quota(record) {
            Some(effective) => {
                *summary.total_sum.get_or_insert(0.0) += effective.total;
                *summary.remaining_sum.get_or_insert(0.0) += effective.remaining;
                *summary.used_sum.get_or_insert(0.0) += effective.used;
            }
            None => {
                if !reasons.contains(&MISSING_FIELDS_REASON) {
                    reasons.push(MISSING_FIELDS_REASON);
                }
            }
        }
    }

    if !reasons.is_empty() {
        summary.degraded = true;
        summary.degraded_reason = Some(reasons.join("; "));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimestampField;

    fn record(total: Option<f64>, remaining: Option<f64>) -> SubscriptionRecord {
        SubscriptionRecord {
            tier_id: "pro".to_string(),
            total_quota: total,
            remaining_quota: remaining,
            reset_today: None,
            obtained_at: TimestampField::default(),
            expires_at: TimestampField::default(),
        }
    }

    #[test]
    fn test_effective_quota_ignores_reset_today() {
        let mut rec = record(Some(100.0), Some(40.0));
        for reset in [None, Some(true), Some(false)] {
            rec.reset_today = reset;
            let eff = compute_effective_quota(&rec).unwrap();
            assert_eq!(eff.used, 60.0);
            assert!((eff.used_pct.unwrap() - 0.6).abs() < 1e-9);
        }
    }

    #[test]
    fn test_effective_quota_clamps() {
        let over = compute_effective_quota(&record(Some(100.0), Some(150.0))).unwrap();
        assert_eq!(over.used, 0.0);
        assert_eq!(over.used_pct, Some(0.0));

        let zero_total = compute_effective_quota(&record(Some(0.0), Some(0.0))).unwrap();
        assert_eq!(zero_total.used_pct, None);

        assert!(compute_effective_quota(&record(Some(100.0), None)).is_none());
    }

    #[test]
    fn test_summarize_includes_records_with_bad_timestamps() {
        let mut second = record(Some(100.0), Some(40.0));
        second.obtained_at = TimestampField {
            raw: Some("bad".to_string()),
            parsed: None,
        };
        let summary = summarize(&[record(Some(100.0), Some(40.0)), second]);
        assert_eq!(summary.total_sum, Some(200.0));
        assert_eq!(summary.remaining_sum, Some(80.0));
        assert_eq!(summary.used_sum, Some(120.0));
        assert!(!summary.degraded);
        assert!(summary.degraded_reason.is_none());
    }

    #[test]
    fn test_summarize_degraded_reason_is_deduplicated() {
        let summary = summarize(&[
            record(Some(50.0), Some(10.0)),
            record(None, Some(1.0)),
            record(Some(1.0), None),
        ]);
        assert_eq!(summary.total_sum, Some(50.0));
        assert!(summary.degraded);
        assert_eq!(summary.degraded_reason.as_deref(), Some(MISSING_FIELDS_REASON));
    }

    #[test]
    fn test_summarize_without_qualifying_records() {
        let summary = summarize(&[record(None, None)]);
        assert_eq!(summary.total_sum, None);
        assert_eq!(summary.used_sum, None);
        assert!(summary.degraded);

        let empty = summarize(&[]);
        assert_eq!(empty, QuotaSummary::default());
    }
}
