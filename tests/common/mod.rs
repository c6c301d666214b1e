#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};

use rightcodes_dashboard::api::{Fetcher, Granularity};
use rightcodes_dashboard::error::{FetchError, FetchResult};
use rightcodes_dashboard::snapshot::{FetchPlan, GranularitySetting, RangeMode};

pub fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 2, 7)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

pub fn default_plan() -> FetchPlan {
    FetchPlan {
        range: RangeMode::Rolling(24 * 3600),
        rate_window_secs: 6 * 3600,
        granularity: GranularitySetting::Auto,
        page: 1,
        page_size: 20,
    }
}

/// In-memory fetcher returning canned payloads.
///
/// Failures queued with [`ScriptedFetcher::fail_next`] are returned by the
/// next profile call, which is the first call of every fetch cycle.
pub struct ScriptedFetcher {
    pub profile: Value,
    pub subscriptions: Value,
    pub advanced: Value,
    pub stats: Value,
    pub use_logs: Value,
    failures: Mutex<VecDeque<FetchError>>,
    use_log_failures: Mutex<VecDeque<FetchError>>,
    panic_next: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    /// Two packages ($40 of $100 left, one without quota fields), 6.0 spent
    /// over the last 6h, 41 use-log entries in total
    pub fn new() -> Self {
        Self {
            profile: json!({"username": "tester", "balance": "5.7001"}),
            subscriptions: json!({"subscriptions": [
                {"tier_id": "pro", "total_quota": 100, "remaining_quota": 40, "reset_today": false},
                {"tier_id": "lite", "reset_today": true}
            ]}),
            advanced: json!({
                "data": [{"tokens": 600, "cost": 3.0}, {"tokens": 600, "cost": 3.0}],
                "details_by_model": [
                    {"model": "gpt-5.2", "total_cost": 4.5, "total_tokens": 900, "total_requests": 3},
                    {"model": "gpt-5.2-codex", "total_cost": 1.5, "total_tokens": 300, "total_requests": 1}
                ]
            }),
            stats: json!({"total_tokens": 1200, "total_cost": 6.0, "total_requests": 4}),
            use_logs: json!({
                "items": [
                    {"created_at": "2026-02-07 11:58:00", "api_key_name": "default-key-9876",
                     "model": "gpt-5.2", "total_tokens": 300, "cost": 1.5, "ip": "10.1.2.3"}
                ],
                "total": 41,
                "page": 1,
                "page_size": 20
            }),
            failures: Mutex::new(VecDeque::new()),
            use_log_failures: Mutex::new(VecDeque::new()),
            panic_next: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_next(&self, error: FetchError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub fn fail_next_use_log(&self, error: FetchError) {
        self.use_log_failures.lock().unwrap().push_back(error);
    }

    /// Make the next profile call panic, as a bug in a response handler would
    pub fn panic_next(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, endpoint: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.as_str() == endpoint).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch_profile(&self) -> FetchResult<Value> {
        self.record("profile".to_string());
        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("response handler panicked");
        }
        match self.failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(self.profile.clone()),
        }
    }

    async fn fetch_subscriptions(&self) -> FetchResult<Value> {
        self.record("subscriptions".to_string());
        Ok(self.subscriptions.clone())
    }

    async fn fetch_stats_overview(&self) -> FetchResult<Value> {
        self.record("overview".to_string());
        Ok(self.stats.clone())
    }

    async fn fetch_stats_range(&self, _start: &str, _end: &str) -> FetchResult<Value> {
        self.record("stats".to_string());
        Ok(self.stats.clone())
    }

    async fn fetch_stats_advanced(
        &self,
        _start: &str,
        _end: &str,
        granularity: Granularity,
    ) -> FetchResult<Value> {
        self.record(format!("advanced:{granularity}"));
        Ok(self.advanced.clone())
    }

    async fn fetch_usage_log_page(
        &self,
        page: u32,
        _page_size: u32,
        _start: Option<&str>,
        _end: Option<&str>,
    ) -> FetchResult<Value> {
        self.record(format!("use_log:{page}"));
        if let Some(err) = self.use_log_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        let mut payload = self.use_logs.clone();
        payload["page"] = json!(page);
        Ok(payload)
    }
}
