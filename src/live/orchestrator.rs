//! Dashboard session
//!
//! The session coordinates all live operations:
//! - Feeding ticks and key presses into the refresh scheduler
//! - Dispatching fetch cycles to background workers
//! - Applying completed cycles (new metrics, or banner plus stale marker)
//! - Use-log pagination

use std::sync::Arc;

use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{spawn_fetch, FetchCompletion};
use crate::api::Fetcher;
use crate::scheduler::{
    backoff_rejection_banner, Banner, RefreshScheduler, RefreshState, TriggerOutcome,
};
use crate::snapshot::FetchPlan;
use crate::view::{DashboardMetrics, DashboardView};

/// State of one running dashboard
pub struct DashboardSession {
    fetcher: Arc<dyn Fetcher>,
    scheduler: RefreshScheduler<StdRng>,
    plan: FetchPlan,
    metrics: Option<DashboardMetrics>,
    banner: Option<Banner>,
    completions: mpsc::Sender<FetchCompletion>,
    dispatched: u64,
}

impl DashboardSession {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        scheduler: RefreshScheduler<StdRng>,
        plan: FetchPlan,
        completions: mpsc::Sender<FetchCompletion>,
    ) -> Self {
        Self {
            fetcher,
            scheduler,
            plan,
            metrics: None,
            banner: None,
            completions,
            dispatched: 0,
        }
    }

    /// One-second timer
    pub fn tick(&mut self, now: NaiveDateTime) -> TriggerOutcome {
        let outcome = self.scheduler.on_tick(now);
        if outcome.should_dispatch() {
            self.dispatch(now);
        }
        outcome
    }

    /// User pressed refresh
    pub fn force_refresh(&mut self, now: NaiveDateTime) -> TriggerOutcome {
        let outcome = self.scheduler.request_refresh(now);
        match outcome {
            TriggerOutcome::Dispatch => self.dispatch(now),
            TriggerOutcome::BackoffActive { retry_at } => {
                self.banner = Some(backoff_rejection_banner(retry_at));
            }
            TriggerOutcome::AlreadyFetching | TriggerOutcome::NotDue => {
                debug!(?outcome, "forced refresh ignored");
            }
        }
        outcome
    }

    fn dispatch(&mut self, now: NaiveDateTime) {
        self.dispatched += 1;
        debug!(cycle = self.dispatched, page = self.plan.page, "spawning fetch worker");
        spawn_fetch(Arc::clone(&self.fetcher), self.plan, now, self.completions.clone());
    }

    /// Apply a finished fetch cycle
    pub fn apply_completion(&mut self, completion: FetchCompletion, now: NaiveDateTime) {
        match completion.result {
            Ok(snapshot) => {
                let metrics = DashboardMetrics::from_snapshot(&snapshot, completion.plan.rate_window_secs);
                self.plan.page = metrics.use_log_page.page;
                info!(
                    subscriptions = metrics.subscriptions.len(),
                    degraded = metrics.quota.degraded,
                    "dashboard refreshed"
                );
                self.metrics = Some(metrics);
                self.banner = None;
                self.scheduler.on_success(now);
            }
            Err(error) => {
                // The last good metrics stay on screen; the status line marks them stale
                self.banner = Some(self.scheduler.on_failure(&error, now));
            }
        }
    }

    /// Move to the next use-log page, refreshing immediately
    pub fn next_page(&mut self, now: NaiveDateTime) -> Option<TriggerOutcome> {
        let max_page = self.metrics.as_ref().and_then(|m| m.use_log_page.max_page());
        if max_page.is_some_and(|max| self.plan.page >= max) {
            self.banner = Some(Banner::info("Usage log: already on the last page."));
            return None;
        }
        Some(self.turn_page(self.plan.page.saturating_add(1), now))
    }

    /// Move to the previous use-log page, refreshing immediately
    pub fn prev_page(&mut self, now: NaiveDateTime) -> Option<TriggerOutcome> {
        if self.plan.page <= 1 {
            self.banner = Some(Banner::info("Usage log: already on the first page."));
            return None;
        }
        Some(self.turn_page(self.plan.page - 1, now))
    }

    /// Request `page`; the current page is kept unless a fetch is dispatched
    fn turn_page(&mut self, page: u32, now: NaiveDateTime) -> TriggerOutcome {
        let current = self.plan.page;
        self.plan.page = page;
        let outcome = self.force_refresh(now);
        if !outcome.should_dispatch() {
            self.plan.page = current;
            if outcome == TriggerOutcome::AlreadyFetching {
                self.banner = Some(Banner::info("Usage log: refresh in progress, try again shortly."));
            }
        }
        outcome
    }

    pub fn view(&self, now: NaiveDateTime) -> DashboardView {
        DashboardView::build(
            self.metrics.as_ref(),
            self.scheduler.state(),
            self.banner.as_ref(),
            &self.plan.range.to_string(),
            now,
        )
    }

    pub fn state(&self) -> &RefreshState {
        self.scheduler.state()
    }

    pub fn plan(&self) -> &FetchPlan {
        &self.plan
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn metrics(&self) -> Option<&DashboardMetrics> {
        self.metrics.as_ref()
    }

    /// Number of fetch cycles started so far
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }
}
