//! Refresh scheduling state machine
//!
//! The scheduler decides when a fetch cycle may start and how the outcome of
//! a cycle changes the cadence. It never performs I/O itself: callers ask it
//! whether to dispatch, run the fetch elsewhere and report the result back.
//!
//! ```text
//!            tick (due)                 success
//!  Scheduled ──────────► Fetching ───────────────► Scheduled (now + watch)
//!      ▲                    │  │                       or Idle (no watch)
//!      │ retry time passed  │  │ auth / request failure
//!      │                    │  └────────────────────► Scheduled (now + watch)
//!   Backoff ◄───────────────┘ rate limited
//! ```
//!
//! At most one fetch is in flight: both the periodic tick and a forced
//! refresh are ignored while `Fetching`. A forced refresh during `Backoff`
//! is rejected and leaves the retry time untouched.

use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backoff::{self, DEFAULT_BASE_SECS, DEFAULT_MAX_SECS};
use crate::error::FetchError;

/// Current phase of the refresh cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RefreshPhase {
    /// No periodic refresh configured and nothing pending
    Idle,
    /// Waiting for `next_refresh_at`
    Scheduled,
    /// A fetch cycle is running
    Fetching,
    /// Rate limited; waiting for `backoff_next_retry_at`
    Backoff,
}

/// Refresh bookkeeping owned by a single [`RefreshScheduler`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshState {
    pub phase: RefreshPhase,
    pub last_success_at: Option<NaiveDateTime>,
    pub stale_since: Option<NaiveDateTime>,
    pub next_refresh_at: Option<NaiveDateTime>,
    pub backoff_attempt: u32,
    pub backoff_next_retry_at: Option<NaiveDateTime>,
    pub in_flight: bool,
}

impl RefreshState {
    fn initial(now: NaiveDateTime) -> Self {
        Self {
            phase: RefreshPhase::Scheduled,
            last_success_at: None,
            stale_since: None,
            next_refresh_at: Some(now),
            backoff_attempt: 0,
            backoff_next_retry_at: None,
            in_flight: false,
        }
    }

    /// How long the displayed data has been stale, if it is
    pub fn stale_for(&self, now: NaiveDateTime) -> Option<Duration> {
        self.stale_since.map(|since| (now - since).max(Duration::zero()))
    }

    pub fn in_backoff(&self, now: NaiveDateTime) -> bool {
        self.phase == RefreshPhase::Backoff
            && self.backoff_next_retry_at.is_some_and(|retry_at| now < retry_at)
    }
}

/// What the caller should do after a tick or a refresh request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Start exactly one fetch cycle now
    Dispatch,
    /// Nothing due yet
    NotDue,
    /// A fetch is already running; nothing changed
    AlreadyFetching,
    /// Rate-limit backoff is active until `retry_at`
    BackoffActive { retry_at: Option<NaiveDateTime> },
}

impl TriggerOutcome {
    pub fn should_dispatch(&self) -> bool {
        matches!(self, TriggerOutcome::Dispatch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BannerLevel {
    Info,
    Warn,
    Error,
}

/// One-line notice shown above the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub level: BannerLevel,
    pub text: String,
}

impl Banner {
    pub fn info(text: impl Into<String>) -> Self {
        Self { level: BannerLevel::Info, text: text.into() }
    }

    pub fn warn(text: impl Into<String>) -> Self {
        Self { level: BannerLevel::Warn, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { level: BannerLevel::Error, text: text.into() }
    }
}

/// Read-only cadence parameters fixed at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Periodic refresh interval; `None` refreshes only on demand
    pub watch_interval: Option<Duration>,
    pub backoff_base_secs: u64,
    pub backoff_max_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            watch_interval: Some(Duration::seconds(30)),
            backoff_base_secs: DEFAULT_BASE_SECS,
            backoff_max_secs: DEFAULT_MAX_SECS,
        }
    }
}

/// Owns the [`RefreshState`] and applies every transition to it
#[derive(Debug)]
pub struct RefreshScheduler<R: Rng = StdRng> {
    state: RefreshState,
    config: SchedulerConfig,
    rng: R,
}

impl RefreshScheduler<StdRng> {
    pub fn new(config: SchedulerConfig, now: NaiveDateTime) -> Self {
        Self::with_rng(config, now, StdRng::from_entropy())
    }
}

impl<R: Rng> RefreshScheduler<R> {
    /// Scheduler with an injected jitter source, initially due immediately
    pub fn with_rng(config: SchedulerConfig, now: NaiveDateTime, rng: R) -> Self {
        Self {
            state: RefreshState::initial(now),
            config,
            rng,
        }
    }

    pub fn state(&self) -> &RefreshState {
        &self.state
    }

    pub fn phase(&self) -> RefreshPhase {
        self.state.phase
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Periodic timer: dispatch when due, resume after an elapsed backoff
    pub fn on_tick(&mut self, now: NaiveDateTime) -> TriggerOutcome {
        match self.state.phase {
            RefreshPhase::Fetching => TriggerOutcome::AlreadyFetching,
            RefreshPhase::Idle => TriggerOutcome::NotDue,
            RefreshPhase::Backoff => {
                if self.state.in_backoff(now) {
                    return TriggerOutcome::BackoffActive {
                        retry_at: self.state.backoff_next_retry_at,
                    };
                }
                debug!(attempt = self.state.backoff_attempt, "backoff elapsed, retrying");
                self.state.phase = RefreshPhase::Scheduled;
                self.state.next_refresh_at = Some(now);
                self.dispatch(now)
            }
            RefreshPhase::Scheduled => match self.state.next_refresh_at {
                Some(due) if now >= due => self.dispatch(now),
                _ => TriggerOutcome::NotDue,
            },
        }
    }

    /// User-requested refresh, honored unless fetching or backing off
    pub fn request_refresh(&mut self, now: NaiveDateTime) -> TriggerOutcome {
        match self.state.phase {
            RefreshPhase::Fetching => TriggerOutcome::AlreadyFetching,
            RefreshPhase::Backoff if self.state.in_backoff(now) => {
                debug!(
                    retry_at = ?self.state.backoff_next_retry_at,
                    "forced refresh rejected during backoff"
                );
                TriggerOutcome::BackoffActive {
                    retry_at: self.state.backoff_next_retry_at,
                }
            }
            _ => self.dispatch(now),
        }
    }

    fn dispatch(&mut self, now: NaiveDateTime) -> TriggerOutcome {
        self.state.phase = RefreshPhase::Fetching;
        self.state.in_flight = true;
        self.state.next_refresh_at = None;
        debug!(at = %now, "dispatching fetch cycle");
        TriggerOutcome::Dispatch
    }

    /// A fetch cycle completed successfully
    pub fn on_success(&mut self, now: NaiveDateTime) {
        self.state.in_flight = false;
        self.state.backoff_attempt = 0;
        self.state.backoff_next_retry_at = None;
        self.state.stale_since = None;
        self.state.last_success_at = Some(now);
        self.schedule_next(now);
        info!(next_refresh_at = ?self.state.next_refresh_at, "refresh succeeded");
    }

    /// A fetch cycle failed; returns the notice to surface
    pub fn on_failure(&mut self, error: &FetchError, now: NaiveDateTime) -> Banner {
        self.state.in_flight = false;
        self.state.stale_since.get_or_insert(now);

        match error {
            FetchError::RateLimited { retry_at } => {
                self.state.backoff_attempt = self.state.backoff_attempt.saturating_add(1);
                let next = match retry_at {
                    Some(server_time) => *server_time,
                    None => backoff::next_retry(
                        now,
                        self.state.backoff_attempt,
                        self.config.backoff_base_secs,
                        self.config.backoff_max_secs,
                        &mut self.rng,
                    ),
                };
                self.state.backoff_next_retry_at = Some(next);
                self.state.next_refresh_at = None;
                self.state.phase = RefreshPhase::Backoff;
                warn!(
                    attempt = self.state.backoff_attempt,
                    retry_at = %next,
                    server_hint = retry_at.is_some(),
                    "rate limited, entering backoff"
                );
                Banner::warn(format!(
                    "Rate limited (429), backing off. Next retry: {}",
                    next.format("%Y-%m-%d %H:%M:%S")
                ))
            }
            FetchError::Unauthenticated => {
                self.schedule_next(now);
                warn!("refresh failed: unauthenticated");
                Banner::error(
                    "Authentication failed (token may have expired): set a new token with --token or RIGHTCODES_TOKEN.",
                )
            }
            FetchError::RequestFailed(detail) => {
                self.schedule_next(now);
                warn!(detail = %detail, "refresh failed");
                Banner::error(format!("Refresh failed: {detail}"))
            }
        }
    }

    fn schedule_next(&mut self, now: NaiveDateTime) {
        match self.config.watch_interval {
            Some(interval) => {
                self.state.next_refresh_at = Some(now + interval);
                self.state.phase = RefreshPhase::Scheduled;
            }
            None => {
                self.state.next_refresh_at = None;
                self.state.phase = RefreshPhase::Idle;
            }
        }
    }
}

/// Notice shown when a forced refresh is refused during backoff
pub fn backoff_rejection_banner(retry_at: Option<NaiveDateTime>) -> Banner {
    let when = retry_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    Banner::warn(format!("Still backing off after rate limit (429). Next retry: {when}"))
}
