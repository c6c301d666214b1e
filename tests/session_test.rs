//! Dashboard session tests driven by a scripted fetcher
//!
//! Tests run on the current-thread runtime, so a spawned fetch worker makes
//! no progress until the test awaits the completion channel. That keeps the
//! "fetch in flight" window fully under test control.

mod common;

use std::sync::Arc;

use chrono::Duration;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;

use common::{default_plan, t0, ScriptedFetcher};
use rightcodes_dashboard::error::FetchError;
use rightcodes_dashboard::live::{DashboardSession, FetchCompletion, COMPLETION_CHANNEL_BUFFER};
use rightcodes_dashboard::scheduler::{
    BannerLevel, RefreshPhase, RefreshScheduler, SchedulerConfig, TriggerOutcome,
};

fn session(fetcher: Arc<ScriptedFetcher>) -> (DashboardSession, mpsc::Receiver<FetchCompletion>) {
    let config = SchedulerConfig {
        watch_interval: Some(Duration::seconds(30)),
        backoff_base_secs: 5,
        backoff_max_secs: 60,
    };
    let scheduler = RefreshScheduler::with_rng(config, t0(), StdRng::seed_from_u64(42));
    let (tx, rx) = mpsc::channel(COMPLETION_CHANNEL_BUFFER);
    (DashboardSession::new(fetcher, scheduler, default_plan(), tx), rx)
}

async fn complete_one(
    session: &mut DashboardSession,
    rx: &mut mpsc::Receiver<FetchCompletion>,
    now: chrono::NaiveDateTime,
) {
    let completion = rx.recv().await.expect("worker sends a completion");
    session.apply_completion(completion, now);
}

#[tokio::test]
async fn test_first_tick_fetches_and_populates_metrics() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let (mut session, mut rx) = session(fetcher.clone());

    assert_eq!(session.tick(t0()), TriggerOutcome::Dispatch);
    complete_one(&mut session, &mut rx, t0()).await;

    let metrics = session.metrics().expect("metrics after a successful cycle");
    assert_eq!(metrics.balance, Some(5.7001));
    assert_eq!(metrics.quota.remaining_sum, Some(40.0));
    assert!(metrics.quota.degraded);
    assert_eq!(metrics.models[0].model, "gpt-5.2");
    assert_eq!(metrics.use_logs[0].key_name.as_deref(), Some("de…9876"));
    assert_eq!(metrics.use_log_page.max_page(), Some(3));

    // 6.0 spent over 6h is 1.0 per hour; 40 remaining lasts 40h
    assert_eq!(metrics.eta.target_time, Some(t0() + Duration::hours(40)));

    let state = session.state();
    assert_eq!(state.phase, RefreshPhase::Scheduled);
    assert_eq!(state.last_success_at, Some(t0()));
    assert_eq!(state.next_refresh_at, Some(t0() + Duration::seconds(30)));
    assert!(session.banner().is_none());

    assert_eq!(
        fetcher.calls(),
        vec!["profile", "subscriptions", "advanced:hour", "advanced:hour", "stats", "use_log:1"]
    );
}

#[tokio::test]
async fn test_no_second_worker_while_fetching() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let (mut session, mut rx) = session(fetcher.clone());

    assert_eq!(session.tick(t0()), TriggerOutcome::Dispatch);
    let before = session.state().clone();

    assert_eq!(session.tick(t0() + Duration::seconds(1)), TriggerOutcome::AlreadyFetching);
    assert_eq!(session.force_refresh(t0() + Duration::seconds(2)), TriggerOutcome::AlreadyFetching);
    assert_eq!(session.state(), &before);
    assert_eq!(session.dispatched(), 1);

    complete_one(&mut session, &mut rx, t0() + Duration::seconds(3)).await;
    assert_eq!(fetcher.call_count("profile"), 1);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_forced_refresh_during_backoff_is_rejected() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.fail_next(FetchError::RateLimited { retry_at: None });
    let (mut session, mut rx) = session(fetcher.clone());

    session.tick(t0());
    complete_one(&mut session, &mut rx, t0()).await;

    let state = session.state().clone();
    assert_eq!(state.phase, RefreshPhase::Backoff);
    assert_eq!(state.backoff_attempt, 1);
    let retry_at = state.backoff_next_retry_at.expect("retry time set");
    assert!(retry_at >= t0() + Duration::seconds(5));
    assert!(retry_at <= t0() + Duration::seconds(10));
    assert_eq!(session.banner().map(|b| b.level), Some(BannerLevel::Error));

    let outcome = session.force_refresh(t0() + Duration::seconds(1));
    assert_eq!(outcome, TriggerOutcome::BackoffActive { retry_at: Some(retry_at) });
    assert_eq!(session.state().backoff_next_retry_at, Some(retry_at));
    assert_eq!(session.dispatched(), 1);
    assert!(session.banner().unwrap().text.contains("Still backing off"));

    tokio::task::yield_now().await;
    assert_eq!(fetcher.call_count("profile"), 1);
}

#[tokio::test]
async fn test_backoff_elapses_into_automatic_retry() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let server_hint = t0() + Duration::seconds(20);
    fetcher.fail_next(FetchError::RateLimited { retry_at: Some(server_hint) });
    let (mut session, mut rx) = session(fetcher.clone());

    session.tick(t0());
    complete_one(&mut session, &mut rx, t0()).await;
    assert_eq!(session.state().backoff_next_retry_at, Some(server_hint));

    assert!(matches!(
        session.tick(t0() + Duration::seconds(19)),
        TriggerOutcome::BackoffActive { .. }
    ));
    assert_eq!(session.tick(server_hint), TriggerOutcome::Dispatch);
    complete_one(&mut session, &mut rx, server_hint).await;

    let state = session.state();
    assert_eq!(state.phase, RefreshPhase::Scheduled);
    assert_eq!(state.backoff_attempt, 0);
    assert_eq!(state.backoff_next_retry_at, None);
    assert_eq!(state.stale_since, None);
}

#[tokio::test]
async fn test_failure_keeps_last_metrics_and_marks_stale() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let (mut session, mut rx) = session(fetcher.clone());

    session.tick(t0());
    complete_one(&mut session, &mut rx, t0()).await;
    let good = session.metrics().cloned();

    fetcher.fail_next(FetchError::RequestFailed("HTTP 502".to_string()));
    let due = t0() + Duration::seconds(30);
    assert_eq!(session.tick(due), TriggerOutcome::Dispatch);
    complete_one(&mut session, &mut rx, due).await;

    assert_eq!(session.metrics().cloned(), good);
    assert_eq!(session.state().phase, RefreshPhase::Scheduled);
    assert_eq!(session.state().backoff_attempt, 0);
    assert_eq!(session.banner().map(|b| b.level), Some(BannerLevel::Error));

    let view = session.view(due + Duration::seconds(12));
    assert!(view.is_stale());
    assert!(view.status.render().contains("Stale: yes (12s)"));
}

#[tokio::test]
async fn test_auth_failure_does_not_back_off() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.fail_next(FetchError::Unauthenticated);
    let (mut session, mut rx) = session(fetcher.clone());

    session.tick(t0());
    complete_one(&mut session, &mut rx, t0()).await;

    assert_eq!(session.state().phase, RefreshPhase::Scheduled);
    assert_eq!(session.state().backoff_next_retry_at, None);
    assert!(session.banner().unwrap().text.contains("token"));
    assert!(session.metrics().is_none());
}

#[tokio::test]
async fn test_use_log_failure_only_empties_that_section() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.fail_next_use_log(FetchError::RequestFailed("HTTP 500".to_string()));
    let (mut session, mut rx) = session(fetcher.clone());

    session.tick(t0());
    complete_one(&mut session, &mut rx, t0()).await;

    let metrics = session.metrics().expect("cycle still succeeds");
    assert!(metrics.use_logs.is_empty());
    assert_eq!(metrics.quota.remaining_sum, Some(40.0));
    assert!(session.banner().is_none());
}

#[tokio::test]
async fn test_any_use_log_failure_keeps_the_cycle() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let (mut session, mut rx) = session(fetcher.clone());

    session.tick(t0());
    complete_one(&mut session, &mut rx, t0()).await;

    fetcher.fail_next_use_log(FetchError::RateLimited { retry_at: None });
    let later = t0() + Duration::seconds(30);
    assert_eq!(session.tick(later), TriggerOutcome::Dispatch);
    complete_one(&mut session, &mut rx, later).await;

    fetcher.fail_next_use_log(FetchError::Unauthenticated);
    let last = later + Duration::seconds(30);
    assert_eq!(session.tick(last), TriggerOutcome::Dispatch);
    complete_one(&mut session, &mut rx, last).await;

    let state = session.state();
    assert_eq!(state.phase, RefreshPhase::Scheduled);
    assert_eq!(state.last_success_at, Some(last));
    assert_eq!(state.backoff_attempt, 0);
    assert!(state.stale_since.is_none());
    let metrics = session.metrics().unwrap();
    assert!(metrics.use_logs.is_empty());
    assert_eq!(metrics.quota.remaining_sum, Some(40.0));
    assert!(session.banner().is_none());
}

#[tokio::test]
async fn test_panicking_fetch_releases_the_scheduler() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.panic_next();
    let (mut session, mut rx) = session(fetcher.clone());

    assert_eq!(session.tick(t0()), TriggerOutcome::Dispatch);
    complete_one(&mut session, &mut rx, t0()).await;

    assert_ne!(session.state().phase, RefreshPhase::Fetching);
    assert!(session.state().stale_since.is_some());
    assert_eq!(session.banner().map(|b| b.level), Some(BannerLevel::Error));

    let now = t0() + Duration::seconds(1);
    assert_eq!(session.force_refresh(now), TriggerOutcome::Dispatch);
    complete_one(&mut session, &mut rx, now).await;
    assert!(session.metrics().is_some());
    assert_eq!(session.state().phase, RefreshPhase::Scheduled);
}

#[tokio::test]
async fn test_page_turn_during_fetch_keeps_current_page() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let (mut session, mut rx) = session(fetcher.clone());

    session.tick(t0());
    complete_one(&mut session, &mut rx, t0()).await;

    let now = t0() + Duration::seconds(30);
    assert_eq!(session.tick(now), TriggerOutcome::Dispatch);
    assert_eq!(session.next_page(now), Some(TriggerOutcome::AlreadyFetching));
    assert_eq!(session.plan().page, 1);
    assert!(session.banner().unwrap().text.contains("in progress"));

    complete_one(&mut session, &mut rx, now).await;
    assert_eq!(session.plan().page, 1);
    assert_eq!(fetcher.call_count("use_log:2"), 0);
    assert_eq!(session.dispatched(), 2);
}

#[tokio::test]
async fn test_pagination_boundaries() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let (mut session, mut rx) = session(fetcher.clone());

    session.tick(t0());
    complete_one(&mut session, &mut rx, t0()).await;

    assert_eq!(session.prev_page(t0()), None);
    assert_eq!(session.banner().map(|b| b.level), Some(BannerLevel::Info));
    assert_eq!(session.plan().page, 1);

    let now = t0() + Duration::seconds(1);
    assert_eq!(session.next_page(now), Some(TriggerOutcome::Dispatch));
    complete_one(&mut session, &mut rx, now).await;
    assert_eq!(session.plan().page, 2);
    assert_eq!(fetcher.call_count("use_log:2"), 1);

    let now = t0() + Duration::seconds(2);
    assert_eq!(session.next_page(now), Some(TriggerOutcome::Dispatch));
    complete_one(&mut session, &mut rx, now).await;
    assert_eq!(session.plan().page, 3);

    // 41 entries at 20 per page end on page 3
    assert_eq!(session.next_page(t0() + Duration::seconds(3)), None);
    assert!(session.banner().unwrap().text.contains("last page"));
    assert_eq!(session.dispatched(), 3);
}
