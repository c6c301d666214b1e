//! right.codes Dashboard Library
//!
//! A terminal dashboard for a usage-metered right.codes account: remaining
//! subscription quota, balance, burn rate with an exhaustion ETA, per-model
//! usage, and the paginated usage log, refreshed on a schedule that backs off
//! when the server rate-limits.
//!
//! ## Architecture Overview
//!
//! Pure computation is kept apart from I/O so every rule can be tested with
//! plain values:
//!
//! - [`normalizer`] - Alias-tolerant extraction of records from loose JSON payloads
//! - [`quota`] - Effective per-subscription quota and account-wide sums
//! - [`burn_rate`] - Consumption rate over a window and the exhaustion ETA
//! - [`backoff`] - Capped exponential delays with jitter
//! - [`scheduler`] - The refresh state machine (when to fetch, how failures change cadence)
//! - [`view`] - Presentation model derived from a snapshot plus refresh state
//!
//! I/O lives behind seams:
//!
//! - [`api`] - The [`api::Fetcher`] trait and its reqwest implementation
//! - [`snapshot`] - One fetch cycle over all endpoints
//! - [`live`] - Background fetch workers and the dashboard session
//! - [`display`] - ratatui rendering and key handling (feature `live`)
//! - [`commands`] - CLI subcommands
//!
//! Ambient concerns: [`config`] (TOML file plus environment), [`logging`]
//! (tracing), [`privacy`] (redaction of anything printed or saved).
//!
//! ## Example
//!
//! ```rust
//! use rightcodes_dashboard::normalizer::subscriptions_from_payload;
//! use rightcodes_dashboard::quota::summarize;
//!
//! let payload = serde_json::json!({"subscriptions": [
//!     {"tier_id": "pro", "total_quota": 100, "remaining_quota": 40}
//! ]});
//! let summary = summarize(&subscriptions_from_payload(&payload));
//! assert_eq!(summary.used_sum, Some(60.0));
//! ```

pub mod api;
pub mod backoff;
pub mod burn_rate;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod normalizer;
pub mod privacy;
pub mod quota;
pub mod scheduler;
pub mod snapshot;
pub mod timestamp_parser;
pub mod view;

// Live mode modules
#[cfg(feature = "live")]
pub mod display;
pub mod live;

pub use api::{ApiClient, Fetcher};
pub use config::Config;
pub use error::{FetchError, FetchResult};
pub use scheduler::{RefreshPhase, RefreshScheduler, RefreshState};
pub use view::{DashboardMetrics, DashboardView};
