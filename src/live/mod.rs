//! Live refresh pipeline
//!
//! The dashboard runs one cooperative event loop. Fetch cycles run in spawned
//! tasks ([`worker`]) that report back over an mpsc channel as
//! [`FetchCompletion`] messages; only the [`orchestrator::DashboardSession`]
//! mutates refresh state, and only from the loop.

use chrono::NaiveDateTime;

use crate::error::FetchResult;
use crate::snapshot::{FetchPlan, Snapshot};

pub mod orchestrator;
pub mod worker;

pub use orchestrator::DashboardSession;
pub use worker::spawn_fetch;

/// Capacity of the completion channel; one fetch is in flight at a time
pub const COMPLETION_CHANNEL_BUFFER: usize = 4;

/// Outcome of one fetch cycle, sent from a worker to the event loop
#[derive(Debug)]
pub struct FetchCompletion {
    /// The plan the cycle ran with
    pub plan: FetchPlan,
    /// Local time at dispatch
    pub started_at: NaiveDateTime,
    pub result: FetchResult<Snapshot>,
}
