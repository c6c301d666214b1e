use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, Instrument};

use super::FetchCompletion;
use crate::api::Fetcher;
use crate::error::FetchError;
use crate::snapshot::{fetch_snapshot, FetchPlan};

/// Run one fetch cycle in a background task and send the outcome to `tx`.
///
/// The task owns nothing but its inputs; it never touches refresh state.
/// Exactly one completion is sent per call, even if the cycle panics, so the
/// scheduler always leaves `Fetching`.
pub fn spawn_fetch(
    fetcher: Arc<dyn Fetcher>,
    plan: FetchPlan,
    started_at: NaiveDateTime,
    tx: mpsc::Sender<FetchCompletion>,
) -> JoinHandle<()> {
    let span = tracing::debug_span!("fetch_cycle", page = plan.page, started_at = %started_at);
    tokio::spawn(
        async move {
            let cycle = tokio::spawn(
                async move { fetch_snapshot(fetcher.as_ref(), &plan, started_at).await }
                    .in_current_span(),
            );
            let result = match cycle.await {
                Ok(result) => result,
                Err(join_error) => {
                    error!(error = %join_error, "fetch cycle aborted");
                    Err(FetchError::RequestFailed(format!("fetch cycle aborted: {join_error}")))
                }
            };
            let completion = FetchCompletion {
                plan,
                started_at,
                result,
            };
            if tx.send(completion).await.is_err() {
                debug!("event loop gone, dropping fetch result");
            }
        }
        .instrument(span),
    )
}
