//! Interactive dashboard command

use anyhow::Result;

use crate::config::{Config, RefreshConfig};

/// Flags of the `dashboard` subcommand; unset flags keep the configured value
#[derive(Debug, Clone, Default)]
pub struct DashboardOptions {
    pub watch: Option<String>,
    pub range: Option<String>,
    pub rate_window: Option<String>,
    pub granularity: Option<String>,
}

impl DashboardOptions {
    pub fn apply(&self, refresh: &mut RefreshConfig) {
        if let Some(watch) = &self.watch {
            refresh.watch = watch.clone();
        }
        if let Some(range) = &self.range {
            refresh.range = range.clone();
        }
        if let Some(rate_window) = &self.rate_window {
            refresh.rate_window = rate_window.clone();
        }
        if let Some(granularity) = &self.granularity {
            refresh.granularity = granularity.clone();
        }
    }
}

/// Run the dashboard until the user quits
#[cfg(feature = "live")]
pub async fn run_dashboard_command(config: &Config) -> Result<()> {
    use std::sync::Arc;

    use tokio::sync::mpsc;
    use tracing::{info, Instrument, Level};

    use super::build_client;
    use crate::api::Fetcher;
    use crate::live::{DashboardSession, FetchCompletion, COMPLETION_CHANNEL_BUFFER};
    use crate::scheduler::RefreshScheduler;
    use crate::timestamp_parser::local_now;

    let fetcher: Arc<dyn Fetcher> = Arc::new(build_client(config)?);
    let plan = config.refresh.fetch_plan()?;
    let scheduler = RefreshScheduler::new(config.refresh.scheduler_config()?, local_now());

    let (tx, rx) = mpsc::channel::<FetchCompletion>(COMPLETION_CHANNEL_BUFFER);
    let session = DashboardSession::new(fetcher, scheduler, plan, tx);

    let span = crate::span_with_context!(Level::INFO, "dashboard", range = %plan.range);
    async move {
        info!(
            base_url = %config.api.base_url,
            watch = %config.refresh.watch,
            rate_window_secs = plan.rate_window_secs,
            "starting dashboard"
        );
        crate::display::run_dashboard(session, rx).await
    }
    .instrument(span)
    .await
}

#[cfg(not(feature = "live"))]
pub async fn run_dashboard_command(_config: &Config) -> Result<()> {
    anyhow::bail!("This build has no interactive dashboard; rebuild with `--features live`")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::RangeMode;

    #[test]
    fn test_flags_override_refresh_config() {
        let mut refresh = RefreshConfig::default();
        DashboardOptions {
            watch: Some("off".to_string()),
            range: Some("today".to_string()),
            rate_window: None,
            granularity: Some("day".to_string()),
        }
        .apply(&mut refresh);

        assert_eq!(refresh.watch_interval().unwrap(), None);
        assert_eq!(refresh.range_mode().unwrap(), RangeMode::Today);
        assert_eq!(refresh.rate_window, "6h");
        assert_eq!(refresh.granularity, "day");
    }
}
