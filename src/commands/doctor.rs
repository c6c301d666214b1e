//! Endpoint diagnostics
//!
//! Calls every endpoint once and records which top-level keys came back.
//! Values are never written, so the report is safe to share.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::build_client;
use crate::api::{Fetcher, Granularity};
use crate::config::Config;
use crate::error::{FetchError, FetchResult};
use crate::snapshot::FetchPlan;

/// Flags of the `doctor` subcommand
#[derive(Debug, Clone, Default)]
pub struct DoctorOptions {
    pub out: Option<PathBuf>,
    pub no_save: bool,
}

/// Outcome of probing one endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeResult {
    pub endpoint: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_at: Option<NaiveDateTime>,
}

impl ProbeResult {
    fn from_result(endpoint: &'static str, result: FetchResult<Value>) -> Self {
        match result {
            Ok(payload) => {
                let mut keys: Vec<String> = payload
                    .as_object()
                    .map(|obj| obj.keys().cloned().collect())
                    .unwrap_or_default();
                keys.sort();
                Self {
                    endpoint,
                    ok: true,
                    keys,
                    error: None,
                    retry_at: None,
                }
            }
            Err(err) => Self {
                endpoint,
                ok: false,
                keys: Vec::new(),
                error: Some(err.kind()),
                retry_at: match err {
                    FetchError::RateLimited { retry_at } => retry_at,
                    _ => None,
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoctorReport {
    pub generated_at: NaiveDateTime,
    pub base_url: String,
    pub probes: Vec<ProbeResult>,
}

impl DoctorReport {
    pub fn all_ok(&self) -> bool {
        self.probes.iter().all(|p| p.ok)
    }
}

/// Probe each endpoint in fetch-cycle order; failures do not stop the run
pub async fn run_probes(fetcher: &dyn Fetcher, plan: &FetchPlan, now: NaiveDateTime) -> Vec<ProbeResult> {
    let windows = plan.windows(now);
    let granularity = plan.granularity.resolve(&plan.range);

    vec![
        ProbeResult::from_result("/auth/me", fetcher.fetch_profile().await),
        ProbeResult::from_result("/subscriptions/list", fetcher.fetch_subscriptions().await),
        ProbeResult::from_result("/use-log/stats/overall", fetcher.fetch_stats_overview().await),
        ProbeResult::from_result(
            "/use-log/stats",
            fetcher.fetch_stats_range(&windows.range_start, &windows.end).await,
        ),
        ProbeResult::from_result(
            "/use-log/stats/advanced?granularity=hour",
            fetcher
                .fetch_stats_advanced(&windows.rate_start, &windows.end, Granularity::Hour)
                .await,
        ),
        ProbeResult::from_result(
            "/use-log/stats/advanced",
            fetcher
                .fetch_stats_advanced(&windows.range_start, &windows.end, granularity)
                .await,
        ),
        ProbeResult::from_result(
            "/use-log/list",
            fetcher
                .fetch_usage_log_page(1, plan.page_size, Some(&windows.range_start), Some(&windows.end))
                .await,
        ),
    ]
}

pub fn write_report(report: &DoctorReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report).context("Failed to serialize doctor report")?;
    fs::write(path, json).with_context(|| format!("Failed to write doctor report: {}", path.display()))?;
    Ok(())
}

pub async fn run_doctor(config: &Config, options: &DoctorOptions) -> Result<()> {
    let client = build_client(config)?;
    let plan = config.refresh.fetch_plan()?;
    let now = crate::timestamp_parser::local_now();

    let report = DoctorReport {
        generated_at: now,
        base_url: client.base_url().to_string(),
        probes: run_probes(&client, &plan, now).await,
    };
    for probe in report.probes.iter().filter(|p| !p.ok) {
        warn!(endpoint = probe.endpoint, error = ?probe.error, "probe failed");
    }

    if options.no_save {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize doctor report")?;
        println!("{json}");
    } else {
        let path = options
            .out
            .clone()
            .unwrap_or_else(|| config.doctor_output_path());
        write_report(&report, &path)?;
        info!(path = %path.display(), "doctor report written");
        println!("Doctor report written to {}", path.display());
    }

    if !report.all_ok() {
        anyhow::bail!("One or more endpoints failed; see the report for details");
    }
    Ok(())
}
