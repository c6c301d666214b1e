//! One-shot usage-log listing
//!
//! Prints a single page of `/use-log/list`. Sensitive fields are redacted
//! before anything reaches the terminal.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use super::build_client;
use crate::api::Fetcher;
use crate::config::Config;
use crate::models::PageInfo;
use crate::normalizer::{
    billing_rate_label, billing_source_label, extract_page_info, extract_use_log_items, use_log_row,
};
use crate::privacy::redact_sensitive_fields;
use crate::snapshot::RangeMode;
use crate::timestamp_parser::{local_now, TimestampParser};
use crate::view::{fmt_cost, fmt_count, PLACEHOLDER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Flags of the `logs` subcommand
#[derive(Debug, Clone)]
pub struct LogsOptions {
    /// Overrides the configured range when set
    pub range: Option<String>,
    pub page: u32,
    /// Overrides the configured page size when set
    pub page_size: Option<u32>,
    pub format: OutputFormat,
}

/// A redacted use-log page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogsPage {
    #[serde(flatten)]
    pub page: PageInfo,
    pub items: Vec<Map<String, Value>>,
}

/// Fetch one page within `range` ending at `now` and redact every item
pub async fn fetch_logs_page(
    fetcher: &dyn Fetcher,
    range: RangeMode,
    page: u32,
    page_size: u32,
    now: NaiveDateTime,
) -> Result<LogsPage> {
    let start = TimestampParser::format_window(range.start(now));
    let end = TimestampParser::format_window(now);
    let payload = fetcher
        .fetch_usage_log_page(page, page_size, Some(&start), Some(&end))
        .await
        .context("Failed to fetch usage log")?;
    Ok(redact_page(&payload, PageInfo::new(page, page_size)))
}

pub fn redact_page(payload: &Value, requested: PageInfo) -> LogsPage {
    LogsPage {
        page: extract_page_info(payload, requested),
        items: extract_use_log_items(payload)
            .into_iter()
            .map(redact_sensitive_fields)
            .collect(),
    }
}

pub async fn run_logs(config: &Config, options: &LogsOptions) -> Result<()> {
    let range: RangeMode = match &options.range {
        Some(text) => text.parse()?,
        None => config.refresh.range_mode()?,
    };
    let page_size = options.page_size.unwrap_or(config.refresh.use_log_page_size).max(1);
    let client = build_client(config)?;

    info!(range = %range, page = options.page, page_size, "listing usage log");
    let page = fetch_logs_page(&client, range, options.page.max(1), page_size, local_now()).await?;

    match options.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&page).context("Failed to serialize usage log")?;
            println!("{json}");
        }
        OutputFormat::Table => print_table(&page, &range),
    }
    Ok(())
}

fn print_table(page: &LogsPage, range: &RangeMode) {
    let pages = page
        .page
        .max_page()
        .map(|max| format!("page {} / {}", page.page.page, max))
        .unwrap_or_else(|| format!("page {}", page.page.page));

    println!("\n{}", "=".repeat(100).bright_cyan());
    println!("{} {}", "Usage log".bright_white().bold(), format!("(range {range}, {pages})").bright_white());
    println!("{}", "=".repeat(100).bright_cyan());

    if page.items.is_empty() {
        println!("\n{}\n", "No entries in this range.".yellow());
        return;
    }

    println!(
        "{:<19}  {:<24}  {:<10}  {:>10}  {:>6}  {:<12}  {:>11}",
        "Time", "Model", "Channel", "Tokens", "Rate", "Billed to", "Cost"
    );
    for item in &page.items {
        let row = use_log_row(item);
        let text = |v: Option<String>| v.unwrap_or_else(|| PLACEHOLDER.to_string());
        println!(
            "{:<19}  {:<24}  {:<10}  {:>10}  {:>6}  {:<12}  {:>11}",
            text(row.time),
            text(row.model).bright_cyan(),
            text(row.channel),
            fmt_count(row.tokens),
            billing_rate_label(row.billing_rate),
            billing_source_label(row.billing_source.as_deref()),
            fmt_cost(row.cost).bright_green(),
        );
    }
    println!();
}
