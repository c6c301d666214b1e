//! Command implementations for the `rightcodes` CLI
//!
//! Each subcommand lives in its own module. Shared here: CLI overrides of
//! the loaded [`Config`] and construction of the authenticated API client.

pub mod dashboard;
pub mod doctor;
pub mod logs;

pub use dashboard::run_dashboard_command;
pub use doctor::run_doctor;
pub use logs::run_logs;

use std::time::Duration;

use anyhow::{bail, Result};

use crate::api::ApiClient;
use crate::config::Config;

/// Options accepted by every subcommand
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub token: Option<String>,
    pub base_url: Option<String>,
}

impl GlobalOptions {
    /// Apply flag values on top of file and environment configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(token) = self.token.as_ref().filter(|t| !t.trim().is_empty()) {
            config.api.token = Some(token.clone());
        }
        if let Some(base_url) = &self.base_url {
            config.api.base_url = base_url.clone();
        }
    }
}

/// Token from `--token`, then `RIGHTCODES_TOKEN`, then the config file.
///
/// Flags and the environment have already been folded into `config` by the
/// time this runs, so the config value is the resolved one.
pub fn resolve_token(config: &Config) -> Result<String> {
    match config.api.token.as_deref().map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => bail!(
            "No API token configured. Pass --token, set RIGHTCODES_TOKEN, or add `token` under [api] in rightcodes.toml"
        ),
    }
}

/// Authenticated client for the configured endpoint
pub fn build_client(config: &Config) -> Result<ApiClient> {
    let token = resolve_token(config)?;
    ApiClient::new(
        &config.api.base_url,
        Some(token),
        Duration::from_secs(config.api.timeout_secs),
    )
}
