//! Production configuration system
//!
//! Provides centralized configuration management with:
//! - Config file loading (optional)
//! - Environment variable overrides
//! - Runtime defaults
//! - Validation of durations and backoff bounds

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::api::client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::backoff::{DEFAULT_BASE_SECS, DEFAULT_MAX_SECS};
use crate::scheduler::SchedulerConfig;
use crate::snapshot::{FetchPlan, GranularitySetting, RangeMode};
use crate::timestamp_parser::parse_duration_secs;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// API endpoint and credentials
    pub api: ApiConfig,

    /// Refresh cadence and query windows
    pub refresh: RefreshConfig,

    /// Paths configuration
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Periodic refresh interval; `0` or `off` disables it
    pub watch: String,
    /// Rolling duration or `today`
    pub range: String,
    pub rate_window: String,
    pub granularity: String,
    pub backoff_base_secs: u64,
    pub backoff_max_secs: u64,
    pub use_log_page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub log_directory: PathBuf,
    pub data_directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "WARN".to_string(),
            format: "pretty".to_string(),
            output: "console".to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            watch: "30s".to_string(),
            range: "24h".to_string(),
            rate_window: "6h".to_string(),
            granularity: "auto".to_string(),
            backoff_base_secs: DEFAULT_BASE_SECS,
            backoff_max_secs: DEFAULT_MAX_SECS,
            use_log_page_size: 20,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let data_root = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rightcodes");
        Self {
            log_directory: data_root.join("logs"),
            data_directory: data_root,
        }
    }
}

impl RefreshConfig {
    /// Watch interval, `None` when periodic refresh is off
    pub fn watch_interval(&self) -> Result<Option<Duration>> {
        let text = self.watch.trim();
        if text.is_empty() || text.eq_ignore_ascii_case("off") {
            return Ok(None);
        }
        let secs = parse_duration_secs(text).with_context(|| format!("Invalid watch interval: {text}"))?;
        if secs <= 0 {
            return Ok(None);
        }
        Duration::try_seconds(secs)
            .map(Some)
            .ok_or_else(|| anyhow::anyhow!("Watch interval out of range: {text}"))
    }

    pub fn range_mode(&self) -> Result<RangeMode> {
        self.range
            .parse()
            .with_context(|| format!("Invalid range: {}", self.range))
    }

    pub fn rate_window_secs(&self) -> Result<i64> {
        let secs = parse_duration_secs(&self.rate_window)
            .with_context(|| format!("Invalid rate window: {}", self.rate_window))?;
        if secs <= 0 {
            anyhow::bail!("Rate window must be positive, got {}", self.rate_window);
        }
        Ok(secs)
    }

    pub fn granularity_setting(&self) -> Result<GranularitySetting> {
        self.granularity.parse()
    }

    pub fn scheduler_config(&self) -> Result<SchedulerConfig> {
        Ok(SchedulerConfig {
            watch_interval: self.watch_interval()?,
            backoff_base_secs: self.backoff_base_secs,
            backoff_max_secs: self.backoff_max_secs,
        })
    }

    /// Fetch plan starting at the first use-log page
    pub fn fetch_plan(&self) -> Result<FetchPlan> {
        Ok(FetchPlan {
            range: self.range_mode()?,
            rate_window_secs: self.rate_window_secs()?,
            granularity: self.granularity_setting()?,
            page: 1,
            page_size: self.use_log_page_size,
        })
    }
}

impl Config {
    /// Load configuration from file, environment, and defaults
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        // Try to load from config file if it exists
        for path in Self::search_paths() {
            if path.exists() {
                info!(config_file = %path.display(), "Loading configuration from file");
                config = Self::load_from_file(&path)?;
                break;
            }
        }

        // Override with environment variables
        config.apply_env_overrides()?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Candidate config files, first match wins
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("rightcodes.toml"),
            PathBuf::from(".rightcodes.toml"),
        ];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("rightcodes").join("config.toml"));
        }
        paths
    }

    /// Load configuration from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        // Logging overrides
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("LOG_OUTPUT") {
            self.logging.output = val;
        }

        // API overrides
        if let Ok(val) = env::var("RIGHTCODES_BASE_URL") {
            self.api.base_url = val;
        }
        if let Ok(val) = env::var("RIGHTCODES_TOKEN") {
            if !val.trim().is_empty() {
                self.api.token = Some(val);
            }
        }
        if let Ok(val) = env::var("RIGHTCODES_TIMEOUT_SECS") {
            self.api.timeout_secs = val.parse().context("Invalid RIGHTCODES_TIMEOUT_SECS")?;
        }

        // Refresh overrides
        if let Ok(val) = env::var("RIGHTCODES_WATCH") {
            self.refresh.watch = val;
        }
        if let Ok(val) = env::var("RIGHTCODES_RANGE") {
            self.refresh.range = val;
        }
        if let Ok(val) = env::var("RIGHTCODES_RATE_WINDOW") {
            self.refresh.rate_window = val;
        }
        if let Ok(val) = env::var("RIGHTCODES_GRANULARITY") {
            self.refresh.granularity = val;
        }

        // Path overrides
        if let Ok(val) = env::var("RIGHTCODES_LOG_DIR") {
            self.paths.log_directory = PathBuf::from(val);
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let refresh = &self.refresh;
        refresh.watch_interval()?;
        refresh.range_mode()?;
        refresh.rate_window_secs()?;
        refresh.granularity_setting()?;

        if refresh.backoff_base_secs < 1 {
            return Err(anyhow::anyhow!("Backoff base must be at least 1 second"));
        }
        if refresh.backoff_max_secs < refresh.backoff_base_secs {
            return Err(anyhow::anyhow!(
                "Backoff max ({}s) must not be below backoff base ({}s)",
                refresh.backoff_max_secs,
                refresh.backoff_base_secs
            ));
        }
        if refresh.use_log_page_size == 0 {
            return Err(anyhow::anyhow!("Use-log page size must be greater than 0"));
        }

        if self.api.timeout_secs == 0 {
            return Err(anyhow::anyhow!("API timeout must be greater than 0"));
        }
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(anyhow::anyhow!("Base URL must be http(s): {}", self.api.base_url));
        }
        if self.api.base_url.starts_with("http://") {
            warn!(base_url = %self.api.base_url, "Base URL is not using TLS");
        }

        Ok(())
    }

    /// Save current configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!(path = %path.display(), "Configuration saved to file");

        Ok(())
    }

    /// Default location of the `doctor` report
    pub fn doctor_output_path(&self) -> PathBuf {
        self.paths.data_directory.join("rightcodes-doctor.json")
    }
}
