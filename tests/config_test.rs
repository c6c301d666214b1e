use std::env;
use std::fs;
use tempfile::tempdir;

#[cfg(test)]
mod config_tests {
    use super::*;
    use chrono::Duration;
    use rightcodes_dashboard::config::Config;
    use rightcodes_dashboard::snapshot::{GranularitySetting, RangeMode};

    #[test]
    fn test_default_config_values() {
        let config = Config::default();

        // Test logging defaults
        assert_eq!(config.logging.level, "WARN");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.logging.output, "console");

        // Test API defaults
        assert_eq!(config.api.base_url, "https://right.codes");
        assert_eq!(config.api.token, None);
        assert_eq!(config.api.timeout_secs, 15);

        // Test refresh defaults
        assert_eq!(config.refresh.watch, "30s");
        assert_eq!(config.refresh.range, "24h");
        assert_eq!(config.refresh.rate_window, "6h");
        assert_eq!(config.refresh.granularity, "auto");
        assert_eq!(config.refresh.backoff_base_secs, 5);
        assert_eq!(config.refresh.backoff_max_secs, 300);
        assert_eq!(config.refresh.use_log_page_size, 20);

        // Test path defaults
        assert!(config.paths.log_directory.ends_with("logs"));
        assert!(config.doctor_output_path().ends_with("rightcodes-doctor.json"));
    }

    #[test]
    fn test_env_variable_override() {
        // Set environment variables
        env::set_var("RIGHTCODES_WATCH", "5m");
        env::set_var("RIGHTCODES_RANGE", "today");
        env::set_var("RIGHTCODES_TIMEOUT_SECS", "30");
        env::set_var("LOG_FORMAT", "json");

        let mut config = Config::default();
        config
            .apply_env_overrides()
            .expect("Failed to apply env overrides");

        assert_eq!(config.refresh.watch_interval().unwrap(), Some(Duration::minutes(5)));
        assert_eq!(config.refresh.range_mode().unwrap(), RangeMode::Today);
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.logging.format, "json");

        // A non-numeric timeout is rejected
        env::set_var("RIGHTCODES_TIMEOUT_SECS", "soon");
        let mut config = Config::default();
        assert!(config.apply_env_overrides().is_err());

        // Cleanup
        env::remove_var("RIGHTCODES_WATCH");
        env::remove_var("RIGHTCODES_RANGE");
        env::remove_var("RIGHTCODES_TIMEOUT_SECS");
        env::remove_var("LOG_FORMAT");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        // Test valid config
        assert!(config.validate().is_ok());

        // Unknown granularity
        config.refresh.granularity = "minute".to_string();
        assert!(config.validate().is_err());

        // Reset and test a malformed range
        config = Config::default();
        config.refresh.range = "yesterday".to_string();
        assert!(config.validate().is_err());

        // Backoff base of zero
        config = Config::default();
        config.refresh.backoff_base_secs = 0;
        assert!(config.validate().is_err());

        // Zero timeout
        config = Config::default();
        config.api.timeout_secs = 0;
        assert!(config.validate().is_err());

        // Watch off is valid
        config = Config::default();
        config.refresh.watch = "off".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_loading() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("rightcodes.toml");

        let config_content = r#"
[logging]
level = "DEBUG"
format = "json"
output = "file"

[api]
base_url = "https://example.test"
token = "file-token"

[refresh]
watch = "1m"
range = "7d"
granularity = "day"
use_log_page_size = 50
"#;

        fs::write(&config_path, config_content).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();

        assert_eq!(config.logging.level, "DEBUG");
        assert_eq!(config.logging.output, "file");
        assert_eq!(config.api.base_url, "https://example.test");
        assert_eq!(config.api.token.as_deref(), Some("file-token"));
        // Missing keys fall back to defaults
        assert_eq!(config.api.timeout_secs, 15);
        assert_eq!(config.refresh.rate_window, "6h");

        let plan = config.refresh.fetch_plan().unwrap();
        assert_eq!(plan.range, RangeMode::Rolling(7 * 24 * 3600));
        assert_eq!(plan.page_size, 50);
        assert_ne!(plan.granularity, GranularitySetting::Auto);
    }

    #[test]
    fn test_config_save_round_trip() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("saved.toml");

        let mut config = Config::default();
        config.refresh.watch = "2m".to_string();
        config.save_to_file(&config_path).unwrap();

        let loaded = Config::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.refresh.watch, "2m");
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("broken.toml");
        fs::write(&config_path, "[refresh\nwatch = ").unwrap();

        let err = Config::load_from_file(&config_path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
