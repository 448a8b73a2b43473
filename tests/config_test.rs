use std::env;
use tempfile::tempdir;

mod common;

#[cfg(test)]
mod config_tests {
    use super::*;
    use ga4_report::config::Config;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();

        // Test logging defaults
        assert_eq!(config.logging.level, "WARN");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.logging.output, "console");

        // Test API defaults
        assert_eq!(
            config.api.data_api_base,
            "https://analyticsdata.googleapis.com/v1beta"
        );
        assert_eq!(
            config.api.admin_api_base,
            "https://analyticsadmin.googleapis.com/v1beta"
        );
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.api.max_retries, 3);

        // Test query defaults
        assert_eq!(config.query.default_start_date, "30daysAgo");
        assert_eq!(config.query.default_end_date, "today");
        assert_eq!(config.query.default_limit, 1000);

        // Test output defaults
        assert_eq!(config.output.format, "table");
        assert!(config.output.json_pretty);
        assert_eq!(config.output.page_size, 25);
        assert!(config.paths.state_file.ends_with("property.toml"));
    }

    #[test]
    fn test_env_variable_override() {
        env::set_var("GA4_TIMEOUT_SECS", "90");
        env::set_var("GA4_OUTPUT_FORMAT", "csv");
        env::set_var("LOG_LEVEL", "DEBUG");
        env::set_var("GA4_STATE_FILE", "/tmp/ga4-state.toml");

        let mut config = Config::default();
        config
            .apply_env_overrides()
            .expect("Failed to apply env overrides");

        assert_eq!(config.api.timeout_secs, 90);
        assert_eq!(config.output.format, "csv");
        assert_eq!(config.logging.level, "DEBUG");
        assert_eq!(
            config.paths.state_file,
            std::path::PathBuf::from("/tmp/ga4-state.toml")
        );

        // Cleanup
        env::remove_var("GA4_TIMEOUT_SECS");
        env::remove_var("GA4_OUTPUT_FORMAT");
        env::remove_var("LOG_LEVEL");
        env::remove_var("GA4_STATE_FILE");

        // Unparseable numbers are rejected rather than ignored
        env::set_var("GA4_PAGE_SIZE", "lots");
        let mut config = Config::default();
        assert!(config.apply_env_overrides().is_err());
        env::remove_var("GA4_PAGE_SIZE");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        // Test valid config
        assert!(config.validate().is_ok());

        // Test invalid timeout
        config.api.timeout_secs = 0;
        assert!(config.validate().is_err());

        // Reset and test invalid limit
        config = Config::default();
        config.query.default_limit = 0;
        assert!(config.validate().is_err());

        // Reset and test invalid output format
        config = Config::default();
        config.output.format = "yaml".to_string();
        assert!(config.validate().is_err());

        // Reset and test invalid log format
        config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_loading() {
        let temp_dir = tempdir().expect("Failed to create temp dir");

        let test_config = r#"
[logging]
level = "DEBUG"
format = "json"
output = "file"

[api]
data_api_base = "http://localhost:8080/v1beta"
admin_api_base = "http://localhost:8081/v1beta"
timeout_secs = 10
max_retries = 0
access_token = "ya29.test"

[query]
default_start_date = "7daysAgo"
default_end_date = "yesterday"
default_limit = 250

[output]
format = "json"
json_pretty = false
page_size = 0

[paths]
log_directory = "/custom/logs"
state_file = "/custom/property.toml"
        "#;

        common::write_config(temp_dir.path(), "test-config.toml", test_config)
            .expect("Failed to write test config");

        // Load config from file
        let config = Config::load_from_file(&temp_dir.path().join("test-config.toml"))
            .expect("Failed to load config");

        // Verify loaded values
        assert_eq!(config.logging.level, "DEBUG");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.api.data_api_base, "http://localhost:8080/v1beta");
        assert_eq!(config.api.max_retries, 0);
        assert_eq!(config.api.access_token.as_deref(), Some("ya29.test"));
        assert_eq!(config.query.default_limit, 250);
        assert_eq!(config.output.page_size, 0);
        assert!(!config.output.json_pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_file_keeps_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let test_config = r#"
[api]
access_token = "ya29.partial"

[output]
page_size = 50
        "#;

        common::write_config(temp_dir.path(), "partial.toml", test_config)
            .expect("Failed to write test config");

        let config = Config::load_from_file(&temp_dir.path().join("partial.toml"))
            .expect("Partial config should load");

        assert_eq!(config.api.access_token.as_deref(), Some("ya29.partial"));
        assert_eq!(
            config.api.data_api_base,
            "https://analyticsdata.googleapis.com/v1beta"
        );
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.output.page_size, 50);
        assert_eq!(config.output.format, "table");
        assert_eq!(config.logging.level, "WARN");
        assert_eq!(config.query.default_limit, 1000);
        assert!(config.validate().is_ok());

        // An empty file is all defaults
        common::write_config(temp_dir.path(), "empty.toml", "").expect("Failed to write test config");
        let config = Config::load_from_file(&temp_dir.path().join("empty.toml"))
            .expect("Empty config should load");
        assert_eq!(config.output.page_size, 25);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();

        // Test TOML serialization
        let toml_string = toml::to_string_pretty(&config).expect("Failed to serialize to TOML");
        assert!(toml_string.contains("[logging]"));
        assert!(toml_string.contains("[api]"));
        assert!(toml_string.contains("[query]"));
        assert!(toml_string.contains("[output]"));
        assert!(toml_string.contains("[paths]"));
        assert!(!toml_string.contains("access_token"));

        // Test round-trip
        let deserialized: Config =
            toml::from_str(&toml_string).expect("Failed to deserialize TOML");
        assert_eq!(config.logging.level, deserialized.logging.level);
        assert_eq!(config.api.timeout_secs, deserialized.api.timeout_secs);
        assert_eq!(config.query.default_limit, deserialized.query.default_limit);
    }

    #[test]
    fn test_save_to_file_round_trip() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("saved.toml");

        let mut config = Config::default();
        config.output.page_size = 100;
        config.save_to_file(&path).expect("Failed to save config");

        let loaded = Config::load_from_file(&path).expect("Failed to load config");
        assert_eq!(loaded.output.page_size, 100);
    }
}
