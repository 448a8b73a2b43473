//! Production configuration system
//!
//! Provides centralized configuration management with:
//! - Environment variable support
//! - Config file loading (optional)
//! - Runtime defaults
//! - Validation and type safety

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Main configuration structure
///
/// Every section defaults, so a config file only needs the keys it changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Data/Admin API access
    pub api: ApiConfig,

    /// Query defaults
    pub query: QueryConfig,

    /// Output configuration
    pub output: OutputConfig,

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
    pub data_api_base: String,
    pub admin_api_base: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// OAuth2 bearer token, obtained outside this tool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_start_date: String,
    pub default_end_date: String,
    pub default_limit: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: String,
    pub json_pretty: bool,
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub log_directory: PathBuf,
    pub state_file: PathBuf,
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
            data_api_base: "https://analyticsdata.googleapis.com/v1beta".to_string(),
            admin_api_base: "https://analyticsadmin.googleapis.com/v1beta".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            access_token: None,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_start_date: "30daysAgo".to_string(),
            default_end_date: "today".to_string(),
            default_limit: 1000,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "table".to_string(),
            json_pretty: true,
            page_size: 25,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_directory: PathBuf::from("logs"),
            state_file: dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("ga4-report")
                .join("property.toml"),
        }
    }
}

impl Config {
    /// Load configuration from environment, file, and defaults
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        // Try to load from config file if it exists
        let config_paths = [
            PathBuf::from("ga4-report.toml"),
            PathBuf::from(".ga4-report.toml"),
            dirs::config_dir()
                .map(|d| d.join("ga4-report").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.is_file() {
                info!(config_file = %path.display(), "Loading configuration from file");
                config = Self::load_from_file(path)?;
                break;
            }
        }

        // Override with environment variables
        config.apply_env_overrides()?;

        // Validate configuration
        config.validate()?;

        Ok(config)
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
        if let Ok(val) = env::var("GA4_ACCESS_TOKEN") {
            self.api.access_token = Some(val);
        }
        if let Ok(val) = env::var("GA4_DATA_API_BASE") {
            self.api.data_api_base = val;
        }
        if let Ok(val) = env::var("GA4_ADMIN_API_BASE") {
            self.api.admin_api_base = val;
        }
        if let Ok(val) = env::var("GA4_TIMEOUT_SECS") {
            self.api.timeout_secs = val.parse().context("Invalid GA4_TIMEOUT_SECS")?;
        }

        // Output overrides
        if let Ok(val) = env::var("GA4_PAGE_SIZE") {
            self.output.page_size = val.parse().context("Invalid GA4_PAGE_SIZE")?;
        }
        if let Ok(val) = env::var("GA4_OUTPUT_FORMAT") {
            self.output.format = val;
        }

        // Path overrides
        if let Ok(val) = env::var("GA4_LOG_DIR") {
            self.paths.log_directory = PathBuf::from(val);
        }
        if let Ok(val) = env::var("GA4_STATE_FILE") {
            self.paths.state_file = PathBuf::from(val);
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(anyhow::anyhow!(
                "Log format must be 'pretty' or 'json', got '{}'",
                self.logging.format
            ));
        }

        if self.api.timeout_secs == 0 {
            return Err(anyhow::anyhow!("API timeout must be greater than 0"));
        }

        if self.api.max_retries > 10 {
            warn!(
                max_retries = self.api.max_retries,
                "Retry count is very high, failing requests will be slow to report"
            );
        }

        if self.query.default_limit == 0 {
            return Err(anyhow::anyhow!("Default query limit must be greater than 0"));
        }

        if !matches!(self.output.format.as_str(), "table" | "json" | "csv") {
            return Err(anyhow::anyhow!(
                "Output format must be table, json or csv, got '{}'",
                self.output.format
            ));
        }

        if self.api.access_token.as_deref().is_some_and(|t| t.trim().is_empty()) {
            warn!("Access token is set but empty");
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
}

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load the global configuration once; later calls return the same instance.
pub fn init_config() -> Result<&'static Config> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }
    let config = Config::load()?;
    Ok(CONFIG.get_or_init(|| config))
}
