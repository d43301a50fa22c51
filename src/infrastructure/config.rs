//! Configuration infrastructure
//!
//! Contains configuration loading and management for the vehicle sales scraper.
//!
//! The whole run is driven by one `AppConfig` built at process start and
//! passed by reference; nothing here is a global.
//!
//! Sources, lowest precedence first:
//! 1. Compiled defaults (`defaults`, `trading_economics`)
//! 2. JSON config file (missing sections fall back to defaults)
//! 3. Environment overrides (`DATA_DIR`, `CHROME_BINARY`)

#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tracing::info;

use crate::domain::{Country, SlugResolver};

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Target site and country list
    pub source: SourceConfig,

    /// Browser launch settings
    pub browser: BrowserConfig,

    /// Waits, polls and delays
    pub timing: TimingConfig,

    /// Per-country retry budget
    pub retry: RetryConfig,

    /// Range selection and in-page extraction settings
    pub extraction: ExtractionConfig,

    /// Output locations
    pub output: OutputConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Target site settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Human readable dataset name written into the manifest
    pub dataset_name: String,

    /// Site root, e.g. `https://tradingeconomics.com`
    pub base_url: String,

    /// Metric path segment appended after the country slug
    pub metric_path: String,

    /// Ordered country list; no duplicates
    pub countries: Vec<String>,

    /// Country name → slug, for names the mechanical rule gets wrong
    pub slug_overrides: HashMap<String, String>,
}

/// Browser launch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Explicit Chrome/Chromium binary; discovered when unset
    pub binary: Option<PathBuf>,

    pub headless: bool,

    pub sandbox: bool,

    pub window_width: u32,

    pub window_height: u32,

    pub user_agent: String,

    pub lang: String,

    /// Extra command line switches passed verbatim
    pub extra_args: Vec<String>,

    /// Browser is torn down after this long without DevTools traffic
    pub idle_timeout_seconds: u64,
}

/// Waits, polls and delays
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Max wait for the document body after navigation
    pub page_load_timeout_seconds: u64,

    /// Grace delay once the body is present
    pub body_grace_ms: u64,

    /// Max wait for the charting runtime to initialise a chart
    pub readiness_timeout_seconds: u64,

    /// Readiness predicate polling interval
    pub readiness_poll_interval_ms: u64,

    /// Max wait for the 10-year range control
    pub range_control_timeout_seconds: u64,

    /// Re-render delay after a range change
    pub range_settle_ms: u64,

    /// Delay between countries regardless of outcome
    pub politeness_delay_ms: u64,

    /// Log a progress line every N countries
    pub progress_every: usize,
}

/// Per-country retry budget
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Extra attempts after the first (total attempts = retries + 1)
    pub retries: u32,

    /// Backoff before retry `i` is `base_delay_seconds + i` seconds
    pub base_delay_seconds: u64,

    /// Treat a clean empty extraction as retryable instead of final
    pub retry_on_empty: bool,
}

/// How the in-page extraction caps runaway collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapPolicy {
    /// Finish the current series, stop scanning further series once more
    /// than `point_cap` points were collected
    AfterSeries,
    /// Stop inside a series once it yielded more than `point_cap` points
    WithinSeries,
    /// Collect everything
    Disabled,
}

/// Range selection and extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// CSS selector of the site's own 10-year span control
    pub ten_year_selector: String,

    /// Range-selector button labels, most history first
    pub range_labels: Vec<String>,

    pub point_cap: usize,

    pub cap_policy: CapPolicy,

    /// Case-insensitive markers of an anti-automation interstitial
    pub challenge_keywords: Vec<String>,
}

/// Output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root of all outputs (`latest/`, `debug/`, `logs/`)
    pub data_dir: PathBuf,

    /// Years covered by the advisory recent-window view
    pub recent_window_years: u32,

    /// Dump HTML and a screenshot when a page yields no chart data
    pub debug_artifacts: bool,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Log directory; `<data_dir>/logs` when unset
    pub directory: Option<PathBuf>,

    /// Number of log files to keep (older files will be deleted)
    pub max_files: u32,

    /// Enable automatic log cleanup on startup
    pub auto_cleanup_logs: bool,

    /// Module-specific log level filters (e.g., "headless_chrome": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dataset_name: trading_economics::DATASET_NAME.to_string(),
            base_url: trading_economics::BASE_URL.to_string(),
            metric_path: trading_economics::METRIC_PATH.to_string(),
            countries: trading_economics::TARGET_COUNTRIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
            slug_overrides: trading_economics::SLUG_OVERRIDES
                .iter()
                .map(|(name, slug)| (name.to_string(), slug.to_string()))
                .collect(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            binary: None,
            headless: true,
            sandbox: false,
            window_width: defaults::WINDOW_WIDTH,
            window_height: defaults::WINDOW_HEIGHT,
            user_agent: defaults::USER_AGENT.to_string(),
            lang: defaults::BROWSER_LANG.to_string(),
            extra_args: defaults::BROWSER_ARGS.iter().map(|s| s.to_string()).collect(),
            idle_timeout_seconds: defaults::BROWSER_IDLE_TIMEOUT_SECONDS,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            page_load_timeout_seconds: defaults::PAGE_LOAD_TIMEOUT_SECONDS,
            body_grace_ms: defaults::BODY_GRACE_MS,
            readiness_timeout_seconds: defaults::READINESS_TIMEOUT_SECONDS,
            readiness_poll_interval_ms: defaults::READINESS_POLL_INTERVAL_MS,
            range_control_timeout_seconds: defaults::RANGE_CONTROL_TIMEOUT_SECONDS,
            range_settle_ms: defaults::RANGE_SETTLE_MS,
            politeness_delay_ms: defaults::POLITENESS_DELAY_MS,
            progress_every: defaults::PROGRESS_EVERY,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: defaults::RETRIES,
            base_delay_seconds: defaults::RETRY_BASE_DELAY_SECONDS,
            retry_on_empty: defaults::RETRY_ON_EMPTY,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ten_year_selector: trading_economics::TEN_YEAR_SELECTOR.to_string(),
            range_labels: defaults::RANGE_LABELS.iter().map(|s| s.to_string()).collect(),
            point_cap: defaults::POINT_CAP,
            cap_policy: CapPolicy::AfterSeries,
            challenge_keywords: defaults::CHALLENGE_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(defaults::DATA_DIR),
            recent_window_years: defaults::RECENT_WINDOW_YEARS,
            debug_artifacts: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            directory: None,
            max_files: defaults::LOG_MAX_FILES,
            auto_cleanup_logs: defaults::LOG_AUTO_CLEANUP,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("headless_chrome".to_string(), "warn".to_string());
                filters.insert("tungstenite".to_string(), "warn".to_string());
                filters.insert("tokio".to_string(), "info".to_string());
                filters
            },
        }
    }
}

impl TimingConfig {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_seconds)
    }

    pub fn body_grace(&self) -> Duration {
        Duration::from_millis(self.body_grace_ms)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_secs(self.readiness_timeout_seconds)
    }

    pub fn readiness_poll_interval(&self) -> Duration {
        Duration::from_millis(self.readiness_poll_interval_ms)
    }

    pub fn range_control_timeout(&self) -> Duration {
        Duration::from_secs(self.range_control_timeout_seconds)
    }

    pub fn range_settle(&self) -> Duration {
        Duration::from_millis(self.range_settle_ms)
    }

    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_secs(self.base_delay_seconds)
    }
}

impl OutputConfig {
    pub fn latest_dir(&self) -> PathBuf {
        self.data_dir.join("latest")
    }

    pub fn debug_dir(&self) -> PathBuf {
        self.data_dir.join("debug")
    }
}

impl LoggingConfig {
    pub fn log_directory(&self, data_dir: &Path) -> PathBuf {
        self.directory
            .clone()
            .unwrap_or_else(|| data_dir.join("logs"))
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Country list is empty")]
    EmptyCountryList,

    #[error("Country '{0}' appears more than once")]
    DuplicateCountry(String),

    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl AppConfig {
    /// Ordered target list as domain values
    pub fn countries(&self) -> Vec<Country> {
        self.source.countries.iter().map(Country::new).collect()
    }

    pub fn slug_resolver(&self) -> SlugResolver {
        SlugResolver::new(self.source.slug_overrides.clone())
    }

    /// Checks the invariants the pipeline relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.countries.is_empty() {
            return Err(ConfigError::EmptyCountryList);
        }

        let mut seen = HashSet::new();
        for country in &self.source.countries {
            if !seen.insert(country.as_str()) {
                return Err(ConfigError::DuplicateCountry(country.clone()));
            }
        }

        url::Url::parse(&self.source.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.source.base_url.clone(),
            reason: e.to_string(),
        })?;

        if self.timing.readiness_poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timing.readiness_poll_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.extraction.range_labels.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "extraction.range_labels",
                reason: "at least one label is required".to_string(),
            });
        }

        Ok(())
    }

    /// Applies `DATA_DIR` and `CHROME_BINARY` overrides.
    /// `CHROME_BINARY` is only honoured when the path exists.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(env_keys::DATA_DIR).filter(|v| !v.trim().is_empty()) {
            info!("DATA_DIR override: {}", dir);
            self.output.data_dir = PathBuf::from(dir);
        }

        if let Some(bin) = lookup(env_keys::CHROME_BINARY).map(PathBuf::from) {
            if bin.exists() {
                info!("CHROME_BINARY override: {:?}", bin);
                self.browser.binary = Some(bin);
            }
        }
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join("vehicle-sales-scraper");

        Ok(config_dir)
    }

    /// Config manager for `$VEHICLE_SALES_CONFIG`, or the per-user config file
    pub fn new() -> Result<Self> {
        if let Some(path) = std::env::var_os(env_keys::CONFIG_PATH) {
            return Ok(Self::with_path(PathBuf::from(path)));
        }
        let config_path = Self::get_config_dir()?.join("config.json");
        Ok(Self { config_path })
    }

    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Load configuration from file; defaults when the file does not exist
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!("Configuration file not found, using defaults: {:?}", self.config_path);
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .with_context(|| format!("Failed to read configuration file {:?}", self.config_path))?;

        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file {:?}", self.config_path))?;

        info!("Loaded configuration from: {:?}", self.config_path);
        Ok(config)
    }

    /// Load, apply environment overrides, validate
    pub async fn load_effective_config(&self) -> Result<AppConfig> {
        let mut config = self.load_config().await?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }
}

/// Environment variable names
pub mod env_keys {
    pub const DATA_DIR: &str = "DATA_DIR";
    pub const CHROME_BINARY: &str = "CHROME_BINARY";
    pub const CONFIG_PATH: &str = "VEHICLE_SALES_CONFIG";
}

/// Trading Economics site constants
pub mod trading_economics {
    pub const DATASET_NAME: &str = "Total Vehicle Sales (Monthly)";

    pub const BASE_URL: &str = "https://tradingeconomics.com";

    pub const METRIC_PATH: &str = "total-vehicle-sales";

    pub const TARGET_COUNTRIES: &[&str] = &[
        "Australia",
        "Brazil",
        "Chile",
        "China",
        "Colombia",
        "India",
        "Malaysia",
        "Mexico",
        "Philippines",
        "Russia",
        "South Africa",
        "Spain",
        "Thailand",
        "Turkey",
        "United States",
    ];

    pub const SLUG_OVERRIDES: &[(&str, &str)] = &[
        ("United States", "united-states"),
        ("South Africa", "south-africa"),
    ];

    /// Site's own date-picker button for a 10-year span
    pub const TEN_YEAR_SELECTOR: &str =
        "a.hawk-chartOptions-datePicker-cnt-btn[data-span_str='10Y']";
}

/// Default configuration values
pub mod defaults {
    pub const WINDOW_WIDTH: u32 = 1920;
    pub const WINDOW_HEIGHT: u32 = 1080;
    pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";
    pub const BROWSER_LANG: &str = "en-US";
    pub const BROWSER_ARGS: &[&str] = &[
        "--disable-blink-features=AutomationControlled",
        "--disable-dev-shm-usage",
        "--disable-gpu",
        "--disable-extensions",
    ];
    pub const BROWSER_IDLE_TIMEOUT_SECONDS: u64 = 600;

    pub const PAGE_LOAD_TIMEOUT_SECONDS: u64 = 60;
    pub const BODY_GRACE_MS: u64 = 2000;
    pub const READINESS_TIMEOUT_SECONDS: u64 = 60;
    pub const READINESS_POLL_INTERVAL_MS: u64 = 500;
    pub const RANGE_CONTROL_TIMEOUT_SECONDS: u64 = 10;
    pub const RANGE_SETTLE_MS: u64 = 2000;
    pub const POLITENESS_DELAY_MS: u64 = 1000;
    pub const PROGRESS_EVERY: usize = 5;

    pub const RETRIES: u32 = 2;
    pub const RETRY_BASE_DELAY_SECONDS: u64 = 2;
    pub const RETRY_ON_EMPTY: bool = false;

    pub const RANGE_LABELS: &[&str] = &["MAX", "10Y", "ALL"];
    pub const POINT_CAP: usize = 10;
    pub const CHALLENGE_KEYWORDS: &[&str] = &[
        "Just a moment...",
        "Verify you are human",
        "Attention Required!",
        "cf-challenge",
        "unusual traffic from your computer",
    ];

    pub const DATA_DIR: &str = "data";
    pub const RECENT_WINDOW_YEARS: u32 = 10;

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_JSON_FORMAT: bool = false;
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = true;
    pub const LOG_MAX_FILES: u32 = 5;
    pub const LOG_AUTO_CLEANUP: bool = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_target_dataset() {
        let config = AppConfig::default();
        assert_eq!(config.source.countries.len(), 15);
        assert_eq!(config.retry.retries, 2);
        assert_eq!(config.extraction.range_labels, vec!["MAX", "10Y", "ALL"]);
        assert_eq!(config.slug_resolver().resolve("United States"), "united-states");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_country() {
        let mut config = AppConfig::default();
        config.source.countries.push("Chile".to_string());
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateCountry("Chile".to_string()))
        );
    }

    #[test]
    fn test_validate_rejects_empty_list_and_zero_poll() {
        let mut config = AppConfig::default();
        config.source.countries.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptyCountryList));

        let mut config = AppConfig::default();
        config.timing.readiness_poll_interval_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let temp = TempDir::new().unwrap();
        let fake_chrome = temp.path().join("chrome");
        std::fs::write(&fake_chrome, b"").unwrap();
        let chrome = fake_chrome.to_string_lossy().to_string();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| match key {
            "DATA_DIR" => Some("/tmp/vss-data".to_string()),
            "CHROME_BINARY" => Some(chrome.clone()),
            _ => None,
        });
        assert_eq!(config.output.data_dir, PathBuf::from("/tmp/vss-data"));
        assert_eq!(config.browser.binary, Some(fake_chrome.clone()));

        // non-existent binary is ignored
        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| {
            (key == "CHROME_BINARY").then(|| "/definitely/not/here".to_string())
        });
        assert!(config.browser.binary.is_none());
    }

    #[tokio::test]
    async fn test_partial_file_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "source": { "countries": ["Chile", "China"] }, "retry": { "retries": 4 } }"#,
        )
        .unwrap();

        let config = ConfigManager::with_path(&path).load_config().await.unwrap();
        assert_eq!(config.source.countries, vec!["Chile", "China"]);
        assert_eq!(config.source.base_url, trading_economics::BASE_URL);
        assert_eq!(config.retry.retries, 4);
        assert_eq!(config.retry.base_delay_seconds, defaults::RETRY_BASE_DELAY_SECONDS);
        assert_eq!(config.extraction.cap_policy, CapPolicy::AfterSeries);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("nested").join("config.json"));
        let mut config = AppConfig::default();
        config.extraction.cap_policy = CapPolicy::Disabled;
        manager.save_config(&config).await.unwrap();

        let loaded = manager.load_config().await.unwrap();
        assert_eq!(loaded.extraction.cap_policy, CapPolicy::Disabled);
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("absent.json"));
        let config = manager.load_config().await.unwrap();
        assert_eq!(config.output.recent_window_years, 10);
    }
}
