//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::PageSelectors;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and scraping behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Results page selectors
    #[serde(default)]
    pub selectors: PageSelectors,

    /// Database and seed file settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Sync trigger settings
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Read API listener
    #[serde(default)]
    pub server: ServerConfig,

    /// Read API default windows
    #[serde(default)]
    pub query: QueryConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Override selected values from `LOTTO_*` environment variables.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("LOTTO_RESULTS_URL") {
            self.crawler.results_url = url;
        }

        if let Ok(timeout) = std::env::var("LOTTO_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.crawler.timeout_secs = secs;
            }
        }

        if let Ok(host) = std::env::var("LOTTO_HTTP_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("LOTTO_HTTP_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        if let Ok(file) = std::env::var("LOTTO_DATABASE_FILE") {
            self.storage.database_file = file;
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        url::Url::parse(&self.crawler.results_url)?;

        for (key, selector) in self.selectors.entries() {
            scraper::Selector::parse(selector)
                .map_err(|e| AppError::selector(selector, format!("{key}: {e:?}")))?;
        }

        if self.storage.database_file.trim().is_empty() {
            return Err(AppError::validation("storage.database_file is empty"));
        }

        if !(-12..=14).contains(&self.schedule.utc_offset_hours) {
            return Err(AppError::validation(
                "schedule.utc_offset_hours must be within -12..=14",
            ));
        }
        if self.schedule.tick_secs == 0 {
            return Err(AppError::validation("schedule.tick_secs must be > 0"));
        }
        for expr in &self.schedule.cron {
            cron::Schedule::from_str(expr).map_err(|e| {
                AppError::validation(format!("invalid cron expression '{expr}': {e}"))
            })?;
        }

        if self.query.heatmap_window_days == 0 {
            return Err(AppError::validation("query.heatmap_window_days must be > 0"));
        }
        Ok(())
    }
}

/// HTTP client and scraping behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Search page that lists results and hosts the range form
    #[serde(default = "defaults::results_url")]
    pub results_url: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            results_url: defaults::results_url(),
        }
    }
}

/// Database and seed file locations, relative to the storage directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "defaults::database_file")]
    pub database_file: String,

    /// `#`-delimited historical export used for the one-time seed
    #[serde(default = "defaults::seed_file")]
    pub seed_file: String,

    /// SQLite busy timeout in milliseconds
    #[serde(default = "defaults::busy_timeout")]
    pub busy_timeout_ms: u64,
}

impl StorageConfig {
    pub fn database_path(&self, storage_dir: &Path) -> PathBuf {
        storage_dir.join(&self.database_file)
    }

    pub fn seed_path(&self, storage_dir: &Path) -> PathBuf {
        storage_dir.join(&self.seed_file)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_file: defaults::database_file(),
            seed_file: defaults::seed_file(),
            busy_timeout_ms: defaults::busy_timeout(),
        }
    }
}

/// When the sync runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// UTC offset of the remote system's calendar (PHT is +8)
    #[serde(default = "defaults::utc_offset")]
    pub utc_offset_hours: i32,

    /// Delay before the startup sync
    #[serde(default = "defaults::startup_delay")]
    pub startup_delay_secs: u64,

    /// How often cron expressions are evaluated
    #[serde(default = "defaults::tick")]
    pub tick_secs: u64,

    /// Cron expressions (seconds field first), evaluated in `utc_offset_hours`
    #[serde(default = "defaults::cron")]
    pub cron: Vec<String>,
}

impl ScheduleConfig {
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }

    /// Current calendar date on the remote system's clock.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset()).date_naive()
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: defaults::utc_offset(),
            startup_delay_secs: defaults::startup_delay(),
            tick_secs: defaults::tick(),
            cron: defaults::cron(),
        }
    }
}

/// Read API listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "defaults::host")]
    pub host: String,

    #[serde(default = "defaults::port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
        }
    }
}

/// Read API defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Days before today covered by `/results` when no start date is given
    #[serde(default = "defaults::results_window")]
    pub results_window_days: u32,

    /// Days before today covered by `/heatmap` when no start date is given
    #[serde(default = "defaults::heatmap_window")]
    pub heatmap_window_days: u32,

    /// `/game-types` lists only games with more stored draws than this
    #[serde(default = "defaults::game_type_min_draws")]
    pub game_type_min_draws: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            results_window_days: defaults::results_window(),
            heatmap_window_days: defaults::heatmap_window(),
            game_type_min_draws: defaults::game_type_min_draws(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; lotto-crawler/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn results_url() -> String {
        "https://www.pcso.gov.ph/SearchLottoResult.aspx".into()
    }

    // Storage defaults
    pub fn database_file() -> String {
        "lotto.db".into()
    }
    pub fn seed_file() -> String {
        "lotto_export.csv".into()
    }
    pub fn busy_timeout() -> u64 {
        5_000
    }

    // Schedule defaults
    pub fn utc_offset() -> i32 {
        8
    }
    pub fn startup_delay() -> u64 {
        10
    }
    pub fn tick() -> u64 {
        30
    }
    pub fn cron() -> Vec<String> {
        vec![
            "0 0-30/5 14 * * *".into(),
            "0 0-30/5 16 * * *".into(),
            "0 0-45/5 21 * * *".into(),
        ]
    }

    // Server defaults
    pub fn host() -> String {
        "0.0.0.0".into()
    }
    pub fn port() -> u16 {
        8080
    }

    // Query defaults
    pub fn results_window() -> u32 {
        1
    }
    pub fn heatmap_window() -> u32 {
        30
    }
    pub fn game_type_min_draws() -> u32 {
        10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_cron() {
        let mut config = Config::default();
        config.schedule.cron.push("every day at noon".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_selector() {
        let mut config = Config::default();
        config.selectors.results_row = "[[invalid".to_string();
        assert!(matches!(
            config.validate(),
            Err(AppError::Selector { .. })
        ));
    }

    #[test]
    fn partial_toml_falls_back_to_field_defaults() {
        let config: Config = toml::from_str(
            r#"
            [crawler]
            timeout_secs = 5

            [schedule]
            utc_offset_hours = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.crawler.timeout_secs, 5);
        assert_eq!(config.crawler.results_url, defaults::results_url());
        assert_eq!(config.schedule.utc_offset_hours, 0);
        assert_eq!(config.schedule.cron.len(), 3);
        assert_eq!(config.storage.database_file, "lotto.db");
    }

    #[test]
    fn load_or_default_survives_missing_file() {
        let config = Config::load_or_default("definitely/not/here.toml");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn storage_paths_are_relative_to_storage_dir() {
        let storage = StorageConfig::default();
        let dir = Path::new("storage");
        assert_eq!(storage.database_path(dir), dir.join("lotto.db"));
        assert_eq!(storage.seed_path(dir), dir.join("lotto_export.csv"));
    }
}
