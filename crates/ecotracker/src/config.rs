//! Configuration management for ecotracker.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::activity::Activity;
use crate::coefficients::CoefficientTable;
use crate::error::{Error, Result};
use crate::trends::DEFAULT_WINDOW_DAYS;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "ecotracker";

/// Default history file name.
const HISTORY_FILE_NAME: &str = "history.csv";

/// Environment variable consulted when `tips.api_key` is unset.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Allowed range for PDF margins, in centimeters.
const MARGIN_RANGE_CM: std::ops::RangeInclusive<f32> = 1.0..=3.0;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `ECOTRACKER_`, nested keys joined by `__`)
/// 2. TOML config file at `~/.config/ecotracker/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Per-activity emission factor overrides (kg CO₂e per unit).
    pub factors: BTreeMap<String, f64>,
    /// Input defaults.
    pub inputs: InputsConfig,
    /// Trend configuration.
    pub trends: TrendsConfig,
    /// Tip generation configuration.
    pub tips: TipsConfig,
    /// PDF report configuration.
    pub report: ReportConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the history CSV.
    /// Defaults to `~/.local/share/ecotracker/history.csv`
    pub history_path: Option<PathBuf>,
}

/// Input defaults applied before presets and command-line values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputsConfig {
    /// Baseline quantity per activity key.
    pub defaults: BTreeMap<String, f64>,
}

/// Trend-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendsConfig {
    /// Number of records in the trailing window.
    pub window_days: usize,
    /// Totals below this earn the low-impact badge.
    pub low_impact_threshold_kg: f64,
}

/// Tip generation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TipsConfig {
    /// Call the tip service at all. When false, fallback tips are used.
    pub enabled: bool,
    /// Chat completions endpoint.
    pub endpoint: String,
    /// Model name sent to the endpoint.
    pub model: String,
    /// API key. Falls back to `OPENAI_API_KEY`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,
    /// Extra attempts after the first failure.
    pub max_retries: u32,
}

/// PDF report configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Title printed at the top.
    pub title: String,
    /// Accent color for the title, badge and charts.
    pub primary_color: String,
    /// Body text color.
    pub text_color: String,
    /// Chart panel background.
    pub chart_background: String,
    /// Logo image (PNG or JPEG). A drawn badge is used when unset or unreadable.
    pub logo_path: Option<PathBuf>,
    /// Footer text.
    pub footer_text: String,
    /// Print the footer and page numbers.
    pub include_footer: bool,
    /// Draw per-category sparklines.
    pub include_sparklines: bool,
    /// Left and right margin.
    pub side_margin_cm: f32,
    /// Top margin.
    pub top_margin_cm: f32,
    /// Bottom margin.
    pub bottom_margin_cm: f32,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            low_impact_threshold_kg: 20.0,
        }
    }
}

impl Default for TipsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 15,
            max_retries: 2,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Sustainability Tracker - Eco Tips Summary".to_string(),
            primary_color: "#2563EB".to_string(),
            text_color: "#111827".to_string(),
            chart_background: "#F3F4F6".to_string(),
            logo_path: None,
            footer_text: "Sustainability Tracker".to_string(),
            include_footer: true,
            include_sparklines: true,
            side_margin_cm: 2.0,
            top_margin_cm: 2.0,
            bottom_margin_cm: 1.8,
        }
    }
}

fn hex_color_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("static pattern compiles"))
}

/// True if `value` is a `#RRGGBB` color.
#[must_use]
pub fn is_hex_color(value: &str) -> bool {
    hex_color_pattern().is_match(value)
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing, or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("ECOTRACKER_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        // Factor overrides must name real activities with sane values
        self.coefficient_table()?;

        for (key, quantity) in &self.inputs.defaults {
            if key.parse::<Activity>().is_err() {
                return Err(Error::config_validation(format!(
                    "unknown activity in [inputs.defaults]: {key}"
                )));
            }
            if !quantity.is_finite() || *quantity < 0.0 {
                return Err(Error::config_validation(format!(
                    "default for {key} must be a number >= 0, got {quantity}"
                )));
            }
        }

        if self.trends.window_days == 0 {
            return Err(Error::config_validation(
                "window_days must be greater than 0",
            ));
        }

        if self.tips.timeout_secs == 0 {
            return Err(Error::config_validation(
                "timeout_secs must be greater than 0",
            ));
        }

        for (name, value) in [
            ("primary_color", &self.report.primary_color),
            ("text_color", &self.report.text_color),
            ("chart_background", &self.report.chart_background),
        ] {
            if !is_hex_color(value) {
                return Err(Error::config_validation(format!(
                    "{name} must be #RRGGBB, got {value}"
                )));
            }
        }

        for (name, value) in [
            ("side_margin_cm", self.report.side_margin_cm),
            ("top_margin_cm", self.report.top_margin_cm),
            ("bottom_margin_cm", self.report.bottom_margin_cm),
        ] {
            if !MARGIN_RANGE_CM.contains(&value) {
                return Err(Error::config_validation(format!(
                    "{name} must be between 1.0 and 3.0, got {value}"
                )));
            }
        }

        Ok(())
    }

    /// The emission factor table with `[factors]` applied.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown activity keys or invalid factors.
    pub fn coefficient_table(&self) -> Result<CoefficientTable> {
        CoefficientTable::standard().with_overrides(&self.factors)
    }

    /// Get the history path, resolving defaults if not set.
    #[must_use]
    pub fn history_path(&self) -> PathBuf {
        self.storage
            .history_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(HISTORY_FILE_NAME))
    }

    /// The tip service API key, from config or `OPENAI_API_KEY`.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        self.tips
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Get the tip timeout as a Duration.
    #[must_use]
    pub fn tip_timeout(&self) -> Duration {
        Duration::from_secs(self.tips.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.storage.history_path.is_none());
        assert!(config.factors.is_empty());
        assert!(config.inputs.defaults.is_empty());
        assert_eq!(config.trends.window_days, 7);
        assert!(config.tips.enabled);
        assert!(config.report.include_footer);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_window() {
        let mut config = Config::default();
        config.trends.window_days = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("window_days"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.tips.timeout_secs = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("timeout_secs"));
    }

    #[test]
    fn test_validate_bad_color() {
        let mut config = Config::default();
        config.report.primary_color = "blue".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("primary_color"));
    }

    #[test]
    fn test_validate_margin_range() {
        let mut config = Config::default();
        config.report.top_margin_cm = 0.5;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("top_margin_cm"));
    }

    #[test]
    fn test_validate_unknown_factor() {
        let mut config = Config::default();
        config.factors.insert("teleport_km".to_string(), 1.0);

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_negative_default_input() {
        let mut config = Config::default();
        config.inputs.defaults.insert("bus_km".to_string(), -1.0);

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("bus_km"));
    }

    #[test]
    fn test_coefficient_table_applies_overrides() {
        let mut config = Config::default();
        config.factors.insert("electricity_kwh".to_string(), 0.4);

        let table = config.coefficient_table().unwrap();
        assert_eq!(table.factor(Activity::ElectricityKwh), Some(0.4));
    }

    #[test]
    fn test_is_hex_color() {
        assert!(is_hex_color("#16a34a"));
        assert!(is_hex_color("#FFFFFF"));
        assert!(!is_hex_color("16a34a"));
        assert!(!is_hex_color("#fff"));
        assert!(!is_hex_color("#GGGGGG"));
    }

    #[test]
    fn test_history_path_default() {
        let path = Config::default().history_path();
        assert!(path.to_string_lossy().contains("ecotracker"));
        assert!(path.to_string_lossy().ends_with("history.csv"));
    }

    #[test]
    fn test_history_path_custom() {
        let mut config = Config::default();
        config.storage.history_path = Some(PathBuf::from("/custom/history.csv"));

        assert_eq!(config.history_path(), PathBuf::from("/custom/history.csv"));
    }

    #[test]
    fn test_api_key_from_config() {
        let mut config = Config::default();
        config.tips.api_key = Some("sk-test".to_string());
        assert_eq!(config.api_key().as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_tip_timeout() {
        assert_eq!(Config::default().tip_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("ecotracker"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        // Loading from a nonexistent path should work (uses defaults)
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config.trends, TrendsConfig::default());
        assert_eq!(config.report, ReportConfig::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r##"
[factors]
electricity_kwh = 0.3

[inputs.defaults]
cold_water_liter = 120.0

[trends]
window_days = 14

[report]
primary_color = "#16A34A"
"##,
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.factors.get("electricity_kwh"), Some(&0.3));
        assert_eq!(config.inputs.defaults.get("cold_water_liter"), Some(&120.0));
        assert_eq!(config.trends.window_days, 14);
        assert_eq!(config.report.primary_color, "#16A34A");
        // Untouched sections keep defaults
        assert_eq!(config.tips, TipsConfig::default());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[trends]\nwindow_days = 0\n").unwrap();

        assert!(Config::load_from(Some(path)).is_err());
    }

    #[test]
    fn test_api_key_not_serialized() {
        let mut config = Config::default();
        config.tips.api_key = Some("sk-secret".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }
}
