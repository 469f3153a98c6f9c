use anyhow::Context;
use bullish_scanner::models::{FilterRule, ScanResult};
use bullish_scanner::utils::DEFAULT_SYMBOL_SUFFIX;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_SYMBOLS_FILE: &str = "nifty500list.csv";
const MAX_DEFAULT_CONCURRENCY: usize = 8;

fn default_concurrency() -> usize {
    num_cpus::get().clamp(1, MAX_DEFAULT_CONCURRENCY)
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse().ok())
}

// History request settings for the chart API
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub range: String,    // e.g. "6mo"
    pub interval: String, // e.g. "1d"
    pub rate_limit_per_minute: u32,
    pub max_retries: u32,
    pub request_timeout_secs: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            range: "6mo".to_string(),
            interval: "1d".to_string(),
            rate_limit_per_minute: 60,
            max_retries: 3,
            request_timeout_secs: 30,
        }
    }
}

// YAML-serializable configuration structure
#[derive(Serialize, Deserialize, Debug)]
pub struct ConfigYaml {
    pub symbols_file: Option<PathBuf>,
    pub symbol_suffix: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub max_results: Option<usize>,
    pub history: Option<HistoryConfig>,
    pub rule: Option<FilterRule>,
}

// Holds application-wide settings
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub symbols_file: PathBuf,
    pub symbol_suffix: String,
    /// Read histories from `<dir>/<SYMBOL>.csv` instead of the network
    pub data_dir: Option<PathBuf>,
    pub concurrency: usize,
    pub max_results: usize,
    pub history: HistoryConfig,
    pub rule: FilterRule,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbols_file: PathBuf::from(DEFAULT_SYMBOLS_FILE),
            symbol_suffix: DEFAULT_SYMBOL_SUFFIX.to_string(),
            data_dir: None,
            concurrency: default_concurrency(),
            max_results: ScanResult::DEFAULT_MAX_RESULTS,
            history: HistoryConfig::default(),
            rule: FilterRule::default(),
        }
    }
}

impl AppConfig {
    // Load configuration from YAML file or environment variables
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        if let Ok(config_file) = env::var("CONFIG_FILE") {
            Self::from_yaml(&config_file)
        } else {
            Ok(Self::from_env())
        }
    }

    pub fn from_yaml(file_path: &str) -> anyhow::Result<Self> {
        let yaml_content = fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read config file {}", file_path))?;
        Self::from_yaml_str(&yaml_content)
            .with_context(|| format!("Failed to parse YAML config {}", file_path))
    }

    pub fn from_yaml_str(yaml_content: &str) -> anyhow::Result<Self> {
        let yaml_config: ConfigYaml = serde_yaml::from_str(yaml_content)?;
        let defaults = Self::default();

        Ok(Self {
            symbols_file: yaml_config.symbols_file.unwrap_or(defaults.symbols_file),
            symbol_suffix: yaml_config.symbol_suffix.unwrap_or(defaults.symbol_suffix),
            data_dir: yaml_config.data_dir,
            concurrency: yaml_config.concurrency.unwrap_or(defaults.concurrency).max(1),
            max_results: yaml_config.max_results.unwrap_or(defaults.max_results),
            history: yaml_config.history.unwrap_or_default(),
            rule: yaml_config.rule.unwrap_or_default(),
        })
    }

    // Load all configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let history = HistoryConfig {
            range: lookup("HISTORY_RANGE").unwrap_or(defaults.history.range),
            interval: lookup("HISTORY_INTERVAL").unwrap_or(defaults.history.interval),
            rate_limit_per_minute: parsed(&lookup, "RATE_LIMIT_PER_MINUTE")
                .unwrap_or(defaults.history.rate_limit_per_minute),
            max_retries: parsed(&lookup, "MAX_RETRIES").unwrap_or(defaults.history.max_retries),
            request_timeout_secs: parsed(&lookup, "REQUEST_TIMEOUT_SECS")
                .unwrap_or(defaults.history.request_timeout_secs),
        };

        let rule = match lookup("FILTER_RULE").as_deref() {
            Some("scored") => FilterRule::Scored {
                min_score: parsed(&lookup, "MIN_SCORE").unwrap_or(FilterRule::DEFAULT_MIN_SCORE),
            },
            _ => FilterRule::default(),
        };

        Self {
            symbols_file: lookup("SYMBOLS_FILE").map(PathBuf::from).unwrap_or(defaults.symbols_file),
            symbol_suffix: lookup("SYMBOL_SUFFIX").unwrap_or(defaults.symbol_suffix),
            data_dir: lookup("DATA_DIR").map(PathBuf::from),
            concurrency: parsed(&lookup, "SCAN_CONCURRENCY").unwrap_or(defaults.concurrency).max(1),
            max_results: parsed(&lookup, "MAX_RESULTS").unwrap_or(defaults.max_results),
            history,
            rule,
        }
    }

    /// Suffix as an option; an empty string disables suffixing
    pub fn suffix(&self) -> Option<&str> {
        (!self.symbol_suffix.is_empty()).then_some(self.symbol_suffix.as_str())
    }
}
