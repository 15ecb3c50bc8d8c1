//! Configuration system for imgsearch.
//!
//! Provides layered configuration from multiple sources:
//!
//! 1. **Compiled defaults** - Sensible defaults built into the binary
//! 2. **User config file** - `~/.config/imgsearch/config.toml`
//! 3. **Environment variables** - `IMGSEARCH_*` prefix
//! 4. **CLI arguments** - Highest priority, always wins
//!
//! # Example Configuration File
//!
//! ```toml
//! [service]
//! api_base = "http://127.0.0.1:8000"
//! send_metric = true
//!
//! [search]
//! default_top_k = 5
//! default_metric = "l2"
//!
//! [output]
//! format = "text"
//! colors = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{ImgSearchError, Result};
use crate::model::{DEFAULT_TOP_K, MAX_TOP_K, MIN_TOP_K, Metric};

/// Search service used when nothing else is configured.
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";

/// Main configuration structure for imgsearch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Search service connection settings.
    pub service: ServiceConfig,
    /// Query defaults.
    pub search: SearchConfig,
    /// Output formatting configuration.
    pub output: OutputConfig,
}

/// Search service connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the search service.
    /// Environment variable: `IMGSEARCH_API_BASE`
    pub api_base: String,

    /// Whether the service accepts a `metric` query parameter.
    /// Environment variable: `IMGSEARCH_SEND_METRIC`
    pub send_metric: bool,

    /// Request timeout in seconds. Unset means wait indefinitely.
    /// Environment variable: `IMGSEARCH_TIMEOUT_SECS`
    pub timeout_secs: Option<u64>,
}

/// Query defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Default number of results to request.
    /// Environment variable: `IMGSEARCH_TOP_K`
    pub default_top_k: u32,

    /// Default similarity metric.
    /// Environment variable: `IMGSEARCH_METRIC`
    pub default_metric: Metric,
}

/// Output formatting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format: text, json, json-pretty, compact, csv.
    pub format: String,

    /// Enable colored output.
    pub colors: bool,

    /// Suppress non-essential output (spinner, preview summary).
    pub quiet: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            send_metric: true,
            timeout_secs: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: DEFAULT_TOP_K,
            default_metric: Metric::L2,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            colors: true,
            quiet: false,
        }
    }
}

impl ServiceConfig {
    /// Request timeout, if one is configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. User config file (~/.config/imgsearch/config.toml)
    /// 3. Compiled defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the user config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let mut config = match Self::user_config_path() {
            Some(path) => Self::load_from_file(&path)?.unwrap_or_default(),
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());

        debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    /// Load configuration from a specific file; `Ok(None)` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load_from_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            debug!("Config file not found: {}", path.display());
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ImgSearchError::path_error("read", path, e))?;
        let mut config: Self =
            toml::from_str(&content).map_err(|e| ImgSearchError::ConfigError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        if !top_k_in_range(config.search.default_top_k) {
            warn!(
                top_k = config.search.default_top_k,
                path = %path.display(),
                "Ignoring out-of-range default_top_k (allowed {MIN_TOP_K}-{MAX_TOP_K})"
            );
            config.search.default_top_k = DEFAULT_TOP_K;
        }
        info!("Loaded config from: {}", path.display());
        Ok(Some(config))
    }

    /// Get the path to the user configuration file.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("imgsearch").join("config.toml"))
    }

    /// Apply environment variable overrides read through `lookup`.
    ///
    /// Unparseable or out-of-range values are ignored with a warning.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base) = lookup("IMGSEARCH_API_BASE") {
            self.service.api_base = base;
        }
        if let Some(value) = lookup("IMGSEARCH_SEND_METRIC") {
            match parse_bool(&value) {
                Some(flag) => self.service.send_metric = flag,
                None => warn!(value = %value, "Ignoring invalid IMGSEARCH_SEND_METRIC"),
            }
        }
        if let Some(value) = lookup("IMGSEARCH_TIMEOUT_SECS") {
            match value.parse() {
                Ok(secs) => self.service.timeout_secs = Some(secs),
                Err(_) => warn!(value = %value, "Ignoring invalid IMGSEARCH_TIMEOUT_SECS"),
            }
        }

        if let Some(value) = lookup("IMGSEARCH_TOP_K") {
            match value.parse() {
                Ok(k) if top_k_in_range(k) => self.search.default_top_k = k,
                _ => warn!(
                    value = %value,
                    "Ignoring invalid IMGSEARCH_TOP_K (allowed {MIN_TOP_K}-{MAX_TOP_K})"
                ),
            }
        }
        if let Some(value) = lookup("IMGSEARCH_METRIC") {
            match value.parse() {
                Ok(metric) => self.search.default_metric = metric,
                Err(_) => warn!(value = %value, "Ignoring invalid IMGSEARCH_METRIC"),
            }
        }

        if let Some(format) = lookup("IMGSEARCH_FORMAT") {
            self.output.format = format;
        }
        if lookup("IMGSEARCH_NO_COLOR").is_some() || lookup("NO_COLOR").is_some() {
            self.output.colors = false;
        }
        if lookup("IMGSEARCH_QUIET").is_some() {
            self.output.quiet = true;
        }
    }

    /// Write the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ImgSearchError::path_error("create", parent, e))?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| ImgSearchError::ConfigError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        std::fs::write(path, content).map_err(|e| ImgSearchError::path_error("write", path, e))?;
        info!("Saved config to: {}", path.display());
        Ok(())
    }
}

const fn top_k_in_range(top_k: u32) -> bool {
    top_k >= MIN_TOP_K && top_k <= MAX_TOP_K
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
