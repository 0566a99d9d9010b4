//! Configuration management for shopscan using the prefer crate.
//!
//! Settings are resolved once at startup: built-in defaults, then an optional
//! config file, then command-line flags. The resulting [`Settings`] and the
//! [`RunContext`] derived from them are passed by reference into every
//! pipeline component.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Root of the paginated storefront directory.
pub const DEFAULT_BASE_URL: &str = "https://onshopify.com/domain-zone";
/// Units dispatched together by the probing pipelines.
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_WIDGET_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LOCALE_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_DISCOVERY_TIMEOUT_SECS: u64 = 30;

/// Format of the run timestamp embedded in output filenames.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
/// Format of the capture timestamp written into each row.
pub const ROW_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub output_dir: PathBuf,
    /// None sends the default browser user agent.
    pub user_agent: Option<String>,
    pub batch_size: usize,
    pub widget_timeout: Duration,
    pub locale_timeout: Duration,
    pub discovery_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            output_dir: PathBuf::from("."),
            user_agent: None,
            batch_size: DEFAULT_BATCH_SIZE,
            widget_timeout: Duration::from_secs(DEFAULT_WIDGET_TIMEOUT_SECS),
            locale_timeout: Duration::from_secs(DEFAULT_LOCALE_TIMEOUT_SECS),
            discovery_timeout: Duration::from_secs(DEFAULT_DISCOVERY_TIMEOUT_SECS),
        }
    }
}

/// Configuration file contents. Every field is optional and overrides the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Directory for output CSVs, relative to the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    /// User agent configuration.
    /// - None: browser-like default
    /// - "impersonate": random full browser user agent
    /// - Any other string: used as-is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_timeout_secs: Option<u64>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Discover a `shopscan` config file in the standard locations.
    /// Falls back to defaults when none is found or it cannot be parsed.
    pub async fn load() -> Self {
        match prefer::load("shopscan").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("Ignoring config file {}: {}", path.display(), e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Format is chosen by extension: TOML, YAML, otherwise JSON.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(contents: &str, ext: &str) -> Result<Self, String> {
        match ext {
            "toml" => toml::from_str(contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e)),
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Directory that relative paths in this config are resolved against.
    pub fn base_dir(&self) -> PathBuf {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Overlay file values onto `settings`.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        if let Some(ref base_url) = self.base_url {
            settings.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(ref dir) = self.output_dir {
            let path = Path::new(dir);
            settings.output_dir = if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.base_dir().join(path)
            };
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = Some(user_agent.clone());
        }
        if let Some(batch_size) = self.batch_size.filter(|n| *n > 0) {
            settings.batch_size = batch_size;
        }
        if let Some(secs) = self.widget_timeout_secs {
            settings.widget_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.locale_timeout_secs {
            settings.locale_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.discovery_timeout_secs {
            settings.discovery_timeout = Duration::from_secs(secs);
        }
    }
}

/// Per-run values fixed at entry: the run timestamp and where outputs go.
#[derive(Debug, Clone)]
pub struct RunContext {
    timestamp: String,
    output_dir: PathBuf,
    started: Instant,
}

impl RunContext {
    pub fn new(settings: &Settings) -> Self {
        Self::with_timestamp(
            settings,
            Local::now().format(FILE_TIMESTAMP_FORMAT).to_string(),
        )
    }

    pub fn with_timestamp(settings: &Settings, timestamp: String) -> Self {
        Self {
            timestamp,
            output_dir: settings.output_dir.clone(),
            started: Instant::now(),
        }
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// `{output_dir}/{prefix}_{timestamp}.csv`
    pub fn output_path(&self, prefix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.csv", prefix, self.timestamp))
    }

    /// Wall-clock capture time for a row.
    pub fn capture_time(&self) -> String {
        Local::now().format(ROW_TIMESTAMP_FORMAT).to_string()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
