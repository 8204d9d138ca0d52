//! Configuration management for CemTem.
//!
//! Provides configuration loading from TOML files with support for
//! multiple file locations, environment variable overrides, and sensible defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;


/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the configuration file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the configuration file as TOML.
    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        /// Path to the configuration file that could not be parsed.
        path: PathBuf,
        /// The underlying TOML parse error.
        source: toml::de::Error,
    },
}

/// Application configuration loaded from TOML file.
///
/// Every section is optional; a missing section means "use defaults".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    /// Telegram bot settings.
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,

    /// Persistence backend settings.
    #[serde(default)]
    pub storage: Option<StorageConfig>,

    /// AI extraction helper settings.
    #[serde(default)]
    pub extraction: Option<ExtractionConfig>,

    /// Conversation session settings.
    #[serde(default)]
    pub session: Option<SessionConfig>,

    /// Completion-action dispatch settings.
    #[serde(default)]
    pub dispatch: Option<DispatchConfig>,

    /// Web chat bridge settings.
    #[serde(default)]
    pub web: Option<WebConfig>,

    /// File logging settings. Absent means stdout only.
    #[serde(default)]
    pub logging: Option<LoggingConfig>,

    /// Registered projects offered by the sales flow's project search.
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
}

/// `[telegram]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TelegramConfig {
    /// Bot token. `TELEGRAM_BOT_TOKEN` takes priority.
    #[serde(default)]
    pub token: Option<String>,
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StorageConfig {
    /// SQLite URL such as `sqlite:data/cemtem.db`. Absent means in-memory.
    #[serde(default)]
    pub database_url: Option<String>,
}

/// `[extraction]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractionConfig {
    /// Whether the AI-assist overlay runs at all.
    #[serde(default = "default_extraction_enabled")]
    pub enabled: bool,

    /// API key. `OPENROUTER_API_KEY` takes priority.
    #[serde(default)]
    pub api_key: Option<String>,

    /// OpenAI-compatible base URL.
    #[serde(default = "default_extraction_base_url")]
    pub base_url: String,

    /// Model identifier.
    #[serde(default = "default_extraction_model")]
    pub model: String,

    /// Upper bound for one extraction call.
    #[serde(default = "default_extraction_timeout_secs")]
    pub timeout_secs: u64,

    /// Minimum confidence for a suggestion to short-circuit the flow.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

fn default_extraction_enabled() -> bool {
    true
}

fn default_extraction_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_extraction_model() -> String {
    "deepseek/deepseek-chat".to_string()
}

fn default_extraction_timeout_secs() -> u64 {
    8
}

fn default_confidence_threshold() -> f64 {
    0.7
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            enabled: default_extraction_enabled(),
            api_key: None,
            base_url: default_extraction_base_url(),
            model: default_extraction_model(),
            timeout_secs: default_extraction_timeout_secs(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

/// `[session]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionConfig {
    /// Sessions idle longer than this are evicted.
    #[serde(default = "default_idle_timeout_mins")]
    pub idle_timeout_mins: u64,

    /// How often the eviction sweep runs.
    #[serde(default = "default_eviction_interval_secs")]
    pub eviction_interval_secs: u64,
}

fn default_idle_timeout_mins() -> u64 {
    60
}

fn default_eviction_interval_secs() -> u64 {
    300
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_mins: default_idle_timeout_mins(),
            eviction_interval_secs: default_eviction_interval_secs(),
        }
    }
}

/// `[dispatch]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DispatchConfig {
    /// Vendors alerted per material round of an inquiry.
    #[serde(default = "default_max_vendors_per_material")]
    pub max_vendors_per_material: usize,

    /// Reply to a vendor whose quote names an unknown inquiry (or who is not
    /// registered) instead of dropping it silently.
    #[serde(default = "default_notify_missing")]
    pub notify_missing_quote_target: bool,
}

fn default_max_vendors_per_material() -> usize {
    3
}

fn default_notify_missing() -> bool {
    true
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_vendors_per_material: default_max_vendors_per_material(),
            notify_missing_quote_target: default_notify_missing(),
        }
    }
}

/// `[web]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WebConfig {
    /// Web server endpoint that publishes `bot-reply` events into socket
    /// rooms. Absent means replies stay on the in-process broadcast hub.
    #[serde(default)]
    pub publish_url: Option<String>,
}

/// Log file rotation policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    /// New file every day.
    #[default]
    Daily,
    /// New file every hour.
    Hourly,
    /// Single file.
    Never,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    /// Directory for rolling log files.
    #[serde(default = "default_log_directory")]
    pub directory: String,

    /// Rotation policy.
    #[serde(default)]
    pub rotation: Rotation,

    /// Number of rotated files to keep.
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

fn default_log_directory() -> String {
    "logs".to_string()
}

fn default_max_files() -> usize {
    7
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            rotation: Rotation::default(),
            max_files: default_max_files(),
        }
    }
}

/// One `[[projects]]` entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectEntry {
    /// Project name.
    pub name: String,
    /// Locality / address.
    #[serde(default)]
    pub location: Option<String>,
    /// Registry (RERA) id.
    #[serde(default)]
    pub rera_id: Option<String>,
}

impl Config {
    /// Load configuration from file system.
    ///
    /// Priority order:
    /// 1. `explicit` path (from the `--config` flag)
    /// 2. CEMTEM_CONFIG environment variable
    /// 3. ./config.toml (local directory)
    /// 4. ~/.config/cemtem/config.toml (user config)
    ///
    /// Returns default config if no config file found.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if a found file cannot be read.
    /// Returns [`ConfigError::ParseError`] if a found file is not valid TOML.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        if let Ok(path) = std::env::var("CEMTEM_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                return Self::load_from(p);
            }
        }

        let local = PathBuf::from("config.toml");
        if local.exists() {
            return Self::load_from(local);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".config/cemtem/config.toml");
            if user_config.exists() {
                return Self::load_from(user_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be read.
    /// Returns [`ConfigError::ParseError`] if the file is not valid TOML.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Extraction settings, defaulted when the section is absent.
    pub fn extraction_or_default(&self) -> ExtractionConfig {
        self.extraction.clone().unwrap_or_default()
    }

    /// Session settings, defaulted when the section is absent.
    pub fn session_or_default(&self) -> SessionConfig {
        self.session.clone().unwrap_or_default()
    }

    /// Dispatch settings, defaulted when the section is absent.
    pub fn dispatch_or_default(&self) -> DispatchConfig {
        self.dispatch.clone().unwrap_or_default()
    }
}
