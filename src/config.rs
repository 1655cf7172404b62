//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::loader::ReportSettings;
use crate::report::{DateFormatter, FieldNames, FormatError, Locale, TimeZoneSetting};
use crate::source::FirestoreConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Document database connection
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub project_id: String,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    pub api_key: Option<String>,

    pub bearer_token: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_database() -> String {
    "(default)".to_string()
}

fn default_collection() -> String {
    "users".to_string()
}

fn default_base_url() -> String {
    "https://firestore.googleapis.com".to_string()
}

fn default_page_size() -> u32 {
    300
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            database: default_database(),
            collection: default_collection(),
            api_key: None,
            bearer_token: None,
            base_url: default_base_url(),
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl SourceConfig {
    pub fn firestore(&self) -> FirestoreConfig {
        FirestoreConfig {
            base_url: self.base_url.clone(),
            project_id: self.project_id.clone(),
            database: self.database.clone(),
            api_key: self.api_key.clone().filter(|k| !k.is_empty()),
            bearer_token: self.bearer_token.clone().filter(|t| !t.is_empty()),
            page_size: self.page_size,
            request_timeout_secs: self.request_timeout_secs,
        }
    }
}

/// Report formatting and field mapping
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_locale")]
    pub locale: String,

    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_identity_field")]
    pub identity_field: String,

    #[serde(default = "default_timestamp_field")]
    pub timestamp_field: String,
}

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_identity_field() -> String {
    "dni".to_string()
}

fn default_timestamp_field() -> String {
    "registrationDate".to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            timezone: default_timezone(),
            identity_field: default_identity_field(),
            timestamp_field: default_timestamp_field(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment.
    ///
    /// The first config file found wins; a file that exists but cannot be
    /// read or parsed is an error rather than a silent fallback.
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_paths: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("regreport").join("config.toml")),
            Some(PathBuf::from("./regreport.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self::load_first(&config_paths)
    }

    fn load_first(config_paths: &[PathBuf]) -> Result<Self, ConfigError> {
        for path in config_paths {
            if path.exists() {
                let config = Self::load_with_env(path)?;
                tracing::info!("Loaded config from {:?}", path);
                return Ok(config);
            }
        }

        tracing::info!("Using default config with environment overrides");
        Ok(Self::from_env())
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Source overrides
        if let Some(project_id) = lookup("REGREPORT_PROJECT_ID") {
            self.source.project_id = project_id;
        }
        if let Some(api_key) = lookup("REGREPORT_API_KEY") {
            self.source.api_key = Some(api_key);
        }
        if let Some(token) = lookup("REGREPORT_BEARER_TOKEN") {
            self.source.bearer_token = Some(token);
        }
        if let Some(collection) = lookup("REGREPORT_COLLECTION") {
            self.source.collection = collection;
        }
        if let Some(base_url) = lookup("REGREPORT_BASE_URL") {
            self.source.base_url = base_url;
        }

        // Report overrides
        if let Some(locale) = lookup("REGREPORT_LOCALE") {
            self.report.locale = locale;
        }
        if let Some(timezone) = lookup("REGREPORT_TIMEZONE") {
            self.report.timezone = timezone;
        }

        // Logging overrides
        if let Some(level) = lookup("REGREPORT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("REGREPORT_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Resolve the report settings, validating locale and timezone
    pub fn report_settings(&self) -> Result<ReportSettings, ConfigError> {
        let locale: Locale = self.report.locale.parse()?;
        let timezone: TimeZoneSetting = self.report.timezone.parse()?;

        Ok(ReportSettings {
            collection: self.source.collection.clone(),
            fields: FieldNames {
                identity: self.report.identity_field.clone(),
                timestamp: self.report.timestamp_field.clone(),
            },
            formatter: DateFormatter::new(locale, timezone),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid report settings: {0}")]
    Format(#[from] FormatError),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Registration report configuration
#
# Environment variables override these settings:
# - REGREPORT_PROJECT_ID
# - REGREPORT_API_KEY
# - REGREPORT_BEARER_TOKEN
# - REGREPORT_COLLECTION
# - REGREPORT_BASE_URL
# - REGREPORT_LOCALE
# - REGREPORT_TIMEZONE
# - REGREPORT_LOG_LEVEL
# - REGREPORT_LOG_FORMAT

[source]
# Firebase / Google Cloud project id
project_id = ""

# Firestore database id
database = "(default)"

# Collection holding the registrations
collection = "users"

# Web API key (sent as ?key=)
api_key = ""

# Firestore REST root; point at the emulator with "http://localhost:8080"
base_url = "https://firestore.googleapis.com"

# Documents per page when listing the collection
page_size = 300

# Request timeout in seconds
request_timeout_secs = 30

[report]
# Display locale: en-US, en-GB or es-ES
locale = "en-US"

# Timezone used to cut calendar days: UTC or an offset like -03:00
timezone = "UTC"

# Document field with the national identity number
identity_field = "dni"

# Document field with the registration timestamp
timestamp_field = "registrationDate"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
