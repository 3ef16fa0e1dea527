use std::str::FromStr;
use std::time::Duration;
use std::{env, fmt, fs, io, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::monitoring::validation::{validate_check_interval, validate_pool_size, validate_timeout};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    ReadFailed { path: path::PathBuf, source: io::Error },

    #[error("Failed to write config {path}: {source}")]
    WriteFailed { path: path::PathBuf, source: io::Error },

    #[error("Failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),

    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No config directory available (set XDG_CONFIG_HOME or HOME)")]
    ConfigPathUnavailable,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub registry: RegistryConfig,
    pub ingestion: IngestionConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Global check interval; also the due cutoff for every monitor
    pub check_interval_seconds: u64,
    /// Concurrent probe/report slots
    pub max_workers: usize,
    /// Timeout for monitors that do not carry their own
    pub default_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Local libsql file path or remote `libsql://` URL
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    pub pool_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub backend_url: String,
    pub report_path: String,
    pub report_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { check_interval_seconds: 30, max_workers: 10, default_timeout_seconds: 30 }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { url: "pulse.db".into(), auth_token: None, pool_size: 4 }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:5000".into(),
            report_path: "/api/health/report".into(),
            report_timeout_seconds: 10,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0".into(), port: 8000 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/pulse/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("pulse/config.toml"))
}

/// Overwrite `target` with the parsed value of env var `name`, if set
fn env_override<T: FromStr>(name: &'static str, target: &mut T) -> Result<(), ConfigError> {
    if let Ok(value) = env::var(name) {
        *target = value.parse().map_err(|_| ConfigError::InvalidEnv { name, value })?;
    }
    Ok(())
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Scheduler")?;
        write_1(f, "Check Interval (s)", &self.scheduler.check_interval_seconds)?;
        write_1(f, "Max Workers", &self.scheduler.max_workers)?;
        write_1(f, "Default Timeout (s)", &self.scheduler.default_timeout_seconds)?;
        write_title_1(f, "Registry")?;
        write_1(f, "URL", &self.registry.url)?;
        write_1(f, "Auth Token", &if self.registry.auth_token.is_some() { "set" } else { "unset" })?;
        write_title_1(f, "Ingestion")?;
        write_1(f, "Backend URL", &self.ingestion.backend_url)?;
        write_1(f, "Report Path", &self.ingestion.report_path)?;
        write_title_1(f, "Server")?;
        write_1(f, "Bind Address", &self.server.bind)?;
        write_1(f, "Port", &self.server.port)?;

        Ok(())
    }
}

impl Config {
    /// Load the configuration used at startup: the config file (created
    /// with defaults when missing), then environment overrides, then
    /// validation.
    pub fn load(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let mut config = Self::from_config(optional_path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/pulse/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| ConfigError::ReadFailed { path: config_path.clone(), source })?;
            Ok(toml::from_str(raw_string.as_str())?)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| ConfigError::WriteFailed { path: path.to_path_buf(), source })?;
        }

        fs::write(path, config_str)
            .map_err(|source| ConfigError::WriteFailed { path: path.to_path_buf(), source })
    }

    /// Apply the worker's environment variables on top of the file values
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        env_override("CHECK_INTERVAL", &mut self.scheduler.check_interval_seconds)?;
        env_override("MAX_WORKERS", &mut self.scheduler.max_workers)?;
        env_override("DEFAULT_TIMEOUT", &mut self.scheduler.default_timeout_seconds)?;
        env_override("REGISTRY_URL", &mut self.registry.url)?;
        env_override("BACKEND_URL", &mut self.ingestion.backend_url)?;
        env_override("LOG_LEVEL", &mut self.logging.level)?;

        if let Ok(token) = env::var("REGISTRY_AUTH_TOKEN") {
            self.registry.auth_token = Some(token);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |e: anyhow::Error| ConfigError::Invalid(e.to_string());

        validate_check_interval(self.scheduler.check_interval_seconds).map_err(invalid)?;
        validate_pool_size(self.scheduler.max_workers).map_err(invalid)?;
        validate_timeout(self.scheduler.default_timeout_seconds).map_err(invalid)?;
        validate_timeout(self.ingestion.report_timeout_seconds).map_err(invalid)?;

        if self.registry.url.trim().is_empty() {
            return Err(ConfigError::Invalid("Registry URL is empty".into()));
        }

        self.report_endpoint()?;
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.scheduler.check_interval_seconds)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.scheduler.default_timeout_seconds)
    }

    pub fn report_timeout(&self) -> Duration {
        Duration::from_secs(self.ingestion.report_timeout_seconds)
    }

    /// Full URL results are POSTed to
    pub fn report_endpoint(&self) -> Result<Url, ConfigError> {
        let base = Url::parse(&self.ingestion.backend_url).map_err(|e| {
            ConfigError::Invalid(format!("Backend URL {:?}: {e}", self.ingestion.backend_url))
        })?;

        base.join(&self.ingestion.report_path)
            .map_err(|e| ConfigError::Invalid(format!("Report path {:?}: {e}", self.ingestion.report_path)))
    }
}
