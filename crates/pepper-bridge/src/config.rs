//! Bridge configuration loading from file and environment variables.

use pepper_types::{LegacyTarget, DEFAULT_LEGACY_HOST, DEFAULT_LEGACY_PORT};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

/// Top-level bridge configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Legacy runtime settings.
    #[serde(default)]
    pub legacy: LegacyConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Where the legacy runtime lives and how long to wait for it.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyConfig {
    #[serde(default = "default_legacy_host")]
    pub host: String,

    #[serde(default = "default_legacy_port")]
    pub port: u16,

    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl LegacyConfig {
    pub fn target(&self) -> LegacyTarget {
        LegacyTarget::new(self.host.clone(), self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "pepper_bridge=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    5000
}

fn default_legacy_host() -> String {
    DEFAULT_LEGACY_HOST.to_string()
}

fn default_legacy_port() -> u16 {
    DEFAULT_LEGACY_PORT
}

fn default_connect_timeout_secs() -> u64 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            host: default_legacy_host(),
            port: default_legacy_port(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A positional argument could not be parsed.
    #[error("invalid argument {name}: {value}")]
    InvalidArgument { name: &'static str, value: String },
}

/// Loads configuration from a TOML file, falling back to defaults, then
/// applies overrides from the process environment.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies environment overrides read through `lookup`.
///
/// - `PEPPER_BRIDGE_HOST` overrides `server.host`
/// - `PEPPER_BRIDGE_PORT` overrides `server.port`
/// - `PEPPER_IP` overrides `legacy.host`
/// - `PEPPER_PORT` overrides `legacy.port`
/// - `PEPPER_LOG_LEVEL` overrides `logging.level`
/// - `PEPPER_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// Unparseable numeric or address values are ignored.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("PEPPER_BRIDGE_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = lookup("PEPPER_BRIDGE_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(host) = lookup("PEPPER_IP") {
        if !host.trim().is_empty() {
            config.legacy.host = host;
        }
    }
    if let Some(port) = lookup("PEPPER_PORT") {
        if let Ok(parsed) = port.parse() {
            config.legacy.port = parsed;
        }
    }
    if let Some(level) = lookup("PEPPER_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("PEPPER_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}

/// Applies positional overrides: `[pepper_ip] [pepper_port] [http_port]`.
pub fn apply_positional_overrides(config: &mut Config, args: &[String]) -> Result<(), ConfigError> {
    if let Some(host) = args.first() {
        config.legacy.host = host.clone();
    }
    if let Some(port) = args.get(1) {
        config.legacy.port = port.parse().map_err(|_| ConfigError::InvalidArgument {
            name: "pepper_port",
            value: port.clone(),
        })?;
    }
    if let Some(port) = args.get(2) {
        config.server.port = port.parse().map_err(|_| ConfigError::InvalidArgument {
            name: "http_port",
            value: port.clone(),
        })?;
    }
    Ok(())
}
