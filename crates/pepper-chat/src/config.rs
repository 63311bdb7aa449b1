//! Chat configuration loading from file and environment variables.

use pepper_speech::config::DEFAULT_BRIDGE_URL;
use pepper_speech::ResolverConfig;
use pepper_types::{LegacyTarget, DEFAULT_LEGACY_HOST, DEFAULT_LEGACY_PORT};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Top-level chat configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Text generation endpoint.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Direct legacy connection settings.
    #[serde(default)]
    pub legacy: LegacyConfig,

    /// Bridge settings.
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Conversation settings.
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyConfig {
    #[serde(default = "default_legacy_host")]
    pub host: String,

    #[serde(default = "default_legacy_port")]
    pub port: u16,

    /// Whether this process may open a legacy session itself. When off,
    /// resolution starts at the bridge.
    #[serde(default)]
    pub direct_enabled: bool,

    /// Connect timeout in seconds for the direct probe.
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

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_bridge_url")]
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationConfig {
    /// Number of trailing turns rendered into each prompt. Unset keeps the
    /// whole conversation.
    #[serde(default)]
    pub history_limit: Option<usize>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "pepper_chat=debug,warn").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_generation_url() -> String {
    pepper_llm::DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    pepper_llm::DEFAULT_MODEL.to_string()
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

fn default_bridge_url() -> String {
    DEFAULT_BRIDGE_URL.to_string()
}

// Chat output shares the terminal, so only warnings and above by default.
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_generation_url(),
            model: default_model(),
        }
    }
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            host: default_legacy_host(),
            port: default_legacy_port(),
            direct_enabled: false,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            url: default_bridge_url(),
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

impl Config {
    /// Resolver settings derived from the legacy and bridge sections.
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig::new(self.legacy.target(), self.bridge.url.clone())
            .with_connect_timeout(self.legacy.connect_timeout())
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

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Applies environment overrides read through `lookup`.
///
/// - `OLLAMA_HOST` overrides `generation.base_url`
/// - `OLLAMA_MODEL` overrides `generation.model`
/// - `PEPPER_IP` / `PEPPER_PORT` override the legacy target
/// - `PEPPER_DIRECT_ENABLED` overrides `legacy.direct_enabled`
/// - `BRIDGE_URL` overrides `bridge.url`
/// - `PEPPER_HISTORY_LIMIT` overrides `conversation.history_limit`
/// - `PEPPER_LOG_LEVEL` / `PEPPER_LOG_JSON` override logging
///
/// Values that fail to parse are ignored.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup("OLLAMA_HOST").filter(|v| !v.trim().is_empty()) {
        config.generation.base_url = url;
    }
    if let Some(model) = lookup("OLLAMA_MODEL").filter(|v| !v.trim().is_empty()) {
        config.generation.model = model;
    }
    if let Some(host) = lookup("PEPPER_IP").filter(|v| !v.trim().is_empty()) {
        config.legacy.host = host;
    }
    if let Some(port) = lookup("PEPPER_PORT") {
        if let Ok(parsed) = port.parse() {
            config.legacy.port = parsed;
        }
    }
    if let Some(flag) = lookup("PEPPER_DIRECT_ENABLED").as_deref().and_then(parse_flag) {
        config.legacy.direct_enabled = flag;
    }
    if let Some(url) = lookup("BRIDGE_URL").filter(|v| !v.trim().is_empty()) {
        config.bridge.url = url;
    }
    if let Some(limit) = lookup("PEPPER_HISTORY_LIMIT") {
        if let Ok(parsed) = limit.parse() {
            config.conversation.history_limit = Some(parsed);
        }
    }
    if let Some(level) = lookup("PEPPER_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("PEPPER_LOG_JSON").as_deref().and_then(parse_flag) {
        config.logging.json = json;
    }
}

/// Applies positional overrides: `[host] [port]` of the legacy runtime.
pub fn apply_positional_overrides(config: &mut Config, args: &[String]) -> Result<(), ConfigError> {
    if let Some(host) = args.first() {
        config.legacy.host = host.clone();
    }
    if let Some(port) = args.get(1) {
        config.legacy.port = port.parse().map_err(|_| ConfigError::InvalidArgument {
            name: "port",
            value: port.clone(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let env: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |key| env.get(key).map(|v| v.to_string())
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.generation.base_url, "http://localhost:11434");
        assert_eq!(config.generation.model, "llama2");
        assert_eq!(config.legacy.target(), LegacyTarget::new("127.0.0.1", 9559));
        assert!(!config.legacy.direct_enabled);
        assert_eq!(config.bridge.url, "http://localhost:5000");
        assert_eq!(config.conversation.history_limit, None);
    }

    #[test]
    fn file_sections_are_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [generation]
            model = "mistral"

            [legacy]
            host = "192.168.1.100"
            direct_enabled = true

            [bridge]
            url = "http://10.0.0.2:5000/"

            [conversation]
            history_limit = 6
            "#
        )
        .unwrap();

        let config = load_config(file.path().to_str()).unwrap();
        assert_eq!(config.generation.model, "mistral");
        assert_eq!(config.generation.base_url, "http://localhost:11434");
        assert_eq!(config.legacy.host, "192.168.1.100");
        assert!(config.legacy.direct_enabled);
        assert_eq!(config.conversation.history_limit, Some(6));

        let resolver = config.resolver_config();
        assert_eq!(resolver.bridge_url, "http://10.0.0.2:5000");
        assert_eq!(resolver.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path().join("pepper.toml").to_str()).unwrap();
        assert_eq!(config.legacy.port, 9559);
    }

    #[test]
    fn env_overrides() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            lookup_from(&[
                ("OLLAMA_HOST", "http://gpu-box:11434"),
                ("OLLAMA_MODEL", "phi3"),
                ("PEPPER_DIRECT_ENABLED", "yes"),
                ("BRIDGE_URL", "http://bridge:5000"),
                ("PEPPER_HISTORY_LIMIT", "10"),
                ("PEPPER_PORT", "eleven"),
            ]),
        );

        assert_eq!(config.generation.base_url, "http://gpu-box:11434");
        assert_eq!(config.generation.model, "phi3");
        assert!(config.legacy.direct_enabled);
        assert_eq!(config.bridge.url, "http://bridge:5000");
        assert_eq!(config.conversation.history_limit, Some(10));
        assert_eq!(config.legacy.port, 9559);
    }

    #[test]
    fn positional_host_and_port() {
        let mut config = Config::default();
        apply_positional_overrides(&mut config, &["10.1.1.1".into(), "9600".into()]).unwrap();
        assert_eq!(config.legacy.target(), LegacyTarget::new("10.1.1.1", 9600));

        assert!(apply_positional_overrides(&mut config, &["h".into(), "-1".into()]).is_err());
    }
}
