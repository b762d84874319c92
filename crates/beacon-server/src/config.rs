//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Event channel settings.
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Identity of this process as an event producer.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Subscriber reconnection settings.
    #[serde(default)]
    pub subscriber: SubscriberConfig,

    /// Report generation settings.
    #[serde(default)]
    pub reports: ReportsConfig,
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

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "beacon_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Event channel configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Name of the channel events are published on.
    #[serde(default = "default_channel_name")]
    pub name: String,

    /// Messages buffered per subscriber before the oldest are dropped.
    #[serde(default = "default_channel_capacity")]
    pub capacity: usize,
}

/// Producer identity.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Stamped as `serviceId` on every published event.
    #[serde(default = "default_service_id")]
    pub id: String,
}

/// Subscriber reconnection backoff.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriberConfig {
    /// Delay before the first reconnection attempt.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for the doubling delay.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

/// Report generation limits.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportsConfig {
    /// Seconds before an in-progress report is abandoned.
    #[serde(default = "default_report_timeout_secs")]
    pub timeout_secs: u64,
}

impl ReportsConfig {
    /// The timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "beacon.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_channel_name() -> String {
    "service-events".to_string()
}

fn default_channel_capacity() -> usize {
    beacon_channel::BroadcastTransport::DEFAULT_CAPACITY
}

fn default_service_id() -> String {
    "beacon".to_string()
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_report_timeout_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
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

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: default_channel_name(),
            capacity: default_channel_capacity(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            id: default_service_id(),
        }
    }
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_report_timeout_secs(),
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
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `BEACON_HOST` overrides `server.host`
/// - `BEACON_PORT` overrides `server.port`
/// - `BEACON_DB_PATH` overrides `database.path`
/// - `BEACON_LOG_LEVEL` overrides `logging.level`
/// - `BEACON_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `BEACON_SERVICE_ID` overrides `service.id`
/// - `BEACON_CHANNEL` overrides `channel.name`
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

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

/// Applies `BEACON_*` overrides read through `lookup`. Unparseable host
/// and port values are ignored.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("BEACON_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = lookup("BEACON_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(db_path) = lookup("BEACON_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = lookup("BEACON_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("BEACON_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(id) = lookup("BEACON_SERVICE_ID") {
        if !id.trim().is_empty() {
            config.service.id = id;
        }
    }
    if let Some(name) = lookup("BEACON_CHANNEL") {
        if !name.trim().is_empty() {
            config.channel.name = name;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Some("/nonexistent/beacon-config.toml")).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.channel.name, "service-events");
        assert_eq!(config.reports.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn partial_file_keeps_section_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nport = 8080\n\n[subscriber]\nmax_backoff_ms = 2000\n\n[service]\nid = \"svc-a\""
        )
        .unwrap();

        let config = load_config(file.path().to_str()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, default_host());
        assert_eq!(config.subscriber.max_backoff_ms, 2_000);
        assert_eq!(config.subscriber.initial_backoff_ms, 500);
        assert_eq!(config.service.id, "svc-a");
        assert_eq!(config.database.path, "beacon.db");
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();
        assert!(matches!(
            load_config(file.path().to_str()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("BEACON_PORT", "9090"),
            ("BEACON_HOST", "not-an-ip"),
            ("BEACON_LOG_JSON", "1"),
            ("BEACON_SERVICE_ID", "svc-b"),
            ("BEACON_CHANNEL", "   "),
        ]);
        let mut config = Config::default();
        apply_env_overrides(&mut config, |name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, default_host());
        assert!(config.logging.json);
        assert_eq!(config.service.id, "svc-b");
        assert_eq!(config.channel.name, "service-events");
    }
}
