//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/deadcode/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/deadcode/` (~/.config/deadcode/)
//! - Data: `$XDG_DATA_HOME/deadcode/` (~/.local/share/deadcode/)
//! - State/Logs: `$XDG_STATE_HOME/deadcode/` (~/.local/state/deadcode/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Class load emitter configuration
    #[serde(default)]
    pub emitter: EmitterConfig,

    /// Receiving collector configuration
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Emitter configuration
///
/// Values are fixed once the emitter is constructed.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct EmitterConfig {
    /// Master switch; when false the bootstrap never installs the emitter
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Substrings a class name must contain to be reported (empty = all)
    #[serde(default)]
    pub allowed_namespaces: Vec<String>,

    /// Destination host for metric packets
    #[serde(default = "default_host")]
    pub host: String,

    /// Destination port for metric packets
    #[serde(default = "default_port")]
    pub port: u16,

    /// Auto-flush threshold and per-packet byte cap
    #[serde(default = "default_packet_size")]
    pub packet_size: usize,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            allowed_namespaces: vec![],
            host: default_host(),
            port: default_port(),
            packet_size: default_packet_size(),
        }
    }
}

impl EmitterConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("emitter.host must not be empty".to_string()));
        }
        if self.packet_size == 0 {
            return Err(Error::Config(
                "emitter.packet_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_enabled() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8125
}

fn default_packet_size() -> usize {
    500
}

/// Collector (receiving side) configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CollectorConfig {
    /// UDP port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Where the class inventory is persisted (defaults to the data dir)
    pub storage_file: Option<PathBuf>,

    /// Seconds between periodic inventory saves while listening
    #[serde(default = "default_save_interval")]
    pub save_interval_secs: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            storage_file: None,
            save_interval_secs: default_save_interval(),
        }
    }
}

impl CollectorConfig {
    /// Resolved inventory path, falling back to `$XDG_DATA_HOME/deadcode/data.json`
    pub fn storage_path(&self) -> PathBuf {
        self.storage_file
            .clone()
            .unwrap_or_else(Config::inventory_path)
    }
}

fn default_save_interval() -> u64 {
    10
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/deadcode/config.toml` (~/.config/deadcode/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("deadcode").join("config.toml")
    }

    /// Returns the data directory path (for the class inventory)
    ///
    /// `$XDG_DATA_HOME/deadcode/` (~/.local/share/deadcode/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("deadcode")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/deadcode/` (~/.local/state/deadcode/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("deadcode")
    }

    /// Returns the default inventory file path
    pub fn inventory_path() -> PathBuf {
        Self::data_dir().join("data.json")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("deadcode.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.emitter.enabled);
        assert!(config.emitter.allowed_namespaces.is_empty());
        assert_eq!(config.emitter.host, "127.0.0.1");
        assert_eq!(config.emitter.port, 8125);
        assert_eq!(config.emitter.packet_size, 500);
        assert_eq!(config.collector.port, 8125);
        assert_eq!(config.collector.save_interval_secs, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[emitter]
allowed_namespaces = ["App\\Service", "Domain"]
host = "metrics.internal"
port = 9125
packet_size = 1200

[collector]
port = 9125
storage_file = "/var/lib/deadcode/data.json"

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(
            config.emitter.allowed_namespaces,
            vec!["App\\Service".to_string(), "Domain".to_string()]
        );
        assert_eq!(config.emitter.host, "metrics.internal");
        assert_eq!(config.emitter.port, 9125);
        assert_eq!(config.emitter.packet_size, 1200);
        assert!(config.emitter.enabled);
        assert_eq!(
            config.collector.storage_path(),
            PathBuf::from("/var/lib/deadcode/data.json")
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_emitter_disabled() {
        let config: Config = toml::from_str("[emitter]\nenabled = false\n").unwrap();
        assert!(!config.emitter.enabled);
        assert_eq!(config.emitter.packet_size, 500);
    }

    #[test]
    fn test_emitter_config_validation() {
        assert!(EmitterConfig::default().validate().is_ok());

        let config = EmitterConfig {
            packet_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EmitterConfig {
            host: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_path_defaults_to_data_dir() {
        let config = CollectorConfig::default();
        assert!(config.storage_path().ends_with("deadcode/data.json"));
    }
}
