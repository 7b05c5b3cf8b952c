//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/ccproxy/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/ccproxy/` (~/.config/ccproxy/)
//! - State/Logs: `$XDG_STATE_HOME/ccproxy/` (~/.local/state/ccproxy/)
//!
//! The conversation logs themselves live under `~/.claude/projects` and are
//! owned by Claude Code, not by this service.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Primary environment variable for the listening port.
pub const PORT_ENV: &str = "CLAUDE_CODE_TEMPLATES_API_PROXY_PORT";

/// Fallback environment variable for the listening port.
pub const PORT_ENV_FALLBACK: &str = "API_PROXY_PORT";

/// Port used when nothing else is configured.
pub const DEFAULT_PORT: u16 = 3335;

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

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Location and naming of Claude Code conversation logs
    #[serde(default)]
    pub claude: ClaudeConfig,

    /// Fallbacks for fields inherited by appended records
    #[serde(default)]
    pub record: RecordConfig,

    /// Agent process notification
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Listening port. Takes precedence over the environment.
    pub port: Option<u16>,

    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: None,
            host: default_host(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

/// Claude Code data location
#[derive(Debug, Deserialize)]
pub struct ClaudeConfig {
    /// Override for `~/.claude/projects`
    pub projects_dir: Option<PathBuf>,

    /// Extension of conversation log files, without the dot
    #[serde(default = "default_log_suffix")]
    pub log_suffix: String,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            projects_dir: None,
            log_suffix: default_log_suffix(),
        }
    }
}

fn default_log_suffix() -> String {
    "jsonl".to_string()
}

/// Defaults used when a conversation has no valid record to inherit from
#[derive(Debug, Deserialize)]
pub struct RecordConfig {
    /// Format version written into new records
    #[serde(default = "default_record_version")]
    pub default_version: String,

    /// Working directory written into new records (process cwd if unset)
    pub default_cwd: Option<PathBuf>,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            default_version: default_record_version(),
            default_cwd: None,
        }
    }
}

fn default_record_version() -> String {
    "1.0.44".to_string()
}

/// Notification dispatcher configuration
#[derive(Debug, Deserialize, Clone)]
pub struct NotifyConfig {
    /// Disable to skip terminal injection entirely
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Executable name of the agent process (matched exactly)
    #[serde(default = "default_process_name")]
    pub process_name: String,

    /// Pause between focusing the tab and typing into it
    #[serde(default = "default_focus_delay_ms")]
    pub focus_delay_ms: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            process_name: default_process_name(),
            focus_delay_ms: default_focus_delay_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_process_name() -> String {
    "claude".to_string()
}

fn default_focus_delay_ms() -> u64 {
    500
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Mirror log output to stderr in addition to the log file
    #[serde(default = "default_true")]
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            stderr: true,
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
    /// `$XDG_CONFIG_HOME/ccproxy/config.toml` (~/.config/ccproxy/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("ccproxy").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/ccproxy/` (~/.local/state/ccproxy/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("ccproxy")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("ccproxy.log")
    }

    /// Root of the project-keyed conversation log tree.
    ///
    /// `~/.claude/projects` unless overridden by `claude.projects_dir`.
    pub fn projects_dir(&self) -> PathBuf {
        self.claude
            .projects_dir
            .clone()
            .unwrap_or_else(|| home_dir().join(".claude").join("projects"))
    }

    /// Working directory written into records that have nothing to inherit.
    pub fn default_cwd(&self) -> PathBuf {
        self.record
            .default_cwd
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("/"))
    }

    /// Resolve the listening port.
    ///
    /// Order: `explicit` (CLI flag), `server.port`, [`PORT_ENV`],
    /// [`PORT_ENV_FALLBACK`], [`DEFAULT_PORT`].
    pub fn resolve_port(&self, explicit: Option<u16>) -> u16 {
        resolve_port_from(
            explicit.or(self.server.port),
            std::env::var(PORT_ENV).ok().as_deref(),
            std::env::var(PORT_ENV_FALLBACK).ok().as_deref(),
        )
    }
}

/// Pure port resolution over already-read candidate values.
///
/// Environment values that do not parse as a port are skipped.
pub fn resolve_port_from(
    explicit: Option<u16>,
    primary: Option<&str>,
    fallback: Option<&str>,
) -> u16 {
    if let Some(port) = explicit {
        return port;
    }

    for (name, raw) in [(PORT_ENV, primary), (PORT_ENV_FALLBACK, fallback)] {
        let Some(raw) = raw else {
            continue;
        };
        match raw.trim().parse::<u16>() {
            Ok(port) => return port,
            Err(e) => {
                tracing::warn!(var = name, value = raw, error = %e, "Ignoring invalid port");
            }
        }
    }

    DEFAULT_PORT
}
