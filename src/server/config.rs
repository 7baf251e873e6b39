//! Configuration loading for calcd.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag; must exist)
//! 2. `~/.calcd/config.toml` (user)
//! 3. `/etc/calcd/config.toml` (system)
//! 4. Built-in defaults
//!
//! Every field has a default, so a config file only needs the values it
//! changes.

use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::server::handlers::{DEFAULT_STREAM_BUFFER, HandlerSettings};
use crate::{CalcError, Result};

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub handlers: HandlersConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0:50051).
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            limits: LimitsConfig::default(),
        }
    }
}

fn default_address() -> String {
    "0.0.0.0:50051".to_string()
}

/// Resource limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum concurrent requests per connection (default: 100).
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    /// Server-side request timeout in seconds, 0 to disable (default: 120).
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent(),
            request_timeout_secs: default_timeout(),
        }
    }
}

impl LimitsConfig {
    /// The server-side timeout, if enabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

fn default_max_concurrent() -> usize {
    100
}

fn default_timeout() -> u64 {
    120
}

/// Handler tunables.
#[derive(Debug, Clone, Deserialize)]
pub struct HandlersConfig {
    /// Simulated work in `CalculateWithDeadline`, in milliseconds (default: 1000).
    #[serde(default = "default_work_duration_ms")]
    pub work_duration_ms: u64,
    /// Messages buffered per streamed response (default: 128).
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
    /// Abandon the simulated work as soon as the deadline passes (default: false).
    #[serde(default)]
    pub preempt_on_deadline: bool,
}

impl Default for HandlersConfig {
    fn default() -> Self {
        Self {
            work_duration_ms: default_work_duration_ms(),
            stream_buffer: default_stream_buffer(),
            preempt_on_deadline: false,
        }
    }
}

impl HandlersConfig {
    pub fn settings(&self) -> HandlerSettings {
        HandlerSettings {
            work_duration: Duration::from_millis(self.work_duration_ms),
            stream_buffer: self.stream_buffer,
            preempt_on_deadline: self.preempt_on_deadline,
        }
    }
}

fn default_work_duration_ms() -> u64 {
    1000
}

fn default_stream_buffer() -> usize {
    DEFAULT_STREAM_BUFFER
}

/// Which observers wrap every call.
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Log message bodies at debug level (default: true).
    #[serde(default = "default_true")]
    pub log_messages: bool,
    /// Record call metrics (default: true).
    #[serde(default = "default_true")]
    pub metrics: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_messages: true,
            metrics: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.calcd/config.toml`
    /// 3. `/etc/calcd/config.toml`
    /// 4. Defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path)?,
            None => {
                info!("no config file found, using defaults");
                Config::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without consulting the standard locations.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CalcError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            CalcError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path, if any.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(CalcError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".calcd").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/calcd/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.bind_address()?;
        if self.server.limits.max_concurrent_requests == 0 {
            return Err(CalcError::Configuration(
                "server.limits.max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.handlers.stream_buffer == 0 {
            return Err(CalcError::Configuration(
                "handlers.stream_buffer must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The parsed listener address.
    pub fn bind_address(&self) -> Result<SocketAddr> {
        self.server.address.parse().map_err(|e| {
            CalcError::Configuration(format!(
                "Invalid address {:?}: {e}",
                self.server.address
            ))
        })
    }
}
