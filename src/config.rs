//! # Configuration Management
//!
//! Loads the recorder configuration from multiple sources:
//! - A configuration file (`config.yml` by default, any format the `config` crate knows)
//! - Environment variables (with the `CALL_RECORDER` prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (`CALL_RECORDER__RECEIVE_UDP__PORT`, `CALL_RECORDER__LOG_PATH`, ...)
//! 2. Configuration file
//! 3. Default values (defined in the Default impl)
//!
//! Unlike the defaults, the file itself is required: the recorder must not start
//! listening without an explicit configuration. The configuration is read once at
//! startup and never reloaded.

use crate::error::{RecorderError, RecorderResult};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Environment variable naming the configuration file when no argument is given.
pub const CONFIG_PATH_ENV: &str = "CALL_RECORDER_CONFIG";

/// Prefix of the environment variables that override file values.
pub const ENV_PREFIX: &str = "CALL_RECORDER";

/// Configuration file used when neither an argument nor the environment names one.
/// The extension is resolved by the `config` crate (`config.yml`, `config.toml`, ...).
pub const DEFAULT_CONFIG_PATH: &str = "config";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub receive_udp: ReceiveUdpConfig,
    /// Root directory under which the `logs/` recording tree is created
    pub log_path: String,
}

/// Where the audio datagrams are received.
///
/// ## Common values:
/// - `address = "0.0.0.0"`: Accept datagrams on every interface
/// - `address = "127.0.0.1"`: Only accept datagrams from this machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveUdpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            receive_udp: ReceiveUdpConfig {
                address: "0.0.0.0".to_string(),
                port: 40000,
            },
            log_path: ".".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the file at `path`, layered between the defaults
    /// and the environment.
    ///
    /// ## Environment Variable Examples:
    /// - `CALL_RECORDER__RECEIVE_UDP__ADDRESS=127.0.0.1`
    /// - `CALL_RECORDER__RECEIVE_UDP__PORT=40001`
    /// - `CALL_RECORDER__LOG_PATH=/var/lib/call-recorder`
    pub fn load(path: &str) -> RecorderResult<Self> {
        Self::load_with_env_prefix(path, ENV_PREFIX)
    }

    fn load_with_env_prefix(path: &str, env_prefix: &str) -> RecorderResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name(path).required(true))
            // `__` nests keys, a single `_` stays part of the field name (receive_udp, log_path)
            .add_source(config::Environment::with_prefix(env_prefix).separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Resolve the configuration file path from the command line or the environment.
    pub fn resolve_path(arg: Option<String>) -> String {
        Self::resolve_path_from(arg, CONFIG_PATH_ENV)
    }

    fn resolve_path_from(arg: Option<String>, env_var: &str) -> String {
        arg.or_else(|| std::env::var(env_var).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - The receive port is not 0
    /// - The receive address is a literal IP address
    /// - The log path is not empty
    pub fn validate(&self) -> RecorderResult<()> {
        if self.receive_udp.port == 0 {
            return Err(RecorderError::Validation("Receive port cannot be 0".to_string()));
        }

        if self.receive_udp.address.parse::<IpAddr>().is_err() {
            return Err(RecorderError::Validation(format!(
                "Receive address '{}' is not an IP address",
                self.receive_udp.address
            )));
        }

        if self.log_path.trim().is_empty() {
            return Err(RecorderError::Validation("Log path cannot be empty".to_string()));
        }

        Ok(())
    }
}
