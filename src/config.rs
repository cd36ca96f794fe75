//! Bridge configuration using Figment
//!
//! Configuration is loaded from (lowest to highest precedence):
//! 1. Built-in defaults ([`BridgeConfig::default`])
//! 2. A TOML file (e.g. `config/p2_bridge.toml`)
//! 3. Environment variables prefixed with `P2BRIDGE_`
//!
//! ```text
//! P2BRIDGE_HOST=192.168.0.20
//! P2BRIDGE_PORT=49153
//! P2BRIDGE_IRIS_STEPS="2.8:2970;4:4000;CLOSE:8174"
//! ```
//!
//! Missing connection fields are not load errors. The camera module reports
//! a `bad_config` status instead, so the host can show the problem next to
//! the instance rather than refusing to start it.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default iris step table, f/2.8 through CLOSE.
pub const DEFAULT_IRIS_STEPS: &str = "2.8:2970;3:3150;3.2:3350;3.4:3550;3.6:3700;3.8:3850;4:4000;4.2:4150;4.5:4350;4.8:4550;5:4650;5.3:4800;5.6:5000;6:5150;6.4:5350;6.8:5550;7.2:5700;7.6:5850;8:6000;8.5:6200;9:6450;9,6:6550;10:6650;11:6900;CLOSE:8174";

const ENV_PREFIX: &str = "P2BRIDGE_";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration load error: {0}")]
    LoadError(#[from] figment::Error),
    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

/// What to do with telemetry keys that show up after a category's variable
/// definitions were derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LateKeyPolicy {
    /// Publish the value but never define the variable.
    #[default]
    Ignore,
    /// Append a definition for the key and republish all definitions.
    Extend,
}

/// Flat configuration record of one camera instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Camera IP address or hostname
    #[serde(default)]
    pub host: Option<String>,
    /// P2 control TCP port (every camera needs its own port)
    #[serde(default)]
    pub port: Option<u16>,
    /// Login user name.
    #[serde(default)]
    pub username: Option<String>,
    /// Login password.
    #[serde(default)]
    pub password: Option<String>,
    /// `label:value` pairs joined by `;`
    #[serde(default = "default_iris_steps")]
    pub iris_steps: Option<String>,
    /// Handling of telemetry keys that appear after variables were defined.
    #[serde(default)]
    pub late_key_policy: LateKeyPolicy,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Validated connection parameters handed to the connection factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Camera host name or address, trimmed.
    pub host: String,
    /// Control port, never 0.
    pub port: u16,
    /// Login user name.
    pub username: String,
    /// Login password.
    pub password: String,
}

fn default_iris_steps() -> Option<String> {
    Some(DEFAULT_IRIS_STEPS.to_string())
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            username: None,
            password: None,
            iris_steps: default_iris_steps(),
            late_key_policy: LateKeyPolicy::default(),
            log_level: default_log_level(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from defaults and `P2BRIDGE_` environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::extract(Self::base_figment())
    }

    /// Load configuration from a TOML file, with environment overrides applied
    /// on top.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be parsed or validation fails.
    /// A missing file is treated as empty.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::from(Serialized::defaults(BridgeConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX));
        Self::extract(figment)
    }

    fn base_figment() -> Figment {
        Figment::from(Serialized::defaults(BridgeConfig::default())).merge(Env::prefixed(ENV_PREFIX))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(ConfigError::LoadError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    ///
    /// Only the ambient settings are checked here. Connection fields are
    /// checked by [`BridgeConfig::connection_settings`] at connect time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }

    /// Extract the connection parameters, or explain which one is missing.
    ///
    /// Empty strings and port `0` count as missing.
    pub fn connection_settings(&self) -> Result<ConnectionSettings, ConfigError> {
        // Credentials are passed through untrimmed.
        fn required(field: &str, value: Option<&str>) -> Result<String, ConfigError> {
            match value {
                Some(v) if !v.trim().is_empty() => Ok(v.to_string()),
                _ => Err(ConfigError::ValidationError(format!("'{field}' is required"))),
            }
        }

        let host = required("host", self.host.as_deref())?;
        let port = match self.port {
            Some(port) if port != 0 => port,
            _ => return Err(ConfigError::ValidationError("'port' is required".into())),
        };
        let username = required("username", self.username.as_deref())?;
        let password = required("password", self.password.as_deref())?;

        Ok(ConnectionSettings {
            host: host.trim().to_string(),
            port,
            username,
            password,
        })
    }

    /// Whether moving from `previous` to `self` requires a new connection.
    ///
    /// Only the connection fields matter; iris steps and ambient settings can
    /// change under a live connection.
    pub fn requires_reconnect(&self, previous: Option<&BridgeConfig>) -> bool {
        match previous {
            None => true,
            Some(prev) => {
                prev.host != self.host
                    || prev.port != self.port
                    || prev.username != self.username
                    || prev.password != self.password
            }
        }
    }

    /// Whether the iris step table differs from `previous`.
    pub fn iris_steps_changed(&self, previous: Option<&BridgeConfig>) -> bool {
        previous.map_or(true, |prev| prev.iris_steps != self.iris_steps)
    }
}
