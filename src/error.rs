//! Custom error types for the bridge.
//!
//! `BridgeError` is the crate-level error. Using `thiserror`, it gathers the
//! failure sources the lifecycle glue has to deal with:
//!
//! - **`Config`**: loading or validating the configuration failed (see
//!   [`crate::config::ConfigError`]).
//! - **`Connection`**: the connection factory could not build a device
//!   connection, or `connect()` itself failed.
//! - **`Device`**: a command was handed to the device connection and the
//!   connection reported a failure.
//! - **`ModuleStopped`**: a [`crate::messages::ModuleHandle`] tried to talk to
//!   an actor that has already shut down.
//!
//! None of these are ever returned to the host as the result of an action
//! invocation. The actor turns them into status transitions and log lines.

use thiserror::Error;

use crate::config::ConfigError;

/// Convenience alias for results using the bridge error type.
pub type AppResult<T> = std::result::Result<T, BridgeError>;

/// Crate-level error type.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Camera module is no longer running")]
    ModuleStopped,
}

impl BridgeError {
    /// Wraps a failure while creating or connecting a device connection.
    pub fn connection(err: anyhow::Error) -> Self {
        BridgeError::Connection(format!("{err:#}"))
    }
}
