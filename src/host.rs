//! Host framework surface
//!
//! The automation host is an external collaborator. The camera module talks
//! to it only through [`HostSurface`]; the CLI uses [`TracingHost`], tests use
//! [`crate::testing::RecordingHost`].

use serde::Serialize;
use std::fmt;
use tracing::{debug, error, info};

use crate::actions::ActionDefinition;
use crate::variables::{VariableDefinition, VariableValues};

/// Instance status shown by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    /// No live connection.
    Disconnected,
    /// Connection in progress.
    Connecting,
    /// Connected.
    Ok,
    /// Configuration is incomplete or invalid.
    BadConfig,
    /// Connection or session failure.
    UnknownError,
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModuleStatus::Disconnected => "disconnected",
            ModuleStatus::Connecting => "connecting",
            ModuleStatus::Ok => "ok",
            ModuleStatus::BadConfig => "bad_config",
            ModuleStatus::UnknownError => "unknown_error",
        };
        f.write_str(s)
    }
}

/// Severity of a host log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostLogLevel {
    /// Debug.
    Debug,
    /// Info.
    Info,
    /// Warning.
    Warn,
    /// Error.
    Error,
}

/// Calls the camera module makes into the host.
///
/// All methods are fire-and-forget from the module's point of view.
pub trait HostSurface: Send + Sync {
    /// Replace the full set of registered actions.
    fn register_actions(&self, actions: &[ActionDefinition]);
    /// Replace the full set of variable definitions.
    fn set_variable_definitions(&self, definitions: Vec<VariableDefinition>);
    fn set_variable_values(&self, values: VariableValues);
    fn report_status(&self, status: ModuleStatus, message: Option<String>);
    fn log(&self, level: HostLogLevel, message: &str);
}

/// Host that writes everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHost;

impl HostSurface for TracingHost {
    fn register_actions(&self, actions: &[ActionDefinition]) {
        info!(count = actions.len(), "Registered actions");
        for action in actions {
            debug!(id = action.id, options = action.options.len(), "  {}", action.name);
        }
    }

    fn set_variable_definitions(&self, definitions: Vec<VariableDefinition>) {
        info!(count = definitions.len(), "Variable definitions updated");
    }

    fn set_variable_values(&self, values: VariableValues) {
        for (id, value) in &values {
            debug!(variable = %id, %value, "Variable");
        }
    }

    fn report_status(&self, status: ModuleStatus, message: Option<String>) {
        match message {
            Some(message) => info!(%status, "Status: {}", message),
            None => info!(%status, "Status"),
        }
    }

    fn log(&self, level: HostLogLevel, message: &str) {
        match level {
            HostLogLevel::Debug => debug!(target: "p2_bridge::host", "{}", message),
            HostLogLevel::Info => info!(target: "p2_bridge::host", "{}", message),
            HostLogLevel::Warn => tracing::warn!(target: "p2_bridge::host", "{}", message),
            HostLogLevel::Error => error!(target: "p2_bridge::host", "{}", message),
        }
    }
}
