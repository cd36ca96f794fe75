//! Events coming back from a device connection.
//!
//! Every connection is created with an [`EventSink`] bound to a fresh
//! [`ConnectionId`]. The sink forwards events into the camera module's inbox,
//! so telemetry and action dispatch are processed by the same task in arrival
//! order. When the module replaces its connection, events still emitted by the
//! old one carry a stale id and are dropped by the module.

use serde_json::{Map, Value};
use std::fmt;
use tokio::sync::mpsc;

use crate::messages::ModuleCommand;

/// Flat key → scalar record of one telemetry category.
pub type TelemetrySnapshot = Map<String, Value>;

/// Identifies one connection instance within a module's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Event emitted by a device connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// Session is being established.
    Connecting,
    /// Session is up.
    Connected,
    /// Session closed.
    Disconnected,
    /// Protocol trace line.
    Debug(String),
    /// Informational message.
    Log(String),
    /// Session failure.
    Error(String),
    /// Lens state (zoom, focus, iris ring, ...)
    OpticalState(TelemetrySnapshot),
    /// Camera processing state (gains, pedestals, iris control value, ...)
    CameraState(TelemetrySnapshot),
}

/// Handle a connection uses to report events to its owning module.
#[derive(Debug, Clone)]
pub struct EventSink {
    id: ConnectionId,
    inbox: mpsc::UnboundedSender<ModuleCommand>,
}

impl EventSink {
    pub(crate) fn new(id: ConnectionId, inbox: mpsc::UnboundedSender<ModuleCommand>) -> Self {
        Self { id, inbox }
    }

    /// Id of the connection this sink belongs to.
    pub fn connection_id(&self) -> ConnectionId {
        self.id
    }

    /// Forward an event. Returns `false` once the module has shut down.
    pub fn emit(&self, event: ConnectionEvent) -> bool {
        self.inbox
            .send(ModuleCommand::Connection { id: self.id, event })
            .is_ok()
    }
}
