//! Message types for the camera module actor
//!
//! Every input of the module, whether a host call or a connection event, is a
//! [`ModuleCommand`] on one unbounded inbox. The actor processes them strictly
//! in arrival order, so action dispatch always sees the camera state left by
//! the telemetry that arrived before it.

use tokio::sync::{mpsc, oneshot};

use crate::actions::OptionValues;
use crate::config::BridgeConfig;
use crate::dispatch::DispatchOutcome;
use crate::error::{AppResult, BridgeError};
use crate::hardware::connection::{ConnectionEvent, ConnectionId};
use crate::host::ModuleStatus;

/// Commands processed by [`crate::app_actor::CameraModule`]
#[derive(Debug)]
pub enum ModuleCommand {
    /// First configuration: register actions and connect
    Init {
        config: Box<BridgeConfig>,
        response: Option<oneshot::Sender<()>>,
    },

    /// Configuration changed in the host
    ConfigUpdated {
        config: Box<BridgeConfig>,
        response: Option<oneshot::Sender<()>>,
    },

    /// Host invoked an action
    InvokeAction {
        action_id: String,
        options: OptionValues,
        response: Option<oneshot::Sender<DispatchOutcome>>,
    },

    /// Event emitted by the connection identified by `id`
    Connection {
        id: ConnectionId,
        event: ConnectionEvent,
    },

    /// Last status reported to the host
    GetStatus {
        response: oneshot::Sender<ModuleStatus>,
    },

    /// Disconnect and stop the actor
    Shutdown {
        response: oneshot::Sender<()>,
    },
}

impl ModuleCommand {
    /// Helper to create an Init command
    pub fn init(config: BridgeConfig) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self::Init {
                config: Box::new(config),
                response: Some(tx),
            },
            rx,
        )
    }

    /// Helper to create a ConfigUpdated command
    pub fn config_updated(config: BridgeConfig) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self::ConfigUpdated {
                config: Box::new(config),
                response: Some(tx),
            },
            rx,
        )
    }

    /// Helper to create an InvokeAction command that reports its outcome
    pub fn invoke_action(
        action_id: impl Into<String>,
        options: OptionValues,
    ) -> (Self, oneshot::Receiver<DispatchOutcome>) {
        let (tx, rx) = oneshot::channel();
        (
            Self::InvokeAction {
                action_id: action_id.into(),
                options,
                response: Some(tx),
            },
            rx,
        )
    }

    /// Helper to create a GetStatus command
    pub fn get_status() -> (Self, oneshot::Receiver<ModuleStatus>) {
        let (tx, rx) = oneshot::channel();
        (Self::GetStatus { response: tx }, rx)
    }

    /// Helper to create a Shutdown command
    pub fn shutdown() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self::Shutdown { response: tx }, rx)
    }
}

/// Cloneable sender side of a module's inbox.
#[derive(Debug, Clone)]
pub struct ModuleHandle {
    tx: mpsc::UnboundedSender<ModuleCommand>,
}

impl ModuleHandle {
    /// Handle sending on `tx`.
    pub fn new(tx: mpsc::UnboundedSender<ModuleCommand>) -> Self {
        Self { tx }
    }

    fn send(&self, command: ModuleCommand) -> AppResult<()> {
        self.tx.send(command).map_err(|_| BridgeError::ModuleStopped)
    }

    async fn request<T>(&self, (command, rx): (ModuleCommand, oneshot::Receiver<T>)) -> AppResult<T> {
        self.send(command)?;
        rx.await.map_err(|_| BridgeError::ModuleStopped)
    }

    /// Send the first configuration and wait until it has been applied.
    pub async fn init(&self, config: BridgeConfig) -> AppResult<()> {
        self.request(ModuleCommand::init(config)).await
    }

    /// Send a configuration update and wait until it has been applied.
    pub async fn update_config(&self, config: BridgeConfig) -> AppResult<()> {
        self.request(ModuleCommand::config_updated(config)).await
    }

    /// Invoke an action and wait until it has been dispatched.
    pub async fn invoke_action(
        &self,
        action_id: impl Into<String>,
        options: OptionValues,
    ) -> AppResult<DispatchOutcome> {
        self.request(ModuleCommand::invoke_action(action_id, options)).await
    }

    /// Invoke an action without waiting, the way the host does.
    pub fn fire_action(&self, action_id: impl Into<String>, options: OptionValues) -> AppResult<()> {
        self.send(ModuleCommand::InvokeAction {
            action_id: action_id.into(),
            options,
            response: None,
        })
    }

    /// Status after every command queued so far has been processed.
    pub async fn status(&self) -> AppResult<ModuleStatus> {
        self.request(ModuleCommand::get_status()).await
    }

    /// Disconnect and stop the module; waits for the actor to acknowledge.
    pub async fn shutdown(&self) -> AppResult<()> {
        self.request(ModuleCommand::shutdown()).await
    }

    /// Whether the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
