//! Camera module actor
//!
//! One task owns everything mutable about a camera instance: configuration,
//! iris table, action catalog, cached camera state, variable schemas and the
//! current connection. Host calls and connection events arrive as
//! [`ModuleCommand`]s on a single inbox and are handled one at a time, so the
//! telemetry path and the dispatch path never race.
//!
//! Each connection gets a fresh [`ConnectionId`]. Events carrying any other id
//! come from a connection that has since been replaced and are dropped.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::actions::{request, ActionCatalog, OptionValues};
use crate::config::BridgeConfig;
use crate::dispatch::{dispatch, DispatchOutcome};
use crate::error::BridgeError;
use crate::hardware::capabilities::{ConnectionFactory, DeviceConnection};
use crate::hardware::connection::{ConnectionEvent, ConnectionId, EventSink, TelemetrySnapshot};
use crate::host::{HostLogLevel, HostSurface, ModuleStatus};
use crate::iris::IrisTable;
use crate::messages::{ModuleCommand, ModuleHandle};
use crate::state::DeviceStateCache;
use crate::variables::{VariableCategory, VariableSynchronizer};

/// The live (or connecting) connection and the id its events carry.
struct ConnectionSlot {
    id: ConnectionId,
    device: Arc<dyn DeviceConnection>,
}

/// Actor that manages one camera instance
pub struct CameraModule {
    host: Arc<dyn HostSurface>,
    factory: Arc<dyn ConnectionFactory>,
    inbox: mpsc::UnboundedSender<ModuleCommand>,
    config: Option<BridgeConfig>,
    iris: IrisTable,
    catalog: ActionCatalog,
    cache: DeviceStateCache,
    variables: VariableSynchronizer,
    connection: Option<ConnectionSlot>,
    next_connection_id: u64,
    status: ModuleStatus,
}

/// Create a module, spawn its actor task and return a handle to it.
pub fn spawn_module(
    host: Arc<dyn HostSurface>,
    factory: Arc<dyn ConnectionFactory>,
) -> (ModuleHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let module = CameraModule::new(host, factory, tx.clone());
    let task = tokio::spawn(module.run(rx));
    (ModuleHandle::new(tx), task)
}

impl CameraModule {
    /// `inbox` must be the sender of the receiver later passed to [`run`](Self::run);
    /// connection events are routed through it.
    pub fn new(
        host: Arc<dyn HostSurface>,
        factory: Arc<dyn ConnectionFactory>,
        inbox: mpsc::UnboundedSender<ModuleCommand>,
    ) -> Self {
        let iris = IrisTable::default();
        let catalog = ActionCatalog::build(&iris);
        Self {
            host,
            factory,
            inbox,
            config: None,
            iris,
            catalog,
            cache: DeviceStateCache::new(),
            variables: VariableSynchronizer::default(),
            connection: None,
            next_connection_id: 0,
            status: ModuleStatus::Disconnected,
        }
    }

    /// Runs the actor event loop, processing commands until shutdown
    pub async fn run(mut self, mut command_rx: mpsc::UnboundedReceiver<ModuleCommand>) {
        info!("CameraModule started");

        while let Some(command) = command_rx.recv().await {
            match command {
                ModuleCommand::Init { config, response } => {
                    self.init(*config).await;
                    if let Some(response) = response {
                        let _ = response.send(());
                    }
                }

                ModuleCommand::ConfigUpdated { config, response } => {
                    self.config_updated(*config).await;
                    if let Some(response) = response {
                        let _ = response.send(());
                    }
                }

                ModuleCommand::InvokeAction {
                    action_id,
                    options,
                    response,
                } => {
                    let outcome = self.invoke_action(&action_id, &options).await;
                    if let Some(response) = response {
                        let _ = response.send(outcome);
                    }
                }

                ModuleCommand::Connection { id, event } => {
                    self.handle_connection_event(id, event);
                }

                ModuleCommand::GetStatus { response } => {
                    let _ = response.send(self.status);
                }

                ModuleCommand::Shutdown { response } => {
                    info!("Shutdown command received");
                    self.drop_connection().await;
                    let _ = response.send(());
                    break;
                }
            }
        }

        info!("CameraModule shutting down");
    }

    async fn init(&mut self, config: BridgeConfig) {
        info!(host = ?config.host, port = ?config.port, "Initializing camera module");
        self.report_status(ModuleStatus::Disconnected, None);
        self.variables.set_policy(config.late_key_policy);
        self.rebuild_actions(&config);
        self.config = Some(config);
        self.connect().await;
    }

    async fn config_updated(&mut self, config: BridgeConfig) {
        let previous = self.config.take();
        let reconnect = config.requires_reconnect(previous.as_ref());
        if config.iris_steps_changed(previous.as_ref()) {
            self.rebuild_actions(&config);
        }
        if self.variables.policy() != config.late_key_policy {
            info!(policy = ?config.late_key_policy, "Late key policy changed");
            self.variables.set_policy(config.late_key_policy);
        }
        self.config = Some(config);

        if reconnect {
            info!("Connection settings changed, reconnecting");
            self.connect().await;
        } else {
            debug!("Configuration updated without connection changes");
        }
    }

    /// Re-derive the iris table and re-register the catalog.
    fn rebuild_actions(&mut self, config: &BridgeConfig) {
        self.iris = IrisTable::from_config(config.iris_steps.as_deref());
        let malformed = self.iris.malformed_count();
        if malformed > 0 {
            let message = format!(
                "{malformed} of {} iris steps have no valid control value and will be skipped",
                self.iris.len()
            );
            warn!("{}", message);
            self.host.log(HostLogLevel::Warn, &message);
        }
        self.catalog = ActionCatalog::build(&self.iris);
        debug!(steps = self.iris.len(), actions = self.catalog.len(), "Registering actions");
        self.host.register_actions(self.catalog.definitions());
    }

    async fn connect(&mut self) {
        self.drop_connection().await;

        let Some(config) = self.config.as_ref() else {
            return;
        };
        let settings = match config.connection_settings() {
            Ok(settings) => settings,
            Err(err) => {
                let err = BridgeError::from(err);
                warn!("Cannot connect: {}", err);
                self.report_status(ModuleStatus::BadConfig, Some(err.to_string()));
                return;
            }
        };

        self.next_connection_id += 1;
        let id = ConnectionId(self.next_connection_id);
        let sink = EventSink::new(id, self.inbox.clone());

        let device = match self.factory.create(&settings, sink) {
            Ok(device) => device,
            Err(err) => {
                self.connection_failed(BridgeError::connection(err));
                return;
            }
        };
        info!(%id, host = %settings.host, port = settings.port, "Connecting to camera");
        self.connection = Some(ConnectionSlot {
            id,
            device: device.clone(),
        });

        if let Err(err) = device.connect().await {
            self.connection_failed(BridgeError::connection(err));
        }
    }

    fn connection_failed(&mut self, err: BridgeError) {
        error!("{}", err);
        let message = err.to_string();
        self.host.log(HostLogLevel::Error, &message);
        self.report_status(ModuleStatus::UnknownError, Some(message));
    }

    /// Disconnect and forget the current connection, if any.
    async fn drop_connection(&mut self) {
        if let Some(slot) = self.connection.take() {
            info!(id = %slot.id, "Dropping connection");
            if let Err(err) = slot.device.disconnect().await {
                warn!(id = %slot.id, "Disconnect failed: {:#}", err);
            }
        }
        self.cache.clear();
    }

    async fn invoke_action(&self, action_id: &str, options: &OptionValues) -> DispatchOutcome {
        let request = match request::parse_by_id(action_id, options) {
            Ok(request) => request,
            Err(rejection) => {
                debug!(action = action_id, "Ignoring invocation: {}", rejection);
                return DispatchOutcome::Rejected(rejection);
            }
        };

        let device = self.connection.as_ref().map(|slot| slot.device.as_ref());
        let outcome = dispatch(&request, &self.iris, &self.cache, device).await;
        if let DispatchOutcome::Failed { command, error } = &outcome {
            let err = BridgeError::Device(error.clone());
            warn!(action = action_id, ?command, "{}", err);
            self.host.log(HostLogLevel::Error, &format!("{action_id}: {err}"));
        }
        outcome
    }

    fn handle_connection_event(&mut self, id: ConnectionId, event: ConnectionEvent) {
        let current = self.connection.as_ref().map(|slot| slot.id);
        if current != Some(id) {
            debug!(%id, ?current, "Dropping event from stale connection");
            return;
        }

        match event {
            ConnectionEvent::Connecting => self.report_status(ModuleStatus::Connecting, None),
            ConnectionEvent::Connected => {
                info!(%id, "Camera connected");
                self.report_status(ModuleStatus::Ok, None);
            }
            ConnectionEvent::Disconnected => {
                info!(%id, "Camera disconnected");
                self.report_status(ModuleStatus::Disconnected, None);
            }
            ConnectionEvent::Debug(message) => {
                debug!(%id, "{}", message);
                self.host.log(HostLogLevel::Debug, &message);
            }
            ConnectionEvent::Log(message) => {
                info!(%id, "{}", message);
                self.host.log(HostLogLevel::Info, &message);
            }
            ConnectionEvent::Error(message) => {
                error!(%id, "{}", message);
                self.host.log(HostLogLevel::Error, &message);
                self.report_status(ModuleStatus::UnknownError, Some(message));
            }
            ConnectionEvent::OpticalState(snapshot) => {
                self.sync_variables(VariableCategory::Optical, &snapshot);
            }
            ConnectionEvent::CameraState(snapshot) => {
                self.cache.update_camera(&snapshot);
                self.sync_variables(VariableCategory::Camera, &snapshot);
            }
        }
    }

    fn sync_variables(&mut self, category: VariableCategory, snapshot: &TelemetrySnapshot) {
        let outcome = self.variables.apply(category, snapshot);
        if let Some(definitions) = outcome.definitions {
            debug!(%category, count = definitions.len(), "Publishing variable definitions");
            self.host.set_variable_definitions(definitions);
        }
        if !outcome.values.is_empty() {
            self.host.set_variable_values(outcome.values);
        }
    }

    fn report_status(&mut self, status: ModuleStatus, message: Option<String>) {
        self.status = status;
        self.host.report_status(status, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LateKeyPolicy;
    use crate::hardware::mock::MockConnectionFactory;
    use crate::testing::RecordingHost;
    use serde_json::json;
    use tracing::Instrument;
    use tracing_test::traced_test;

    /// Like [`spawn_module`], but the actor runs inside the caller's span so
    /// its log lines are attributed to the test.
    fn spawn_traced(
        host: Arc<RecordingHost>,
        factory: Arc<MockConnectionFactory>,
    ) -> (ModuleHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let module = CameraModule::new(host, factory, tx.clone());
        let task = tokio::spawn(module.run(rx).instrument(tracing::Span::current()));
        (ModuleHandle::new(tx), task)
    }

    fn config() -> BridgeConfig {
        BridgeConfig {
            host: Some("cam-1.local".into()),
            port: Some(49153),
            username: Some("guest".into()),
            password: Some("secret".into()),
            ..BridgeConfig::default()
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_stale_events_are_traced_and_dropped() {
        let host = Arc::new(RecordingHost::new());
        let factory = Arc::new(MockConnectionFactory::new());
        let (module, task) = spawn_traced(host.clone(), factory.clone());

        module.init(config()).await.unwrap();
        let first = factory.latest().unwrap();
        module
            .update_config(BridgeConfig {
                port: Some(49154),
                ..config()
            })
            .await
            .unwrap();
        first.emit_optical_state(json!({"zoom": 1}).as_object().cloned().unwrap());
        module.status().await.unwrap();

        assert!(logs_contain("Dropping event from stale connection"));
        assert!(host.definitions().is_empty());

        module.shutdown().await.unwrap();
        task.await.unwrap();
        assert!(logs_contain("CameraModule shutting down"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_device_failure_is_traced() {
        let host = Arc::new(RecordingHost::new());
        let factory = Arc::new(MockConnectionFactory::new());
        let (module, _task) = spawn_traced(host.clone(), factory.clone());
        module.init(config()).await.unwrap();
        factory.latest().unwrap().set_failing(true).await;

        let outcome = module
            .invoke_action("set_menu", json!({"state": "ON"}).as_object().cloned().unwrap())
            .await
            .unwrap();

        assert!(matches!(outcome, DispatchOutcome::Failed { .. }));
        assert!(logs_contain("Device error"));
        assert_eq!(module.status().await.unwrap(), ModuleStatus::Ok);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_rejected_invocation_is_traced_at_debug() {
        let host = Arc::new(RecordingHost::new());
        let factory = Arc::new(MockConnectionFactory::new());
        let (module, _task) = spawn_traced(host, factory);
        module.init(config()).await.unwrap();

        let outcome = module
            .invoke_action("set_iris", json!({"value": "wide"}).as_object().cloned().unwrap())
            .await
            .unwrap();

        assert!(matches!(outcome, DispatchOutcome::Rejected(_)));
        assert!(logs_contain("Ignoring invocation"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_policy_change_applies_without_reconnect() {
        let host = Arc::new(RecordingHost::new());
        let factory = Arc::new(MockConnectionFactory::new());
        let (module, _task) = spawn_traced(host.clone(), factory.clone());
        module.init(config()).await.unwrap();
        let camera = factory.latest().unwrap();
        camera.emit_optical_state(json!({"zoom": 1}).as_object().cloned().unwrap());

        module
            .update_config(BridgeConfig {
                late_key_policy: LateKeyPolicy::Extend,
                ..config()
            })
            .await
            .unwrap();
        camera.emit_optical_state(json!({"zoom": 2, "focus": 3}).as_object().cloned().unwrap());
        module.status().await.unwrap();

        assert!(logs_contain("Late key policy changed"));
        assert_eq!(factory.created_count(), 1);
        assert_eq!(host.definition_sets().len(), 2);
        assert_eq!(host.definitions().len(), 2);
    }

    #[tokio::test]
    async fn test_config_update_before_init_connects() {
        let host = Arc::new(RecordingHost::new());
        let factory = Arc::new(MockConnectionFactory::new());
        let (module, _task) = spawn_module(host.clone(), factory.clone());

        module.update_config(config()).await.unwrap();

        assert_eq!(factory.created_count(), 1);
        assert_eq!(host.registrations().len(), 1);
        assert_eq!(module.status().await.unwrap(), ModuleStatus::Ok);
    }
}
