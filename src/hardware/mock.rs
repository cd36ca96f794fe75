//! Mock Hardware Implementations
//!
//! Provides a simulated P2 camera for testing without physical hardware.
//!
//! # Available Mocks
//!
//! - `MockCamera` - Simulated camera session that records every command and
//!   keeps a small model of the camera state it would report back
//! - `MockConnectionFactory` - Hands out `MockCamera`s and remembers them so
//!   tests can reach the connection the module is currently using
//!
//! # Telemetry
//!
//! `MockCamera` emits nothing on its own except the lifecycle events from
//! `connect`/`disconnect`. Tests push telemetry with
//! [`MockCamera::emit_camera_state`] / [`MockCamera::emit_optical_state`];
//! the CLI simulator calls [`MockCamera::spawn_telemetry`] to publish the
//! modelled state periodically.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::debug;

use crate::config::ConnectionSettings;
use crate::dispatch::CameraCommand;
use crate::hardware::capabilities::{
    CameraControl, ConnectionFactory, DeviceConnection, GainColor, MenuCommand, Notch,
    OverlayOutput, PedestalColor, TallyColor, WhiteBalanceChannel,
};
use crate::hardware::connection::{ConnectionEvent, EventSink, TelemetrySnapshot};

// =============================================================================
// MockCamera - Simulated P2 camera session
// =============================================================================

/// Camera state the mock reports back as telemetry.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedState {
    /// Iris control value.
    pub iris: i64,
    /// Red white-balance gain.
    pub red_gain: i64,
    /// Blue white-balance gain.
    pub blue_gain: i64,
    /// Master gain, in notches.
    pub master_gain: i64,
    /// Pedestal of R, G and B.
    pub pedestal: [i64; 3],
    /// Selected white balance channel.
    pub white_balance: WhiteBalanceChannel,
    /// Red tally lamp.
    pub tally_red: bool,
    /// Green tally lamp.
    pub tally_green: bool,
    /// Whether the camera menu is open.
    pub menu_open: bool,
    /// Overlay on OUT 1 and OUT 2.
    pub overlay: [bool; 2],
    /// Zoom position, in notches.
    pub zoom: i64,
    /// Focus position, in notches.
    pub focus: i64,
    /// Last zoom speed.
    pub zoom_speed: i64,
    /// Last focus speed.
    pub focus_speed: i64,
}

impl Default for SimulatedState {
    fn default() -> Self {
        Self {
            iris: 4000,
            red_gain: 0,
            blue_gain: 0,
            master_gain: 0,
            pedestal: [0; 3],
            white_balance: WhiteBalanceChannel::A,
            tally_red: false,
            tally_green: false,
            menu_open: false,
            overlay: [false; 2],
            zoom: 0,
            focus: 0,
            zoom_speed: 0,
            focus_speed: 0,
        }
    }
}

impl SimulatedState {
    fn apply(&mut self, command: &CameraCommand) {
        match command {
            CameraCommand::SetTally { color, on } => match color {
                TallyColor::Red => self.tally_red = *on,
                TallyColor::Green => self.tally_green = *on,
            },
            CameraCommand::ChangeMasterGain(notch) => self.master_gain += notch.delta(),
            CameraCommand::SetIris(value) => self.iris = *value,
            CameraCommand::SetWhiteBalanceChannel(channel) => self.white_balance = *channel,
            CameraCommand::SetGain { color, value } => *self.gain_mut(*color) = *value,
            CameraCommand::ChangeGain { color, delta } => *self.gain_mut(*color) += *delta,
            CameraCommand::SetPedestal { color, value } => {
                let index = match color {
                    PedestalColor::Red => 0,
                    PedestalColor::Green => 1,
                    PedestalColor::Blue => 2,
                };
                self.pedestal[index] = *value;
            }
            CameraCommand::SetScreenOverlayDisplay { output, on } => {
                self.overlay[usize::from(output.number() - 1)] = *on;
            }
            CameraCommand::ToggleScreenOverlayDisplay(output) => {
                let slot = &mut self.overlay[usize::from(output.number() - 1)];
                *slot = !*slot;
            }
            CameraCommand::SetMenu(on) => self.menu_open = *on,
            CameraCommand::ToggleMenu => self.menu_open = !self.menu_open,
            CameraCommand::ChangeFocus(notch) => self.focus += notch.delta(),
            CameraCommand::ChangeZoom(notch) => self.zoom += notch.delta(),
            CameraCommand::SetFocusSpeed(speed) => self.focus_speed = *speed,
            CameraCommand::SetZoomSpeed(speed) => self.zoom_speed = *speed,
            CameraCommand::SendMenuCommand(_) | CameraCommand::RawControl(_) => {}
        }
    }

    fn gain_mut(&mut self, color: GainColor) -> &mut i64 {
        match color {
            GainColor::Red => &mut self.red_gain,
            GainColor::Blue => &mut self.blue_gain,
        }
    }

    /// Camera-category telemetry in the key style of the P2 session.
    pub fn camera_snapshot(&self) -> TelemetrySnapshot {
        let value = json!({
            "iris": self.iris,
            "redGain": self.red_gain,
            "blueGain": self.blue_gain,
            "masterGain": self.master_gain,
            "redPedestal": self.pedestal[0],
            "greenPedestal": self.pedestal[1],
            "bluePedestal": self.pedestal[2],
            "whiteBalanceChannel": self.white_balance.wire_id(),
            "tallyRed": self.tally_red,
            "tallyGreen": self.tally_green,
            "menu": self.menu_open,
        });
        value.as_object().cloned().unwrap_or_default()
    }

    /// Optical-category telemetry.
    pub fn optical_snapshot(&self) -> TelemetrySnapshot {
        let value = json!({
            "zoom": self.zoom,
            "focus": self.focus,
            "zoomSpeed": self.zoom_speed,
            "focusSpeed": self.focus_speed,
        });
        value.as_object().cloned().unwrap_or_default()
    }
}

/// Mock camera session
///
/// Simulates a P2 session with:
/// - `Connecting` then `Connected` on connect, `Disconnected` on disconnect
/// - A log of every command in the order it was issued
/// - Optional failure injection for command calls
///
/// # Example
///
/// ```rust,ignore
/// let camera = MockCamera::new(sink);
/// camera.connect().await?;
/// camera.set_iris(3150).await?;
/// assert_eq!(camera.commands().await, vec![CameraCommand::SetIris(3150)]);
/// ```
pub struct MockCamera {
    events: EventSink,
    commands: Arc<RwLock<Vec<CameraCommand>>>,
    state: Arc<RwLock<SimulatedState>>,
    connected: Arc<RwLock<bool>>,
    fail_commands: Arc<RwLock<bool>>,
}

impl MockCamera {
    /// Disconnected mock that reports through `events`.
    pub fn new(events: EventSink) -> Self {
        Self {
            events,
            commands: Arc::new(RwLock::new(Vec::new())),
            state: Arc::new(RwLock::new(SimulatedState::default())),
            connected: Arc::new(RwLock::new(false)),
            fail_commands: Arc::new(RwLock::new(false)),
        }
    }

    /// Commands received so far, oldest first.
    pub async fn commands(&self) -> Vec<CameraCommand> {
        self.commands.read().await.clone()
    }

    /// Forget the recorded commands.
    pub async fn clear_commands(&self) {
        self.commands.write().await.clear();
    }

    /// Whether `connect` has been called without a later `disconnect`.
    pub async fn is_connected(&self) -> bool {
        *self.connected.read().await
    }

    /// Current modelled camera state.
    pub async fn state(&self) -> SimulatedState {
        self.state.read().await.clone()
    }

    /// Make every subsequent command fail (or succeed again).
    pub async fn set_failing(&self, failing: bool) {
        *self.fail_commands.write().await = failing;
    }

    /// Sink this camera reports through.
    pub fn sink(&self) -> &EventSink {
        &self.events
    }

    /// Push `event` to the module as if the camera sent it.
    pub fn emit(&self, event: ConnectionEvent) -> bool {
        self.events.emit(event)
    }

    /// Push a camera telemetry snapshot.
    pub fn emit_camera_state(&self, snapshot: TelemetrySnapshot) -> bool {
        self.emit(ConnectionEvent::CameraState(snapshot))
    }

    /// Push an optical telemetry snapshot.
    pub fn emit_optical_state(&self, snapshot: TelemetrySnapshot) -> bool {
        self.emit(ConnectionEvent::OpticalState(snapshot))
    }

    /// Publish the modelled state on a fixed period until the module stops
    /// listening.
    pub fn spawn_telemetry(&self, period: Duration) -> JoinHandle<()> {
        let state = self.state.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                let (camera, optical) = {
                    let state = state.read().await;
                    (state.camera_snapshot(), state.optical_snapshot())
                };
                if !events.emit(ConnectionEvent::CameraState(camera))
                    || !events.emit(ConnectionEvent::OpticalState(optical))
                {
                    debug!("MockCamera: module gone, stopping telemetry");
                    break;
                }
            }
        })
    }

    async fn record(&self, command: CameraCommand) -> Result<()> {
        if *self.fail_commands.read().await {
            bail!("MockCamera: rejected {:?}", command);
        }
        debug!("MockCamera: {:?}", command);
        self.state.write().await.apply(&command);
        self.commands.write().await.push(command);
        Ok(())
    }
}

#[async_trait]
impl CameraControl for MockCamera {
    async fn set_tally(&self, color: TallyColor, on: bool) -> Result<()> {
        self.record(CameraCommand::SetTally { color, on }).await
    }

    async fn change_master_gain(&self, notch: Notch) -> Result<()> {
        self.record(CameraCommand::ChangeMasterGain(notch)).await
    }

    async fn set_iris(&self, value: i64) -> Result<()> {
        self.record(CameraCommand::SetIris(value)).await
    }

    async fn set_white_balance_channel(&self, channel: WhiteBalanceChannel) -> Result<()> {
        self.record(CameraCommand::SetWhiteBalanceChannel(channel)).await
    }

    async fn set_gain(&self, color: GainColor, value: i64) -> Result<()> {
        self.record(CameraCommand::SetGain { color, value }).await
    }

    async fn change_gain(&self, color: GainColor, delta: i64) -> Result<()> {
        self.record(CameraCommand::ChangeGain { color, delta }).await
    }

    async fn set_pedestal(&self, color: PedestalColor, value: i64) -> Result<()> {
        self.record(CameraCommand::SetPedestal { color, value }).await
    }

    async fn set_screen_overlay_display(&self, output: OverlayOutput, on: bool) -> Result<()> {
        self.record(CameraCommand::SetScreenOverlayDisplay { output, on })
            .await
    }

    async fn toggle_screen_overlay_display(&self, output: OverlayOutput) -> Result<()> {
        self.record(CameraCommand::ToggleScreenOverlayDisplay(output))
            .await
    }

    async fn set_menu(&self, on: bool) -> Result<()> {
        self.record(CameraCommand::SetMenu(on)).await
    }

    async fn toggle_menu(&self) -> Result<()> {
        self.record(CameraCommand::ToggleMenu).await
    }

    async fn send_menu_command(&self, command: MenuCommand) -> Result<()> {
        self.record(CameraCommand::SendMenuCommand(command)).await
    }

    async fn change_focus(&self, notch: Notch) -> Result<()> {
        self.record(CameraCommand::ChangeFocus(notch)).await
    }

    async fn change_zoom(&self, notch: Notch) -> Result<()> {
        self.record(CameraCommand::ChangeZoom(notch)).await
    }

    async fn set_focus_speed(&self, speed: i64) -> Result<()> {
        self.record(CameraCommand::SetFocusSpeed(speed)).await
    }

    async fn set_zoom_speed(&self, speed: i64) -> Result<()> {
        self.record(CameraCommand::SetZoomSpeed(speed)).await
    }
}

#[async_trait]
impl DeviceConnection for MockCamera {
    async fn connect(&self) -> Result<()> {
        self.emit(ConnectionEvent::Connecting);
        *self.connected.write().await = true;
        self.emit(ConnectionEvent::Connected);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let was_connected = std::mem::replace(&mut *self.connected.write().await, false);
        if was_connected {
            self.emit(ConnectionEvent::Disconnected);
        }
        Ok(())
    }

    async fn send_raw_control(&self, payload: &str) -> Result<()> {
        self.record(CameraCommand::RawControl(payload.to_string()))
            .await
    }
}

// =============================================================================
// MockConnectionFactory
// =============================================================================

/// Factory that builds `MockCamera`s and keeps a handle to each of them.
#[derive(Default)]
pub struct MockConnectionFactory {
    created: Mutex<Vec<(ConnectionSettings, Arc<MockCamera>)>>,
    refuse: Mutex<bool>,
}

impl MockConnectionFactory {
    /// Factory that accepts every connection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create` fail, as a real factory would on an unresolvable host.
    pub fn refuse_connections(&self, refuse: bool) {
        if let Ok(mut flag) = self.refuse.lock() {
            *flag = refuse;
        }
    }

    /// Number of connections created so far.
    pub fn created_count(&self) -> usize {
        self.created.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// The most recently created camera, i.e. the one the module is using.
    pub fn latest(&self) -> Option<Arc<MockCamera>> {
        self.created
            .lock()
            .ok()
            .and_then(|c| c.last().map(|(_, camera)| camera.clone()))
    }

    /// Settings the latest camera was created with.
    pub fn latest_settings(&self) -> Option<ConnectionSettings> {
        self.created
            .lock()
            .ok()
            .and_then(|c| c.last().map(|(settings, _)| settings.clone()))
    }
}

impl ConnectionFactory for MockConnectionFactory {
    fn create(
        &self,
        settings: &ConnectionSettings,
        events: EventSink,
    ) -> Result<Arc<dyn DeviceConnection>> {
        if self.refuse.lock().map(|r| *r).unwrap_or(false) {
            bail!("MockConnectionFactory: refusing {}:{}", settings.host, settings.port);
        }
        let camera = Arc::new(MockCamera::new(events));
        if let Ok(mut created) = self.created.lock() {
            created.push((settings.clone(), camera.clone()));
        }
        Ok(camera)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::connection::ConnectionId;
    use crate::messages::ModuleCommand;
    use tokio::sync::mpsc;

    fn camera() -> (MockCamera, mpsc::UnboundedReceiver<ModuleCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (MockCamera::new(EventSink::new(ConnectionId(7), tx)), rx)
    }

    fn next_event(rx: &mut mpsc::UnboundedReceiver<ModuleCommand>) -> Option<(ConnectionId, ConnectionEvent)> {
        match rx.try_recv().ok()? {
            ModuleCommand::Connection { id, event } => Some((id, event)),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_mock_camera_lifecycle_events() {
        let (camera, mut rx) = camera();

        camera.connect().await.unwrap();
        assert!(camera.is_connected().await);
        assert_eq!(next_event(&mut rx), Some((ConnectionId(7), ConnectionEvent::Connecting)));
        assert_eq!(next_event(&mut rx), Some((ConnectionId(7), ConnectionEvent::Connected)));

        camera.disconnect().await.unwrap();
        assert_eq!(next_event(&mut rx), Some((ConnectionId(7), ConnectionEvent::Disconnected)));

        // Disconnecting twice is idempotent and silent
        camera.disconnect().await.unwrap();
        assert!(next_event(&mut rx).is_none());
    }

    #[tokio::test]
    async fn test_mock_camera_records_in_order() {
        let (camera, _rx) = camera();

        camera.set_iris(3150).await.unwrap();
        camera.change_gain(GainColor::Blue, -4).await.unwrap();
        camera.send_raw_control("<x/>").await.unwrap();

        assert_eq!(
            camera.commands().await,
            vec![
                CameraCommand::SetIris(3150),
                CameraCommand::ChangeGain { color: GainColor::Blue, delta: -4 },
                CameraCommand::RawControl("<x/>".into()),
            ]
        );
        let state = camera.state().await;
        assert_eq!(state.iris, 3150);
        assert_eq!(state.blue_gain, -4);
    }

    #[tokio::test]
    async fn test_mock_camera_failure_injection() {
        let (camera, _rx) = camera();
        camera.set_failing(true).await;
        assert!(camera.toggle_menu().await.is_err());
        assert!(camera.commands().await.is_empty());
    }

    #[test]
    fn test_simulated_toggles() {
        let mut state = SimulatedState::default();
        state.apply(&CameraCommand::ToggleScreenOverlayDisplay(OverlayOutput::Out2));
        state.apply(&CameraCommand::ToggleMenu);
        assert_eq!(state.overlay, [false, true]);
        assert!(state.menu_open);
        assert_eq!(state.camera_snapshot().get("menu"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_factory_tracks_latest() {
        let factory = MockConnectionFactory::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let settings = ConnectionSettings {
            host: "cam".into(),
            port: 49153,
            username: "u".into(),
            password: "p".into(),
        };

        factory.create(&settings, EventSink::new(ConnectionId(1), tx.clone())).unwrap();
        factory.create(&settings, EventSink::new(ConnectionId(2), tx.clone())).unwrap();
        assert_eq!(factory.created_count(), 2);
        assert_eq!(factory.latest().unwrap().sink().connection_id(), ConnectionId(2));

        factory.refuse_connections(true);
        assert!(factory.create(&settings, EventSink::new(ConnectionId(3), tx)).is_err());
        assert_eq!(factory.created_count(), 2);
    }
}
