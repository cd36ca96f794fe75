//! Command dispatch
//!
//! Maps a validated [`ActionRequest`] to at most one [`CameraCommand`] and
//! issues it on the current connection. Planning is pure: it reads the iris
//! table and the cached camera state and never touches the device, so every
//! arithmetic rule can be tested without a connection.

use anyhow::Result;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::actions::{ActionRequest, Rejection};
use crate::hardware::capabilities::{
    DeviceConnection, GainColor, MenuCommand, Notch, OverlayOutput, PedestalColor, SwitchState,
    TallyColor, WhiteBalanceChannel,
};
use crate::iris::IrisTable;
use crate::state::DeviceStateCache;

/// One device call, exactly as it will be issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CameraCommand {
    /// `set_tally`
    SetTally { color: TallyColor, on: bool },
    /// `change_master_gain`
    ChangeMasterGain(Notch),
    /// `set_iris`
    SetIris(i64),
    /// `set_white_balance_channel`
    SetWhiteBalanceChannel(WhiteBalanceChannel),
    /// `set_gain`
    SetGain { color: GainColor, value: i64 },
    /// `change_gain`
    ChangeGain { color: GainColor, delta: i64 },
    /// `set_pedestal`
    SetPedestal { color: PedestalColor, value: i64 },
    /// `set_screen_overlay_display`
    SetScreenOverlayDisplay { output: OverlayOutput, on: bool },
    /// `toggle_screen_overlay_display`
    ToggleScreenOverlayDisplay(OverlayOutput),
    /// `set_menu`
    SetMenu(bool),
    /// `toggle_menu`
    ToggleMenu,
    /// `send_menu_command`
    SendMenuCommand(MenuCommand),
    /// `change_focus`
    ChangeFocus(Notch),
    /// `change_zoom`
    ChangeZoom(Notch),
    /// `set_focus_speed`
    SetFocusSpeed(i64),
    /// `set_zoom_speed`
    SetZoomSpeed(i64),
    /// `send_raw_control`
    RawControl(String),
}

impl CameraCommand {
    /// Issue this command on `device`.
    pub async fn send(&self, device: &dyn DeviceConnection) -> Result<()> {
        match self {
            CameraCommand::SetTally { color, on } => device.set_tally(*color, *on).await,
            CameraCommand::ChangeMasterGain(notch) => device.change_master_gain(*notch).await,
            CameraCommand::SetIris(value) => device.set_iris(*value).await,
            CameraCommand::SetWhiteBalanceChannel(channel) => {
                device.set_white_balance_channel(*channel).await
            }
            CameraCommand::SetGain { color, value } => device.set_gain(*color, *value).await,
            CameraCommand::ChangeGain { color, delta } => device.change_gain(*color, *delta).await,
            CameraCommand::SetPedestal { color, value } => {
                device.set_pedestal(*color, *value).await
            }
            CameraCommand::SetScreenOverlayDisplay { output, on } => {
                device.set_screen_overlay_display(*output, *on).await
            }
            CameraCommand::ToggleScreenOverlayDisplay(output) => {
                device.toggle_screen_overlay_display(*output).await
            }
            CameraCommand::SetMenu(on) => device.set_menu(*on).await,
            CameraCommand::ToggleMenu => device.toggle_menu().await,
            CameraCommand::SendMenuCommand(command) => device.send_menu_command(*command).await,
            CameraCommand::ChangeFocus(notch) => device.change_focus(*notch).await,
            CameraCommand::ChangeZoom(notch) => device.change_zoom(*notch).await,
            CameraCommand::SetFocusSpeed(speed) => device.set_focus_speed(*speed).await,
            CameraCommand::SetZoomSpeed(speed) => device.set_zoom_speed(*speed).await,
            CameraCommand::RawControl(payload) => device.send_raw_control(payload).await,
        }
    }
}

/// Valid request that produces no command in the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Skip {
    #[error("iris step table is empty")]
    EmptyIrisTable,
    #[error("iris step '{label}' has no control value")]
    MalformedIrisStep { label: String },
    #[error("camera has not reported a usable iris value")]
    UnknownIris,
    #[error("first iris step has no control value")]
    NoIrisFloor,
}

/// What happened to one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Options failed validation.
    Rejected(Rejection),
    /// Valid, but the current state produces no command.
    Skipped(Skip),
    /// Valid command, but there is no live connection to send it on.
    NotConnected(CameraCommand),
    /// Command accepted by the connection.
    Sent(CameraCommand),
    /// Connection reported an error for the command.
    Failed { command: CameraCommand, error: String },
}

impl DispatchOutcome {
    /// Command that was planned, whether or not it reached the camera.
    pub fn command(&self) -> Option<&CameraCommand> {
        match self {
            DispatchOutcome::NotConnected(command)
            | DispatchOutcome::Sent(command)
            | DispatchOutcome::Failed { command, .. } => Some(command),
            DispatchOutcome::Rejected(_) | DispatchOutcome::Skipped(_) => None,
        }
    }

    /// Whether the command was accepted by the connection.
    pub fn is_sent(&self) -> bool {
        matches!(self, DispatchOutcome::Sent(_))
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchOutcome::Rejected(reason) => write!(f, "rejected: {reason}"),
            DispatchOutcome::Skipped(reason) => write!(f, "skipped: {reason}"),
            DispatchOutcome::NotConnected(command) => write!(f, "not connected: {command:?}"),
            DispatchOutcome::Sent(command) => write!(f, "sent: {command:?}"),
            DispatchOutcome::Failed { command, error } => {
                write!(f, "failed: {command:?}: {error}")
            }
        }
    }
}

/// Cached iris, treating 0 like a missing value.
fn known_iris(cache: &DeviceStateCache) -> Option<i64> {
    cache.iris().filter(|&value| value != 0)
}

fn switch(state: SwitchState, set: impl FnOnce(bool) -> CameraCommand, toggle: CameraCommand) -> CameraCommand {
    match state {
        SwitchState::On => set(true),
        SwitchState::Off => set(false),
        SwitchState::Toggle => toggle,
    }
}

/// Decide which command, if any, `request` produces.
pub fn plan(
    request: &ActionRequest,
    iris: &IrisTable,
    cache: &DeviceStateCache,
) -> Result<CameraCommand, Skip> {
    let command = match request {
        ActionRequest::SetTally { color, on } => CameraCommand::SetTally { color: *color, on: *on },
        ActionRequest::ChangeMasterGain { notch } => CameraCommand::ChangeMasterGain(*notch),
        ActionRequest::SetIrisStep { value } => CameraCommand::SetIris(*value),
        ActionRequest::ChangeIrisStep { direction } => {
            if iris.is_empty() {
                return Err(Skip::EmptyIrisTable);
            }
            let current_iris = known_iris(cache);
            let current = iris.nearest(current_iris);
            let next = iris
                .step(current, direction.delta())
                .ok_or(Skip::EmptyIrisTable)?;
            debug!(
                current_iris = ?current_iris,
                from = ?current.map(|s| s.label.as_str()),
                to = %next.label,
                "Stepping iris"
            );
            let value = next.value.ok_or_else(|| Skip::MalformedIrisStep {
                label: next.label.clone(),
            })?;
            CameraCommand::SetIris(value)
        }
        ActionRequest::SetIris { value } => CameraCommand::SetIris(*value),
        ActionRequest::ChangeIris { delta } => {
            let current = known_iris(cache).ok_or(Skip::UnknownIris)?;
            let floor = iris.first_value().ok_or(Skip::NoIrisFloor)?;
            CameraCommand::SetIris(current.saturating_add(*delta).max(0).max(floor))
        }
        ActionRequest::SetWhiteBalanceChannel { channel } => {
            CameraCommand::SetWhiteBalanceChannel(*channel)
        }
        ActionRequest::SetGain { color, value } => CameraCommand::SetGain {
            color: *color,
            value: *value,
        },
        ActionRequest::ChangeGain {
            color,
            use_absolute: true,
            value,
        } => CameraCommand::SetGain {
            color: *color,
            value: cache.gain(*color).unwrap_or(0).saturating_add(*value),
        },
        ActionRequest::ChangeGain {
            color,
            use_absolute: false,
            value,
        } => CameraCommand::ChangeGain {
            color: *color,
            delta: *value,
        },
        // The device surface has no relative pedestal setter.
        ActionRequest::SetPedestal { color, value } | ActionRequest::ChangePedestal { color, value } => {
            CameraCommand::SetPedestal {
                color: *color,
                value: *value,
            }
        }
        ActionRequest::SetScreenOverlayDisplay { output, state } => switch(
            *state,
            |on| CameraCommand::SetScreenOverlayDisplay { output: *output, on },
            CameraCommand::ToggleScreenOverlayDisplay(*output),
        ),
        ActionRequest::SetMenu { state } => {
            switch(*state, CameraCommand::SetMenu, CameraCommand::ToggleMenu)
        }
        ActionRequest::SendMenuCommand { command } => CameraCommand::SendMenuCommand(*command),
        ActionRequest::ChangeFocus { notch } => CameraCommand::ChangeFocus(*notch),
        ActionRequest::ChangeZoom { notch } => CameraCommand::ChangeZoom(*notch),
        ActionRequest::SetFocusSpeed { speed } => CameraCommand::SetFocusSpeed(*speed),
        ActionRequest::SetZoomSpeed { speed } => CameraCommand::SetZoomSpeed(*speed),
        ActionRequest::SendRawControl { payload } => CameraCommand::RawControl(payload.clone()),
    };
    Ok(command)
}

/// Plan `request` and, when a connection is present, issue the command.
///
/// Device errors are folded into [`DispatchOutcome::Failed`]; nothing is
/// propagated to the invoker.
pub async fn dispatch(
    request: &ActionRequest,
    iris: &IrisTable,
    cache: &DeviceStateCache,
    device: Option<&dyn DeviceConnection>,
) -> DispatchOutcome {
    let command = match plan(request, iris, cache) {
        Ok(command) => command,
        Err(skip) => {
            debug!(action = %request.kind(), reason = %skip, "Action skipped");
            return DispatchOutcome::Skipped(skip);
        }
    };
    let Some(device) = device else {
        debug!(action = %request.kind(), "No connection, dropping command");
        return DispatchOutcome::NotConnected(command);
    };
    match command.send(device).await {
        Ok(()) => DispatchOutcome::Sent(command),
        Err(err) => DispatchOutcome::Failed {
            command,
            error: format!("{err:#}"),
        },
    }
}
