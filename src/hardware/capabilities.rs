//! Device capability traits for the P2 camera connection.
//!
//! The protocol session itself lives outside this crate. Everything the
//! bridge needs from it is expressed here as capability traits:
//!
//! - [`CameraControl`]: the camera-control command surface (tally, gain,
//!   iris, menu, lens). Each method issues one command and returns once the
//!   command has been handed to the session, not when the camera acknowledges.
//! - [`DeviceConnection`]: lifecycle plus the low-level raw control escape hatch.
//! - [`ConnectionFactory`]: builds a connection for validated settings and
//!   wires its events to an [`EventSink`](super::connection::EventSink).
//!
//! The small enums below are the closed value sets the camera accepts. Their
//! `wire_id` strings are what the session puts on the wire and what the host
//! sees as dropdown choice ids.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::config::ConnectionSettings;

use super::connection::EventSink;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $wire:literal / $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum $name {
            $(#[doc = $label] $variant),+
        }

        impl $name {
            /// Every value, in dropdown order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Identifier used on the wire and as the host choice id.
            pub fn wire_id(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            /// Human label shown in the host dropdown.
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            /// Exact, case-sensitive match on the wire id.
            pub fn from_wire_id(id: &str) -> Option<Self> {
                match id {
                    $($wire => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.wire_id())
            }
        }
    };
}

wire_enum! {
    /// Tally lamp colour.
    pub enum TallyColor { Red => "RED" / "Red", Green => "GREEN" / "Green" }
}

wire_enum! {
    /// Colour channel of the white-balance gain controls.
    pub enum GainColor { Red => "R" / "Red", Blue => "B" / "Blue" }
}

wire_enum! {
    /// Colour channel of the pedestal (black level) controls.
    pub enum PedestalColor { Red => "R" / "Red", Green => "G" / "Green", Blue => "B" / "Blue" }
}

wire_enum! {
    /// White balance memory channel.
    pub enum WhiteBalanceChannel { A => "A" / "A", B => "B" / "B", Preset => "Preset" / "Preset" }
}

wire_enum! {
    /// Camera menu navigation key.
    pub enum MenuCommand {
        Up => "UP" / "Up",
        Down => "DOWN" / "Down",
        Left => "LEFT" / "Left",
        Right => "RIGHT" / "Right",
        Set => "SET" / "Set",
        Exit => "EXIT" / "Exit",
    }
}

/// Target state of a switchable display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SwitchState {
    /// Switch on.
    On,
    /// Switch off.
    Off,
    /// Invert the current state on the camera.
    Toggle,
}

impl SwitchState {
    /// Parse a dropdown state id (`ON`, `OFF`, `TOGGLE`).
    pub fn from_wire_id(id: &str) -> Option<Self> {
        match id {
            "ON" => Some(SwitchState::On),
            "OFF" => Some(SwitchState::Off),
            "TOGGLE" => Some(SwitchState::Toggle),
            _ => None,
        }
    }
}

/// SDI output carrying the on-screen overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OverlayOutput {
    /// OUT 1
    Out1,
    /// OUT 2
    Out2,
}

impl OverlayOutput {
    /// Output number as shown in the host (1 or 2).
    pub fn number(self) -> u8 {
        match self {
            OverlayOutput::Out1 => 1,
            OverlayOutput::Out2 => 2,
        }
    }

    /// Output from its host number.
    pub fn from_number(n: i64) -> Option<Self> {
        match n {
            1 => Some(OverlayOutput::Out1),
            2 => Some(OverlayOutput::Out2),
            _ => None,
        }
    }
}

/// Single-notch relative change, as sent by the lens and master gain commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Notch {
    /// +1
    Up,
    /// -1
    Down,
}

impl Notch {
    /// Signed change: +1 or -1.
    pub fn delta(self) -> i64 {
        match self {
            Notch::Up => 1,
            Notch::Down => -1,
        }
    }

    /// Notch from a signed delta; only +1 and -1 are valid.
    pub fn from_delta(delta: i64) -> Option<Self> {
        match delta {
            1 => Some(Notch::Up),
            -1 => Some(Notch::Down),
            _ => None,
        }
    }
}

/// Camera-control command surface.
#[async_trait]
pub trait CameraControl: Send + Sync {
    async fn set_tally(&self, color: TallyColor, on: bool) -> Result<()>;
    async fn change_master_gain(&self, notch: Notch) -> Result<()>;
    async fn set_iris(&self, value: i64) -> Result<()>;
    async fn set_white_balance_channel(&self, channel: WhiteBalanceChannel) -> Result<()>;
    async fn set_gain(&self, color: GainColor, value: i64) -> Result<()>;
    async fn change_gain(&self, color: GainColor, delta: i64) -> Result<()>;
    async fn set_pedestal(&self, color: PedestalColor, value: i64) -> Result<()>;
    async fn set_screen_overlay_display(&self, output: OverlayOutput, on: bool) -> Result<()>;
    /// The session owns toggle semantics; the bridge never reads overlay state.
    async fn toggle_screen_overlay_display(&self, output: OverlayOutput) -> Result<()>;
    async fn set_menu(&self, on: bool) -> Result<()>;
    async fn toggle_menu(&self) -> Result<()>;
    async fn send_menu_command(&self, command: MenuCommand) -> Result<()>;
    async fn change_focus(&self, notch: Notch) -> Result<()>;
    async fn change_zoom(&self, notch: Notch) -> Result<()>;
    async fn set_focus_speed(&self, speed: i64) -> Result<()>;
    async fn set_zoom_speed(&self, speed: i64) -> Result<()>;
}

/// A live (or connecting) session with one camera.
///
/// `connect` starts the session and returns; progress is reported through the
/// event sink the connection was created with.
#[async_trait]
pub trait DeviceConnection: CameraControl {
    async fn connect(&self) -> Result<()>;
    async fn disconnect(&self) -> Result<()>;
    /// Send a pre-built control payload verbatim.
    async fn send_raw_control(&self, payload: &str) -> Result<()>;
}

/// Builds device connections. One factory serves every reconnect of a module.
pub trait ConnectionFactory: Send + Sync {
    fn create(
        &self,
        settings: &ConnectionSettings,
        events: EventSink,
    ) -> Result<Arc<dyn DeviceConnection>>;
}
