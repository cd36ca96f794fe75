//! Action catalog
//!
//! The fixed set of parameterized operations the host can bind to buttons.
//! [`ActionCatalog::build`] produces the registrable definitions; only
//! Set Iris (Step) depends on runtime data (the iris table), which is why
//! the catalog is rebuilt whenever that table changes.

pub mod options;
pub mod request;

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::hardware::capabilities::{
    GainColor, MenuCommand, PedestalColor, TallyColor, WhiteBalanceChannel,
};
use crate::iris::IrisTable;

pub use options::{Bounds, Choice, ChoiceId, OptionKind, OptionSpec, OptionValues, Rejection};
pub use request::ActionRequest;

/// Range of the stepless iris setter.
pub const IRIS_RANGE: Bounds = Bounds::new(0, 100_000);
/// Range of every other numeric option.
pub const VALUE_RANGE: Bounds = Bounds::new(-100_000, 100_000);

macro_rules! action_kinds {
    ($($variant:ident => $id:literal, $name:literal;)+) => {
        /// Every action the bridge registers.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum ActionKind {
            $(#[doc = $name] $variant),+
        }

        impl ActionKind {
            /// Every action, in registration order.
            pub const ALL: &'static [ActionKind] = &[$(ActionKind::$variant),+];

            /// Host-facing action id.
            pub fn id(self) -> &'static str {
                match self {
                    $(ActionKind::$variant => $id),+
                }
            }

            /// Display name shown in the host.
            pub fn name(self) -> &'static str {
                match self {
                    $(ActionKind::$variant => $name),+
                }
            }

            /// Look up an action by its host-facing id.
            pub fn from_id(id: &str) -> Option<Self> {
                match id {
                    $($id => Some(ActionKind::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

action_kinds! {
    SetTally => "set_tally", "Set Tally";
    ChangeMasterGain => "change_master_gain", "Change Master Gain";
    SetIrisStep => "set_iris_step", "Set Iris (Step)";
    ChangeIrisStep => "change_iris_step", "Change Iris (Step)";
    SetIris => "set_iris", "Set Iris (Stepless)";
    ChangeIris => "change_iris", "Change Iris (Stepless)";
    SetWhiteBalanceChannel => "set_white_balance_channel", "Set White Balance Channel";
    SetGain => "set_gain", "Set Gain";
    ChangeGain => "change_gain", "Change Gain";
    SetPedestal => "set_pedestal", "Set Pedestal";
    ChangePedestal => "change_pedestal", "Change Pedestal";
    SetScreenOverlayDisplay => "set_screen_overlay_display", "Set Screen Overlay Display";
    SetMenu => "set_menu", "Set Menu";
    SendMenuCommand => "send_menu_command", "Send Menu Command";
    ChangeFocus => "change_focus", "Change Focus";
    ChangeZoom => "change_zoom", "Change Zoom";
    SetFocusSpeed => "set_focus_speed", "Set Focus Speed";
    SetZoomSpeed => "set_zoom_speed", "Set Zoom Speed";
    SendRawControl => "send_raw_control", "Send Raw Control Payload";
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Registrable description of one action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionDefinition {
    /// Host-facing action id.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Option schema, in display order.
    pub options: Vec<OptionSpec>,
    /// Action this definition describes.
    #[serde(skip)]
    pub kind: ActionKind,
}

/// Immutable set of action definitions for one iris table.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionCatalog {
    definitions: Vec<ActionDefinition>,
}

impl ActionCatalog {
    /// Build definitions for every action, with iris step choices taken from `iris`.
    pub fn build(iris: &IrisTable) -> Self {
        let definitions = ActionKind::ALL
            .iter()
            .map(|&kind| ActionDefinition {
                id: kind.id(),
                name: kind.name(),
                options: option_specs(kind, iris),
                kind,
            })
            .collect();
        Self { definitions }
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> &[ActionDefinition] {
        &self.definitions
    }

    /// Definition of `kind`.
    pub fn get(&self, kind: ActionKind) -> Option<&ActionDefinition> {
        self.definitions.iter().find(|d| d.kind == kind)
    }

    /// Number of registered actions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the catalog has no actions.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

fn wire_choices<T: Copy>(all: &[T], id: impl Fn(T) -> &'static str, label: impl Fn(T) -> &'static str) -> Vec<Choice> {
    all.iter().map(|&v| Choice::new(id(v), label(v))).collect()
}

fn notch_choices(up: &str, down: &str) -> Vec<Choice> {
    vec![Choice::new(1, up), Choice::new(-1, down)]
}

fn state_choices(with_toggle: bool) -> Vec<Choice> {
    let mut choices = vec![Choice::new("ON", "On"), Choice::new("OFF", "Off")];
    if with_toggle {
        choices.push(Choice::new("TOGGLE", "Toggle"));
    }
    choices
}

fn gain_color() -> OptionSpec {
    OptionSpec::dropdown(
        "color",
        "Color",
        wire_choices(GainColor::ALL, GainColor::wire_id, GainColor::label),
        "R",
    )
}

fn pedestal_color() -> OptionSpec {
    OptionSpec::dropdown(
        "color",
        "Color",
        wire_choices(PedestalColor::ALL, PedestalColor::wire_id, PedestalColor::label),
        "R",
    )
}

fn option_specs(kind: ActionKind, iris: &IrisTable) -> Vec<OptionSpec> {
    match kind {
        ActionKind::SetTally => vec![
            OptionSpec::dropdown(
                "color",
                "Color",
                wire_choices(TallyColor::ALL, TallyColor::wire_id, TallyColor::label),
                "RED",
            ),
            OptionSpec::dropdown("state", "State", state_choices(false), "ON"),
        ],
        ActionKind::ChangeMasterGain | ActionKind::ChangeFocus | ActionKind::ChangeZoom => vec![
            OptionSpec::dropdown("value", "Relative Value", notch_choices("+1", "-1"), 1),
        ],
        ActionKind::SetIrisStep => {
            let choices: Vec<Choice> = iris
                .valid_steps()
                .filter_map(|step| step.value.map(|v| Choice::new(v, step.label.as_str())))
                .collect();
            let default = choices
                .first()
                .map(|c| Value::from(c.id.clone()))
                .unwrap_or(Value::Null);
            vec![OptionSpec::dropdown("value", "Value", choices, default)]
        }
        ActionKind::ChangeIrisStep => vec![OptionSpec::dropdown(
            "direction",
            "Direction",
            notch_choices("+", "-"),
            1,
        )],
        ActionKind::SetIris => vec![OptionSpec::number("value", "Value", 1, IRIS_RANGE)],
        ActionKind::ChangeIris => {
            vec![OptionSpec::number("value", "Relative Value", 100, VALUE_RANGE)]
        }
        ActionKind::SetWhiteBalanceChannel => vec![OptionSpec::dropdown(
            "channel",
            "Channel",
            wire_choices(
                WhiteBalanceChannel::ALL,
                WhiteBalanceChannel::wire_id,
                WhiteBalanceChannel::label,
            ),
            "A",
        )],
        ActionKind::SetGain => vec![
            gain_color(),
            OptionSpec::number("value", "Value", 1, VALUE_RANGE),
        ],
        ActionKind::ChangeGain => vec![
            gain_color(),
            OptionSpec::checkbox("useAbsolute", "Send absolute instead of relative values", false),
            OptionSpec::number("value", "Relative Value", 1, VALUE_RANGE),
        ],
        ActionKind::SetPedestal => vec![
            pedestal_color(),
            OptionSpec::number("value", "Value", 1, VALUE_RANGE),
        ],
        ActionKind::ChangePedestal => vec![
            pedestal_color(),
            OptionSpec::number("value", "Relative Value", 1, VALUE_RANGE),
        ],
        ActionKind::SetScreenOverlayDisplay => vec![
            OptionSpec::dropdown(
                "output",
                "Output",
                vec![Choice::new(1, "Out 1"), Choice::new(2, "Out 2")],
                1,
            ),
            OptionSpec::dropdown("state", "State", state_choices(true), "TOGGLE"),
        ],
        ActionKind::SetMenu => vec![OptionSpec::dropdown(
            "state",
            "State",
            state_choices(true),
            "TOGGLE",
        )],
        ActionKind::SendMenuCommand => vec![OptionSpec::dropdown(
            "command",
            "Command",
            wire_choices(MenuCommand::ALL, MenuCommand::wire_id, MenuCommand::label),
            "UP",
        )],
        ActionKind::SetFocusSpeed | ActionKind::SetZoomSpeed => {
            vec![OptionSpec::number("value", "Speed", 1, VALUE_RANGE)]
        }
        ActionKind::SendRawControl => vec![OptionSpec::text("payload", "Payload")],
    }
}
