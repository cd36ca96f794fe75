//! Typed action requests.
//!
//! [`parse`] turns an action id plus its raw option bag into an
//! [`ActionRequest`]. Nothing past this point sees untyped option values.

use serde::Serialize;

use super::options::{
    optional_flag, require_choice, require_integer, require_numeric_choice, require_text, Bounds,
    OptionValues, Rejection,
};
use super::{ActionKind, IRIS_RANGE, VALUE_RANGE};
use crate::hardware::capabilities::{
    GainColor, MenuCommand, Notch, OverlayOutput, PedestalColor, SwitchState, TallyColor,
    WhiteBalanceChannel,
};

/// One validated invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionRequest {
    /// Switch a tally lamp.
    SetTally { color: TallyColor, on: bool },
    /// Master gain one notch up or down.
    ChangeMasterGain { notch: Notch },
    /// Jump to an iris step's control value.
    SetIrisStep { value: i64 },
    /// Move one iris step from the current one.
    ChangeIrisStep { direction: Notch },
    /// Absolute iris control value.
    SetIris { value: i64 },
    /// Iris relative to the cached value.
    ChangeIris { delta: i64 },
    /// Select a white balance channel.
    SetWhiteBalanceChannel { channel: WhiteBalanceChannel },
    /// Absolute white-balance gain.
    SetGain { color: GainColor, value: i64 },
    /// Relative gain, or cached gain plus `value` when `use_absolute`.
    ChangeGain { color: GainColor, use_absolute: bool, value: i64 },
    /// Absolute pedestal.
    SetPedestal { color: PedestalColor, value: i64 },
    /// Pedestal change; issued as an absolute set.
    ChangePedestal { color: PedestalColor, value: i64 },
    /// Overlay on, off or toggled on one output.
    SetScreenOverlayDisplay { output: OverlayOutput, state: SwitchState },
    /// Camera menu on, off or toggled.
    SetMenu { state: SwitchState },
    /// Menu navigation key.
    SendMenuCommand { command: MenuCommand },
    /// Focus one notch.
    ChangeFocus { notch: Notch },
    /// Zoom one notch.
    ChangeZoom { notch: Notch },
    /// Continuous focus speed.
    SetFocusSpeed { speed: i64 },
    /// Continuous zoom speed.
    SetZoomSpeed { speed: i64 },
    /// Payload sent verbatim.
    SendRawControl { payload: String },
}

impl ActionRequest {
    /// Action this request was parsed from.
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionRequest::SetTally { .. } => ActionKind::SetTally,
            ActionRequest::ChangeMasterGain { .. } => ActionKind::ChangeMasterGain,
            ActionRequest::SetIrisStep { .. } => ActionKind::SetIrisStep,
            ActionRequest::ChangeIrisStep { .. } => ActionKind::ChangeIrisStep,
            ActionRequest::SetIris { .. } => ActionKind::SetIris,
            ActionRequest::ChangeIris { .. } => ActionKind::ChangeIris,
            ActionRequest::SetWhiteBalanceChannel { .. } => ActionKind::SetWhiteBalanceChannel,
            ActionRequest::SetGain { .. } => ActionKind::SetGain,
            ActionRequest::ChangeGain { .. } => ActionKind::ChangeGain,
            ActionRequest::SetPedestal { .. } => ActionKind::SetPedestal,
            ActionRequest::ChangePedestal { .. } => ActionKind::ChangePedestal,
            ActionRequest::SetScreenOverlayDisplay { .. } => ActionKind::SetScreenOverlayDisplay,
            ActionRequest::SetMenu { .. } => ActionKind::SetMenu,
            ActionRequest::SendMenuCommand { .. } => ActionKind::SendMenuCommand,
            ActionRequest::ChangeFocus { .. } => ActionKind::ChangeFocus,
            ActionRequest::ChangeZoom { .. } => ActionKind::ChangeZoom,
            ActionRequest::SetFocusSpeed { .. } => ActionKind::SetFocusSpeed,
            ActionRequest::SetZoomSpeed { .. } => ActionKind::SetZoomSpeed,
            ActionRequest::SendRawControl { .. } => ActionKind::SendRawControl,
        }
    }
}

fn on_off(id: &str) -> Option<bool> {
    match SwitchState::from_wire_id(id)? {
        SwitchState::On => Some(true),
        SwitchState::Off => Some(false),
        SwitchState::Toggle => None,
    }
}

fn notch(options: &OptionValues, option: &'static str) -> Result<Notch, Rejection> {
    require_numeric_choice(options, option, Notch::from_delta)
}

fn value(options: &OptionValues, range: Bounds) -> Result<i64, Rejection> {
    require_integer(options, "value", range)
}

/// Validate a raw invocation by action id.
pub fn parse_by_id(action_id: &str, options: &OptionValues) -> Result<ActionRequest, Rejection> {
    let kind = ActionKind::from_id(action_id)
        .ok_or_else(|| Rejection::UnknownAction(action_id.to_string()))?;
    parse(kind, options)
}

/// Validate the options of `kind`. The first invalid option rejects the
/// whole invocation.
pub fn parse(kind: ActionKind, options: &OptionValues) -> Result<ActionRequest, Rejection> {
    let request = match kind {
        ActionKind::SetTally => ActionRequest::SetTally {
            color: require_choice(options, "color", TallyColor::from_wire_id)?,
            on: require_choice(options, "state", on_off)?,
        },
        ActionKind::ChangeMasterGain => ActionRequest::ChangeMasterGain {
            notch: notch(options, "value")?,
        },
        ActionKind::SetIrisStep => ActionRequest::SetIrisStep {
            // Any integer: the table may have changed since the button was configured.
            value: require_integer(options, "value", Bounds::new(i64::MIN, i64::MAX))?,
        },
        ActionKind::ChangeIrisStep => ActionRequest::ChangeIrisStep {
            direction: notch(options, "direction")?,
        },
        ActionKind::SetIris => ActionRequest::SetIris {
            value: value(options, IRIS_RANGE)?,
        },
        ActionKind::ChangeIris => ActionRequest::ChangeIris {
            delta: value(options, VALUE_RANGE)?,
        },
        ActionKind::SetWhiteBalanceChannel => ActionRequest::SetWhiteBalanceChannel {
            channel: require_choice(options, "channel", WhiteBalanceChannel::from_wire_id)?,
        },
        ActionKind::SetGain => ActionRequest::SetGain {
            color: require_choice(options, "color", GainColor::from_wire_id)?,
            value: value(options, VALUE_RANGE)?,
        },
        ActionKind::ChangeGain => ActionRequest::ChangeGain {
            color: require_choice(options, "color", GainColor::from_wire_id)?,
            use_absolute: optional_flag(options, "useAbsolute")?,
            value: value(options, VALUE_RANGE)?,
        },
        ActionKind::SetPedestal => ActionRequest::SetPedestal {
            color: require_choice(options, "color", PedestalColor::from_wire_id)?,
            value: value(options, VALUE_RANGE)?,
        },
        ActionKind::ChangePedestal => ActionRequest::ChangePedestal {
            color: require_choice(options, "color", PedestalColor::from_wire_id)?,
            value: value(options, VALUE_RANGE)?,
        },
        ActionKind::SetScreenOverlayDisplay => ActionRequest::SetScreenOverlayDisplay {
            output: require_numeric_choice(options, "output", OverlayOutput::from_number)?,
            state: require_choice(options, "state", SwitchState::from_wire_id)?,
        },
        ActionKind::SetMenu => ActionRequest::SetMenu {
            state: require_choice(options, "state", SwitchState::from_wire_id)?,
        },
        ActionKind::SendMenuCommand => ActionRequest::SendMenuCommand {
            command: require_choice(options, "command", MenuCommand::from_wire_id)?,
        },
        ActionKind::ChangeFocus => ActionRequest::ChangeFocus {
            notch: notch(options, "value")?,
        },
        ActionKind::ChangeZoom => ActionRequest::ChangeZoom {
            notch: notch(options, "value")?,
        },
        ActionKind::SetFocusSpeed => ActionRequest::SetFocusSpeed {
            speed: value(options, VALUE_RANGE)?,
        },
        ActionKind::SetZoomSpeed => ActionRequest::SetZoomSpeed {
            speed: value(options, VALUE_RANGE)?,
        },
        ActionKind::SendRawControl => ActionRequest::SendRawControl {
            payload: require_text(options, "payload")?,
        },
    };
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn opts(value: Value) -> OptionValues {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_set_tally() {
        assert_eq!(
            parse(ActionKind::SetTally, &opts(json!({"color": "GREEN", "state": "OFF"}))),
            Ok(ActionRequest::SetTally { color: TallyColor::Green, on: false })
        );
        // TOGGLE is not a tally state
        assert!(parse(ActionKind::SetTally, &opts(json!({"color": "RED", "state": "TOGGLE"}))).is_err());
        assert!(parse(ActionKind::SetTally, &opts(json!({"color": "BLUE", "state": "ON"}))).is_err());
    }

    #[test]
    fn test_notch_options_need_exact_numbers() {
        assert_eq!(
            parse(ActionKind::ChangeZoom, &opts(json!({"value": -1}))),
            Ok(ActionRequest::ChangeZoom { notch: Notch::Down })
        );
        assert!(parse(ActionKind::ChangeZoom, &opts(json!({"value": "-1"}))).is_err());
        assert!(parse(ActionKind::ChangeFocus, &opts(json!({"value": 2}))).is_err());
        assert!(parse(ActionKind::ChangeIrisStep, &opts(json!({"direction": 0}))).is_err());
    }

    #[test]
    fn test_numeric_options_reject_non_numbers() {
        for kind in [ActionKind::SetIris, ActionKind::ChangeIris, ActionKind::SetZoomSpeed] {
            assert!(matches!(
                parse(kind, &opts(json!({"value": "abc"}))),
                Err(Rejection::WrongType { option: "value", .. })
            ));
            assert!(matches!(
                parse(kind, &opts(json!({}))),
                Err(Rejection::Missing { option: "value" })
            ));
        }
    }

    #[test]
    fn test_set_iris_range() {
        assert!(parse(ActionKind::SetIris, &opts(json!({"value": -1}))).is_err());
        assert_eq!(
            parse(ActionKind::SetIris, &opts(json!({"value": 100000}))),
            Ok(ActionRequest::SetIris { value: 100_000 })
        );
        assert_eq!(
            parse(ActionKind::ChangeIris, &opts(json!({"value": -100000}))),
            Ok(ActionRequest::ChangeIris { delta: -100_000 })
        );
    }

    #[test]
    fn test_change_gain_flag() {
        assert_eq!(
            parse(ActionKind::ChangeGain, &opts(json!({"color": "R", "value": 10}))),
            Ok(ActionRequest::ChangeGain { color: GainColor::Red, use_absolute: false, value: 10 })
        );
        assert_eq!(
            parse(
                ActionKind::ChangeGain,
                &opts(json!({"color": "B", "useAbsolute": true, "value": 3.0}))
            ),
            Ok(ActionRequest::ChangeGain { color: GainColor::Blue, use_absolute: true, value: 3 })
        );
        assert!(parse(
            ActionKind::ChangeGain,
            &opts(json!({"color": "R", "useAbsolute": 1, "value": 3}))
        )
        .is_err());
        // Gain has no green channel
        assert!(parse(ActionKind::SetGain, &opts(json!({"color": "G", "value": 3}))).is_err());
    }

    #[test]
    fn test_pedestal_accepts_green() {
        assert_eq!(
            parse(ActionKind::ChangePedestal, &opts(json!({"color": "G", "value": -5}))),
            Ok(ActionRequest::ChangePedestal { color: PedestalColor::Green, value: -5 })
        );
    }

    #[test]
    fn test_overlay_and_menu_states() {
        assert_eq!(
            parse(
                ActionKind::SetScreenOverlayDisplay,
                &opts(json!({"output": 2, "state": "TOGGLE"}))
            ),
            Ok(ActionRequest::SetScreenOverlayDisplay {
                output: OverlayOutput::Out2,
                state: SwitchState::Toggle
            })
        );
        assert!(parse(
            ActionKind::SetScreenOverlayDisplay,
            &opts(json!({"output": "1", "state": "ON"}))
        )
        .is_err());
        assert!(parse(ActionKind::SetMenu, &opts(json!({"state": "MAYBE"}))).is_err());
    }

    #[test]
    fn test_raw_control_payload() {
        assert_eq!(
            parse_by_id("send_raw_control", &opts(json!({"payload": "<x/>"}))),
            Ok(ActionRequest::SendRawControl { payload: "<x/>".into() })
        );
        assert!(parse_by_id("send_raw_control", &opts(json!({"payload": ""}))).is_err());
        assert!(parse_by_id("send_raw_control", &opts(json!({}))).is_err());
    }

    #[test]
    fn test_unknown_action_id() {
        assert_eq!(
            parse_by_id("reboot", &OptionValues::new()),
            Err(Rejection::UnknownAction("reboot".into()))
        );
    }

    #[test]
    fn test_catalog_defaults_are_valid_requests() {
        use crate::actions::ActionCatalog;
        use crate::iris::IrisTable;

        let catalog = ActionCatalog::build(&IrisTable::parse(crate::config::DEFAULT_IRIS_STEPS));
        for def in catalog.definitions() {
            if def.kind == ActionKind::SendRawControl {
                continue;
            }
            let defaults: OptionValues = def
                .options
                .iter()
                .map(|o| (o.id.to_string(), o.default.clone()))
                .collect();
            let request = parse(def.kind, &defaults);
            assert!(request.is_ok(), "{}: {:?}", def.id, request);
            assert_eq!(request.unwrap().kind(), def.kind);
        }
    }
}
