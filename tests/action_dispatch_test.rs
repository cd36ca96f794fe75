//! End-to-end action dispatch through the camera module against the mock
//! camera.

use p2_bridge::{
    actions::{OptionValues, Rejection},
    app_actor::spawn_module,
    config::BridgeConfig,
    dispatch::{CameraCommand, DispatchOutcome, Skip},
    hardware::{
        capabilities::{
            GainColor, MenuCommand, Notch, OverlayOutput, PedestalColor, TallyColor,
            WhiteBalanceChannel,
        },
        mock::{MockCamera, MockConnectionFactory},
    },
    host::HostLogLevel,
    messages::ModuleHandle,
    testing::RecordingHost,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn opts(value: Value) -> OptionValues {
    value.as_object().cloned().unwrap_or_default()
}

async fn connected_module(
    iris_steps: Option<&str>,
) -> (ModuleHandle, Arc<MockCamera>, Arc<RecordingHost>) {
    let host = Arc::new(RecordingHost::new());
    let factory = Arc::new(MockConnectionFactory::new());
    let (module, _task) = spawn_module(host.clone(), factory.clone());
    let mut config = BridgeConfig {
        host: Some("10.0.0.5".into()),
        port: Some(49153),
        username: Some("guest".into()),
        password: Some("secret".into()),
        ..BridgeConfig::default()
    };
    if let Some(steps) = iris_steps {
        config.iris_steps = Some(steps.to_string());
    }
    module.init(config).await.unwrap();
    let camera = factory.latest().unwrap();
    (module, camera, host)
}

#[tokio::test]
async fn test_direct_actions_issue_one_command_each() {
    let (module, camera, _host) = connected_module(None).await;

    let cases = [
        ("set_tally", json!({"color": "RED", "state": "ON"}), CameraCommand::SetTally { color: TallyColor::Red, on: true }),
        ("change_master_gain", json!({"value": -1}), CameraCommand::ChangeMasterGain(Notch::Down)),
        ("set_iris_step", json!({"value": 4000}), CameraCommand::SetIris(4000)),
        ("set_iris", json!({"value": 3150}), CameraCommand::SetIris(3150)),
        ("set_white_balance_channel", json!({"channel": "Preset"}), CameraCommand::SetWhiteBalanceChannel(WhiteBalanceChannel::Preset)),
        ("set_gain", json!({"color": "B", "value": -12}), CameraCommand::SetGain { color: GainColor::Blue, value: -12 }),
        ("set_pedestal", json!({"color": "G", "value": 7}), CameraCommand::SetPedestal { color: PedestalColor::Green, value: 7 }),
        ("change_pedestal", json!({"color": "R", "value": -3}), CameraCommand::SetPedestal { color: PedestalColor::Red, value: -3 }),
        ("set_screen_overlay_display", json!({"output": 2, "state": "ON"}), CameraCommand::SetScreenOverlayDisplay { output: OverlayOutput::Out2, on: true }),
        ("set_screen_overlay_display", json!({"output": 1, "state": "TOGGLE"}), CameraCommand::ToggleScreenOverlayDisplay(OverlayOutput::Out1)),
        ("set_menu", json!({"state": "OFF"}), CameraCommand::SetMenu(false)),
        ("set_menu", json!({"state": "TOGGLE"}), CameraCommand::ToggleMenu),
        ("send_menu_command", json!({"command": "EXIT"}), CameraCommand::SendMenuCommand(MenuCommand::Exit)),
        ("change_focus", json!({"value": 1}), CameraCommand::ChangeFocus(Notch::Up)),
        ("change_zoom", json!({"value": -1}), CameraCommand::ChangeZoom(Notch::Down)),
        ("set_focus_speed", json!({"value": 30}), CameraCommand::SetFocusSpeed(30)),
        ("set_zoom_speed", json!({"value": -30}), CameraCommand::SetZoomSpeed(-30)),
        ("send_raw_control", json!({"payload": "<Ctrl/>"}), CameraCommand::RawControl("<Ctrl/>".into())),
    ];

    for (action, options, expected) in cases {
        camera.clear_commands().await;
        let outcome = module.invoke_action(action, opts(options)).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Sent(expected.clone()), "{action}");
        assert_eq!(camera.commands().await, vec![expected], "{action}");
    }
}

#[tokio::test]
async fn test_invalid_options_issue_nothing() {
    let (module, camera, host) = connected_module(None).await;

    let cases = [
        ("set_iris", json!({"value": "abc"})),
        ("set_iris", json!({"value": 100001})),
        ("set_gain", json!({"color": "G", "value": 1})),
        ("set_tally", json!({"color": "RED", "state": "TOGGLE"})),
        ("change_zoom", json!({"value": 0})),
        ("change_gain", json!({"color": "R", "useAbsolute": "yes", "value": 1})),
        ("send_raw_control", json!({"payload": ""})),
        ("customXML", json!({"xml": "<x/>"})),
    ];
    for (action, options) in cases {
        let outcome = module.invoke_action(action, opts(options)).await.unwrap();
        assert!(matches!(outcome, DispatchOutcome::Rejected(_)), "{action}: {outcome:?}");
    }

    assert!(camera.commands().await.is_empty());
    assert!(host
        .logs()
        .iter()
        .all(|(level, _)| *level != HostLogLevel::Error));
}

#[tokio::test]
async fn test_unknown_action_is_rejected() {
    let (module, _camera, _host) = connected_module(None).await;
    let outcome = module.invoke_action("reboot", OptionValues::new()).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Rejected(Rejection::UnknownAction("reboot".into())));
}

#[tokio::test]
async fn test_change_gain_reads_cached_state_only_when_absolute() {
    let (module, camera, _host) = connected_module(None).await;
    camera.emit_camera_state(opts(json!({"redGain": 50, "blueGain": -5})));

    module
        .invoke_action("change_gain", opts(json!({"color": "R", "useAbsolute": true, "value": 10})))
        .await
        .unwrap();
    module
        .invoke_action("change_gain", opts(json!({"color": "R", "value": 10})))
        .await
        .unwrap();
    module
        .invoke_action("change_gain", opts(json!({"color": "B", "useAbsolute": true, "value": 2})))
        .await
        .unwrap();

    assert_eq!(
        camera.commands().await,
        vec![
            CameraCommand::SetGain { color: GainColor::Red, value: 60 },
            CameraCommand::ChangeGain { color: GainColor::Red, delta: 10 },
            CameraCommand::SetGain { color: GainColor::Blue, value: -3 },
        ]
    );
}

#[tokio::test]
async fn test_change_iris_stepless_follows_telemetry() {
    let (module, camera, _host) = connected_module(Some("f2:1000;f4:5000")).await;

    // No telemetry yet
    let outcome = module.invoke_action("change_iris", opts(json!({"value": 100}))).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Skipped(Skip::UnknownIris));

    camera.emit_camera_state(opts(json!({"iris": 0})));
    let outcome = module.invoke_action("change_iris", opts(json!({"value": 100}))).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Skipped(Skip::UnknownIris));

    camera.emit_camera_state(opts(json!({"iris": 3000})));
    module.invoke_action("change_iris", opts(json!({"value": 100}))).await.unwrap();
    module.invoke_action("change_iris", opts(json!({"value": -2500}))).await.unwrap();

    assert_eq!(
        camera.commands().await,
        vec![CameraCommand::SetIris(3100), CameraCommand::SetIris(1000)]
    );
}

#[tokio::test]
async fn test_fractional_telemetry_still_drives_relative_actions() {
    let (module, camera, _host) = connected_module(Some("f2:1000;f4:5000")).await;
    camera.emit_camera_state(opts(json!({"iris": 2999.7, "redGain": 49.6})));

    module.invoke_action("change_iris", opts(json!({"value": 100}))).await.unwrap();
    module
        .invoke_action("change_gain", opts(json!({"color": "R", "useAbsolute": true, "value": 10})))
        .await
        .unwrap();

    assert_eq!(
        camera.commands().await,
        vec![
            CameraCommand::SetIris(3100),
            CameraCommand::SetGain { color: GainColor::Red, value: 60 },
        ]
    );
}

#[tokio::test]
async fn test_change_iris_step_walks_the_table() {
    let (module, camera, _host) = connected_module(None).await;
    camera.emit_camera_state(opts(json!({"iris": 4010})));

    let outcome = module
        .invoke_action("change_iris_step", opts(json!({"direction": 1})))
        .await
        .unwrap();
    // 4010 is nearest to f/4 (4000); one step up is f/4.2
    assert_eq!(outcome, DispatchOutcome::Sent(CameraCommand::SetIris(4150)));

    camera.emit_camera_state(opts(json!({"iris": 8174})));
    module
        .invoke_action("change_iris_step", opts(json!({"direction": 1})))
        .await
        .unwrap();
    assert_eq!(camera.commands().await.last(), Some(&CameraCommand::SetIris(8174)));
}

#[tokio::test]
async fn test_change_iris_step_with_empty_table() {
    let (module, camera, _host) = connected_module(Some("")).await;
    camera.emit_camera_state(opts(json!({"iris": 4000})));

    let outcome = module
        .invoke_action("change_iris_step", opts(json!({"direction": -1})))
        .await
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::Skipped(Skip::EmptyIrisTable));
    assert!(camera.commands().await.is_empty());
}

#[tokio::test]
async fn test_device_failure_is_logged_not_propagated() {
    let (module, camera, host) = connected_module(None).await;
    camera.set_failing(true).await;

    let outcome = module.invoke_action("set_iris", opts(json!({"value": 10}))).await.unwrap();
    assert!(matches!(
        outcome,
        DispatchOutcome::Failed { command: CameraCommand::SetIris(10), .. }
    ));
    assert!(host
        .logs()
        .iter()
        .any(|(level, msg)| *level == HostLogLevel::Error && msg.starts_with("set_iris:")));

    // The module keeps serving
    camera.set_failing(false).await;
    let outcome = module.invoke_action("set_iris", opts(json!({"value": 11}))).await.unwrap();
    assert!(outcome.is_sent());
}

#[tokio::test]
async fn test_fire_and_forget_actions_are_ordered() {
    let (module, camera, _host) = connected_module(None).await;

    module.fire_action("set_zoom_speed", opts(json!({"value": 5}))).unwrap();
    module.fire_action("change_zoom", opts(json!({"value": 1}))).unwrap();
    module.fire_action("set_zoom_speed", opts(json!({"value": 0}))).unwrap();
    // Barrier: processed after everything queued above
    module.status().await.unwrap();

    assert_eq!(
        camera.commands().await,
        vec![
            CameraCommand::SetZoomSpeed(5),
            CameraCommand::ChangeZoom(Notch::Up),
            CameraCommand::SetZoomSpeed(0),
        ]
    );
    assert_eq!(camera.state().await.zoom_speed, 0);
}
