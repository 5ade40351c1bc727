// Tests for the session runner and the finalizer
// Focus: command order on the device, exit code mapping, restore-once semantics

use super::fake::FakeMirror;
use super::*;
use crate::adb::fake::FakeBridge;
use crate::adb::{DeviceTarget, ShellOutput};
use crate::error::MirrorError;

fn usb() -> DeviceTarget {
    DeviceTarget::Usb("AB11".into())
}

fn bridge_with_settings() -> FakeBridge {
    FakeBridge::new()
        .on_shell("settings get global stay_awake", ShellOutput::ok("0\n"))
        .on_shell("settings get secure lockscreen.disabled", ShellOutput::ok("0\n"))
        .on_shell("settings get system screen_off_timeout", ShellOutput::ok("30000\n"))
}

// ============================================================
// SESSION RUNNER
// ============================================================

#[tokio::test]
async fn prepares_device_then_launches_mirror() {
    let bridge = bridge_with_settings();
    let mirror = FakeMirror::exiting_with(0);
    let ctx = RunContext::new();

    SessionRunner::new(&bridge, &mirror, None)
        .run(&usb(), &ctx)
        .await
        .unwrap();

    assert_eq!(
        bridge.shell_commands(),
        vec![
            "echo ok",
            "settings get global stay_awake",
            "settings get secure lockscreen.disabled",
            "settings get system screen_off_timeout",
            "settings put secure lockscreen.disabled 1",
            "settings put global stay_awake 1",
        ]
    );
    assert_eq!(mirror.launches(), vec!["-s AB11 --turn-screen-off --stay-awake"]);

    let (target, snapshot) = ctx.saved().unwrap();
    assert_eq!(target, &usb());
    assert_eq!(snapshot.stay_awake, "0");
    assert_eq!(snapshot.screen_off_timeout.as_deref(), Some("30000"));
}

#[tokio::test]
async fn unreachable_device_fails_before_any_change() {
    let bridge = FakeBridge::new().on_shell("echo ok", ShellOutput::failed("error: closed"));
    let mirror = FakeMirror::exiting_with(0);
    let ctx = RunContext::new();

    let err = SessionRunner::new(&bridge, &mirror, None)
        .run(&usb(), &ctx)
        .await
        .unwrap_err();

    assert!(matches!(err, MirrorError::DeviceUnreachable { .. }));
    assert_eq!(bridge.shell_commands(), vec!["echo ok"]);
    assert!(ctx.saved().is_none());
    assert!(mirror.launches().is_empty());
}

#[tokio::test]
async fn liveness_timeout_is_reported_as_unreachable() {
    let bridge = FakeBridge::new().on_shell_timeout("echo ok");
    let mirror = FakeMirror::exiting_with(0);
    let ctx = RunContext::new();

    let err = SessionRunner::new(&bridge, &mirror, None)
        .run(&usb(), &ctx)
        .await
        .unwrap_err();

    assert!(matches!(err, MirrorError::DeviceUnreachable { .. }));
    assert!(err.hint().is_some());
    assert!(ctx.saved().is_none());
    assert!(mirror.launches().is_empty());
}

#[tokio::test]
async fn rotation_locks_orientation_before_launch() {
    let bridge = bridge_with_settings();
    let mirror = FakeMirror::exiting_with(0);
    let ctx = RunContext::new();

    SessionRunner::new(&bridge, &mirror, Some(Rotation::LandscapeLeft))
        .run(&usb(), &ctx)
        .await
        .unwrap();

    let commands = bridge.shell_commands();
    assert_eq!(
        &commands[commands.len() - 2..],
        &[
            "settings put system accelerometer_rotation 0",
            "settings put system user_rotation 3",
        ]
    );
    assert_eq!(mirror.launches().len(), 1);
}

#[tokio::test]
async fn rotation_failure_is_not_fatal() {
    let bridge = bridge_with_settings().on_shell(
        "settings put system accelerometer_rotation 0",
        ShellOutput::failed("Permission denial"),
    );
    let mirror = FakeMirror::exiting_with(0);

    SessionRunner::new(&bridge, &mirror, Some(Rotation::LandscapeRight))
        .run(&usb(), &RunContext::new())
        .await
        .unwrap();

    assert!(
        !bridge
            .shell_commands()
            .iter()
            .any(|c| c.starts_with("settings put system user_rotation"))
    );
    assert_eq!(mirror.launches().len(), 1);
}

#[tokio::test]
async fn normal_mirror_exit_codes_are_success() {
    for code in [0, 2, 130] {
        let bridge = bridge_with_settings();
        let mirror = FakeMirror::exiting_with(code);
        let result = SessionRunner::new(&bridge, &mirror, None)
            .run(&usb(), &RunContext::new())
            .await;
        assert!(result.is_ok(), "exit code {code} should be a normal end");
    }
}

#[tokio::test]
async fn abnormal_mirror_exit_code_propagates() {
    let bridge = bridge_with_settings();
    let mirror = FakeMirror::exiting_with(1);
    let ctx = RunContext::new();

    let err = SessionRunner::new(&bridge, &mirror, None)
        .run(&usb(), &ctx)
        .await
        .unwrap_err();

    assert!(matches!(err, MirrorError::MirrorProcess { code: 1 }));
    assert_eq!(err.exit_code(), 1);
    // The snapshot is still there for the finalizer
    assert!(ctx.saved().is_some());
}

// ============================================================
// FINALIZER
// ============================================================

#[tokio::test]
async fn finalize_restores_snapshot_and_reports_exit_code() {
    let bridge = FakeBridge::new();
    let ctx = RunContext::new();
    ctx.record_snapshot(
        usb(),
        SettingsSnapshot {
            stay_awake: "0".into(),
            lockscreen_disabled: "0".into(),
            screen_off_timeout: Some("30000".into()),
        },
    );

    let code = finalize(
        Some(&bridge),
        &ctx,
        RunOutcome::Failed(MirrorError::MirrorProcess { code: 1 }),
    )
    .await;

    assert_eq!(code, Some(1));
    assert_eq!(
        bridge.shell_commands(),
        vec![
            "exit",
            "settings put global stay_awake 0",
            "input keyevent KEYCODE_SLEEP",
            "settings put secure lockscreen.disabled 0",
            "settings put system screen_off_timeout 60000",
            "settings put system screen_off_timeout 30000",
        ]
    );
}

#[tokio::test]
async fn finalize_runs_once() {
    let bridge = FakeBridge::new();
    let ctx = RunContext::new();
    ctx.record_snapshot(
        usb(),
        SettingsSnapshot {
            stay_awake: "0".into(),
            lockscreen_disabled: "0".into(),
            screen_off_timeout: None,
        },
    );

    assert_eq!(finalize(Some(&bridge), &ctx, RunOutcome::Interrupted).await, Some(0));
    let after_first = bridge.calls().len();
    assert_eq!(finalize(Some(&bridge), &ctx, RunOutcome::Completed).await, None);
    assert_eq!(bridge.calls().len(), after_first);
}

#[tokio::test]
async fn finalize_without_snapshot_touches_nothing() {
    let bridge = FakeBridge::new();
    let ctx = RunContext::new();
    ctx.record_target(usb());

    let code = finalize(Some(&bridge), &ctx, RunOutcome::Failed(MirrorError::NoUsbDevice)).await;

    assert_eq!(code, Some(1));
    assert!(bridge.calls().is_empty());
}

#[tokio::test]
async fn finalize_without_bridge_reports_preflight_error() {
    let ctx = RunContext::new();
    let code = finalize::<FakeBridge>(
        None,
        &ctx,
        RunOutcome::Failed(MirrorError::Argument("bad".into())),
    )
    .await;
    assert_eq!(code, Some(1));
}

#[tokio::test]
async fn finalize_skips_writes_when_device_gone() {
    let bridge = FakeBridge::new().on_shell("exit", ShellOutput::failed("error: device offline"));
    let ctx = RunContext::new();
    ctx.record_snapshot(
        usb(),
        SettingsSnapshot {
            stay_awake: "0".into(),
            lockscreen_disabled: "0".into(),
            screen_off_timeout: None,
        },
    );

    assert_eq!(finalize(Some(&bridge), &ctx, RunOutcome::Completed).await, Some(0));
    assert_eq!(bridge.shell_commands(), vec!["exit"]);
}
