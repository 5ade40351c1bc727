// Settings guardian: snapshot, override and restore device display/power settings
use crate::adb::{Bridge, DeviceTarget, ShellOutput};
use log::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Namespace {
    Global,
    Secure,
    System,
}

impl Namespace {
    fn as_str(&self) -> &'static str {
        match self {
            Namespace::Global => "global",
            Namespace::Secure => "secure",
            Namespace::System => "system",
        }
    }
}

/// One entry of Android's `settings` provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setting {
    namespace: Namespace,
    key: &'static str,
}

impl Setting {
    const fn new(namespace: Namespace, key: &'static str) -> Self {
        Self { namespace, key }
    }

    pub fn get_command(&self) -> String {
        format!("settings get {} {}", self.namespace.as_str(), self.key)
    }

    pub fn put_command(&self, value: &str) -> String {
        format!("settings put {} {} {}", self.namespace.as_str(), self.key, value)
    }
}

pub const STAY_AWAKE: Setting = Setting::new(Namespace::Global, "stay_awake");
pub const LOCKSCREEN_DISABLED: Setting = Setting::new(Namespace::Secure, "lockscreen.disabled");
pub const SCREEN_OFF_TIMEOUT: Setting = Setting::new(Namespace::System, "screen_off_timeout");
pub const ACCELEROMETER_ROTATION: Setting =
    Setting::new(Namespace::System, "accelerometer_rotation");
pub const USER_ROTATION: Setting = Setting::new(Namespace::System, "user_rotation");

const UNREADABLE_DEFAULT: &str = "0";
/// Short value written before the saved timeout; some firmware only re-arms
/// the lock timer when the value changes.
const TIMEOUT_NUDGE_MS: &str = "60000";
/// Tried in order until one succeeds
const LOCK_SCREEN_KEYS: [&str; 2] = [
    "input keyevent KEYCODE_SLEEP",
    "input keyevent KEYCODE_POWER",
];

/// The device's settings before the session changed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsSnapshot {
    pub stay_awake: String,
    pub lockscreen_disabled: String,
    pub screen_off_timeout: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreReport {
    /// Every step ran; `failed` names the steps the device rejected
    Restored { failed: Vec<&'static str> },
    /// The device did not answer the liveness probe, nothing was written
    Unreachable,
}

pub struct SettingsGuardian<'a, B: Bridge> {
    bridge: &'a B,
}

impl<'a, B: Bridge> SettingsGuardian<'a, B> {
    pub fn new(bridge: &'a B) -> Self {
        Self { bridge }
    }

    /// Never fails: unreadable values fall back to defaults so the session can start.
    pub async fn capture(&self, target: &DeviceTarget) -> SettingsSnapshot {
        info!("Saving device settings...");
        let stay_awake = self.read(target, STAY_AWAKE).await;
        let lockscreen_disabled = self.read(target, LOCKSCREEN_DISABLED).await;
        let screen_off_timeout = self.read(target, SCREEN_OFF_TIMEOUT).await;

        let snapshot = SettingsSnapshot {
            stay_awake: stay_awake.unwrap_or_else(|| UNREADABLE_DEFAULT.to_string()),
            lockscreen_disabled: lockscreen_disabled
                .unwrap_or_else(|| UNREADABLE_DEFAULT.to_string()),
            screen_off_timeout,
        };
        debug!("Saved settings: {snapshot:?}");
        snapshot
    }

    /// Keep the device awake and unlocked while it is mirrored
    pub async fn apply_session_overrides(&self, target: &DeviceTarget) {
        for (setting, value) in [(LOCKSCREEN_DISABLED, "1"), (STAY_AWAKE, "1")] {
            if !self.write(target, setting, value).await {
                warn!("Could not set {} for the session", setting.key);
            }
        }
    }

    /// Best effort: each step logs its failure and the rest still run.
    pub async fn restore(
        &self,
        target: &DeviceTarget,
        snapshot: &SettingsSnapshot,
    ) -> RestoreReport {
        info!("Restoring device settings...");
        if !self.is_reachable(target).await {
            warn!("Device {target} is disconnected, could not restore settings");
            return RestoreReport::Unreachable;
        }

        let mut failed = Vec::new();

        if !self.write(target, STAY_AWAKE, &snapshot.stay_awake).await {
            failed.push(STAY_AWAKE.key);
        }

        match self.first_success(target, &LOCK_SCREEN_KEYS).await {
            Some(command) => debug!("Screen locked with '{command}'"),
            None => {
                warn!("Could not lock the screen");
                failed.push("lock screen");
            }
        }

        if !self
            .write(target, LOCKSCREEN_DISABLED, &snapshot.lockscreen_disabled)
            .await
        {
            failed.push(LOCKSCREEN_DISABLED.key);
        }

        if let Some(timeout) = &snapshot.screen_off_timeout {
            let nudged = self.write(target, SCREEN_OFF_TIMEOUT, TIMEOUT_NUDGE_MS).await
                && self.write(target, SCREEN_OFF_TIMEOUT, timeout).await;
            if !nudged {
                failed.push(SCREEN_OFF_TIMEOUT.key);
            }
        }

        if failed.is_empty() {
            info!("✅ Device settings restored");
        } else {
            warn!("Some settings could not be restored: {}", failed.join(", "));
        }
        RestoreReport::Restored { failed }
    }

    pub async fn is_reachable(&self, target: &DeviceTarget) -> bool {
        self.shell(target, "exit").await.success
    }

    async fn read(&self, target: &DeviceTarget, setting: Setting) -> Option<String> {
        let value = self
            .shell(target, &setting.get_command())
            .await
            .value()
            .map(str::to_string);
        if value.is_none() {
            debug!("Could not read {}", setting.key);
        }
        value
    }

    pub(crate) async fn write(&self, target: &DeviceTarget, setting: Setting, value: &str) -> bool {
        let ok = self.shell(target, &setting.put_command(value)).await.success;
        if !ok {
            warn!("Failed to set {} to {value}", setting.key);
        }
        ok
    }

    /// Runs alternatives in order and returns the first that succeeded
    async fn first_success<'c>(
        &self,
        target: &DeviceTarget,
        commands: &[&'c str],
    ) -> Option<&'c str> {
        for &command in commands {
            if self.shell(target, command).await.success {
                return Some(command);
            }
            debug!("'{command}' was rejected");
        }
        None
    }

    // Bridge errors are folded into a failed result; the device may already be gone
    async fn shell(&self, target: &DeviceTarget, command: &str) -> ShellOutput {
        match self.bridge.run_shell(target, command).await {
            Ok(output) => output,
            Err(e) => {
                debug!("'{command}' on {target}: {e}");
                ShellOutput::failed("")
            }
        }
    }
}
