// Session runner: prepare the device and run the mirroring process
use super::context::RunContext;
use super::scrcpy::Mirror;
use super::settings::{ACCELEROMETER_ROTATION, SettingsGuardian, USER_ROTATION};
use crate::adb::{Bridge, DeviceTarget};
use crate::error::{MirrorError, MirrorResult};
use log::{debug, info, warn};
use std::fmt;
use std::str::FromStr;

/// Fixed scrcpy options: screen off on the device while mirroring, stay awake
pub const MIRROR_OPTIONS: [&str; 2] = ["--turn-screen-off", "--stay-awake"];

/// scrcpy exit codes treated as a normal end of session:
/// clean exit, interrupted by Ctrl-C (128 + SIGINT), device disconnected
const NORMAL_EXIT_CODES: [i32; 3] = [0, 130, 2];

const ROTATION_CHOICES: &str = "expected 0 (portrait), 1 (landscape right) or 3 (landscape left)";

/// Display rotation as written to `user_rotation`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Portrait,
    LandscapeRight,
    LandscapeLeft,
}

impl Rotation {
    pub fn value(&self) -> u8 {
        match self {
            Rotation::Portrait => 0,
            Rotation::LandscapeRight => 1,
            Rotation::LandscapeLeft => 3,
        }
    }
}

impl TryFrom<u8> for Rotation {
    type Error = MirrorError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Rotation::Portrait),
            1 => Ok(Rotation::LandscapeRight),
            3 => Ok(Rotation::LandscapeLeft),
            other => Err(MirrorError::Argument(format!(
                "Invalid rotation '{other}', {ROTATION_CHOICES}"
            ))),
        }
    }
}

impl FromStr for Rotation {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().parse::<u8>().map_err(|_| {
            MirrorError::Argument(format!("Invalid rotation '{s}', {ROTATION_CHOICES}"))
        })?;
        Rotation::try_from(value)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

pub fn is_normal_exit(code: i32) -> bool {
    NORMAL_EXIT_CODES.contains(&code)
}

pub struct SessionRunner<'a, B: Bridge, M: Mirror> {
    bridge: &'a B,
    mirror: &'a M,
    rotation: Option<Rotation>,
}

impl<'a, B: Bridge, M: Mirror> SessionRunner<'a, B, M> {
    pub fn new(bridge: &'a B, mirror: &'a M, rotation: Option<Rotation>) -> Self {
        Self {
            bridge,
            mirror,
            rotation,
        }
    }

    /// Runs one mirroring session and blocks until scrcpy exits.
    /// The settings snapshot is recorded in `ctx` before anything is changed,
    /// so the finalizer can restore it on any exit path.
    pub async fn run(&self, target: &DeviceTarget, ctx: &RunContext) -> MirrorResult<()> {
        if !self.is_reachable(target).await {
            return Err(MirrorError::DeviceUnreachable {
                target: target.to_string(),
            });
        }

        let guardian = SettingsGuardian::new(self.bridge);
        let snapshot = guardian.capture(target).await;
        ctx.record_snapshot(target.clone(), snapshot);
        guardian.apply_session_overrides(target).await;

        if let Some(rotation) = self.rotation
            && !self.apply_rotation(&guardian, target, rotation).await
        {
            warn!("Could not set screen rotation, using the device default");
        }

        info!("🚀 Starting scrcpy on {target}...");
        let code = self.mirror.launch(target, &MIRROR_OPTIONS).await?;
        if is_normal_exit(code) {
            info!("Mirroring ended");
            Ok(())
        } else {
            Err(MirrorError::MirrorProcess { code })
        }
    }

    async fn is_reachable(&self, target: &DeviceTarget) -> bool {
        match self.bridge.run_shell(target, "echo ok").await {
            Ok(probe) => probe.success,
            Err(e) => {
                debug!("Liveness check on {target}: {e}");
                false
            }
        }
    }

    async fn apply_rotation(
        &self,
        guardian: &SettingsGuardian<'_, B>,
        target: &DeviceTarget,
        rotation: Rotation,
    ) -> bool {
        info!("Setting screen rotation: {rotation}");
        guardian.write(target, ACCELEROMETER_ROTATION, "0").await
            && guardian
                .write(target, USER_ROTATION, &rotation.to_string())
                .await
    }
}
