// Mirroring process launcher
use crate::adb::DeviceTarget;
use crate::error::{MirrorError, MirrorResult};
use log::debug;
use std::path::PathBuf;
use std::process::ExitStatus;
use tokio::process::Command;

/// Launches the mirroring tool against a device and waits for it to exit.
#[allow(async_fn_in_trait)]
pub trait Mirror: Send + Sync {
    /// Returns the process exit code; death by signal N is reported as 128 + N
    async fn launch(&self, target: &DeviceTarget, options: &[&str]) -> MirrorResult<i32>;
}

pub struct ScrcpyProcess {
    program: PathBuf,
}

impl ScrcpyProcess {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn exit_code(status: ExitStatus) -> i32 {
        if let Some(code) = status.code() {
            return code;
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return 128 + signal;
            }
        }
        1
    }
}

impl Mirror for ScrcpyProcess {
    async fn launch(&self, target: &DeviceTarget, options: &[&str]) -> MirrorResult<i32> {
        let serial = target.to_string();
        debug!("$ scrcpy -s {serial} {}", options.join(" "));

        // Inherits stdio so scrcpy's own output reaches the terminal
        let status = Command::new(&self.program)
            .arg("-s")
            .arg(&serial)
            .args(options)
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| MirrorError::MirrorLaunch {
                program: self.program.clone(),
                source,
            })?;

        Ok(Self::exit_code(status))
    }
}
