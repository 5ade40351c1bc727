// Run context and the single finalizer shared by every exit path
use super::settings::{SettingsGuardian, SettingsSnapshot};
use crate::adb::{Bridge, DeviceTarget};
use crate::error::{MirrorError, MirrorResult};
use log::{debug, info};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// State produced during a run that the finalizer needs afterwards.
#[derive(Debug, Default)]
pub struct RunContext {
    target: OnceLock<DeviceTarget>,
    saved: OnceLock<(DeviceTarget, SettingsSnapshot)>,
    finalized: AtomicBool,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_target(&self, target: DeviceTarget) {
        let _ = self.target.set(target);
    }

    /// First snapshot wins; a second capture never overwrites the original values
    pub fn record_snapshot(&self, target: DeviceTarget, snapshot: SettingsSnapshot) {
        let _ = self.saved.set((target, snapshot));
    }

    pub fn target(&self) -> Option<&DeviceTarget> {
        self.target.get()
    }

    pub fn saved(&self) -> Option<&(DeviceTarget, SettingsSnapshot)> {
        self.saved.get()
    }

    /// Returns true exactly once
    pub fn begin_finalize(&self) -> bool {
        !self.finalized.swap(true, Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed,
    Interrupted,
    Failed(MirrorError),
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed | RunOutcome::Interrupted => 0,
            RunOutcome::Failed(err) => err.exit_code(),
        }
    }
}

impl From<MirrorResult<()>> for RunOutcome {
    fn from(result: MirrorResult<()>) -> Self {
        match result {
            Ok(()) => RunOutcome::Completed,
            Err(err) => RunOutcome::Failed(err),
        }
    }
}

/// Restores device settings (if a snapshot was taken), reports the outcome
/// and returns the process exit code. Returns None when already finalized.
pub async fn finalize<B: Bridge>(
    bridge: Option<&B>,
    ctx: &RunContext,
    outcome: RunOutcome,
) -> Option<i32> {
    if !ctx.begin_finalize() {
        return None;
    }

    if let RunOutcome::Interrupted = outcome {
        info!("🛑 Interrupted, cleaning up...");
    }

    match (bridge, ctx.saved(), ctx.target()) {
        (Some(bridge), Some((target, snapshot)), _) => {
            let report = SettingsGuardian::new(bridge).restore(target, snapshot).await;
            debug!("Restore on {target}: {report:?}");
        }
        (_, None, Some(target)) => {
            info!("No settings were changed on {target}, nothing to restore");
        }
        _ => {}
    }

    if let RunOutcome::Failed(err) = &outcome {
        eprintln!("❌ {err}");
        if let Some(hint) = err.hint() {
            eprintln!("💡 {hint}");
        }
    }

    Some(outcome.exit_code())
}
