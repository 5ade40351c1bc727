// Session module
// Prepares the connected device, runs scrcpy and puts the device back the way it was.

pub mod context;
pub mod runner;
pub mod scrcpy;
pub mod settings;

#[cfg(test)]
pub(crate) mod fake;
#[cfg(test)]
mod tests;

pub use context::{RunContext, RunOutcome, finalize};
pub use runner::{MIRROR_OPTIONS, Rotation, SessionRunner};
pub use scrcpy::{Mirror, ScrcpyProcess};
pub use settings::{RestoreReport, SettingsGuardian, SettingsSnapshot};
