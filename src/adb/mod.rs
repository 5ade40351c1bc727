// ADB module - thin wrapper around the external adb executable
// Every call is one subprocess invocation; retry policy lives in the negotiator.

pub mod discovery;
pub mod error;
pub mod shell;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

// Re-export the main types and functions for easy access
pub use discovery::{DiscoveredDevice, Discovery};
pub use error::{AdbError, AdbResult};
pub use shell::{AdbShell, DEFAULT_COMMAND_TIMEOUT};
pub use types::{Bridge, DeviceEntry, DeviceState, DeviceTarget, ShellOutput, TargetKind};
