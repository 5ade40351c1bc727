use crate::adb::AdbError;
use std::net::SocketAddrV4;
use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for a mirroring run.
pub type MirrorResult<T> = Result<T, MirrorError>;

/// Every way a run can fail. All of them end in the finalizer, which
/// restores device settings when it can and maps the error to an exit code.
#[derive(Debug, Error)]
pub enum MirrorError {
    // Environment (pre-flight, before any device contact)
    #[error("Missing required program(s) in {}: {}", dir.display(), names.join(", "))]
    MissingDependency { dir: PathBuf, names: Vec<String> },

    #[error("Cannot enter tool directory {}: {source}", dir.display())]
    WorkingDirectory {
        dir: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot determine the tool directory: {reason}")]
    ToolDirectory { reason: String },

    #[error("Cannot make {} executable: {source}", path.display())]
    Permissions {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    // Arguments
    #[error("{0}")]
    Argument(String),

    // Device state
    #[error("Device '{serial}' is unauthorized")]
    DeviceUnauthorized { serial: String },

    #[error("Device '{serial}' is offline")]
    DeviceOffline { serial: String },

    #[error("Device '{serial}' is in an unexpected state ({state})")]
    DeviceUnknownState { serial: String, state: String },

    #[error("Device {target} is not responding")]
    DeviceUnreachable { target: String },

    // USB bootstrap
    #[error("No USB device detected")]
    NoUsbDevice,

    #[error("Wi-Fi is not ready: {reason}")]
    WifiNotReady { reason: String },

    #[error("Could not read the Wi-Fi IP address of device '{serial}'")]
    NoDeviceIp { serial: String },

    #[error("Could not switch device '{serial}' to TCP/IP mode: {output}")]
    TcpipModeFailed { serial: String, output: String },

    // Network dial
    #[error(
        "Could not establish a wireless connection to {addr} after {attempts} attempts\n\
         The wireless link may have been lost because:\n \
         1. the device rebooted\n \
         2. USB debugging was disabled\n \
         3. the Wi-Fi network changed\n \
         4. developer options were reset"
    )]
    NetworkDialExhausted { addr: SocketAddrV4, attempts: u32 },

    // Mirroring
    #[error("scrcpy exited abnormally (exit code {code})")]
    MirrorProcess { code: i32 },

    #[error("Failed to launch scrcpy at {}: {source}", program.display())]
    MirrorLaunch {
        program: PathBuf,
        source: std::io::Error,
    },

    // adb-send-text
    #[error("No connected device found")]
    NoDevice,

    #[error("{count} devices are connected; keep exactly one attached")]
    MultipleDevices { count: usize },

    #[error(transparent)]
    Bridge(#[from] AdbError),
}

impl MirrorError {
    /// Process exit code for this failure; scrcpy's own code is passed through.
    pub fn exit_code(&self) -> i32 {
        match self {
            MirrorError::MirrorProcess { code } => *code,
            _ => 1,
        }
    }

    /// What the user can do about it
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            MirrorError::MissingDependency { .. } => {
                Some("Place the adb and scrcpy executables in the same directory as this tool.")
            }
            MirrorError::Argument(_) => Some("Run with --help for usage."),
            MirrorError::DeviceUnauthorized { .. } => {
                Some("Unlock the device and accept the 'Allow USB debugging?' prompt.")
            }
            MirrorError::DeviceOffline { .. } | MirrorError::DeviceUnknownState { .. } => {
                Some("Reconnect the USB cable and try again.")
            }
            MirrorError::DeviceUnreachable { .. } => {
                Some("Check that the device is still connected and try again.")
            }
            MirrorError::NoUsbDevice => Some(
                "Make sure that:\n \
                 1. the device is connected over USB\n \
                 2. USB debugging is enabled in developer options\n \
                 3. this computer is authorized for USB debugging",
            ),
            MirrorError::WifiNotReady { .. } => {
                Some("Turn on Wi-Fi on the device and join the same network as this computer.")
            }
            MirrorError::NoDeviceIp { .. } => Some("Check the device's Wi-Fi connection."),
            MirrorError::TcpipModeFailed { .. } => {
                Some("Reconnect the device over USB and run again.")
            }
            MirrorError::NetworkDialExhausted { .. } => {
                Some("Reconnect the device over USB and run this tool again.")
            }
            MirrorError::MultipleDevices { .. } => Some("Disconnect the other devices."),
            _ => None,
        }
    }
}
