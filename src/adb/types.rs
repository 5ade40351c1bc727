// Core bridge types and the trait every adb implementation provides
use super::error::AdbResult;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

/// Connection state as reported by `adb devices` / `adb get-state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    Device,
    Unauthorized,
    Offline,
    Unknown,
}

impl DeviceState {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "device" => DeviceState::Device,
            "unauthorized" => DeviceState::Unauthorized,
            "offline" => DeviceState::Offline,
            _ => DeviceState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceState::Device => "device",
            DeviceState::Unauthorized => "unauthorized",
            DeviceState::Offline => "offline",
            DeviceState::Unknown => "unknown",
        }
    }

    pub fn is_online(&self) -> bool {
        *self == DeviceState::Device
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw line of `adb devices`, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    pub identifier: String,
    pub state: DeviceState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Usb,
    Network,
}

/// Addresses one device for bridge operations.
///
/// USB devices are addressed by the serial adb assigned them, network devices
/// by `ip:port`. Identifiers are parsed once here and never re-parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceTarget {
    Usb(String),
    Network(SocketAddrV4),
}

impl DeviceTarget {
    pub fn network(ip: Ipv4Addr, port: u16) -> Self {
        DeviceTarget::Network(SocketAddrV4::new(ip, port))
    }

    /// Classifies a bridge identifier: `a.b.c.d:port` is a network target,
    /// anything else non-empty is a USB serial.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return None;
        }
        match identifier.parse::<SocketAddrV4>() {
            Ok(addr) => Some(DeviceTarget::Network(addr)),
            Err(_) => Some(DeviceTarget::Usb(identifier.to_string())),
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            DeviceTarget::Usb(_) => TargetKind::Usb,
            DeviceTarget::Network(_) => TargetKind::Network,
        }
    }

    pub fn ip(&self) -> Option<Ipv4Addr> {
        match self {
            DeviceTarget::Network(addr) => Some(*addr.ip()),
            DeviceTarget::Usb(_) => None,
        }
    }
}

impl fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceTarget::Usb(serial) => f.write_str(serial),
            DeviceTarget::Network(addr) => write!(f, "{addr}"),
        }
    }
}

/// Result of `adb shell`: callers inspect `success` instead of getting an error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShellOutput {
    pub stdout: String,
    pub success: bool,
}

impl ShellOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            success: true,
        }
    }

    pub fn failed(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            success: false,
        }
    }

    /// Trimmed stdout when the command succeeded and printed something useful
    pub fn value(&self) -> Option<&str> {
        let value = self.stdout.trim();
        if !self.success || value.is_empty() || value == "null" {
            None
        } else {
            Some(value)
        }
    }
}

// Trait defining bridge capabilities (real adb process or a scripted fake in tests)
#[allow(async_fn_in_trait)]
pub trait Bridge: Send + Sync {
    async fn list_devices(&self) -> AdbResult<Vec<DeviceEntry>>;

    async fn get_state(&self, target: &DeviceTarget) -> AdbResult<DeviceState>;

    async fn run_shell(&self, target: &DeviceTarget, command: &str) -> AdbResult<ShellOutput>;

    async fn connect(&self, addr: SocketAddrV4) -> AdbResult<bool>;

    /// `adb tcpip`: only the "restarting"/"already running" replies count as success
    async fn enable_network_mode(&self, serial: &str, port: u16) -> AdbResult<()>;

    async fn restart_server(&self) -> AdbResult<()>;
}
