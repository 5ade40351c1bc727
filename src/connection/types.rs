// Types for the connection negotiator
use crate::adb::DeviceTarget;
use std::net::Ipv4Addr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 5555;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Start,
    CheckExistingWireless,
    Reuse,
    DialRequested,
    BootstrapUsb,
    UsbOnly,
    Connected,
    Failed,
}

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub ip: Option<Ipv4Addr>,
    pub port: u16,
    pub usb_only: bool,
}

impl Default for ConnectRequest {
    fn default() -> Self {
        Self {
            ip: None,
            port: DEFAULT_PORT,
            usb_only: false,
        }
    }
}

/// Produced once per run by the negotiator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOutcome {
    pub target: DeviceTarget,
    /// True when a USB device was switched to wireless mode during this run
    pub mode_transition_performed: bool,
    /// The branch that produced the target (Reuse, DialRequested, BootstrapUsb or UsbOnly)
    pub path: ConnectionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Fixed delays used by the negotiator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub retry: RetryPolicy,
    /// Wait after `adb tcpip` for the device to restart its listener
    pub tcpip_settle: Duration,
    /// Wait after restarting the adb server for USB devices to re-enumerate
    pub server_restart: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            tcpip_settle: Duration::from_secs(2),
            server_restart: Duration::from_secs(1),
        }
    }
}
