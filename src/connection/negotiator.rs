// Connection negotiator: decides how to reach the device and gets it there
use super::types::{ConnectRequest, ConnectionOutcome, ConnectionState, Timing};
use crate::adb::discovery::state_error;
use crate::adb::{AdbShell, Bridge, DeviceTarget, Discovery};
use crate::error::{MirrorError, MirrorResult};
use log::{debug, info, warn};
use std::net::{Ipv4Addr, SocketAddrV4};
use tokio::time::sleep;

/// Probes tried in order to read the device's Wi-Fi address
const DEVICE_IP_PROBES: [&str; 2] = ["ip addr show wlan0", "ifconfig wlan0"];
const WIFI_ENABLED_MARKER: &str = "Wi-Fi is enabled";

/// State machine choosing between reusing a wireless link, dialing a requested
/// address, or bootstrapping a USB device into wireless mode.
///
/// Rules are evaluated in a fixed priority: an already-online network device wins
/// (unless the user asked for a different IP), then a requested IP, then USB.
/// Only the network dial retries; every USB bootstrap step is fatal on failure
/// because it depends on device-side state a retry cannot change.
pub struct Negotiator<'a, B: Bridge> {
    bridge: &'a B,
    timing: Timing,
    state: ConnectionState,
    history: Vec<ConnectionState>,
}

impl<'a, B: Bridge> Negotiator<'a, B> {
    pub fn new(bridge: &'a B, timing: Timing) -> Self {
        Self {
            bridge,
            timing,
            state: ConnectionState::Start,
            history: vec![ConnectionState::Start],
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Every state visited so far, in order
    pub fn history(&self) -> &[ConnectionState] {
        &self.history
    }

    fn change_state(&mut self, new_state: ConnectionState) {
        if self.state != new_state {
            debug!("🔌 Connection state: {:?} -> {:?}", self.state, new_state);
            self.state = new_state;
            self.history.push(new_state);
        }
    }

    pub async fn negotiate(&mut self, request: &ConnectRequest) -> MirrorResult<ConnectionOutcome> {
        let result = self.run(request).await;
        match &result {
            Ok(outcome) => {
                self.change_state(ConnectionState::Connected);
                info!("✅ Using device {}", outcome.target);
            }
            Err(_) => self.change_state(ConnectionState::Failed),
        }
        result
    }

    async fn run(&mut self, request: &ConnectRequest) -> MirrorResult<ConnectionOutcome> {
        if request.usb_only {
            self.change_state(ConnectionState::UsbOnly);
            info!("📱 USB-only mode, skipping wireless setup");
            let serial = self.probe_usb().await?;
            return Ok(ConnectionOutcome {
                target: DeviceTarget::Usb(serial),
                mode_transition_performed: false,
                path: ConnectionState::UsbOnly,
            });
        }

        self.change_state(ConnectionState::CheckExistingWireless);
        let existing = Discovery::new(self.bridge).find_first_wireless().await?;

        match (existing, request.ip) {
            (Some(found), requested) if requested.is_none() || requested == found.ip() => {
                self.change_state(ConnectionState::Reuse);
                info!("📶 Found connected wireless device {found}");
                Ok(ConnectionOutcome {
                    target: found,
                    mode_transition_performed: false,
                    path: ConnectionState::Reuse,
                })
            }
            (found, Some(ip)) => {
                if let Some(found) = found {
                    info!("Ignoring wireless device {found}, {ip} was requested");
                }
                let target = self.dial(SocketAddrV4::new(ip, request.port)).await?;
                Ok(ConnectionOutcome {
                    target,
                    mode_transition_performed: false,
                    path: ConnectionState::DialRequested,
                })
            }
            (_, None) => self.bootstrap_usb(request.port).await,
        }
    }

    async fn bootstrap_usb(&mut self, port: u16) -> MirrorResult<ConnectionOutcome> {
        self.change_state(ConnectionState::BootstrapUsb);
        let serial = self.probe_usb().await?;
        let usb = DeviceTarget::Usb(serial.clone());

        self.check_wifi(&usb).await?;
        let ip = self.probe_device_ip(&usb).await?;
        info!("✅ Device IP: {ip}");

        info!("Enabling TCP/IP mode on port {port}...");
        self.bridge
            .enable_network_mode(&serial, port)
            .await
            .map_err(|e| MirrorError::TcpipModeFailed {
                serial: serial.clone(),
                output: e.to_string(),
            })?;
        info!("✅ TCP/IP mode enabled");
        sleep(self.timing.tcpip_settle).await;

        let target = self.dial(SocketAddrV4::new(ip, port)).await?;
        Ok(ConnectionOutcome {
            target,
            mode_transition_performed: true,
            path: ConnectionState::BootstrapUsb,
        })
    }

    /// Finds the USB device and confirms it is fully online
    async fn probe_usb(&mut self) -> MirrorResult<String> {
        debug!("Restarting adb server before USB detection");
        match self.bridge.restart_server().await {
            Ok(()) => sleep(self.timing.server_restart).await,
            Err(e) => warn!("Could not restart adb server: {e}"),
        }

        let target = Discovery::new(self.bridge)
            .find_first_usb()
            .await?
            .ok_or(MirrorError::NoUsbDevice)?;

        let state = self.bridge.get_state(&target).await?;
        if !state.is_online() {
            return Err(state_error(&target, state));
        }
        info!("📱 USB device: {target}");

        match target {
            DeviceTarget::Usb(serial) => Ok(serial),
            DeviceTarget::Network(_) => Err(MirrorError::NoUsbDevice),
        }
    }

    async fn check_wifi(&self, usb: &DeviceTarget) -> MirrorResult<()> {
        let wifi_on = self
            .bridge
            .run_shell(usb, "settings get global wifi_on")
            .await?;
        if !wifi_on.success {
            return Err(MirrorError::WifiNotReady {
                reason: "could not read the Wi-Fi setting".to_string(),
            });
        }
        if wifi_on.stdout.trim() != "1" {
            return Err(MirrorError::WifiNotReady {
                reason: "Wi-Fi is turned off on the device".to_string(),
            });
        }

        let dump = self.bridge.run_shell(usb, "dumpsys wifi").await?;
        if !dump.success || !dump.stdout.contains(WIFI_ENABLED_MARKER) {
            return Err(MirrorError::WifiNotReady {
                reason: "the device is not connected to a Wi-Fi network".to_string(),
            });
        }
        Ok(())
    }

    async fn probe_device_ip(&self, usb: &DeviceTarget) -> MirrorResult<Ipv4Addr> {
        for command in DEVICE_IP_PROBES {
            match self.bridge.run_shell(usb, command).await {
                Ok(output) if output.success => {
                    if let Some(ip) = AdbShell::parse_inet_address(&output.stdout) {
                        return Ok(ip);
                    }
                    debug!("'{command}' printed no IPv4 address");
                }
                Ok(_) => debug!("'{command}' failed on the device"),
                Err(e) => warn!("'{command}' could not run: {e}"),
            }
        }
        Err(MirrorError::NoDeviceIp {
            serial: usb.to_string(),
        })
    }

    /// Connect + liveness check, retried with a fixed delay
    async fn dial(&mut self, addr: SocketAddrV4) -> MirrorResult<DeviceTarget> {
        self.change_state(ConnectionState::DialRequested);
        let target = DeviceTarget::Network(addr);
        let max_attempts = self.timing.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            info!("🔌 Connecting to {addr} (attempt {attempt}/{max_attempts})");
            if self.try_dial(addr, &target).await {
                info!("✅ Wireless connection established");
                return Ok(target);
            }
            self.log_device_list().await;

            if attempt < max_attempts {
                warn!(
                    "Attempt {attempt}/{max_attempts} failed, retrying in {:?}",
                    self.timing.retry.delay
                );
                sleep(self.timing.retry.delay).await;
            }
        }

        Err(MirrorError::NetworkDialExhausted {
            addr,
            attempts: max_attempts,
        })
    }

    async fn try_dial(&self, addr: SocketAddrV4, target: &DeviceTarget) -> bool {
        match self.bridge.connect(addr).await {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                warn!("adb connect {addr}: {e}");
                return false;
            }
        }
        match self.bridge.run_shell(target, "exit").await {
            Ok(output) => output.success,
            Err(e) => {
                warn!("Liveness check on {target}: {e}");
                false
            }
        }
    }

    async fn log_device_list(&self) {
        match self.bridge.list_devices().await {
            Ok(entries) => {
                for entry in entries {
                    debug!("  {}\t{}", entry.identifier, entry.state);
                }
            }
            Err(e) => debug!("Could not list devices: {e}"),
        }
    }
}
