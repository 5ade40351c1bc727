// Scripted in-memory bridge for tests
use super::error::{AdbError, AdbResult};
use super::shell::AdbShell;
use super::types::{Bridge, DeviceEntry, DeviceState, DeviceTarget, ShellOutput};
use std::collections::{HashMap, HashSet, VecDeque};
use std::net::SocketAddrV4;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Default)]
struct FakeState {
    devices: Vec<DeviceEntry>,
    state: Option<DeviceState>,
    // Per-command replies; the last reply repeats once the queue drains
    shell: HashMap<String, VecDeque<ShellOutput>>,
    // Commands whose bridge call times out instead of returning output
    shell_timeouts: HashSet<String>,
    connect_results: VecDeque<bool>,
    tcpip_accepted: bool,
    calls: Vec<String>,
    connect_times: Vec<Instant>,
}

pub struct FakeBridge {
    inner: Mutex<FakeState>,
}

impl FakeBridge {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(FakeState {
                tcpip_accepted: true,
                ..FakeState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.inner.lock().unwrap()
    }

    /// Raw `adb devices` text
    pub fn with_devices(self, listing: &str) -> Self {
        self.lock().devices = AdbShell::parse_devices(listing);
        self
    }

    pub fn with_state(self, state: DeviceState) -> Self {
        self.lock().state = Some(state);
        self
    }

    pub fn on_shell(self, command: &str, reply: ShellOutput) -> Self {
        self.lock()
            .shell
            .entry(command.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn on_shell_timeout(self, command: &str) -> Self {
        self.lock().shell_timeouts.insert(command.to_string());
        self
    }

    pub fn with_connect_results(self, results: &[bool]) -> Self {
        self.lock().connect_results.extend(results);
        self
    }

    pub fn with_tcpip_accepted(self, accepted: bool) -> Self {
        self.lock().tcpip_accepted = accepted;
        self
    }

    /// A USB device with Wi-Fi on and associated, wlan0 at `ip`
    pub fn usb_device_on_wifi(serial: &str, ip: &str) -> Self {
        Self::new()
            .with_devices(&format!("List of devices attached\n{serial}\tdevice\n"))
            .on_shell("settings get global wifi_on", ShellOutput::ok("1\n"))
            .on_shell("dumpsys wifi", ShellOutput::ok("Wi-Fi is enabled\nWifiStateMachine ...\n"))
            .on_shell(
                "ip addr show wlan0",
                ShellOutput::ok(format!("    inet {ip}/24 brd 10.0.0.255 scope global wlan0\n")),
            )
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    /// Shell commands issued, without the target prefix
    pub fn shell_commands(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| call.strip_prefix("shell "))
            .filter_map(|rest| rest.split_once(' ').map(|(_, command)| command.to_string()))
            .collect()
    }

    pub fn connect_times(&self) -> Vec<Instant> {
        self.lock().connect_times.clone()
    }
}

impl Bridge for FakeBridge {
    async fn list_devices(&self) -> AdbResult<Vec<DeviceEntry>> {
        let mut state = self.lock();
        state.calls.push("devices".to_string());
        Ok(state.devices.clone())
    }

    async fn get_state(&self, target: &DeviceTarget) -> AdbResult<DeviceState> {
        let mut state = self.lock();
        state.calls.push(format!("get-state {target}"));
        Ok(state.state.unwrap_or(DeviceState::Device))
    }

    async fn run_shell(&self, target: &DeviceTarget, command: &str) -> AdbResult<ShellOutput> {
        let mut state = self.lock();
        state.calls.push(format!("shell {target} {command}"));
        if state.shell_timeouts.contains(command) {
            return Err(AdbError::Timeout {
                command: format!("adb -s {target} shell {command}"),
                duration: Duration::from_secs(10),
            });
        }
        let reply = match state.shell.get_mut(command) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        Ok(reply.unwrap_or_else(|| ShellOutput::ok("")))
    }

    async fn connect(&self, addr: SocketAddrV4) -> AdbResult<bool> {
        let mut state = self.lock();
        state.calls.push(format!("connect {addr}"));
        state.connect_times.push(Instant::now());
        Ok(state.connect_results.pop_front().unwrap_or(false))
    }

    async fn enable_network_mode(&self, serial: &str, port: u16) -> AdbResult<()> {
        let mut state = self.lock();
        state.calls.push(format!("tcpip {serial} {port}"));
        if state.tcpip_accepted {
            Ok(())
        } else {
            Err(AdbError::UnexpectedOutput {
                command: format!("adb -s {serial} tcpip {port}"),
                output: "error: closed".to_string(),
            })
        }
    }

    async fn restart_server(&self) -> AdbResult<()> {
        self.lock().calls.push("restart-server".to_string());
        Ok(())
    }
}
