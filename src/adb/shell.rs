use super::error::{AdbError, AdbResult};
use super::types::{Bridge, DeviceEntry, DeviceState, DeviceTarget, ShellOutput};
use log::debug;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// Default wall-clock bound for a single adb invocation.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Bridge implementation that drives the external `adb` executable.
pub struct AdbShell {
    program: PathBuf,
    timeout: Duration,
}

impl AdbShell {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn describe(args: &[&str]) -> String {
        format!("adb {}", args.join(" "))
    }

    async fn exec(&self, args: &[&str]) -> AdbResult<Output> {
        let command = Self::describe(args);
        debug!("$ {command}");

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, output).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(source)) => Err(AdbError::Launch {
                program: self.program.clone(),
                source,
            }),
            Err(_) => Err(AdbError::Timeout {
                command,
                duration: self.timeout,
            }),
        }
    }

    fn combined_output(output: &Output) -> String {
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }
        text
    }

    /// Parses `adb devices` output, keeping every state so callers can
    /// tell "unauthorized" apart from "no device".
    pub fn parse_devices(output: &str) -> Vec<DeviceEntry> {
        output
            .lines()
            .map(str::trim)
            .filter(|line| {
                !line.is_empty()
                    && !line.starts_with("List of devices")
                    && !line.starts_with("adb server")
                    && !line.starts_with('*')
            })
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                let identifier = parts.next()?;
                let state = parts.next()?;
                Some(DeviceEntry {
                    identifier: identifier.to_string(),
                    state: DeviceState::parse(state),
                })
            })
            .collect()
    }

    /// `adb tcpip` prints "restarting in TCP mode port: 5555" or
    /// "already running as tcpip"; anything else (even with exit code 0) is a failure.
    pub fn is_tcpip_accepted(output: &str) -> bool {
        let lower = output.to_lowercase();
        lower.contains("restarting in tcp") || lower.contains("already running as tcp")
    }

    /// `adb connect` exits 0 even when the handshake failed
    pub fn is_connect_refused(output: &str) -> bool {
        let lower = output.to_lowercase();
        lower.contains("failed to connect")
            || lower.contains("cannot connect")
            || lower.contains("connection refused")
            || lower.contains("unable to connect")
    }

    /// Extracts the first IPv4 address following an `inet` token, as printed by
    /// `ip addr show` ("inet 10.0.0.7/24 ...") or toybox `ifconfig` ("inet addr:10.0.0.7").
    pub fn parse_inet_address(output: &str) -> Option<Ipv4Addr> {
        output.lines().find_map(|line| {
            let mut tokens = line.split_whitespace();
            while let Some(token) = tokens.next() {
                if token != "inet" {
                    continue;
                }
                let candidate = tokens.next()?;
                let candidate = candidate.strip_prefix("addr:").unwrap_or(candidate);
                let candidate = candidate.split('/').next().unwrap_or(candidate);
                if let Ok(ip) = candidate.parse::<Ipv4Addr>() {
                    return Some(ip);
                }
            }
            None
        })
    }
}

impl Bridge for AdbShell {
    async fn list_devices(&self) -> AdbResult<Vec<DeviceEntry>> {
        let args = ["devices"];
        let output = self.exec(&args).await?;
        if !output.status.success() {
            return Err(AdbError::CommandFailed {
                command: Self::describe(&args),
                output: Self::combined_output(&output),
            });
        }
        Ok(Self::parse_devices(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn get_state(&self, target: &DeviceTarget) -> AdbResult<DeviceState> {
        let id = target.to_string();
        let output = self.exec(&["-s", id.as_str(), "get-state"]).await?;
        if output.status.success() {
            return Ok(DeviceState::parse(&String::from_utf8_lossy(&output.stdout)));
        }
        // On failure adb reports the state in its error text
        let text = Self::combined_output(&output).to_lowercase();
        let state = if text.contains("unauthorized") {
            DeviceState::Unauthorized
        } else if text.contains("offline") {
            DeviceState::Offline
        } else {
            DeviceState::Unknown
        };
        Ok(state)
    }

    async fn run_shell(&self, target: &DeviceTarget, command: &str) -> AdbResult<ShellOutput> {
        let id = target.to_string();
        let output = self.exec(&["-s", id.as_str(), "shell", command]).await?;
        Ok(ShellOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            success: output.status.success(),
        })
    }

    async fn connect(&self, addr: SocketAddrV4) -> AdbResult<bool> {
        let addr = addr.to_string();
        let output = self.exec(&["connect", addr.as_str()]).await?;
        let text = Self::combined_output(&output);
        debug!("adb connect: {}", text.trim());
        Ok(output.status.success() && !Self::is_connect_refused(&text))
    }

    async fn enable_network_mode(&self, serial: &str, port: u16) -> AdbResult<()> {
        let port = port.to_string();
        let args = ["-s", serial, "tcpip", port.as_str()];
        let output = self.exec(&args).await?;
        let text = Self::combined_output(&output);
        if Self::is_tcpip_accepted(&text) {
            Ok(())
        } else {
            Err(AdbError::UnexpectedOutput {
                command: Self::describe(&args),
                output: text.trim().to_string(),
            })
        }
    }

    async fn restart_server(&self) -> AdbResult<()> {
        // kill-server exits non-zero when no server was running
        self.exec(&["kill-server"]).await?;
        let args = ["start-server"];
        let output = self.exec(&args).await?;
        if !output.status.success() {
            return Err(AdbError::CommandFailed {
                command: Self::describe(&args),
                output: Self::combined_output(&output),
            });
        }
        Ok(())
    }
}


#[cfg(all(test, unix))]
mod subprocess_tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::tempdir;
    use tokio::time::Instant;

    /// Writes an executable `adb` stand-in running `body` under /bin/sh
    fn script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("adb");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn usb() -> DeviceTarget {
        DeviceTarget::Usb("AB11".into())
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let dir = tempdir().unwrap();
        let adb = AdbShell::new(script(dir.path(), "exec sleep 5"), Duration::from_millis(200));

        let started = Instant::now();
        let err = adb.list_devices().await.unwrap_err();

        assert!(matches!(err, AdbError::Timeout { .. }), "{err:?}");
        assert!(err.to_string().contains("adb devices"));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn missing_program_is_a_launch_error() {
        let dir = tempdir().unwrap();
        let adb = AdbShell::new(dir.path().join("adb"), DEFAULT_COMMAND_TIMEOUT);
        assert!(matches!(adb.list_devices().await, Err(AdbError::Launch { .. })));
    }

    #[tokio::test]
    async fn devices_are_parsed_from_stdout() {
        let dir = tempdir().unwrap();
        let adb = AdbShell::new(
            script(
                dir.path(),
                r#"printf 'List of devices attached\nAB11\tdevice\n192.168.1.50:5555\toffline\n'"#,
            ),
            DEFAULT_COMMAND_TIMEOUT,
        );

        let devices = adb.list_devices().await.unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[1].state, DeviceState::Offline);
    }

    #[tokio::test]
    async fn tcpip_warning_with_zero_exit_is_rejected() {
        let dir = tempdir().unwrap();
        let adb = AdbShell::new(
            script(dir.path(), "echo 'error: closed'; exit 0"),
            DEFAULT_COMMAND_TIMEOUT,
        );

        match adb.enable_network_mode("AB11", 5555).await {
            Err(AdbError::UnexpectedOutput { command, output }) => {
                assert_eq!(command, "adb -s AB11 tcpip 5555");
                assert_eq!(output, "error: closed");
            }
            other => panic!("expected UnexpectedOutput, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn tcpip_restart_message_is_accepted() {
        let dir = tempdir().unwrap();
        let adb = AdbShell::new(
            script(dir.path(), r#"echo "restarting in TCP mode port: $4""#),
            DEFAULT_COMMAND_TIMEOUT,
        );
        adb.enable_network_mode("AB11", 5555).await.unwrap();
    }

    #[tokio::test]
    async fn unauthorized_state_is_read_from_stderr() {
        let dir = tempdir().unwrap();
        let adb = AdbShell::new(
            script(dir.path(), "echo 'error: device unauthorized.' >&2; exit 1"),
            DEFAULT_COMMAND_TIMEOUT,
        );
        assert_eq!(
            adb.get_state(&usb()).await.unwrap(),
            DeviceState::Unauthorized
        );
    }

    #[tokio::test]
    async fn refused_connect_with_zero_exit_is_not_connected() {
        let dir = tempdir().unwrap();
        let adb = AdbShell::new(
            script(dir.path(), r#"echo "failed to connect to '$2': Connection refused""#),
            DEFAULT_COMMAND_TIMEOUT,
        );
        let addr = SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 7), 5555);
        assert!(!adb.connect(addr).await.unwrap());
    }

    #[tokio::test]
    async fn shell_reports_exit_status() {
        let dir = tempdir().unwrap();
        let adb = AdbShell::new(
            script(dir.path(), r#"[ "$4" = "exit" ] && exit 0; echo "$4"; exit 1"#),
            DEFAULT_COMMAND_TIMEOUT,
        );

        assert!(adb.run_shell(&usb(), "exit").await.unwrap().success);
        let failed = adb.run_shell(&usb(), "settings get global stay_awake").await.unwrap();
        assert!(!failed.success);
        assert_eq!(failed.stdout.trim(), "settings get global stay_awake");
    }
}
