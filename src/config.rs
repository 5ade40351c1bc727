// Tool directory, optional adb-mirror.toml and the merge of CLI flags over it

use crate::adb::DEFAULT_COMMAND_TIMEOUT;
use crate::app::RunOptions;
use crate::args::Args;
use crate::connection::{ConnectRequest, DEFAULT_PORT, RetryPolicy, Timing};
use crate::error::{MirrorError, MirrorResult};
use crate::session::Rotation;
use log::{debug, info};
use serde::Deserialize;
use std::env::consts::EXE_SUFFIX;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "adb-mirror.toml";
pub const HOME_ENV: &str = "ADB_MIRROR_HOME";

/// Contents of `adb-mirror.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub rotation: Option<u8>,
    pub command_timeout_secs: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub tcpip_settle_ms: Option<u64>,
    /// Relative paths are resolved against the tool directory
    pub adb: Option<PathBuf>,
    pub scrcpy: Option<PathBuf>,
}

impl FileConfig {
    /// Missing file means defaults; an unreadable or malformed file is an error.
    pub fn load(dir: &Path) -> MirrorResult<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| MirrorError::Config {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let config = toml::from_str(&content).map_err(|e| MirrorError::Config {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        info!("📄 Loaded {}", path.display());
        Ok(config)
    }

    /// Bound for each adb call; zero would time out every call
    pub fn command_timeout(&self) -> MirrorResult<Duration> {
        match self.command_timeout_secs {
            Some(0) => Err(MirrorError::Argument(format!(
                "Invalid command_timeout_secs 0 in {CONFIG_FILE_NAME}, expected at least 1"
            ))),
            Some(secs) => Ok(Duration::from_secs(secs)),
            None => Ok(DEFAULT_COMMAND_TIMEOUT),
        }
    }
}

/// `ADB_MIRROR_HOME` when set, otherwise the directory holding the executable
pub fn tool_dir() -> MirrorResult<PathBuf> {
    tool_dir_from(std::env::var_os(HOME_ENV), std::env::current_exe())
}

pub fn tool_dir_from(home: Option<OsString>, exe: io::Result<PathBuf>) -> MirrorResult<PathBuf> {
    if let Some(home) = home.filter(|h| !h.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    let exe = exe.map_err(|e| MirrorError::ToolDirectory {
        reason: e.to_string(),
    })?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| MirrorError::ToolDirectory {
            reason: format!("{} has no parent directory", exe.display()),
        })
}

pub fn enter_tool_dir(dir: &Path) -> MirrorResult<()> {
    std::env::set_current_dir(dir).map_err(|source| MirrorError::WorkingDirectory {
        dir: dir.to_path_buf(),
        source,
    })?;
    debug!("Working directory: {}", dir.display());
    Ok(())
}

/// Locations of the external programs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub dir: PathBuf,
    pub adb: PathBuf,
    pub scrcpy: PathBuf,
}

impl ToolPaths {
    pub fn resolve(dir: &Path, file: &FileConfig) -> Self {
        let locate = |configured: &Option<PathBuf>, name: &str| match configured {
            Some(path) => dir.join(path),
            None => dir.join(format!("{name}{EXE_SUFFIX}")),
        };
        Self {
            dir: dir.to_path_buf(),
            adb: locate(&file.adb, "adb"),
            scrcpy: locate(&file.scrcpy, "scrcpy"),
        }
    }

    /// Both programs must exist before any device is touched
    pub fn check_environment(&self) -> MirrorResult<()> {
        self.ensure_programs(&[&self.adb, &self.scrcpy])
    }

    pub fn check_adb(&self) -> MirrorResult<()> {
        self.ensure_programs(&[&self.adb])
    }

    fn ensure_programs(&self, programs: &[&PathBuf]) -> MirrorResult<()> {
        let missing: Vec<String> = programs
            .iter()
            .filter(|path| !path.is_file())
            .map(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string())
            })
            .collect();
        if !missing.is_empty() {
            return Err(MirrorError::MissingDependency {
                dir: self.dir.clone(),
                names: missing,
            });
        }

        for path in programs {
            ensure_executable(path)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn ensure_executable(path: &Path) -> MirrorResult<()> {
    use std::os::unix::fs::PermissionsExt;

    let to_error = |source| MirrorError::Permissions {
        path: path.to_path_buf(),
        source,
    };
    let mut permissions = std::fs::metadata(path).map_err(to_error)?.permissions();
    let mode = permissions.mode();
    if mode & 0o111 == 0 {
        info!("🔧 Setting execute permission on {}", path.display());
        permissions.set_mode(mode | 0o111);
        std::fs::set_permissions(path, permissions).map_err(to_error)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Path) -> MirrorResult<()> {
    Ok(())
}

impl RunOptions {
    /// CLI flags override the config file, which overrides the defaults.
    pub fn resolve(args: &Args, file: &FileConfig) -> MirrorResult<Self> {
        let port = match (args.port, file.port) {
            (Some(port), _) => port,
            (None, Some(0)) => {
                return Err(MirrorError::Argument(format!(
                    "Invalid port 0 in {CONFIG_FILE_NAME}"
                )));
            }
            (None, Some(port)) => port,
            (None, None) => DEFAULT_PORT,
        };
        let rotation = match args.rotation {
            Some(rotation) => Some(rotation),
            None => file.rotation.map(Rotation::try_from).transpose()?,
        };

        let defaults = Timing::default();
        let timing = Timing {
            retry: RetryPolicy {
                max_attempts: file.retry_attempts.unwrap_or(defaults.retry.max_attempts),
                delay: file
                    .retry_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.retry.delay),
            },
            tcpip_settle: file
                .tcpip_settle_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.tcpip_settle),
            server_restart: defaults.server_restart,
        };

        let command_timeout = file.command_timeout()?;

        Ok(Self {
            request: ConnectRequest {
                ip: args.ip,
                port,
                usb_only: args.usb_only,
            },
            rotation,
            timing,
            command_timeout,
        })
    }
}
