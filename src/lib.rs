pub mod adb;
pub mod app;
pub mod args;
pub mod config;
pub mod connection;
pub mod error;
pub mod session;
pub mod text_input;

pub use adb::{AdbShell, Bridge, DeviceTarget};
pub use app::{RunOptions, run, run_until, shutdown_signal};
pub use error::{MirrorError, MirrorResult};

/// `log` setup shared by both binaries: Info, or Debug with `-d`; `RUST_LOG` wins
pub fn init_logging(debug: bool) {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
