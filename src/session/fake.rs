// Scripted mirror process for tests
use super::scrcpy::Mirror;
use crate::adb::DeviceTarget;
use crate::error::MirrorResult;
use std::sync::Mutex;

pub struct FakeMirror {
    // None keeps the "process" running until the future is dropped
    exit_code: Option<i32>,
    launches: Mutex<Vec<String>>,
}

impl FakeMirror {
    pub fn exiting_with(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            launches: Mutex::new(Vec::new()),
        }
    }

    pub fn never_exiting() -> Self {
        Self {
            exit_code: None,
            launches: Mutex::new(Vec::new()),
        }
    }

    /// One entry per launch: `-s <target> <options...>`
    pub fn launches(&self) -> Vec<String> {
        self.launches.lock().unwrap().clone()
    }
}

impl Mirror for FakeMirror {
    async fn launch(&self, target: &DeviceTarget, options: &[&str]) -> MirrorResult<i32> {
        self.launches
            .lock()
            .unwrap()
            .push(format!("-s {target} {}", options.join(" ")));
        match self.exit_code {
            Some(code) => Ok(code),
            None => std::future::pending().await,
        }
    }
}
