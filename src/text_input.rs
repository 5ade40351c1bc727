// Send text to the attached device through the ADB Keyboard IME broadcast
use crate::adb::{AdbError, Bridge, DeviceTarget, Discovery};
use crate::error::{MirrorError, MirrorResult};
use log::{debug, info};

const INPUT_TEXT_ACTION: &str = "ADB_INPUT_TEXT";

/// Single-quotes `text` for the device shell
pub fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

pub fn broadcast_command(text: &str) -> String {
    format!(
        "am broadcast -a {INPUT_TEXT_ACTION} --es msg {}",
        shell_quote(text)
    )
}

/// Sends `text` to the only online device and returns that device.
pub async fn send_text<B: Bridge>(bridge: &B, text: &str) -> MirrorResult<DeviceTarget> {
    let mut online = Discovery::new(bridge).enumerate().await?;
    let target = match online.len() {
        0 => return Err(MirrorError::NoDevice),
        1 => online.remove(0),
        count => return Err(MirrorError::MultipleDevices { count }),
    };

    info!("⌨️ Sending text to {target}...");
    let command = broadcast_command(text);
    let output = bridge.run_shell(&target, &command).await?;
    debug!("Broadcast result: {}", output.stdout.trim());
    if !output.success {
        return Err(AdbError::CommandFailed {
            command,
            output: output.stdout,
        }
        .into());
    }

    info!("✅ Text sent");
    Ok(target)
}
