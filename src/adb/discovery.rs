// Device discovery: classify what `adb devices` reports
use super::types::{Bridge, DeviceState, DeviceTarget, TargetKind};
use crate::error::{MirrorError, MirrorResult};
use log::debug;

/// A listed device after its identifier has been classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub target: DeviceTarget,
    pub state: DeviceState,
}

/// Enumerates devices through a bridge, preserving the bridge's listing order.
/// "First" always means first in that order.
pub struct Discovery<'a, B: Bridge> {
    bridge: &'a B,
}

impl<'a, B: Bridge> Discovery<'a, B> {
    pub fn new(bridge: &'a B) -> Self {
        Self { bridge }
    }

    /// Every listed device, whatever its state
    pub async fn devices(&self) -> MirrorResult<Vec<DiscoveredDevice>> {
        let entries = self.bridge.list_devices().await?;
        let devices = entries
            .into_iter()
            .filter_map(|entry| {
                DeviceTarget::from_identifier(&entry.identifier).map(|target| DiscoveredDevice {
                    target,
                    state: entry.state,
                })
            })
            .collect::<Vec<_>>();
        debug!("Discovered {} device(s): {:?}", devices.len(), devices);
        Ok(devices)
    }

    /// Online devices only
    pub async fn enumerate(&self) -> MirrorResult<Vec<DeviceTarget>> {
        Ok(self
            .devices()
            .await?
            .into_iter()
            .filter(|device| device.state.is_online())
            .map(|device| device.target)
            .collect())
    }

    pub async fn find_first_wireless(&self) -> MirrorResult<Option<DeviceTarget>> {
        Ok(self
            .enumerate()
            .await?
            .into_iter()
            .find(|target| target.kind() == TargetKind::Network))
    }

    /// First online USB device. When none is online but a USB device is listed
    /// in another state, that state is reported so the user gets the right remedy.
    pub async fn find_first_usb(&self) -> MirrorResult<Option<DeviceTarget>> {
        let usb = self
            .devices()
            .await?
            .into_iter()
            .filter(|device| device.target.kind() == TargetKind::Usb)
            .collect::<Vec<_>>();

        if let Some(online) = usb.iter().find(|device| device.state.is_online()) {
            return Ok(Some(online.target.clone()));
        }
        match usb.into_iter().next() {
            Some(device) => Err(state_error(&device.target, device.state)),
            None => Ok(None),
        }
    }
}

/// Maps a non-online state to the error the user can act on
pub fn state_error(target: &DeviceTarget, state: DeviceState) -> MirrorError {
    let serial = target.to_string();
    match state {
        DeviceState::Unauthorized => MirrorError::DeviceUnauthorized { serial },
        DeviceState::Offline => MirrorError::DeviceOffline { serial },
        DeviceState::Device | DeviceState::Unknown => MirrorError::DeviceUnknownState {
            serial,
            state: state.to_string(),
        },
    }
}
