//! Device enumeration on a backend.

use crate::error::{DeviceError, Result};
use bridge_traits::audio::{AudioBackend, DeviceInfo};
use std::sync::Arc;
use tracing::debug;

/// Playback and capture devices a backend exposes.
pub struct Devices {
    backend: Arc<dyn AudioBackend>,
}

impl Devices {
    /// Fails with `InitFailed` on a null backend.
    pub fn new(backend: Arc<dyn AudioBackend>) -> Result<Self> {
        if backend.is_null() {
            return Err(DeviceError::InitFailed(
                "no suitable audio backend found".to_string(),
            ));
        }
        Ok(Self { backend })
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn playbacks(&self) -> Result<Vec<DeviceInfo>> {
        let devices = self.backend.playback_devices()?;
        debug!(count = devices.len(), "Enumerated playback devices on {}", self.backend.name());
        Ok(devices)
    }

    pub fn captures(&self) -> Result<Vec<DeviceInfo>> {
        let devices = self.backend.capture_devices()?;
        debug!(count = devices.len(), "Enumerated capture devices on {}", self.backend.name());
        Ok(devices)
    }

    /// The backend's default output, or the first one listed.
    pub fn default_playback(&self) -> Result<Option<DeviceInfo>> {
        Ok(pick_default(self.playbacks()?))
    }

    /// The backend's default input, or the first one listed.
    pub fn default_capture(&self) -> Result<Option<DeviceInfo>> {
        Ok(pick_default(self.captures()?))
    }
}

fn pick_default(devices: Vec<DeviceInfo>) -> Option<DeviceInfo> {
    let index = devices.iter().position(|d| d.is_default).unwrap_or(0);
    devices.into_iter().nth(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::{NullBackend, VirtualBackend};
    use bridge_traits::audio::DeviceType;

    #[test]
    fn test_virtual_devices() {
        let devices = Devices::new(Arc::new(VirtualBackend::new())).unwrap();
        assert_eq!(devices.backend_name(), "virtual");

        let playbacks = devices.playbacks().unwrap();
        assert_eq!(playbacks.len(), 1);
        assert_eq!(playbacks[0].device_type, DeviceType::Playback);

        let capture = devices.default_capture().unwrap().unwrap();
        assert_eq!(capture.id, "virtual:capture");
        assert_eq!(capture.to_string(), "<DeviceInfo Virtual Input (capture)>");
    }

    #[test]
    fn test_null_backend_is_rejected() {
        assert!(matches!(
            Devices::new(Arc::new(NullBackend::new())),
            Err(DeviceError::InitFailed(_))
        ));
    }

    #[test]
    fn test_pick_default_prefers_flagged_device() {
        let list = vec![
            DeviceInfo::new("a", "A", DeviceType::Playback),
            DeviceInfo::new("b", "B", DeviceType::Playback).with_default(true),
        ];
        assert_eq!(pick_default(list).unwrap().id, "b");

        let list = vec![DeviceInfo::new("a", "A", DeviceType::Playback)];
        assert_eq!(pick_default(list).unwrap().id, "a");
        assert!(pick_default(Vec::new()).is_none());
    }
}
