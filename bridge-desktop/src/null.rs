//! Null Audio Backend
//!
//! Stand-in used when no native audio subsystem is compiled in. It reports
//! itself as null so device construction fails fast instead of running
//! without sound.

use bridge_traits::{
    audio::{AudioBackend, BackendStream, DataCallback, DeviceInfo, StreamParams},
    error::{BridgeError, Result},
};
use tracing::debug;

/// Backend that can never open a stream.
#[derive(Debug, Clone, Default)]
pub struct NullBackend;

impl NullBackend {
    pub fn new() -> Self {
        Self
    }
}

impl AudioBackend for NullBackend {
    fn name(&self) -> &str {
        "null"
    }

    fn is_null(&self) -> bool {
        true
    }

    fn open_stream(
        &self,
        params: &StreamParams,
        _callback: DataCallback,
    ) -> Result<Box<dyn BackendStream>> {
        debug!(device_type = %params.device_type, "Null backend refused to open stream");
        Err(BridgeError::NotAvailable(
            "no suitable audio backend found".to_string(),
        ))
    }

    fn playback_devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok(Vec::new())
    }

    fn capture_devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::audio::{DeviceType, EndpointParams, SampleFormat};

    #[test]
    fn test_null_backend_is_null() {
        let backend = NullBackend::new();
        assert!(backend.is_null());
        assert_eq!(backend.name(), "null");
    }

    #[test]
    fn test_null_backend_refuses_streams() {
        let backend = NullBackend::new();
        let params = StreamParams::new(DeviceType::Playback, 44100, 200)
            .with_playback(EndpointParams::new(SampleFormat::S16, 2));

        let result = backend.open_stream(&params, Box::new(|_, _, _| {}));
        assert!(matches!(result, Err(BridgeError::NotAvailable(_))));
        assert!(backend.playback_devices().unwrap().is_empty());
    }
}
