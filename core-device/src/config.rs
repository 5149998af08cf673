//! # Device Configuration
//!
//! [`DeviceConfig`] describes one device: its role, the format and channel
//! count of each direction, the sample rate, the target buffer size and the
//! optional explicit device ids. It is fixed once the device is built.
//!
//! ## Usage
//!
//! ```rust
//! use core_device::{DeviceConfig, SampleFormat};
//!
//! let config = DeviceConfig::playback()
//!     .with_format(SampleFormat::F32)
//!     .with_sample_rate(48000)
//!     .with_buffer_size_msec(50);
//! assert!(config.validate().is_ok());
//! ```

use crate::error::{DeviceError, Result};
use bridge_traits::audio::{DeviceType, EndpointParams, SampleFormat, StreamParams};
use core_runtime::DeviceDefaults;

const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_BUFFER_SIZE_MSEC: u32 = 200;

/// Format and channel count of one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub format: SampleFormat,
    pub channels: u16,
}

impl Endpoint {
    pub fn new(format: SampleFormat, channels: u16) -> Self {
        Self { format, channels }
    }

    /// Bytes in one interleaved frame.
    pub fn frame_bytes(&self) -> usize {
        self.format.width() * self.channels as usize
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(SampleFormat::S16, 2)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub device_type: DeviceType,
    pub sample_rate: u32,
    pub buffer_size_msec: u32,
    /// Output side; used by playback and duplex devices.
    pub playback: Endpoint,
    /// Input side; used by capture and duplex devices.
    pub capture: Endpoint,
    pub playback_device_id: Option<String>,
    pub capture_device_id: Option<String>,
}

impl DeviceConfig {
    fn with_type(device_type: DeviceType) -> Self {
        Self {
            device_type,
            sample_rate: DEFAULT_SAMPLE_RATE,
            buffer_size_msec: DEFAULT_BUFFER_SIZE_MSEC,
            playback: Endpoint::default(),
            capture: Endpoint::default(),
            playback_device_id: None,
            capture_device_id: None,
        }
    }

    /// S16 stereo output at 44100 Hz with a 200 ms buffer.
    pub fn playback() -> Self {
        Self::with_type(DeviceType::Playback)
    }

    /// S16 stereo input at 44100 Hz with a 200 ms buffer.
    pub fn capture() -> Self {
        Self::with_type(DeviceType::Capture)
    }

    /// S16 stereo in both directions at 44100 Hz with a 200 ms buffer.
    pub fn duplex() -> Self {
        Self::with_type(DeviceType::Duplex)
    }

    /// Config of `device_type` taking every value from `defaults`.
    pub fn from_defaults(device_type: DeviceType, defaults: &DeviceDefaults) -> Self {
        let endpoint = Endpoint::new(defaults.format, defaults.channels);
        Self {
            device_type,
            sample_rate: defaults.sample_rate,
            buffer_size_msec: defaults.buffer_size_msec,
            playback: endpoint,
            capture: endpoint,
            playback_device_id: defaults.playback_device_id.clone(),
            capture_device_id: defaults.capture_device_id.clone(),
        }
    }

    /// Set the format of every direction the device uses.
    pub fn with_format(mut self, format: SampleFormat) -> Self {
        self.playback.format = format;
        self.capture.format = format;
        self
    }

    /// Set the channel count of every direction the device uses.
    pub fn with_channels(mut self, channels: u16) -> Self {
        self.playback.channels = channels;
        self.capture.channels = channels;
        self
    }

    pub fn with_playback(mut self, format: SampleFormat, channels: u16) -> Self {
        self.playback = Endpoint::new(format, channels);
        self
    }

    pub fn with_capture(mut self, format: SampleFormat, channels: u16) -> Self {
        self.capture = Endpoint::new(format, channels);
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_buffer_size_msec(mut self, msec: u32) -> Self {
        self.buffer_size_msec = msec;
        self
    }

    pub fn with_playback_device(mut self, id: impl Into<String>) -> Self {
        self.playback_device_id = Some(id.into());
        self
    }

    pub fn with_capture_device(mut self, id: impl Into<String>) -> Self {
        self.capture_device_id = Some(id.into());
        self
    }

    /// Validates the configuration.
    ///
    /// This checks:
    /// - Sample rate is non-zero
    /// - Buffer size is non-zero
    /// - Every direction the device uses has at least one channel
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(DeviceError::Config("sample rate must be > 0".to_string()));
        }
        if self.buffer_size_msec == 0 {
            return Err(DeviceError::Config("buffer size must be > 0 ms".to_string()));
        }
        if self.device_type.has_playback() && self.playback.channels == 0 {
            return Err(DeviceError::Config(
                "playback channel count must be > 0".to_string(),
            ));
        }
        if self.device_type.has_capture() && self.capture.channels == 0 {
            return Err(DeviceError::Config(
                "capture channel count must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Backend parameters for this configuration. Only the directions the
    /// device type uses are filled in.
    pub fn to_stream_params(&self) -> StreamParams {
        let mut params =
            StreamParams::new(self.device_type, self.sample_rate, self.buffer_size_msec);

        if self.device_type.has_playback() {
            let mut endpoint = EndpointParams::new(self.playback.format, self.playback.channels);
            endpoint.device_id = self.playback_device_id.clone();
            params = params.with_playback(endpoint);
        }
        if self.device_type.has_capture() {
            let mut endpoint = EndpointParams::new(self.capture.format, self.capture.channels);
            endpoint.device_id = self.capture_device_id.clone();
            params = params.with_capture(endpoint);
        }
        params
    }

    /// Frames covered by the configured buffer size.
    pub fn buffer_frames(&self) -> usize {
        (self.sample_rate as u64 * self.buffer_size_msec as u64 / 1000) as usize
    }
}
