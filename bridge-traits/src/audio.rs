//! Audio Backend Abstractions
//!
//! Contracts between the core and the platform audio subsystem.
//!
//! The core never talks to an OS audio API directly. A host crate implements
//! [`AudioBackend`], which opens a [`BackendStream`] for a set of
//! [`StreamParams`] and drives the supplied [`DataCallback`] from its own
//! real-time thread. Every buffer handed to the callback is raw interleaved
//! little-endian PCM in the negotiated [`SampleFormat`].
//!
//! # Example
//!
//! ```ignore
//! use bridge_traits::audio::{AudioBackend, DeviceType, EndpointParams, SampleFormat, StreamParams};
//!
//! fn open_silence(backend: &dyn AudioBackend) -> bridge_traits::error::Result<()> {
//!     let params = StreamParams::new(DeviceType::Playback, 44100, 200)
//!         .with_playback(EndpointParams::new(SampleFormat::S16, 2));
//!     let mut stream = backend.open_stream(&params, Box::new(|output, _input, _frames| {
//!         output.fill(0);
//!     }))?;
//!     stream.start()
//! }
//! ```

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Sample Format Model
// ============================================================================

/// PCM sample formats understood by the core and the backends.
///
/// All formats are little-endian and interleaved by channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// Unsigned 8-bit, silence at 0x80.
    U8,
    /// Signed 16-bit.
    #[default]
    S16,
    /// Signed 32-bit.
    S32,
    /// 32-bit IEEE float in [-1.0, 1.0].
    F32,
}

impl SampleFormat {
    /// Every supported format, narrowest first.
    pub const ALL: [SampleFormat; 4] = [
        SampleFormat::U8,
        SampleFormat::S16,
        SampleFormat::S32,
        SampleFormat::F32,
    ];

    /// Width of one sample in bytes.
    pub const fn width(self) -> usize {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::S16 => 2,
            SampleFormat::S32 | SampleFormat::F32 => 4,
        }
    }

    /// Bit depth of one sample.
    pub const fn bits(self) -> u16 {
        (self.width() * 8) as u16
    }

    pub const fn is_float(self) -> bool {
        matches!(self, SampleFormat::F32)
    }

    /// Resolve a format from a sample width in bytes.
    ///
    /// Only 1, 2 and 4 byte integers and 4 byte floats exist.
    pub fn from_width(width: usize, is_float: bool) -> Result<Self> {
        match (width, is_float) {
            (1, false) => Ok(SampleFormat::U8),
            (2, false) => Ok(SampleFormat::S16),
            (4, false) => Ok(SampleFormat::S32),
            (4, true) => Ok(SampleFormat::F32),
            (w, true) => Err(BridgeError::UnsupportedFormat(format!(
                "float samples must be 4 bytes wide, got {}",
                w
            ))),
            (w, false) => Err(BridgeError::UnsupportedFormat(format!(
                "unsupported sample width {}",
                w
            ))),
        }
    }

    /// Short lowercase name ("u8", "s16", "s32", "f32").
    pub const fn name(self) -> &'static str {
        match self {
            SampleFormat::U8 => "u8",
            SampleFormat::S16 => "s16",
            SampleFormat::S32 => "s32",
            SampleFormat::F32 => "f32",
        }
    }

    /// Byte value that encodes silence in this format.
    pub const fn silence(self) -> u8 {
        match self {
            SampleFormat::U8 => 0x80,
            _ => 0,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Width in bytes of one sample of `format`.
pub fn width_of(format: SampleFormat) -> usize {
    format.width()
}

/// Inverse of [`width_of`]; fails with `UnsupportedFormat` for unknown widths.
pub fn format_from_width(width: usize, is_float: bool) -> Result<SampleFormat> {
    SampleFormat::from_width(width, is_float)
}

// ============================================================================
// Stream Parameters
// ============================================================================

/// Role of a device stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Playback,
    Capture,
    Duplex,
}

impl DeviceType {
    pub fn has_playback(self) -> bool {
        matches!(self, DeviceType::Playback | DeviceType::Duplex)
    }

    pub fn has_capture(self) -> bool {
        matches!(self, DeviceType::Capture | DeviceType::Duplex)
    }

    pub fn name(self) -> &'static str {
        match self {
            DeviceType::Playback => "playback",
            DeviceType::Capture => "capture",
            DeviceType::Duplex => "duplex",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Format of one direction (output or input) of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointParams {
    pub format: SampleFormat,
    pub channels: u16,
    /// Backend-specific device id; `None` selects the default device.
    pub device_id: Option<String>,
}

impl EndpointParams {
    pub fn new(format: SampleFormat, channels: u16) -> Self {
        Self {
            format,
            channels,
            device_id: None,
        }
    }

    pub fn with_device_id(mut self, id: impl Into<String>) -> Self {
        self.device_id = Some(id.into());
        self
    }

    /// Bytes occupied by one interleaved frame.
    pub fn frame_bytes(&self) -> usize {
        self.format.width() * self.channels as usize
    }
}

/// Everything a backend needs to open a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamParams {
    pub device_type: DeviceType,
    pub sample_rate: u32,
    /// Target hardware buffer size in milliseconds.
    pub buffer_size_msec: u32,
    pub playback: Option<EndpointParams>,
    pub capture: Option<EndpointParams>,
}

impl StreamParams {
    pub fn new(device_type: DeviceType, sample_rate: u32, buffer_size_msec: u32) -> Self {
        Self {
            device_type,
            sample_rate,
            buffer_size_msec,
            playback: None,
            capture: None,
        }
    }

    pub fn with_playback(mut self, endpoint: EndpointParams) -> Self {
        self.playback = Some(endpoint);
        self
    }

    pub fn with_capture(mut self, endpoint: EndpointParams) -> Self {
        self.capture = Some(endpoint);
        self
    }

    /// Number of frames covered by the target buffer size.
    pub fn buffer_frames(&self) -> usize {
        (self.sample_rate as u64 * self.buffer_size_msec as u64 / 1000) as usize
    }

    /// Check that the endpoints required by `device_type` are present and sane.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(BridgeError::InvalidParameters(
                "sample rate must be > 0".to_string(),
            ));
        }
        if self.device_type.has_playback() && self.playback.is_none() {
            return Err(BridgeError::InvalidParameters(format!(
                "{} stream requires playback parameters",
                self.device_type
            )));
        }
        if self.device_type.has_capture() && self.capture.is_none() {
            return Err(BridgeError::InvalidParameters(format!(
                "{} stream requires capture parameters",
                self.device_type
            )));
        }
        for endpoint in self.playback.iter().chain(self.capture.iter()) {
            if endpoint.channels == 0 {
                return Err(BridgeError::InvalidParameters(
                    "channel count must be > 0".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Backend Contract
// ============================================================================

/// Callback driven by the backend on its real-time thread.
///
/// Arguments are the hardware output buffer (empty for capture streams), the
/// captured input (empty for playback streams) and the frame count of this
/// invocation. Invocations for one stream never overlap.
pub type DataCallback = Box<dyn FnMut(&mut [u8], &[u8], usize) + Send + 'static>;

/// An opened stream. Dropping it releases the native resources.
pub trait BackendStream {
    /// Begin delivering callbacks.
    fn start(&mut self) -> Result<()>;

    /// Halt callbacks without releasing the stream.
    fn stop(&mut self) -> Result<()>;
}

/// Platform audio subsystem.
pub trait AudioBackend: Send + Sync {
    /// Human readable backend name (e.g. "alsa", "coreaudio", "virtual").
    fn name(&self) -> &str;

    /// `true` for a backend that can never produce or consume audio.
    fn is_null(&self) -> bool {
        false
    }

    /// Open a stream and bind `callback` to it. The stream starts stopped.
    fn open_stream(
        &self,
        params: &StreamParams,
        callback: DataCallback,
    ) -> Result<Box<dyn BackendStream>>;

    /// Enumerate output devices.
    fn playback_devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Enumerate input devices.
    fn capture_devices(&self) -> Result<Vec<DeviceInfo>>;
}

/// Device description reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Backend-specific identifier, usable as `EndpointParams::device_id`.
    pub id: String,
    pub name: String,
    pub device_type: DeviceType,
    pub is_default: bool,
    pub min_channels: u16,
    pub max_channels: u16,
    pub min_sample_rate: u32,
    pub max_sample_rate: u32,
    pub formats: Vec<SampleFormat>,
}

impl DeviceInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, device_type: DeviceType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            device_type,
            is_default: false,
            min_channels: 1,
            max_channels: 2,
            min_sample_rate: 8000,
            max_sample_rate: 192_000,
            formats: SampleFormat::ALL.to_vec(),
        }
    }

    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    pub fn with_channels(mut self, min: u16, max: u16) -> Self {
        self.min_channels = min;
        self.max_channels = max;
        self
    }

    pub fn with_sample_rates(mut self, min: u32, max: u32) -> Self {
        self.min_sample_rate = min;
        self.max_sample_rate = max;
        self
    }

    pub fn with_formats(mut self, formats: Vec<SampleFormat>) -> Self {
        self.formats = formats;
        self
    }

    pub fn supports_format(&self, format: SampleFormat) -> bool {
        self.formats.contains(&format)
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<DeviceInfo {} ({})>", self.name, self.device_type)
    }
}
