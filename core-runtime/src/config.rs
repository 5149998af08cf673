//! # Core Configuration Module
//!
//! Provides configuration management for the audio core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the audio backend devices are opened on, an optional
//! host logger, and the defaults applied to new devices. It enforces
//! fail-fast validation so a missing backend is reported at build time.
//!
//! ## Required Dependencies
//!
//! - `AudioBackend` - Opens device streams. When the `desktop-shims` feature
//!   is enabled, the best backend compiled into `bridge-desktop` is injected
//!   automatically if none is provided (cpal with `native-audio`, otherwise
//!   the null backend, which makes device construction fail fast).
//!
//! ## Optional Dependencies
//!
//! - `LoggerSink` - Mirror of core log events into the host logger
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, DeviceDefaults};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .backend(Arc::new(bridge_desktop::VirtualBackend::new()))
//!     .device_defaults(DeviceDefaults::default().with_sample_rate(48000))
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! Device defaults can also be loaded from JSON; missing fields take the
//! built-in defaults (S16, 2 channels, 44100 Hz, 200 ms):
//!
//! ```ignore
//! let defaults = DeviceDefaults::from_json(r#"{ "sample_rate": 48000 }"#)?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{AudioBackend, LoggerSink, SampleFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// Device Defaults
// ============================================================================

fn default_format() -> SampleFormat {
    SampleFormat::S16
}

fn default_channels() -> u16 {
    2
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_buffer_size_msec() -> u32 {
    200
}

/// Values applied to a device when the caller does not set them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDefaults {
    #[serde(default = "default_format")]
    pub format: SampleFormat,

    #[serde(default = "default_channels")]
    pub channels: u16,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Hardware buffer size hint in milliseconds.
    #[serde(default = "default_buffer_size_msec")]
    pub buffer_size_msec: u32,

    /// Backend device id for playback; `None` selects the system default.
    #[serde(default)]
    pub playback_device_id: Option<String>,

    /// Backend device id for capture; `None` selects the system default.
    #[serde(default)]
    pub capture_device_id: Option<String>,
}

impl Default for DeviceDefaults {
    fn default() -> Self {
        Self {
            format: default_format(),
            channels: default_channels(),
            sample_rate: default_sample_rate(),
            buffer_size_msec: default_buffer_size_msec(),
            playback_device_id: None,
            capture_device_id: None,
        }
    }
}

impl DeviceDefaults {
    pub fn with_format(mut self, format: SampleFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = channels;
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

    /// Parse defaults from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let defaults: DeviceDefaults = serde_json::from_str(json)?;
        defaults.validate()?;
        Ok(defaults)
    }

    /// Read defaults from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read device defaults from {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }

    /// Validates the defaults.
    ///
    /// This checks:
    /// - Channel count is between 1 and 32
    /// - Sample rate is between 8 kHz and 384 kHz
    /// - Buffer size is between 1 ms and 5 s
    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 || self.channels > 32 {
            return Err(Error::Config(format!(
                "Channel count must be between 1 and 32, got {}",
                self.channels
            )));
        }

        if !(8_000..=384_000).contains(&self.sample_rate) {
            return Err(Error::Config(format!(
                "Sample rate must be between 8000 and 384000 Hz, got {}",
                self.sample_rate
            )));
        }

        if self.buffer_size_msec == 0 || self.buffer_size_msec > 5_000 {
            return Err(Error::Config(format!(
                "Buffer size must be between 1 and 5000 ms, got {}",
                self.buffer_size_msec
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Core Configuration
// ============================================================================

/// Core configuration for the audio core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Audio backend devices are opened on (required)
    pub backend: Arc<dyn AudioBackend>,

    /// Host logger (optional)
    pub logger_sink: Option<Arc<dyn LoggerSink>>,

    /// Defaults for new devices
    pub device_defaults: DeviceDefaults,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("backend", &self.backend.name())
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .field("device_defaults", &self.device_defaults)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        self.device_defaults.validate()
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn backend_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AudioBackend".to_string(),
        message: "AudioBackend implementation is required to open devices. \
                 Desktop: enable the 'desktop-shims' feature (and 'native-audio' for cpal). \
                 Headless: inject bridge_desktop::VirtualBackend. \
                 Mobile: inject a platform-native backend."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_backend() -> Result<Arc<dyn AudioBackend>> {
    let backend = bridge_desktop::default_backend();
    tracing::debug!(backend = backend.name(), "Using default audio backend");
    Ok(backend)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_backend() -> Result<Arc<dyn AudioBackend>> {
    Err(backend_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    backend: Option<Arc<dyn AudioBackend>>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
    device_defaults: Option<DeviceDefaults>,
}

impl CoreConfigBuilder {
    /// Sets the audio backend.
    ///
    /// If not provided, the desktop default is used when the `desktop-shims`
    /// feature is enabled.
    pub fn backend(mut self, backend: Arc<dyn AudioBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Sets the host logger sink.
    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    /// Sets all device defaults at once.
    pub fn device_defaults(mut self, defaults: DeviceDefaults) -> Self {
        self.device_defaults = Some(defaults);
        self
    }

    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        let defaults = self.device_defaults.take().unwrap_or_default();
        self.device_defaults = Some(defaults.with_sample_rate(sample_rate));
        self
    }

    pub fn buffer_size_msec(mut self, msec: u32) -> Self {
        let defaults = self.device_defaults.take().unwrap_or_default();
        self.device_defaults = Some(defaults.with_buffer_size_msec(msec));
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CoreConfig)` on success, or an error if:
    /// - No backend was injected and no default is compiled in
    /// - Device defaults are invalid
    pub fn build(self) -> Result<CoreConfig> {
        let backend = match self.backend {
            Some(backend) => backend,
            None => provide_default_backend()?,
        };

        let config = CoreConfig {
            backend,
            logger_sink: self.logger_sink,
            device_defaults: self.device_defaults.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::audio::{BackendStream, DataCallback, DeviceInfo, StreamParams};
    use bridge_traits::error::Result as BridgeResult;
    use mockall::mock;

    mock! {
        Backend {}

        impl AudioBackend for Backend {
            fn name(&self) -> &str;
            fn is_null(&self) -> bool;
            fn open_stream(
                &self,
                params: &StreamParams,
                callback: DataCallback,
            ) -> BridgeResult<Box<dyn BackendStream>>;
            fn playback_devices(&self) -> BridgeResult<Vec<DeviceInfo>>;
            fn capture_devices(&self) -> BridgeResult<Vec<DeviceInfo>>;
        }
    }

    fn mock_backend() -> Arc<dyn AudioBackend> {
        let mut backend = MockBackend::new();
        backend.expect_name().return_const("mock".to_string());
        Arc::new(backend)
    }

    #[test]
    fn test_device_defaults() {
        let defaults = DeviceDefaults::default();
        assert_eq!(defaults.format, SampleFormat::S16);
        assert_eq!(defaults.channels, 2);
        assert_eq!(defaults.sample_rate, 44100);
        assert_eq!(defaults.buffer_size_msec, 200);
        assert!(defaults.validate().is_ok());
    }

    #[test]
    fn test_device_defaults_from_partial_json() {
        let defaults =
            DeviceDefaults::from_json(r#"{ "sample_rate": 48000, "format": "f32" }"#).unwrap();
        assert_eq!(defaults.sample_rate, 48000);
        assert_eq!(defaults.format, SampleFormat::F32);
        assert_eq!(defaults.channels, 2);
        assert_eq!(defaults.buffer_size_msec, 200);
    }

    #[test]
    fn test_device_defaults_json_rejects_invalid_values() {
        assert!(matches!(
            DeviceDefaults::from_json(r#"{ "channels": 0 }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            DeviceDefaults::from_json("not json"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(DeviceDefaults::default()
            .with_sample_rate(1000)
            .validate()
            .is_err());
        assert!(DeviceDefaults::default()
            .with_buffer_size_msec(0)
            .validate()
            .is_err());
        assert!(DeviceDefaults::default()
            .with_channels(64)
            .validate()
            .is_err());
    }

    #[test]
    fn test_builder_with_backend() {
        let config = CoreConfig::builder()
            .backend(mock_backend())
            .sample_rate(48000)
            .buffer_size_msec(20)
            .build()
            .unwrap();

        assert_eq!(config.backend.name(), "mock");
        assert_eq!(config.device_defaults.sample_rate, 48000);
        assert_eq!(config.device_defaults.buffer_size_msec, 20);
        assert!(config.logger_sink.is_none());
    }

    #[test]
    fn test_builder_rejects_invalid_defaults() {
        let result = CoreConfig::builder()
            .backend(mock_backend())
            .device_defaults(DeviceDefaults::default().with_channels(0))
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_backend() {
        let result = CoreConfig::builder().build();
        match result {
            Err(err) => assert!(err.is_capability_missing()),
            Ok(_) => panic!("expected missing backend"),
        }
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_default_backend() {
        let config = CoreConfig::builder().build().unwrap();
        assert!(!config.backend.name().is_empty());
    }

    #[test]
    fn test_debug_hides_trait_objects() {
        let config = CoreConfig::builder()
            .backend(mock_backend())
            .build()
            .unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("\"mock\""));
        assert!(debug.contains("device_defaults"));
    }
}
