//! # Device Module
//!
//! Connects backend audio callbacks to application routines for playback,
//! capture and full-duplex devices.
//!
//! ## Overview
//!
//! This crate handles:
//! - Device configuration and lifecycle ([`DeviceConfig`], [`Device`] and
//!   the typed [`PlaybackDevice`], [`CaptureDevice`], [`DuplexDevice`])
//! - The callback bridge that resumes the bound routine once per hardware
//!   invocation and checks what it yields
//! - The registry that routes backend callbacks to devices
//!   ([`CallbackRegistry`])
//! - Device enumeration ([`Devices`])
//!
//! ## Threading
//!
//! The backend calls into the bridge from its own real-time thread. Routines
//! run there, one invocation at a time per device, and must not block.
//! Failures on that thread unbind the routine and are parked until
//! [`Device::take_error`] or the next `start`, which binds its routine and
//! returns the parked failure.
//!
//! ## Example
//!
//! ```rust,no_run
//! use core_device::{DeviceConfig, PlaybackDevice};
//! use core_decode::{stream_file, DecodeOptions};
//! use std::sync::Arc;
//!
//! # fn example(backend: Arc<dyn bridge_traits::AudioBackend>) -> Result<(), Box<dyn std::error::Error>> {
//! let options = DecodeOptions::default();
//! let mut device = PlaybackDevice::new(DeviceConfig::playback(), backend)?;
//! device.start(stream_file("song.flac", &options)?)?;
//! # Ok(())
//! # }
//! ```

mod bridge;
pub mod callbacks;
pub mod config;
pub mod device;
pub mod devices;
pub mod error;
pub mod registry;
pub mod routine;

pub use bridge_traits::audio::{DeviceInfo, DeviceType, SampleFormat};
pub use callbacks::StreamCallbacks;
pub use config::{DeviceConfig, Endpoint};
pub use device::{CaptureDevice, Device, DeviceState, DuplexDevice, PlaybackDevice};
pub use devices::Devices;
pub use error::{DeviceError, Result};
pub use registry::{CallbackRegistry, DeviceId};
pub use routine::{
    capture_fn, duplex_fn, playback_fn, CaptureRoutine, DuplexRoutine, Payload, PlaybackRoutine,
    Routine, Step,
};
