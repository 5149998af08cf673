//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the decode/device core and the
//! platform-specific audio layer. The core never calls an OS audio API; it
//! asks an [`AudioBackend`](audio::AudioBackend) for a stream and lets the
//! backend drive a [`DataCallback`](audio::DataCallback) from its real-time
//! thread.
//!
//! ## Traits
//!
//! ### Audio
//! - [`AudioBackend`](audio::AudioBackend) - Opens device streams and enumerates devices
//! - [`BackendStream`](audio::BackendStream) - Start/stop control over an opened stream
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop` (cpal) | ✅ Available |
//! | Offline  | `bridge-desktop` (`VirtualBackend`) | ✅ Available |
//! | Mobile   | TBD                 | 📋 Planned |
//!
//! ## Fail-Fast Strategy
//!
//! A backend that cannot produce audio must say so through
//! [`AudioBackend::is_null`](audio::AudioBackend::is_null); device construction
//! treats a null backend as an initialization failure instead of running
//! silently.
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert native errors to `BridgeError` and include
//! context such as device names.
//!
//! ## Thread Safety
//!
//! Backends are `Send + Sync` so one instance can be shared by every device.
//! Streams themselves are owned by a single device and need not be `Send`.

pub mod audio;
pub mod error;
pub mod logging;

pub use error::BridgeError;

// Re-export commonly used types
pub use audio::{
    format_from_width, width_of, AudioBackend, BackendStream, DataCallback, DeviceInfo,
    DeviceType, EndpointParams, SampleFormat, StreamParams,
};
pub use logging::{LogEntry, LogLevel, LoggerSink, StderrSink};
