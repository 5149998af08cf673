//! # Desktop Bridge Implementations
//!
//! Audio backends for desktop platforms (macOS, Windows, Linux) and for
//! headless use.
//!
//! ## Overview
//!
//! This crate provides implementations of
//! [`AudioBackend`](bridge_traits::AudioBackend):
//! - `CpalBackend` using `cpal` (feature `cpal`)
//! - `VirtualBackend`, clocked by the caller, for offline rendering and tests
//! - `NullBackend`, reported as null so device construction fails fast
//!
//! ## Feature Flags
//!
//! - `cpal`: Enable native audio I/O. Off by default because it needs the
//!   platform audio development headers (ALSA on Linux).
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::default_backend;
//!
//! let backend = default_backend();
//! println!("audio backend: {}", backend.name());
//! ```

mod null;
mod virtual_device;

#[cfg(any(feature = "cpal", test))]
mod ring_buffer;

#[cfg(feature = "cpal")]
mod cpal_backend;

pub use null::NullBackend;
pub use virtual_device::{VirtualBackend, VirtualDeviceHandle};

#[cfg(feature = "cpal")]
pub use cpal_backend::CpalBackend;

use bridge_traits::AudioBackend;
use std::sync::Arc;

/// Best backend compiled into this build.
///
/// Returns the cpal backend when the `cpal` feature is enabled, otherwise the
/// [`NullBackend`].
pub fn default_backend() -> Arc<dyn AudioBackend> {
    #[cfg(feature = "cpal")]
    {
        Arc::new(CpalBackend::new())
    }
    #[cfg(not(feature = "cpal"))]
    {
        tracing::debug!("No native audio backend compiled in, using null backend");
        Arc::new(NullBackend::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "cpal"))]
    #[test]
    fn test_default_backend_without_cpal_is_null() {
        let backend = default_backend();
        assert!(backend.is_null());
    }
}
