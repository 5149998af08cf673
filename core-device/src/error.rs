//! # Device Error Types
//!
//! Errors raised by device construction, routine binding and the callback
//! bridge.

use bridge_traits::{audio::DeviceType, error::BridgeError};
use core_decode::DecodeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeviceError {
    // ========================================================================
    // Construction
    // ========================================================================
    /// No usable backend, or the backend rejected the stream parameters.
    #[error("Failed to initialize device: {0}")]
    InitFailed(String),

    #[error("Invalid device configuration: {0}")]
    Config(String),

    // ========================================================================
    // Binding
    // ========================================================================
    /// A routine is already bound to the device.
    #[error("Can't start an already started device")]
    AlreadyStarted,

    /// The routine's role does not match the device type.
    #[error("A {device} device can't run a {routine} routine")]
    RoutineMismatch {
        device: DeviceType,
        routine: DeviceType,
    },

    // ========================================================================
    // Callback
    // ========================================================================
    /// The routine yielded more bytes than the hardware buffer accepts.
    #[error("Routine yielded {len} bytes but the invocation accepts at most {max}")]
    Overflow { len: usize, max: usize },

    /// The routine itself failed while being resumed.
    #[error("Routine failed: {0}")]
    Routine(String),

    // ========================================================================
    // Lifecycle
    // ========================================================================
    #[error("Device is closed")]
    Closed,

    #[error("Backend error: {0}")]
    Backend(#[from] BridgeError),
}

impl DeviceError {
    /// `true` for failures that unbind the routine but leave the device
    /// running.
    pub fn is_fatal_to_binding(&self) -> bool {
        matches!(self, DeviceError::Overflow { .. } | DeviceError::Routine(_))
    }

    /// `true` for errors raised by calling the API incorrectly.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            DeviceError::AlreadyStarted | DeviceError::RoutineMismatch { .. } | DeviceError::Closed
        )
    }
}

impl From<DecodeError> for DeviceError {
    fn from(err: DecodeError) -> Self {
        DeviceError::Routine(err.to_string())
    }
}

impl From<core_runtime::Error> for DeviceError {
    fn from(err: core_runtime::Error) -> Self {
        DeviceError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DeviceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_fatal_classification() {
        assert!(DeviceError::Overflow { len: 10, max: 4 }.is_fatal_to_binding());
        assert!(DeviceError::Routine("boom".into()).is_fatal_to_binding());
        assert!(!DeviceError::AlreadyStarted.is_fatal_to_binding());
        assert!(!DeviceError::Closed.is_fatal_to_binding());
    }

    #[test]
    fn test_usage_errors() {
        assert!(DeviceError::AlreadyStarted.is_usage_error());
        assert!(DeviceError::RoutineMismatch {
            device: DeviceType::Playback,
            routine: DeviceType::Capture,
        }
        .is_usage_error());
        assert!(!DeviceError::InitFailed("x".into()).is_usage_error());
    }

    #[test]
    fn test_decode_error_becomes_routine_failure() {
        let err: DeviceError = DecodeError::Decode("truncated".into()).into();
        assert!(matches!(err, DeviceError::Routine(ref msg) if msg.contains("truncated")));
    }

    #[test]
    fn test_mismatch_message() {
        let err = DeviceError::RoutineMismatch {
            device: DeviceType::Playback,
            routine: DeviceType::Duplex,
        };
        assert_eq!(err.to_string(), "A playback device can't run a duplex routine");
    }
}
