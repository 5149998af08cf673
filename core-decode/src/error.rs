//! # Decode Error Types
//!
//! Error types for decoding, conversion and streaming of audio sources.

use thiserror::Error;

/// Errors that can occur while decoding audio.
#[derive(Error, Debug)]
pub enum DecodeError {
    // ========================================================================
    // Format/Codec Errors
    // ========================================================================
    /// File extension or sample width the decoder does not handle.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Codec is recognised but its decoder is not compiled in.
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    // ========================================================================
    // Decoding Errors
    // ========================================================================
    /// Source could not be opened or decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Sample count is not a whole number of frames.
    #[error("Corrupt frames: {samples} samples do not divide into {channels} channels")]
    CorruptFrames { samples: usize, channels: u16 },

    /// Channel or sample rate conversion failed.
    #[error("Resampling failed: {0}")]
    Resample(String),

    // ========================================================================
    // Streaming Errors
    // ========================================================================
    /// A chunk request exceeded the stream's preallocated capacity.
    #[error("Requested {requested} frames, stream capacity is {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },

    // ========================================================================
    // I/O and Internal Errors
    // ========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DecodeError {
    /// True when the source's format or codec is the problem.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            DecodeError::UnsupportedFormat(_) | DecodeError::UnsupportedCodec(_)
        )
    }

    /// True when the source data itself could not be read or decoded.
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            DecodeError::Decode(_) | DecodeError::CorruptFrames { .. } | DecodeError::Io(_)
        )
    }
}

impl From<bridge_traits::error::BridgeError> for DecodeError {
    fn from(err: bridge_traits::error::BridgeError) -> Self {
        match err {
            bridge_traits::error::BridgeError::UnsupportedFormat(msg) => {
                DecodeError::UnsupportedFormat(msg)
            }
            bridge_traits::error::BridgeError::Io(e) => DecodeError::Io(e),
            other => DecodeError::Internal(other.to_string()),
        }
    }
}

impl From<hound::Error> for DecodeError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => DecodeError::Io(e),
            other => DecodeError::Internal(format!("WAV writer: {}", other)),
        }
    }
}

/// Result type for decode operations.
pub type Result<T> = std::result::Result<T, DecodeError>;
