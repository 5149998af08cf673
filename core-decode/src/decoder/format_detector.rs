//! # Format Detection Module
//!
//! Maps Symphonia codec types to the codec families this crate decodes and
//! checks them against the compiled-in decoder features.

use crate::error::{DecodeError, Result};
use std::path::Path;
use symphonia::core::codecs::CodecType;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Codec families with a decoder adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecFamily {
    /// Uncompressed PCM (the WAV payload).
    Pcm,
    Flac,
    Mp3,
    Vorbis,
    Unknown,
}

/// Create a probe hint from a file path's extension.
pub fn hint_from_path(path: &Path) -> Hint {
    let mut hint = Hint::new();

    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        debug!("Setting probe hint extension: {}", extension);
        hint.with_extension(extension);
    } else {
        debug!("No file extension found, probe will auto-detect");
    }

    hint
}

/// Create a probe hint from a bare extension.
pub fn hint_from_extension(extension: &str) -> Hint {
    let mut hint = Hint::new();
    hint.with_extension(extension);
    hint
}

/// Classify a Symphonia codec type.
pub fn detect_codec(codec_type: CodecType) -> CodecFamily {
    use symphonia::core::codecs::*;

    if codec_type == CODEC_TYPE_MP3 {
        CodecFamily::Mp3
    } else if codec_type == CODEC_TYPE_FLAC {
        CodecFamily::Flac
    } else if codec_type == CODEC_TYPE_VORBIS {
        CodecFamily::Vorbis
    } else if is_pcm(codec_type) {
        CodecFamily::Pcm
    } else {
        warn!("Unknown codec type: {:?}", codec_type);
        CodecFamily::Unknown
    }
}

fn is_pcm(codec_type: CodecType) -> bool {
    use symphonia::core::codecs::*;

    [
        CODEC_TYPE_PCM_U8,
        CODEC_TYPE_PCM_S8,
        CODEC_TYPE_PCM_S16LE,
        CODEC_TYPE_PCM_S16BE,
        CODEC_TYPE_PCM_S24LE,
        CODEC_TYPE_PCM_S24BE,
        CODEC_TYPE_PCM_S32LE,
        CODEC_TYPE_PCM_S32BE,
        CODEC_TYPE_PCM_F32LE,
        CODEC_TYPE_PCM_F32BE,
        CODEC_TYPE_PCM_F64LE,
        CODEC_TYPE_PCM_F64BE,
        CODEC_TYPE_PCM_ALAW,
        CODEC_TYPE_PCM_MULAW,
    ]
    .contains(&codec_type)
}

/// `true` for IEEE float PCM payloads.
pub fn is_float_pcm(codec_type: CodecType) -> bool {
    use symphonia::core::codecs::*;

    codec_type == CODEC_TYPE_PCM_F32LE
        || codec_type == CODEC_TYPE_PCM_F32BE
        || codec_type == CODEC_TYPE_PCM_F64LE
        || codec_type == CODEC_TYPE_PCM_F64BE
}

/// Validate that a codec family is enabled by the current feature flags.
///
/// # Returns
///
/// - `Ok(())` - Codec is supported
/// - `Err(DecodeError::UnsupportedCodec)` - Codec not enabled
pub fn validate_codec_support(codec: CodecFamily) -> Result<()> {
    match codec {
        CodecFamily::Pcm => {
            #[cfg(not(feature = "decoder-wav"))]
            return Err(DecodeError::UnsupportedCodec(
                "WAV decoder not enabled. Enable 'decoder-wav' feature".to_string(),
            ));
            #[cfg(feature = "decoder-wav")]
            Ok(())
        }
        CodecFamily::Flac => {
            #[cfg(not(feature = "decoder-flac"))]
            return Err(DecodeError::UnsupportedCodec(
                "FLAC decoder not enabled. Enable 'decoder-flac' feature".to_string(),
            ));
            #[cfg(feature = "decoder-flac")]
            Ok(())
        }
        CodecFamily::Mp3 => {
            #[cfg(not(feature = "decoder-mp3"))]
            return Err(DecodeError::UnsupportedCodec(
                "MP3 decoder not enabled. Enable 'decoder-mp3' feature".to_string(),
            ));
            #[cfg(feature = "decoder-mp3")]
            Ok(())
        }
        CodecFamily::Vorbis => {
            #[cfg(not(feature = "decoder-vorbis"))]
            return Err(DecodeError::UnsupportedCodec(
                "Vorbis decoder not enabled. Enable 'decoder-vorbis' feature".to_string(),
            ));
            #[cfg(feature = "decoder-vorbis")]
            Ok(())
        }
        CodecFamily::Unknown => Err(DecodeError::UnsupportedCodec(
            "Unknown audio codec".to_string(),
        )),
    }
}
