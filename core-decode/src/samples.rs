//! # Sample Containers
//!
//! Typed, interleaved PCM storage shared by the decoders, the streaming
//! engine and the device bridge.
//!
//! ## Overview
//!
//! - [`Samples`]: one variant per [`SampleFormat`], little-endian byte
//!   encoding on demand
//! - [`StreamInfo`]: immutable description of an opened source
//! - [`DecodedAudio`]: a fully materialized decode result
//! - [`PcmChunk`]: one chunk handed out by a [`PcmStream`](crate::PcmStream)

use crate::error::{DecodeError, Result};
use bridge_traits::audio::SampleFormat;
use serde::Serialize;
use symphonia::core::conv::IntoSample;

macro_rules! each_variant {
    ($value:expr, $v:ident => $body:expr) => {
        match $value {
            Samples::U8($v) => $body,
            Samples::S16($v) => $body,
            Samples::S32($v) => $body,
            Samples::F32($v) => $body,
        }
    };
}

// ============================================================================
// Samples
// ============================================================================

/// Interleaved samples of a single format.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    U8(Vec<u8>),
    S16(Vec<i16>),
    S32(Vec<i32>),
    F32(Vec<f32>),
}

impl Samples {
    pub fn new(format: SampleFormat) -> Self {
        Self::with_capacity(format, 0)
    }

    /// Empty container with room for `samples` samples.
    pub fn with_capacity(format: SampleFormat, samples: usize) -> Self {
        match format {
            SampleFormat::U8 => Samples::U8(Vec::with_capacity(samples)),
            SampleFormat::S16 => Samples::S16(Vec::with_capacity(samples)),
            SampleFormat::S32 => Samples::S32(Vec::with_capacity(samples)),
            SampleFormat::F32 => Samples::F32(Vec::with_capacity(samples)),
        }
    }

    pub fn format(&self) -> SampleFormat {
        match self {
            Samples::U8(_) => SampleFormat::U8,
            Samples::S16(_) => SampleFormat::S16,
            Samples::S32(_) => SampleFormat::S32,
            Samples::F32(_) => SampleFormat::F32,
        }
    }

    /// Number of samples (not frames).
    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of whole frames for `channels` interleaved channels.
    pub fn frames(&self, channels: u16) -> usize {
        if channels == 0 {
            return 0;
        }
        self.len() / channels as usize
    }

    pub fn capacity(&self) -> usize {
        each_variant!(self, v => v.capacity())
    }

    /// Size of the little-endian encoding in bytes.
    pub fn byte_len(&self) -> usize {
        self.len() * self.format().width()
    }

    pub fn clear(&mut self) {
        each_variant!(self, v => v.clear())
    }

    // ------------------------------------------------------------------------
    // Byte encoding
    // ------------------------------------------------------------------------

    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.byte_len()];
        self.write_le_bytes(&mut out);
        out
    }

    /// Encode into `out`, stopping at whichever runs out first. Returns the
    /// number of bytes written.
    pub fn write_le_bytes(&self, out: &mut [u8]) -> usize {
        match self {
            Samples::U8(v) => {
                let n = v.len().min(out.len());
                out[..n].copy_from_slice(&v[..n]);
                n
            }
            Samples::S16(v) => write_chunks(v, out, |s| s.to_le_bytes()),
            Samples::S32(v) => write_chunks(v, out, |s| s.to_le_bytes()),
            Samples::F32(v) => write_chunks(v, out, |s| s.to_le_bytes()),
        }
    }

    /// Decode little-endian bytes; a trailing partial sample is an error.
    pub fn from_le_bytes(format: SampleFormat, bytes: &[u8]) -> Result<Self> {
        let width = format.width();
        if bytes.len() % width != 0 {
            return Err(DecodeError::Decode(format!(
                "{} bytes is not a whole number of {} samples",
                bytes.len(),
                format
            )));
        }

        Ok(match format {
            SampleFormat::U8 => Samples::U8(bytes.to_vec()),
            SampleFormat::S16 => Samples::S16(
                bytes
                    .chunks_exact(2)
                    .map(|c| i16::from_le_bytes([c[0], c[1]]))
                    .collect(),
            ),
            SampleFormat::S32 => Samples::S32(
                bytes
                    .chunks_exact(4)
                    .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            SampleFormat::F32 => Samples::F32(
                bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
        })
    }

    // ------------------------------------------------------------------------
    // Moving samples around
    // ------------------------------------------------------------------------

    /// Append all samples of `other`, which must have the same format.
    pub fn extend_from(&mut self, other: &Samples) -> Result<()> {
        match (self, other) {
            (Samples::U8(a), Samples::U8(b)) => a.extend_from_slice(b),
            (Samples::S16(a), Samples::S16(b)) => a.extend_from_slice(b),
            (Samples::S32(a), Samples::S32(b)) => a.extend_from_slice(b),
            (Samples::F32(a), Samples::F32(b)) => a.extend_from_slice(b),
            (a, b) => return Err(format_mismatch(a.format(), b.format())),
        }
        Ok(())
    }

    /// Detach the first `n` samples (fewer if shorter) into a new container.
    pub fn split_off_front(&mut self, n: usize) -> Samples {
        match self {
            Samples::U8(v) => Samples::U8(take_front(v, n)),
            Samples::S16(v) => Samples::S16(take_front(v, n)),
            Samples::S32(v) => Samples::S32(take_front(v, n)),
            Samples::F32(v) => Samples::F32(take_front(v, n)),
        }
    }

    /// Move the first `n` samples (fewer if shorter) to the end of `out`.
    /// Returns the number of samples moved.
    pub fn drain_front_into(&mut self, n: usize, out: &mut Samples) -> Result<usize> {
        let n = n.min(self.len());
        match (self, out) {
            (Samples::U8(a), Samples::U8(b)) => b.extend(a.drain(..n)),
            (Samples::S16(a), Samples::S16(b)) => b.extend(a.drain(..n)),
            (Samples::S32(a), Samples::S32(b)) => b.extend(a.drain(..n)),
            (Samples::F32(a), Samples::F32(b)) => b.extend(a.drain(..n)),
            (a, b) => return Err(format_mismatch(a.format(), b.format())),
        }
        Ok(n)
    }

    // ------------------------------------------------------------------------
    // Float conversion
    // ------------------------------------------------------------------------

    /// Normalized float copy of the samples.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            Samples::U8(v) => v.iter().map(|&s| -> f32 { s.into_sample() }).collect(),
            Samples::S16(v) => v.iter().map(|&s| -> f32 { s.into_sample() }).collect(),
            Samples::S32(v) => v.iter().map(|&s| -> f32 { s.into_sample() }).collect(),
            Samples::F32(v) => v.clone(),
        }
    }

    /// Append float samples, converting (and clamping) to this format.
    pub fn extend_from_f32(&mut self, data: &[f32]) {
        match self {
            Samples::U8(v) => v.extend(data.iter().map(|&s| -> u8 { s.into_sample() })),
            Samples::S16(v) => v.extend(data.iter().map(|&s| -> i16 { s.into_sample() })),
            Samples::S32(v) => v.extend(data.iter().map(|&s| -> i32 { s.into_sample() })),
            Samples::F32(v) => v.extend_from_slice(data),
        }
    }

    pub fn from_f32(format: SampleFormat, data: &[f32]) -> Self {
        let mut samples = Samples::with_capacity(format, data.len());
        samples.extend_from_f32(data);
        samples
    }

    // ------------------------------------------------------------------------
    // Typed accessors
    // ------------------------------------------------------------------------

    pub fn as_u8(&self) -> Option<&[u8]> {
        match self {
            Samples::U8(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<&[i16]> {
        match self {
            Samples::S16(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<&[i32]> {
        match self {
            Samples::S32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            Samples::F32(v) => Some(v),
            _ => None,
        }
    }
}

fn write_chunks<T: Copy, const W: usize>(
    samples: &[T],
    out: &mut [u8],
    encode: impl Fn(T) -> [u8; W],
) -> usize {
    let mut written = 0;
    for (chunk, &sample) in out.chunks_exact_mut(W).zip(samples) {
        chunk.copy_from_slice(&encode(sample));
        written += W;
    }
    written
}

fn take_front<T>(v: &mut Vec<T>, n: usize) -> Vec<T> {
    let n = n.min(v.len());
    let rest = v.split_off(n);
    std::mem::replace(v, rest)
}

fn format_mismatch(expected: SampleFormat, got: SampleFormat) -> DecodeError {
    DecodeError::Internal(format!(
        "sample format mismatch: expected {}, got {}",
        expected, got
    ))
}

pub(crate) fn duration_secs(frames: u64, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    frames as f64 / sample_rate as f64
}

// ============================================================================
// Stream Information
// ============================================================================

/// Properties of an opened source, available before any samples are read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamInfo {
    /// File path, or `<memory>` for in-memory sources.
    pub name: String,
    /// Codec name: "wav", "flac", "mp3" or "vorbis".
    pub file_format: String,
    pub channels: u16,
    pub sample_rate: u32,
    /// Bytes per sample of `sample_format`.
    pub sample_width: usize,
    pub sample_format: SampleFormat,
    /// Seconds, `num_frames / sample_rate`.
    pub duration: f64,
    pub num_frames: u64,
    /// Largest packet in frames as reported by the codec, 0 if unknown.
    pub max_frame_size: usize,
}

impl std::fmt::Display for StreamInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} {}ch {}Hz {} ({:.3}s, {} frames)",
            self.name,
            self.file_format,
            self.channels,
            self.sample_rate,
            self.sample_format,
            self.duration,
            self.num_frames
        )
    }
}

// ============================================================================
// Decoded Audio
// ============================================================================

/// Fully decoded audio. The sample count is always a whole number of frames.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    name: String,
    channels: u16,
    sample_rate: u32,
    samples: Samples,
}

impl DecodedAudio {
    pub fn new(
        name: impl Into<String>,
        channels: u16,
        sample_rate: u32,
        samples: Samples,
    ) -> Result<Self> {
        if channels == 0 || samples.len() % channels as usize != 0 {
            return Err(DecodeError::CorruptFrames {
                samples: samples.len(),
                channels,
            });
        }
        Ok(Self {
            name: name.into(),
            channels,
            sample_rate,
            samples,
        })
    }

    /// Build from raw little-endian bytes in `format`.
    pub fn from_le_bytes(
        name: impl Into<String>,
        channels: u16,
        sample_rate: u32,
        format: SampleFormat,
        bytes: &[u8],
    ) -> Result<Self> {
        Self::new(
            name,
            channels,
            sample_rate,
            Samples::from_le_bytes(format, bytes)?,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.samples.format()
    }

    pub fn sample_width(&self) -> usize {
        self.samples.format().width()
    }

    pub fn num_frames(&self) -> u64 {
        self.samples.frames(self.channels) as u64
    }

    pub fn duration(&self) -> f64 {
        duration_secs(self.num_frames(), self.sample_rate)
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn into_samples(self) -> Samples {
        self.samples
    }
}

// ============================================================================
// PCM Chunk
// ============================================================================

/// One chunk of a PCM stream. Owns its samples.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmChunk {
    samples: Samples,
    channels: u16,
}

impl PcmChunk {
    pub fn new(samples: Samples, channels: u16) -> Result<Self> {
        if channels == 0 || samples.len() % channels as usize != 0 {
            return Err(DecodeError::CorruptFrames {
                samples: samples.len(),
                channels,
            });
        }
        Ok(Self { samples, channels })
    }

    pub fn frames(&self) -> usize {
        self.samples.frames(self.channels)
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn format(&self) -> SampleFormat {
        self.samples.format()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn into_samples(self) -> Samples {
        self.samples
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples.to_le_bytes()
    }
}
