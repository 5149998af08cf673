//! # Decode Configuration
//!
//! Output targets and streaming buffer sizes for the decode engines.

use bridge_traits::audio::SampleFormat;
use serde::{Deserialize, Serialize};

// ============================================================================
// Streaming
// ============================================================================

/// Chunking and buffer sizes of a [`PcmStream`](crate::PcmStream).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Frames returned by `next_chunk` and by a request of 0 frames.
    ///
    /// Default: 1024 frames (~23ms at 44.1kHz).
    #[serde(default = "default_frames_to_read")]
    pub frames_to_read: usize,

    /// Lower bound of the preallocated chunk capacity, in frames. The stream
    /// capacity is `max(frames_to_read, min_capacity_frames)`.
    ///
    /// Default: 16384 frames.
    #[serde(default = "default_min_capacity_frames")]
    pub min_capacity_frames: usize,

    /// Input frames fed to the resampler per step when the sample rate is
    /// converted.
    ///
    /// Default: 1024 frames.
    #[serde(default = "default_resample_chunk_frames")]
    pub resample_chunk_frames: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            frames_to_read: default_frames_to_read(),
            min_capacity_frames: default_min_capacity_frames(),
            resample_chunk_frames: default_resample_chunk_frames(),
        }
    }
}

impl StreamingConfig {
    /// Small chunks for interactive playback.
    pub fn low_latency() -> Self {
        Self {
            frames_to_read: 256,
            resample_chunk_frames: 256,
            ..Default::default()
        }
    }

    /// Large chunks for offline rendering.
    pub fn high_throughput() -> Self {
        Self {
            frames_to_read: 8192,
            min_capacity_frames: 65536,
            resample_chunk_frames: 4096,
        }
    }

    pub fn with_frames_to_read(mut self, frames: usize) -> Self {
        self.frames_to_read = frames;
        self
    }

    /// Chunk capacity in frames.
    pub fn capacity_frames(&self) -> usize {
        self.frames_to_read.max(self.min_capacity_frames)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.frames_to_read == 0 {
            return Err("frames_to_read must be > 0".to_string());
        }

        if self.resample_chunk_frames == 0 {
            return Err("resample_chunk_frames must be > 0".to_string());
        }

        Ok(())
    }
}

fn default_frames_to_read() -> usize {
    1024
}

fn default_min_capacity_frames() -> usize {
    16384
}

fn default_resample_chunk_frames() -> usize {
    1024
}

// ============================================================================
// Decode Targets
// ============================================================================

/// Target of a converting decode: every source is turned into this format,
/// channel count and sample rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeOptions {
    #[serde(default)]
    pub format: SampleFormat,

    #[serde(default = "default_channels")]
    pub channels: u16,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default)]
    pub streaming: StreamingConfig,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            format: SampleFormat::default(),
            channels: default_channels(),
            sample_rate: default_sample_rate(),
            streaming: StreamingConfig::default(),
        }
    }
}

impl DecodeOptions {
    pub fn new(format: SampleFormat, channels: u16, sample_rate: u32) -> Self {
        Self {
            format,
            channels,
            sample_rate,
            ..Default::default()
        }
    }

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

    pub fn with_streaming(mut self, streaming: StreamingConfig) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.channels == 0 {
            return Err("channels must be > 0".to_string());
        }
        if self.sample_rate == 0 {
            return Err("sample_rate must be > 0".to_string());
        }
        self.streaming.validate()
    }
}

fn default_channels() -> u16 {
    2
}

fn default_sample_rate() -> u32 {
    44100
}

/// Output request for codecs that can convert while decoding (MP3, Vorbis).
///
/// A `None` field keeps the source's value; the default keeps the source's
/// channels and rate and produces signed 16-bit samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputSpec {
    pub format: Option<SampleFormat>,
    pub channels: Option<u16>,
    pub sample_rate: Option<u32>,
}

impl OutputSpec {
    pub fn with_format(mut self, format: SampleFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn is_native(&self) -> bool {
        self.channels.is_none() && self.sample_rate.is_none()
    }
}
