//! # Format Conversion
//!
//! [`ConvertingDecoder`] wraps any [`DecoderAdapter`] and converts its output
//! to a target sample format, channel count and sample rate while reading.
//!
//! ## Pipeline
//!
//! ```text
//! inner samples → f32 → channel remix → FftFixedIn resampler → target format
//! ```
//!
//! - When the source already has the target channel count and sample rate,
//!   reads go straight to the inner adapter, which then produces the target
//!   format itself.
//! - Channel remix: mono is duplicated to every output channel, downmix to
//!   mono averages, other layouts copy matching channels and zero the rest.
//! - The resampler's output delay is dropped and the tail is flushed at end of
//!   stream, so the output has `round(frames_in * out_rate / in_rate)` frames.

use crate::config::{DecodeOptions, OutputSpec, StreamingConfig};
use crate::decoder::{AdapterKind, CodecAdapter, DecoderAdapter, SourceData};
use crate::error::{DecodeError, Result};
use crate::samples::{duration_secs, Samples, StreamInfo};
use bridge_traits::audio::SampleFormat;
use bytes::Bytes;
use rubato::{FftFixedIn, Resampler};
use tracing::debug;

/// Upper bound of flush passes once the input is exhausted.
const MAX_FLUSH_PASSES: usize = 16;

/// Frame count after converting from `in_rate` to `out_rate`, rounded.
pub fn scale_frames(frames: u64, in_rate: u32, out_rate: u32) -> u64 {
    if in_rate == out_rate || in_rate == 0 {
        return frames;
    }
    let scaled = (frames as u128 * out_rate as u128 + in_rate as u128 / 2) / in_rate as u128;
    scaled as u64
}

// ============================================================================
// Resampler State
// ============================================================================

struct ResampleState {
    resampler: FftFixedIn<f32>,
    channels: usize,
    in_rate: u32,
    out_rate: u32,
    /// Planar input not yet consumed by the resampler.
    input: Vec<Vec<f32>>,
    /// Leading output frames still to drop.
    delay: usize,
    frames_in: u64,
    frames_out: u64,
}

impl ResampleState {
    fn new(in_rate: u32, out_rate: u32, chunk_frames: usize, channels: usize) -> Result<Self> {
        let resampler = FftFixedIn::<f32>::new(
            in_rate as usize,
            out_rate as usize,
            chunk_frames,
            2,
            channels,
        )
        .map_err(|e| DecodeError::Resample(e.to_string()))?;
        let delay = resampler.output_delay();

        debug!(in_rate, out_rate, chunk_frames, delay, "Created resampler");

        Ok(Self {
            resampler,
            channels,
            in_rate,
            out_rate,
            input: vec![Vec::with_capacity(chunk_frames * 2); channels],
            delay,
            frames_in: 0,
            frames_out: 0,
        })
    }

    /// Queue interleaved input and run every complete chunk.
    fn push(&mut self, interleaved: &[f32], fifo: &mut Vec<f32>) -> Result<()> {
        for frame in interleaved.chunks_exact(self.channels) {
            for (plane, &sample) in self.input.iter_mut().zip(frame) {
                plane.push(sample);
            }
        }
        self.frames_in += (interleaved.len() / self.channels) as u64;

        loop {
            let needed = self.resampler.input_frames_next();
            if self.input[0].len() < needed {
                return Ok(());
            }

            let chunk: Vec<&[f32]> = self.input.iter().map(|plane| &plane[..needed]).collect();
            let output = self
                .resampler
                .process(&chunk, None)
                .map_err(|e| DecodeError::Resample(e.to_string()))?;

            for plane in &mut self.input {
                plane.drain(..needed);
            }
            self.emit(&output, fifo);
        }
    }

    /// Resample what is left, then trim to the exact output length.
    fn flush(&mut self, fifo: &mut Vec<f32>) -> Result<()> {
        let expected = scale_frames(self.frames_in, self.in_rate, self.out_rate);

        if !self.input[0].is_empty() {
            let output = self
                .resampler
                .process_partial(Some(self.input.as_slice()), None)
                .map_err(|e| DecodeError::Resample(e.to_string()))?;
            for plane in &mut self.input {
                plane.clear();
            }
            self.emit(&output, fifo);
        }

        let mut passes = 0;
        while self.frames_out < expected && passes < MAX_FLUSH_PASSES {
            let output = self
                .resampler
                .process_partial(None::<&[Vec<f32>]>, None)
                .map_err(|e| DecodeError::Resample(e.to_string()))?;
            self.emit(&output, fifo);
            passes += 1;
        }

        if self.frames_out > expected {
            let excess = (self.frames_out - expected) as usize * self.channels;
            fifo.truncate(fifo.len().saturating_sub(excess));
            self.frames_out = expected;
        }

        debug!(
            frames_in = self.frames_in,
            frames_out = self.frames_out,
            "Flushed resampler"
        );
        Ok(())
    }

    fn emit(&mut self, planar: &[Vec<f32>], fifo: &mut Vec<f32>) {
        let frames = planar.first().map_or(0, |plane| plane.len());
        let skip = self.delay.min(frames);
        self.delay -= skip;

        for i in skip..frames {
            for plane in planar {
                fifo.push(plane[i]);
            }
        }
        self.frames_out += (frames - skip) as u64;
    }
}

/// Remix interleaved frames from `in_channels` to `out_channels`.
fn remix(input: &[f32], in_channels: usize, out_channels: usize, out: &mut Vec<f32>) {
    if in_channels == out_channels {
        out.extend_from_slice(input);
        return;
    }

    for frame in input.chunks_exact(in_channels) {
        if in_channels == 1 {
            out.extend(std::iter::repeat(frame[0]).take(out_channels));
        } else if out_channels == 1 {
            out.push(frame.iter().sum::<f32>() / in_channels as f32);
        } else {
            out.extend((0..out_channels).map(|ch| frame.get(ch).copied().unwrap_or(0.0)));
        }
    }
}

// ============================================================================
// Converting Decoder
// ============================================================================

/// Decoder adapter producing a fixed target format, channel count and rate.
pub struct ConvertingDecoder {
    inner: Box<dyn DecoderAdapter>,
    info: StreamInfo,
    passthrough: bool,
    in_channels: usize,
    out_channels: usize,
    resampler: Option<ResampleState>,
    read_frames: usize,
    /// Inner samples of the current step.
    scratch: Samples,
    mixed: Vec<f32>,
    /// Converted interleaved output not yet handed out.
    fifo: Vec<f32>,
    flushed: bool,
}

impl ConvertingDecoder {
    pub fn new(inner: Box<dyn DecoderAdapter>, target: &DecodeOptions) -> Result<Self> {
        target
            .validate()
            .map_err(|e| DecodeError::Internal(format!("invalid decode options: {}", e)))?;

        let source = inner.info().clone();
        if source.channels == 0 || source.sample_rate == 0 {
            return Err(DecodeError::Decode(format!(
                "could not decode {}: invalid stream parameters",
                source.name
            )));
        }

        let passthrough = source.channels == target.channels
            && source.sample_rate == target.sample_rate
            && source.sample_format == target.format;

        let resampler = if source.sample_rate != target.sample_rate {
            Some(ResampleState::new(
                source.sample_rate,
                target.sample_rate,
                target.streaming.resample_chunk_frames,
                target.channels as usize,
            )?)
        } else {
            None
        };

        let num_frames = scale_frames(source.num_frames, source.sample_rate, target.sample_rate);
        let info = StreamInfo {
            channels: target.channels,
            sample_rate: target.sample_rate,
            sample_width: target.format.width(),
            sample_format: target.format,
            duration: duration_secs(num_frames, target.sample_rate),
            num_frames,
            ..source.clone()
        };

        debug!(
            passthrough,
            from = %source,
            to_channels = target.channels,
            to_rate = target.sample_rate,
            to_format = %target.format,
            "Created converting decoder"
        );

        Ok(Self {
            scratch: Samples::new(source.sample_format),
            inner,
            info,
            passthrough,
            in_channels: source.channels as usize,
            out_channels: target.channels as usize,
            resampler,
            read_frames: target.streaming.resample_chunk_frames,
            mixed: Vec::new(),
            fifo: Vec::new(),
            flushed: false,
        })
    }

    /// Open `source` with the `kind` adapter and convert it to `target`.
    ///
    /// When no channel or rate conversion is needed the adapter decodes
    /// straight to the target format; otherwise it decodes to f32.
    pub(crate) fn open(kind: AdapterKind, source: SourceData, target: &DecodeOptions) -> Result<Self> {
        let adapter = CodecAdapter::open(kind, source, None)?;
        Self::from_adapter(adapter, target)
    }

    /// Open `source` with the `kind` adapter; fields missing from `spec` keep
    /// the source's values, the format defaults to s16.
    pub(crate) fn open_with_spec(
        kind: AdapterKind,
        source: SourceData,
        spec: &OutputSpec,
        streaming: &StreamingConfig,
    ) -> Result<Self> {
        let adapter = CodecAdapter::open(kind, source, None)?;
        let info = adapter.info();
        let target = DecodeOptions::new(
            spec.format.unwrap_or(SampleFormat::S16),
            spec.channels.unwrap_or(info.channels),
            spec.sample_rate.unwrap_or(info.sample_rate),
        )
        .with_streaming(streaming.clone());
        Self::from_adapter(adapter, &target)
    }

    fn from_adapter(mut adapter: CodecAdapter, target: &DecodeOptions) -> Result<Self> {
        let info = adapter.info();
        if info.channels == target.channels && info.sample_rate == target.sample_rate {
            adapter.set_output_format(target.format)?;
        } else {
            adapter.set_output_format(SampleFormat::F32)?;
        }
        Self::new(Box::new(adapter), target)
    }

    /// Open encoded bytes of unknown codec, trying every enabled adapter.
    pub(crate) fn open_memory_any(data: Bytes, target: &DecodeOptions) -> Result<Self> {
        let mut last_error = None;
        for kind in AdapterKind::ALL.into_iter().filter(|k| k.is_enabled()) {
            match Self::open(kind, SourceData::Memory(data.clone()), target) {
                Ok(decoder) => return Ok(decoder),
                Err(e) => last_error = Some(e),
            }
        }
        Err(match last_error {
            Some(e) if e.is_format_error() => e,
            _ => DecodeError::Decode("could not decode memory: unrecognised format".to_string()),
        })
    }

    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    /// Pull inner samples through the pipeline until `frames` output frames
    /// are buffered or the input is exhausted.
    fn fill(&mut self, frames: usize) -> Result<()> {
        let wanted = frames * self.out_channels;

        while self.fifo.len() < wanted && !self.flushed {
            self.scratch.clear();
            let n = self.inner.read_frames(self.read_frames, &mut self.scratch)?;
            if n == 0 {
                if let Some(resampler) = self.resampler.as_mut() {
                    resampler.flush(&mut self.fifo)?;
                }
                self.flushed = true;
                break;
            }

            let floats = self.scratch.to_f32_vec();
            self.mixed.clear();
            remix(&floats, self.in_channels, self.out_channels, &mut self.mixed);

            match self.resampler.as_mut() {
                Some(resampler) => resampler.push(&self.mixed, &mut self.fifo)?,
                None => self.fifo.extend_from_slice(&self.mixed),
            }
        }
        Ok(())
    }
}

impl DecoderAdapter for ConvertingDecoder {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn read_frames(&mut self, max_frames: usize, out: &mut Samples) -> Result<usize> {
        if self.passthrough {
            return self.inner.read_frames(max_frames, out);
        }
        if self.inner.is_closed() {
            return Ok(0);
        }
        if out.format() != self.info.sample_format {
            return Err(DecodeError::Internal(format!(
                "read buffer is {}, decoder produces {}",
                out.format(),
                self.info.sample_format
            )));
        }

        self.fill(max_frames)?;

        let frames = max_frames.min(self.fifo.len() / self.out_channels);
        let samples = frames * self.out_channels;
        out.extend_from_f32(&self.fifo[..samples]);
        self.fifo.drain(..samples);
        Ok(frames)
    }

    fn close(&mut self) {
        self.inner.close();
        self.fifo = Vec::new();
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn double_buffered(&self) -> bool {
        self.inner.double_buffered()
    }
}
