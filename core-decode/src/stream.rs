//! # Streaming Decode Engine
//!
//! [`PcmStream`] pulls bounded chunks of PCM from a decoder adapter.
//!
//! ## Overview
//!
//! - Chunks are requested by frame count; a request of 0 (or `None`) uses
//!   `frames_to_read` from the [`StreamingConfig`].
//! - Requests above the preallocated capacity fail with
//!   [`DecodeError::CapacityExceeded`] without advancing the stream.
//! - The decoder is closed exactly once: when the source is exhausted, when a
//!   read fails, or when the stream is dropped.
//! - Double-buffered adapters (Vorbis) refill with two back-to-back reads so
//!   the next chunk is already decoded when it is asked for.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use core_decode::{stream_file, DecodeOptions};
//!
//! # fn example() -> core_decode::Result<()> {
//! let stream = stream_file("song.ogg", &DecodeOptions::default())?;
//! for chunk in stream {
//!     let chunk = chunk?;
//!     println!("{} frames", chunk.frames());
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::{DecodeOptions, StreamingConfig};
use crate::convert::ConvertingDecoder;
use crate::decoder::{AdapterKind, DecoderAdapter, SourceData};
use crate::error::{DecodeError, Result};
use crate::samples::{PcmChunk, Samples, StreamInfo};
use bytes::Bytes;
use std::path::Path;
use tracing::{debug, instrument, warn};

/// Lazily decoded PCM, one chunk at a time.
pub struct PcmStream {
    decoder: Option<Box<dyn DecoderAdapter>>,
    info: StreamInfo,
    config: StreamingConfig,
    capacity: usize,
    double_buffered: bool,
    /// Decoded frames not yet handed out.
    staging: Samples,
    frames_delivered: u64,
    failed: bool,
}

impl PcmStream {
    pub fn new(decoder: Box<dyn DecoderAdapter>, config: StreamingConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| DecodeError::Internal(format!("invalid streaming config: {}", e)))?;

        let info = decoder.info().clone();
        let capacity = config.capacity_frames();
        let double_buffered = decoder.double_buffered();
        let buffers = if double_buffered { 2 } else { 1 };
        let staging = Samples::with_capacity(
            info.sample_format,
            capacity * info.channels as usize * buffers,
        );

        debug!(
            capacity,
            double_buffered,
            frames_to_read = config.frames_to_read,
            "Created PCM stream for {}",
            info.name
        );

        Ok(Self {
            decoder: Some(decoder),
            info,
            config,
            capacity,
            double_buffered,
            staging,
            frames_delivered: 0,
            failed: false,
        })
    }

    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    /// Largest chunk in frames a single request may ask for.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn frames_delivered(&self) -> u64 {
        self.frames_delivered
    }

    /// `true` once the decoder has been released.
    pub fn is_closed(&self) -> bool {
        self.decoder.is_none()
    }

    /// Next chunk of `frames_to_read` frames.
    pub fn next_chunk(&mut self) -> Result<Option<PcmChunk>> {
        self.next_frames(None)
    }

    /// Next chunk of at most `frames` frames; `None` or 0 means the default.
    ///
    /// Returns `Ok(None)` once the source is exhausted. Only the final chunk
    /// may be shorter than requested.
    pub fn next_frames(&mut self, frames: Option<usize>) -> Result<Option<PcmChunk>> {
        let requested = match frames {
            None | Some(0) => self.config.frames_to_read,
            Some(n) => n,
        };
        if requested > self.capacity {
            return Err(DecodeError::CapacityExceeded {
                requested,
                capacity: self.capacity,
            });
        }
        if self.failed {
            return Ok(None);
        }

        let channels = self.info.channels as usize;
        if self.staging.frames(self.info.channels) < requested {
            if let Err(e) = self.refill(requested) {
                warn!("Decoding {} failed: {}", self.info.name, e);
                self.failed = true;
                self.staging.clear();
                self.close();
                return Err(e);
            }
        }

        let frames = requested.min(self.staging.frames(self.info.channels));
        if frames == 0 {
            self.close();
            return Ok(None);
        }

        let mut samples = Samples::with_capacity(self.info.sample_format, frames * channels);
        self.staging.drain_front_into(frames * channels, &mut samples)?;
        self.frames_delivered += frames as u64;

        PcmChunk::new(samples, self.info.channels).map(Some)
    }

    /// Read until `requested` frames (two buffers' worth when double
    /// buffered) are staged, closing the decoder at end of stream.
    fn refill(&mut self, requested: usize) -> Result<()> {
        let Some(decoder) = self.decoder.as_mut() else {
            return Ok(());
        };

        let target = if self.double_buffered {
            requested * 2
        } else {
            requested
        };

        let mut exhausted = false;
        loop {
            let staged = self.staging.frames(self.info.channels);
            if staged >= target {
                break;
            }
            let n = decoder.read_frames(target - staged, &mut self.staging)?;
            if n == 0 {
                exhausted = true;
                break;
            }
        }

        if exhausted {
            debug!(
                frames = self.frames_delivered + self.staging.frames(self.info.channels) as u64,
                "Reached end of {}",
                self.info.name
            );
            self.close();
        }
        Ok(())
    }

    /// Release the decoder. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(mut decoder) = self.decoder.take() {
            decoder.close();
            debug!("Closed PCM stream for {}", self.info.name);
        }
    }
}

impl Iterator for PcmStream {
    type Item = Result<PcmChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}

impl std::iter::FusedIterator for PcmStream {}

impl Drop for PcmStream {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for PcmStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcmStream")
            .field("info", &self.info)
            .field("capacity", &self.capacity)
            .field("frames_delivered", &self.frames_delivered)
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================================================
// Entry Points
// ============================================================================

/// Stream a file converted to `options`' format, channels and sample rate.
///
/// The adapter is selected by the file extension.
#[instrument(skip(path, options), fields(path = %path.as_ref().display()))]
pub fn stream_file(path: impl AsRef<Path>, options: &DecodeOptions) -> Result<PcmStream> {
    let path = path.as_ref();
    let kind = AdapterKind::dispatch(path)?;
    let decoder = ConvertingDecoder::open(kind, SourceData::File(path.to_path_buf()), options)?;
    PcmStream::new(Box::new(decoder), options.streaming.clone())
}

/// Stream encoded bytes converted to `options`' format, channels and sample
/// rate. The codec is found by trying each adapter in turn.
#[instrument(skip(data, options))]
pub fn stream_memory(data: impl Into<Bytes>, options: &DecodeOptions) -> Result<PcmStream> {
    let decoder = ConvertingDecoder::open_memory_any(data.into(), options)?;
    PcmStream::new(Box::new(decoder), options.streaming.clone())
}

/// Stream a file through the `kind` adapter in its native output format.
pub(crate) fn stream_native(
    kind: AdapterKind,
    source: SourceData,
    format: Option<bridge_traits::audio::SampleFormat>,
    config: &StreamingConfig,
) -> Result<PcmStream> {
    let adapter = crate::decoder::CodecAdapter::open(kind, source, format)?;
    PcmStream::new(Box::new(adapter), config.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::duration_secs;
    use bridge_traits::audio::SampleFormat;
    use mockall::mock;
    use mockall::predicate::*;

    mock! {
        Adapter {}

        impl DecoderAdapter for Adapter {
            fn info(&self) -> &StreamInfo;
            fn read_frames(&mut self, max_frames: usize, out: &mut Samples) -> Result<usize>;
            fn close(&mut self);
            fn is_closed(&self) -> bool;
            fn double_buffered(&self) -> bool;
        }
    }

    fn info(frames: u64) -> StreamInfo {
        StreamInfo {
            name: "mock".to_string(),
            file_format: "wav".to_string(),
            channels: 2,
            sample_rate: 44100,
            sample_width: 2,
            sample_format: SampleFormat::S16,
            duration: duration_secs(frames, 44100),
            num_frames: frames,
            max_frame_size: 0,
        }
    }

    /// Mock producing `total` frames of a counter, closed exactly once.
    fn counting_adapter(total: usize, double_buffered: bool) -> MockAdapter {
        let mut adapter = MockAdapter::new();
        adapter.expect_info().return_const(info(total as u64));
        adapter
            .expect_double_buffered()
            .return_const(double_buffered);
        let mut produced = 0usize;
        adapter
            .expect_read_frames()
            .returning(move |max_frames, out| {
                let n = max_frames.min(total - produced);
                if let Samples::S16(v) = out {
                    for i in produced..produced + n {
                        v.push(i as i16);
                        v.push(-(i as i16));
                    }
                }
                produced += n;
                Ok(n)
            });
        adapter.expect_close().times(1).return_const(());
        adapter
    }

    #[test]
    fn test_chunks_cover_stream_and_close_once() {
        let adapter = counting_adapter(2500, false);
        let mut stream = PcmStream::new(Box::new(adapter), StreamingConfig::default()).unwrap();

        let sizes: Vec<usize> = stream
            .by_ref()
            .map(|chunk| chunk.unwrap().frames())
            .collect();
        assert_eq!(sizes, vec![1024, 1024, 452]);
        assert!(stream.is_closed());
        assert_eq!(stream.frames_delivered(), 2500);

        // Fused.
        assert!(stream.next_chunk().unwrap().is_none());
    }

    #[test]
    fn test_custom_request_sizes() {
        let adapter = counting_adapter(100, false);
        let mut stream = PcmStream::new(Box::new(adapter), StreamingConfig::default()).unwrap();

        let chunk = stream.next_frames(Some(30)).unwrap().unwrap();
        assert_eq!(chunk.frames(), 30);
        assert_eq!(chunk.samples().as_i16().unwrap()[..4], [0, 0, 1, -1]);

        let chunk = stream.next_frames(Some(0)).unwrap().unwrap();
        assert_eq!(chunk.frames(), 70);
        assert!(stream.next_frames(Some(5)).unwrap().is_none());
    }

    #[test]
    fn test_capacity_exceeded_does_not_advance() {
        let adapter = counting_adapter(100, false);
        let mut stream = PcmStream::new(Box::new(adapter), StreamingConfig::default()).unwrap();

        let err = stream.next_frames(Some(20_000)).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::CapacityExceeded {
                requested: 20_000,
                capacity: 16384
            }
        ));

        let chunk = stream.next_frames(Some(10)).unwrap().unwrap();
        assert_eq!(chunk.samples().as_i16().unwrap()[0], 0);
    }

    #[test]
    fn test_double_buffered_prefetches() {
        let adapter = counting_adapter(5000, true);
        let mut stream = PcmStream::new(Box::new(adapter), StreamingConfig::default()).unwrap();

        let chunk = stream.next_chunk().unwrap().unwrap();
        assert_eq!(chunk.frames(), 1024);
        // The second buffer is already staged.
        assert_eq!(stream.staging.frames(2), 1024);

        let total: usize = stream.map(|c| c.unwrap().frames()).sum();
        assert_eq!(total, 5000 - 1024);
    }

    #[test]
    fn test_read_error_closes_decoder() {
        let mut adapter = MockAdapter::new();
        adapter.expect_info().return_const(info(10));
        adapter.expect_double_buffered().return_const(false);
        adapter
            .expect_read_frames()
            .with(eq(1024), always())
            .returning(|_, _| Err(DecodeError::Decode("corrupt".to_string())));
        adapter.expect_close().times(1).return_const(());

        let mut stream = PcmStream::new(Box::new(adapter), StreamingConfig::default()).unwrap();
        assert!(stream.next_chunk().is_err());
        assert!(stream.is_closed());
        assert!(stream.next_chunk().unwrap().is_none());
    }

    #[test]
    fn test_drop_closes_unfinished_stream() {
        let adapter = counting_adapter(10_000, false);
        let mut stream = PcmStream::new(Box::new(adapter), StreamingConfig::default()).unwrap();
        stream.next_chunk().unwrap();
        drop(stream);
    }

    #[test]
    fn test_empty_source() {
        let adapter = counting_adapter(0, false);
        let mut stream = PcmStream::new(Box::new(adapter), StreamingConfig::default()).unwrap();
        assert!(stream.next_chunk().unwrap().is_none());
        assert!(stream.is_closed());
    }
}
