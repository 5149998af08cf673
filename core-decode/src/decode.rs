//! # Whole-File Decoding
//!
//! Decode a complete source into one [`DecodedAudio`], either keeping the
//! container's native layout or converting to a target format in one pass.

use crate::config::DecodeOptions;
use crate::convert::ConvertingDecoder;
use crate::decoder::{AdapterKind, CodecAdapter, DecoderAdapter, SourceData};
use crate::error::Result;
use crate::samples::{DecodedAudio, Samples, StreamInfo};
use bridge_traits::audio::SampleFormat;
use bytes::Bytes;
use std::path::Path;
use tracing::{debug, instrument};

/// Frames requested per read while draining a decoder.
const READ_ALL_FRAMES: usize = 16384;

/// Upper bound on the samples reserved up front from a header's frame
/// count (about one minute of 48 kHz stereo). Longer sources grow the
/// buffer as they decode.
const MAX_RESERVED_SAMPLES: usize = 1 << 22;

/// Samples to reserve for `num_frames` frames of `channels` channels.
fn reserve_hint(num_frames: u64, channels: u16) -> usize {
    usize::try_from(num_frames)
        .ok()
        .and_then(|frames| frames.checked_mul(channels as usize))
        .map_or(MAX_RESERVED_SAMPLES, |n| n.min(MAX_RESERVED_SAMPLES))
}

/// Stream properties of a file, without decoding it.
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn get_file_info(path: impl AsRef<Path>) -> Result<StreamInfo> {
    let path = path.as_ref();
    let adapter = AdapterKind::dispatch(path)?.open_file(path, None)?;
    Ok(adapter.info().clone())
}

/// Decode a whole file in its native sample format, channels and rate.
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn read_file(path: impl AsRef<Path>) -> Result<DecodedAudio> {
    let path = path.as_ref();
    let mut adapter = AdapterKind::dispatch(path)?.open_file(path, None)?;
    read_all(&mut adapter)
}

/// Decode a whole file converted to `options`' format, channels and rate.
#[instrument(skip(path, options), fields(path = %path.as_ref().display()))]
pub fn decode_file(path: impl AsRef<Path>, options: &DecodeOptions) -> Result<DecodedAudio> {
    let path = path.as_ref();
    let kind = AdapterKind::dispatch(path)?;
    let mut decoder = ConvertingDecoder::open(kind, SourceData::File(path.to_path_buf()), options)?;
    read_all(&mut decoder)
}

/// Decode encoded bytes converted to `options`' format, channels and rate.
#[instrument(skip(data, options))]
pub fn decode_memory(data: impl Into<Bytes>, options: &DecodeOptions) -> Result<DecodedAudio> {
    let mut decoder = ConvertingDecoder::open_memory_any(data.into(), options)?;
    read_all(&mut decoder)
}

/// Drain `decoder` into one [`DecodedAudio`] and close it.
pub fn read_all<D: DecoderAdapter + ?Sized>(decoder: &mut D) -> Result<DecodedAudio> {
    let info = decoder.info().clone();
    let mut samples = Samples::with_capacity(
        info.sample_format,
        reserve_hint(info.num_frames, info.channels),
    );

    let result = loop {
        match decoder.read_frames(READ_ALL_FRAMES, &mut samples) {
            Ok(0) => break Ok(()),
            Ok(_) => {}
            Err(e) => break Err(e),
        }
    };
    decoder.close();
    result?;

    debug!(
        frames = samples.frames(info.channels),
        expected_frames = info.num_frames,
        "Decoded {}",
        info.name
    );
    DecodedAudio::new(info.name, info.channels, info.sample_rate, samples)
}

// ============================================================================
// Per-codec helpers
// ============================================================================

pub(crate) fn native_info(kind: AdapterKind, source: SourceData) -> Result<StreamInfo> {
    let adapter = CodecAdapter::open(kind, source, None)?;
    Ok(adapter.info().clone())
}

pub(crate) fn native_read(
    kind: AdapterKind,
    source: SourceData,
    format: Option<SampleFormat>,
) -> Result<DecodedAudio> {
    let mut adapter = CodecAdapter::open(kind, source, format)?;
    read_all(&mut adapter)
}
