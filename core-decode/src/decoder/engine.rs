//! # Symphonia Decode Engine
//!
//! Packet-level decoding shared by every codec adapter.
//!
//! The engine owns the container reader and the codec decoder for one track,
//! converts each decoded packet to interleaved samples of the requested
//! output format and hands them out in frame-exact slices.

use crate::decoder::format_detector::{detect_codec, is_float_pcm, CodecFamily};
use crate::error::{DecodeError, Result};
use crate::samples::Samples;
use bridge_traits::audio::SampleFormat;
use bytes::Bytes;
use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;
use symphonia::core::audio::{AudioBufferRef, SampleBuffer};
use symphonia::core::codecs::{CodecParameters, Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, error, warn};

const MAX_CONSECUTIVE_ERRORS: usize = 10;

/// Where encoded bytes come from.
#[derive(Clone)]
pub(crate) enum SourceData {
    File(PathBuf),
    Memory(Bytes),
}

impl SourceData {
    /// Identifier reported in `StreamInfo::name`.
    pub(crate) fn name(&self) -> String {
        match self {
            SourceData::File(path) => path.display().to_string(),
            SourceData::Memory(_) => "<memory>".to_string(),
        }
    }

    fn media_stream(&self) -> Result<MediaSourceStream> {
        let source: Box<dyn MediaSource> = match self {
            SourceData::File(path) => {
                let file = std::fs::File::open(path).map_err(|e| {
                    error!("Failed to open file {:?}: {}", path, e);
                    DecodeError::Decode(format!("could not open file {}: {}", self, e))
                })?;
                Box::new(file)
            }
            SourceData::Memory(data) => Box::new(Cursor::new(data.clone())),
        };
        Ok(MediaSourceStream::new(source, Default::default()))
    }

    fn probe(&self, hint: &Hint) -> Result<Box<dyn FormatReader>> {
        let stream = self.media_stream()?;
        let probed = symphonia::default::get_probe()
            .format(
                hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                debug!("Format probe failed for {}: {}", self, e);
                DecodeError::Decode(format!("could not decode {}: {}", self, e))
            })?;
        Ok(probed.format)
    }
}

impl fmt::Display for SourceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceData::File(path) => {
                let name = path.display().to_string();
                f.write_str(core_runtime::logging::strip_path(&name))
            }
            SourceData::Memory(data) => write!(f, "<memory: {} bytes>", data.len()),
        }
    }
}

/// Reader plus decoder for the first audio track of a source.
pub(crate) struct SymphoniaEngine {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    family: CodecFamily,
    params: CodecParameters,
    channels: u16,
    sample_rate: u32,
    output_format: SampleFormat,
    /// Decoded samples not yet handed out.
    pending: Samples,
    position_frames: u64,
    eof: bool,
}

impl SymphoniaEngine {
    pub(crate) fn open(source: &SourceData, hint: &Hint) -> Result<Self> {
        let reader = source.probe(hint)?;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| {
                DecodeError::Decode(format!("could not decode {}: no audio track", source))
            })?;

        let track_id = track.id;
        let params = track.codec_params.clone();
        let family = detect_codec(params.codec);

        let sample_rate = params.sample_rate.ok_or_else(|| {
            DecodeError::Decode(format!("could not decode {}: missing sample rate", source))
        })?;

        // Channels may only be known after the first decode; stereo until then.
        let channels = params.channels.map(|ch| ch.count() as u16).unwrap_or(2);

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| {
                debug!("Failed to create decoder: {}", e);
                DecodeError::UnsupportedCodec(format!("{:?}: {}", family, e))
            })?;

        let output_format = native_format(family, &params);
        debug!(
            track_id,
            sample_rate,
            channels,
            format = %output_format,
            "Opened track {:?}",
            family
        );

        Ok(Self {
            reader,
            decoder,
            track_id,
            family,
            params,
            channels,
            sample_rate,
            output_format,
            pending: Samples::new(output_format),
            position_frames: 0,
            eof: false,
        })
    }

    pub(crate) fn family(&self) -> CodecFamily {
        self.family
    }

    pub(crate) fn track_id(&self) -> u32 {
        self.track_id
    }

    pub(crate) fn channels(&self) -> u16 {
        self.channels
    }

    pub(crate) fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frame count from the container, if it has one.
    pub(crate) fn n_frames(&self) -> Option<u64> {
        self.params.n_frames
    }

    pub(crate) fn max_frames_per_packet(&self) -> Option<u64> {
        self.params.max_frames_per_packet
    }

    /// Sample format matching the source's bit depth.
    pub(crate) fn native_format(&self) -> SampleFormat {
        native_format(self.family, &self.params)
    }

    /// Change the output format. Only valid before the first read.
    pub(crate) fn set_output_format(&mut self, format: SampleFormat) -> Result<()> {
        if self.position_frames > 0 || !self.pending.is_empty() {
            return Err(DecodeError::Internal(
                "output format can only change before the first read".to_string(),
            ));
        }
        self.output_format = format;
        self.pending = Samples::new(format);
        Ok(())
    }

    /// Append up to `max_frames` frames to `out`. Returns 0 at end of stream.
    pub(crate) fn read_frames(&mut self, max_frames: usize, out: &mut Samples) -> Result<usize> {
        if out.format() != self.output_format {
            return Err(DecodeError::Internal(format!(
                "read buffer is {}, decoder produces {}",
                out.format(),
                self.output_format
            )));
        }

        while self.pending.frames(self.channels) < max_frames && self.decode_next_packet()? {}

        let channels = self.channels as usize;
        let frames = max_frames.min(self.pending.frames(self.channels));
        self.pending.drain_front_into(frames * channels, out)?;
        self.position_frames += frames as u64;
        Ok(frames)
    }

    /// Decode the next packet of the selected track into `pending`.
    ///
    /// Corrupted packets are skipped; returns `false` at end of stream.
    fn decode_next_packet(&mut self) -> Result<bool> {
        if self.eof {
            return Ok(false);
        }

        let mut consecutive_errors = 0;

        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of stream at {} frames", self.position_frames);
                    self.eof = true;
                    return Ok(false);
                }
                Err(SymphoniaError::ResetRequired) => {
                    return Err(DecodeError::Decode(
                        "track list changed, reset required".to_string(),
                    ));
                }
                Err(SymphoniaError::IoError(e)) => {
                    consecutive_errors += 1;
                    warn!(
                        "I/O error reading packet (attempt {}/{}): {}",
                        consecutive_errors, MAX_CONSECUTIVE_ERRORS, e
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        return Err(DecodeError::Decode(format!(
                            "stream I/O failure after {} attempts: {}",
                            MAX_CONSECUTIVE_ERRORS, e
                        )));
                    }
                    continue;
                }
                Err(e) => {
                    error!("Fatal format reader error: {}", e);
                    return Err(DecodeError::Decode(format!("failed to read packet: {}", e)));
                }
            };

            while !self.reader.metadata().is_latest() {
                self.reader.metadata().pop();
            }

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let decoded_channels = decoded.spec().channels.count() as u16;
                    if decoded_channels != self.channels && self.pending.is_empty() {
                        debug!(
                            "Updating channel count from {} to {} (detected from decoded audio)",
                            self.channels, decoded_channels
                        );
                        self.channels = decoded_channels;
                    }
                    append_interleaved(&mut self.pending, decoded);
                    return Ok(true);
                }
                Err(SymphoniaError::DecodeError(err)) => {
                    consecutive_errors += 1;
                    warn!(
                        "Skipping packet with decode error (attempt {}/{}): {}",
                        consecutive_errors, MAX_CONSECUTIVE_ERRORS, err
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        return Err(DecodeError::Decode(format!(
                            "stream corruption after {} failed packets",
                            MAX_CONSECUTIVE_ERRORS
                        )));
                    }
                }
                Err(SymphoniaError::IoError(err)) => {
                    consecutive_errors += 1;
                    warn!(
                        "Skipping corrupted packet (I/O error, attempt {}/{}): {}",
                        consecutive_errors, MAX_CONSECUTIVE_ERRORS, err
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        return Err(DecodeError::Decode(format!(
                            "stream corruption after {} failed packets",
                            MAX_CONSECUTIVE_ERRORS
                        )));
                    }
                }
                Err(e) => {
                    error!("Fatal decode error: {}", e);
                    return Err(DecodeError::Decode(format!("failed to decode packet: {}", e)));
                }
            }
        }
    }
}

/// Convert one decoded packet to interleaved samples of `pending`'s format.
fn append_interleaved(pending: &mut Samples, decoded: AudioBufferRef<'_>) {
    let duration = decoded.capacity() as u64;
    let spec = *decoded.spec();

    match pending {
        Samples::U8(v) => {
            let mut buf = SampleBuffer::<u8>::new(duration, spec);
            buf.copy_interleaved_ref(decoded);
            v.extend_from_slice(buf.samples());
        }
        Samples::S16(v) => {
            let mut buf = SampleBuffer::<i16>::new(duration, spec);
            buf.copy_interleaved_ref(decoded);
            v.extend_from_slice(buf.samples());
        }
        Samples::S32(v) => {
            let mut buf = SampleBuffer::<i32>::new(duration, spec);
            buf.copy_interleaved_ref(decoded);
            v.extend_from_slice(buf.samples());
        }
        Samples::F32(v) => {
            let mut buf = SampleBuffer::<f32>::new(duration, spec);
            buf.copy_interleaved_ref(decoded);
            v.extend_from_slice(buf.samples());
        }
    }
}

/// Sample format preserving the source's bit depth.
///
/// Lossy codecs decode to 16-bit; 24-bit sources widen to left-justified
/// 32-bit.
fn native_format(family: CodecFamily, params: &CodecParameters) -> SampleFormat {
    match family {
        CodecFamily::Mp3 | CodecFamily::Vorbis => SampleFormat::S16,
        _ if is_float_pcm(params.codec) => SampleFormat::F32,
        _ => match params.bits_per_sample {
            Some(bits) if bits <= 8 => SampleFormat::U8,
            Some(bits) if bits <= 16 => SampleFormat::S16,
            Some(_) => SampleFormat::S32,
            None => SampleFormat::S16,
        },
    }
}

/// Total frames of a track, summed from packet durations on a fresh reader.
///
/// Used when the container does not state a frame count, and for MP3 where
/// the stated count is not trusted.
pub(crate) fn count_frames(source: &SourceData, hint: &Hint, track_id: u32) -> Result<u64> {
    let mut reader = source.probe(hint)?;
    let mut total = 0u64;

    loop {
        match reader.next_packet() {
            Ok(packet) => {
                if packet.track_id() == track_id {
                    total += packet.dur;
                }
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                warn!("Frame count scan of {} stopped early: {}", source, e);
                break;
            }
        }
    }

    debug!(frames = total, "Scanned frame count of {}", source);
    Ok(total)
}
