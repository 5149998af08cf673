//! # Audio Decoder Module
//!
//! Codec adapters with one contract for WAV, FLAC, MP3 and Ogg Vorbis, plus
//! the extension-based dispatcher.
//!
//! ## Supported Formats
//!
//! | Format | Codec | Feature Flag | Native output |
//! |--------|-------|--------------|---------------|
//! | WAV | PCM | `decoder-wav` | source bit depth |
//! | FLAC | Free Lossless Audio Codec | `decoder-flac` | source bit depth |
//! | MP3 | MPEG-1/2 Audio Layer III | `decoder-mp3` | s16 |
//! | Vorbis | Ogg Vorbis | `decoder-vorbis` | s16 |
//!
//! ## Architecture
//!
//! ```text
//! SourceData → MediaSourceStream → FormatReader → Decoder → Samples
//! ```
//!
//! Every adapter is a [`CodecAdapter`] bound to one [`AdapterKind`]. Opening
//! a valid file of another codec through an adapter fails, so the per-codec
//! entry points never silently decode something else.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use core_decode::decoder::{AdapterKind, DecoderAdapter};
//! use core_decode::Samples;
//!
//! # fn example() -> core_decode::Result<()> {
//! let kind = AdapterKind::dispatch("song.flac")?;
//! let mut adapter = kind.open_file("song.flac", None)?;
//! let mut out = Samples::new(adapter.info().sample_format);
//! while adapter.read_frames(4096, &mut out)? > 0 {}
//! # Ok(())
//! # }
//! ```

mod engine;
pub mod format_detector;

pub mod flac;
pub mod mp3;
pub mod vorbis;
pub mod wav;

pub(crate) use engine::SourceData;

use crate::error::{DecodeError, Result};
use crate::samples::{duration_secs, Samples, StreamInfo};
use bridge_traits::audio::SampleFormat;
use bytes::Bytes;
use engine::{count_frames, SymphoniaEngine};
use format_detector::{hint_from_extension, validate_codec_support, CodecFamily};
use std::path::Path;
use tracing::{debug, info, instrument};

// ============================================================================
// Adapter Contract
// ============================================================================

/// An opened decoder for one source.
///
/// Reads append at most the requested number of frames; a read returning 0
/// means end of stream. After `close` every read returns 0.
pub trait DecoderAdapter: Send {
    /// Stream properties. Cheap; does not move the read position.
    fn info(&self) -> &StreamInfo;

    /// Append up to `max_frames` frames to `out`, which must be in
    /// `info().sample_format`. Returns the number of frames appended.
    fn read_frames(&mut self, max_frames: usize, out: &mut Samples) -> Result<usize>;

    /// Release the underlying reader. Further calls are no-ops.
    fn close(&mut self);

    fn is_closed(&self) -> bool;

    /// `true` when streams should refill with two back-to-back reads.
    fn double_buffered(&self) -> bool {
        false
    }
}

impl DecoderAdapter for Box<dyn DecoderAdapter> {
    fn info(&self) -> &StreamInfo {
        (**self).info()
    }

    fn read_frames(&mut self, max_frames: usize, out: &mut Samples) -> Result<usize> {
        (**self).read_frames(max_frames, out)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }

    fn double_buffered(&self) -> bool {
        (**self).double_buffered()
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// The codec an adapter is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    Wav,
    Flac,
    Mp3,
    Vorbis,
}

impl AdapterKind {
    /// Order in which unnamed in-memory sources are tried.
    pub const ALL: [AdapterKind; 4] = [
        AdapterKind::Wav,
        AdapterKind::Flac,
        AdapterKind::Mp3,
        AdapterKind::Vorbis,
    ];

    /// Select an adapter from a file name's extension, case-insensitively.
    ///
    /// `.ogg`/`.vorbis`, `.mp3`, `.flac` and `.wav` are recognised; the
    /// content is never sniffed.
    pub fn dispatch(filename: impl AsRef<Path>) -> Result<Self> {
        let path = filename.as_ref();
        Self::from_path(path).ok_or_else(|| {
            DecodeError::UnsupportedFormat(format!(
                "unsupported file format: {}",
                path.display()
            ))
        })
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "ogg" | "vorbis" => Some(AdapterKind::Vorbis),
            "mp3" => Some(AdapterKind::Mp3),
            "flac" => Some(AdapterKind::Flac),
            "wav" => Some(AdapterKind::Wav),
            _ => None,
        }
    }

    /// Codec name as reported in `StreamInfo::file_format`.
    pub const fn name(self) -> &'static str {
        match self {
            AdapterKind::Wav => "wav",
            AdapterKind::Flac => "flac",
            AdapterKind::Mp3 => "mp3",
            AdapterKind::Vorbis => "vorbis",
        }
    }

    /// Extension used as the probe hint.
    pub const fn extension(self) -> &'static str {
        match self {
            AdapterKind::Wav => "wav",
            AdapterKind::Flac => "flac",
            AdapterKind::Mp3 => "mp3",
            AdapterKind::Vorbis => "ogg",
        }
    }

    pub(crate) fn family(self) -> CodecFamily {
        match self {
            AdapterKind::Wav => CodecFamily::Pcm,
            AdapterKind::Flac => CodecFamily::Flac,
            AdapterKind::Mp3 => CodecFamily::Mp3,
            AdapterKind::Vorbis => CodecFamily::Vorbis,
        }
    }

    /// `true` when the matching `decoder-*` feature is compiled in.
    pub fn is_enabled(self) -> bool {
        validate_codec_support(self.family()).is_ok()
    }

    pub fn double_buffered(self) -> bool {
        matches!(self, AdapterKind::Vorbis)
    }

    /// Open a file with this adapter. `format` overrides the native output
    /// format.
    pub fn open_file(
        self,
        path: impl AsRef<Path>,
        format: Option<SampleFormat>,
    ) -> Result<CodecAdapter> {
        CodecAdapter::open(self, SourceData::File(path.as_ref().to_path_buf()), format)
    }

    /// Open encoded bytes with this adapter.
    pub fn open_memory(
        self,
        data: impl Into<Bytes>,
        format: Option<SampleFormat>,
    ) -> Result<CodecAdapter> {
        CodecAdapter::open(self, SourceData::Memory(data.into()), format)
    }
}

impl std::fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Open encoded bytes of unknown codec, trying every enabled adapter in
/// [`AdapterKind::ALL`] order.
pub fn open_memory_any(data: impl Into<Bytes>, format: Option<SampleFormat>) -> Result<CodecAdapter> {
    let data = data.into();
    let mut last_error = None;

    for kind in AdapterKind::ALL.into_iter().filter(|k| k.is_enabled()) {
        match CodecAdapter::open(kind, SourceData::Memory(data.clone()), format) {
            Ok(adapter) => return Ok(adapter),
            Err(e) => {
                debug!("{} adapter rejected memory source: {}", kind, e);
                last_error = Some(e);
            }
        }
    }

    Err(match last_error {
        Some(e) if e.is_format_error() => e,
        _ => DecodeError::Decode("could not decode memory: unrecognised format".to_string()),
    })
}

// ============================================================================
// Codec Adapter
// ============================================================================

/// A decoder adapter bound to one codec.
pub struct CodecAdapter {
    kind: AdapterKind,
    engine: Option<SymphoniaEngine>,
    info: StreamInfo,
}

impl CodecAdapter {
    #[instrument(skip(kind, source, format), fields(kind = kind.name(), source = %source))]
    pub(crate) fn open(
        kind: AdapterKind,
        source: SourceData,
        format: Option<SampleFormat>,
    ) -> Result<Self> {
        validate_codec_support(kind.family())?;

        let hint = hint_from_extension(kind.extension());
        let mut engine = SymphoniaEngine::open(&source, &hint)?;

        if engine.family() != kind.family() {
            return Err(DecodeError::Decode(format!(
                "could not decode {}: not a {} stream",
                source,
                kind.name()
            )));
        }

        // MP3 frame counts from Xing headers are not trusted.
        let num_frames = match (kind, engine.n_frames()) {
            (AdapterKind::Mp3, _) | (_, None) => count_frames(&source, &hint, engine.track_id())?,
            (_, Some(frames)) => frames,
        };

        let output_format = format.unwrap_or_else(|| engine.native_format());
        engine.set_output_format(output_format)?;

        let max_frame_size = match kind {
            AdapterKind::Mp3 => 0,
            _ => engine.max_frames_per_packet().unwrap_or(0) as usize,
        };

        let info = StreamInfo {
            name: source.name(),
            file_format: kind.name().to_string(),
            channels: engine.channels(),
            sample_rate: engine.sample_rate(),
            sample_width: output_format.width(),
            sample_format: output_format,
            duration: duration_secs(num_frames, engine.sample_rate()),
            num_frames,
            max_frame_size,
        };

        info!(
            channels = info.channels,
            sample_rate = info.sample_rate,
            frames = info.num_frames,
            format = %info.sample_format,
            "Opened {} decoder",
            kind
        );

        Ok(Self {
            kind,
            engine: Some(engine),
            info,
        })
    }

    pub fn kind(&self) -> AdapterKind {
        self.kind
    }

    /// Sample format matching the source's bit depth, regardless of the
    /// requested output format.
    pub fn native_format(&self) -> Option<SampleFormat> {
        self.engine.as_ref().map(|e| e.native_format())
    }

    /// Change the output format. Only valid before the first read.
    pub fn set_output_format(&mut self, format: SampleFormat) -> Result<()> {
        let engine = self.engine.as_mut().ok_or_else(|| {
            DecodeError::Internal("decoder is closed".to_string())
        })?;
        engine.set_output_format(format)?;
        self.info.sample_format = format;
        self.info.sample_width = format.width();
        Ok(())
    }
}

impl DecoderAdapter for CodecAdapter {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn read_frames(&mut self, max_frames: usize, out: &mut Samples) -> Result<usize> {
        match self.engine.as_mut() {
            Some(engine) => engine.read_frames(max_frames, out),
            None => Ok(0),
        }
    }

    fn close(&mut self) {
        if self.engine.take().is_some() {
            debug!("Closed {} decoder for {}", self.kind, self.info.name);
        }
    }

    fn is_closed(&self) -> bool {
        self.engine.is_none()
    }

    fn double_buffered(&self) -> bool {
        self.kind.double_buffered()
    }
}

impl Drop for CodecAdapter {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for CodecAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecAdapter")
            .field("kind", &self.kind)
            .field("info", &self.info)
            .field("closed", &self.is_closed())
            .finish()
    }
}
