//! # Decode Module
//!
//! Uniform decoding of WAV, FLAC, MP3 and Ogg Vorbis into linear PCM.
//!
//! ## Overview
//!
//! This crate handles:
//! - Whole-file decoding, native or converted to a target format, channel
//!   count and sample rate ([`read_file`], [`decode_file`], [`decode_memory`])
//! - Lazy decoding in bounded chunks ([`stream_file`], [`stream_memory`],
//!   [`PcmStream`])
//! - Per-codec entry points ([`wav`], [`flac`], [`mp3`], [`vorbis`])
//! - WAV output ([`write_wav`], [`WavReadStream`])
//!
//! Codecs are feature-gated (`decoder-wav`, `decoder-flac`, `decoder-mp3`,
//! `decoder-vorbis`, all on by default).
//!
//! ## Example
//!
//! ```rust,no_run
//! use core_decode::{decode_file, DecodeOptions, SampleFormat};
//!
//! # fn example() -> core_decode::Result<()> {
//! let options = DecodeOptions::new(SampleFormat::F32, 2, 48000);
//! let audio = decode_file("song.mp3", &options)?;
//! println!("{} frames, {:.2}s", audio.num_frames(), audio.duration());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod convert;
pub mod decode;
pub mod decoder;
pub mod error;
pub mod samples;
pub mod stream;
pub mod wav_io;

pub use bridge_traits::audio::{format_from_width, width_of, SampleFormat};
pub use config::{DecodeOptions, OutputSpec, StreamingConfig};
pub use convert::ConvertingDecoder;
pub use decode::{decode_file, decode_memory, get_file_info, read_all, read_file};
pub use decoder::{flac, mp3, vorbis, wav};
pub use decoder::{open_memory_any, AdapterKind, CodecAdapter, DecoderAdapter};
pub use error::{DecodeError, Result};
pub use samples::{DecodedAudio, PcmChunk, Samples, StreamInfo};
pub use stream::{stream_file, stream_memory, PcmStream};
pub use wav_io::{write_wav, WavReadStream};
