//! FLAC decoding. Output keeps the stream's bit depth unless a format is
//! given; 24-bit streams come out as left-justified s32.

use super::{AdapterKind, SourceData};
use crate::config::StreamingConfig;
use crate::decode::{native_info, native_read};
use crate::error::Result;
use crate::samples::{DecodedAudio, StreamInfo};
use crate::stream::{stream_native, PcmStream};
use bridge_traits::audio::SampleFormat;
use bytes::Bytes;
use std::path::Path;

const KIND: AdapterKind = AdapterKind::Flac;

pub fn get_file_info(path: impl AsRef<Path>) -> Result<StreamInfo> {
    native_info(KIND, SourceData::File(path.as_ref().to_path_buf()))
}

pub fn get_info(data: impl Into<Bytes>) -> Result<StreamInfo> {
    native_info(KIND, SourceData::Memory(data.into()))
}

/// Decode a whole FLAC file, in `format` or the file's own sample format.
pub fn read_file(path: impl AsRef<Path>, format: Option<SampleFormat>) -> Result<DecodedAudio> {
    native_read(KIND, SourceData::File(path.as_ref().to_path_buf()), format)
}

pub fn read_memory(data: impl Into<Bytes>, format: Option<SampleFormat>) -> Result<DecodedAudio> {
    native_read(KIND, SourceData::Memory(data.into()), format)
}

pub fn stream_file(
    path: impl AsRef<Path>,
    format: Option<SampleFormat>,
    config: &StreamingConfig,
) -> Result<PcmStream> {
    stream_native(KIND, SourceData::File(path.as_ref().to_path_buf()), format, config)
}

pub fn stream_memory(
    data: impl Into<Bytes>,
    format: Option<SampleFormat>,
    config: &StreamingConfig,
) -> Result<PcmStream> {
    stream_native(KIND, SourceData::Memory(data.into()), format, config)
}
