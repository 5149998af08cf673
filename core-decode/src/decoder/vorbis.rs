//! # Ogg Vorbis Decoding
//!
//! Vorbis always decodes to 16-bit by default. An [`OutputSpec`] can ask for a
//! different sample format, channel count or sample rate, which are
//! converted while decoding.
//!
//! Streams over Vorbis sources are double buffered: each refill decodes two
//! chunks back to back.

use super::{AdapterKind, SourceData};
use crate::config::{OutputSpec, StreamingConfig};
use crate::convert::ConvertingDecoder;
use crate::decode::{native_info, read_all};
use crate::error::Result;
use crate::samples::{DecodedAudio, StreamInfo};
use crate::stream::PcmStream;
use bytes::Bytes;
use std::path::Path;

const KIND: AdapterKind = AdapterKind::Vorbis;

pub fn get_file_info(path: impl AsRef<Path>) -> Result<StreamInfo> {
    native_info(KIND, SourceData::File(path.as_ref().to_path_buf()))
}

pub fn get_info(data: impl Into<Bytes>) -> Result<StreamInfo> {
    native_info(KIND, SourceData::Memory(data.into()))
}

pub fn read_file(path: impl AsRef<Path>, spec: &OutputSpec) -> Result<DecodedAudio> {
    read_source(SourceData::File(path.as_ref().to_path_buf()), spec)
}

pub fn read_memory(data: impl Into<Bytes>, spec: &OutputSpec) -> Result<DecodedAudio> {
    read_source(SourceData::Memory(data.into()), spec)
}

pub fn stream_file(
    path: impl AsRef<Path>,
    spec: &OutputSpec,
    config: &StreamingConfig,
) -> Result<PcmStream> {
    let decoder = ConvertingDecoder::open_with_spec(
        KIND,
        SourceData::File(path.as_ref().to_path_buf()),
        spec,
        config,
    )?;
    PcmStream::new(Box::new(decoder), config.clone())
}

fn read_source(source: SourceData, spec: &OutputSpec) -> Result<DecodedAudio> {
    let mut decoder =
        ConvertingDecoder::open_with_spec(KIND, source, spec, &StreamingConfig::default())?;
    read_all(&mut decoder)
}
