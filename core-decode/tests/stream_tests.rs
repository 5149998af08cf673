//! Chunked decoding: chunk sizing, concatenation and WAV re-encoding.

mod common;

use common::*;
use core_decode::{
    read_file, stream_file, stream_memory, wav, DecodeError, DecodeOptions, SampleFormat,
    StreamingConfig, WavReadStream,
};
use std::io::Read;

#[test]
fn test_native_stream_concatenates_to_whole_decode() {
    let dir = tempfile::tempdir().unwrap();
    let path = stereo_wav(dir.path());

    let config = StreamingConfig::default().with_frames_to_read(300);
    let stream = wav::stream_file(&path, None, &config).unwrap();
    assert_eq!(stream.info().num_frames, 1000);

    let frames: Vec<usize> = wav::stream_file(&path, None, &config)
        .unwrap()
        .map(|c| c.unwrap().frames())
        .collect();
    assert_eq!(frames, vec![300, 300, 300, 100]);

    let whole = read_file(&path).unwrap();
    assert_eq!(&concat(stream), whole.samples());
}

#[test]
fn test_converting_stream_matches_decode() {
    let dir = tempfile::tempdir().unwrap();
    let path = stereo_wav(dir.path());

    let options = DecodeOptions::default()
        .with_format(SampleFormat::S16)
        .with_streaming(StreamingConfig::default().with_frames_to_read(256));
    let stream = stream_file(&path, &options).unwrap();
    let whole = core_decode::decode_file(&path, &options).unwrap();
    assert_eq!(&concat(stream), whole.samples());
}

#[test]
fn test_stream_closes_after_last_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let path = stereo_wav(dir.path());

    let config = StreamingConfig::default().with_frames_to_read(600);
    let mut stream = wav::stream_file(&path, None, &config).unwrap();
    assert!(!stream.is_closed());

    assert_eq!(stream.next_chunk().unwrap().unwrap().frames(), 600);
    assert_eq!(stream.next_chunk().unwrap().unwrap().frames(), 400);
    assert!(stream.next_chunk().unwrap().is_none());
    assert!(stream.is_closed());
    assert_eq!(stream.frames_delivered(), 1000);

    // Exhausted streams keep returning None.
    assert!(stream.next_chunk().unwrap().is_none());
}

#[test]
fn test_request_larger_than_capacity_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = stereo_wav(dir.path());

    let config = StreamingConfig::low_latency();
    let mut stream = wav::stream_file(&path, None, &config).unwrap();
    let capacity = stream.capacity();

    let err = stream.next_frames(Some(capacity + 1)).unwrap_err();
    assert!(matches!(err, DecodeError::CapacityExceeded { .. }));

    // The failed request did not consume anything.
    let chunk = stream.next_frames(Some(100)).unwrap().unwrap();
    assert_eq!(chunk.frames(), 100);
    assert_eq!(stream.frames_delivered(), 100);
}

#[test]
fn test_stream_memory_detects_codec() {
    let dir = tempfile::tempdir().unwrap();
    let path = stereo_wav(dir.path());
    let bytes = std::fs::read(&path).unwrap();

    let stream = stream_memory(bytes, &DecodeOptions::default()).unwrap();
    assert_eq!(stream.info().name, "<memory>");
    assert_eq!(concat(stream).frames(2), 1000);
}

#[test]
fn test_stream_garbage_memory_fails() {
    let result = stream_memory(vec![0u8; 512], &DecodeOptions::default());
    assert!(result.is_err());
}

#[test]
fn test_wav_read_stream_over_decoder() {
    let dir = tempfile::tempdir().unwrap();
    let path = stereo_wav(dir.path());

    let stream = wav::stream_file(&path, None, &StreamingConfig::default()).unwrap();
    let info = stream.info().clone();
    let mut reader = WavReadStream::new(
        stream,
        info.channels,
        info.sample_rate,
        info.sample_format,
        Some(info.num_frames),
    );

    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).unwrap();

    let wav = hound::WavReader::new(std::io::Cursor::new(bytes)).unwrap();
    assert_eq!(wav.spec().channels, 2);
    assert_eq!(wav.spec().sample_rate, 44100);
    assert_eq!(wav.duration(), 1000);
    let samples: Vec<i16> = wav.into_samples().map(|s| s.unwrap()).collect();
    assert_eq!(samples, stereo_samples(FRAMES));
}

#[test]
fn test_wav_read_stream_truncates_to_max_frames() {
    let dir = tempfile::tempdir().unwrap();
    let path = stereo_wav(dir.path());

    let stream = wav::stream_file(&path, None, &StreamingConfig::default()).unwrap();
    let mut reader = WavReadStream::new(stream, 2, 44100, SampleFormat::S16, Some(10));

    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).unwrap();
    assert_eq!(bytes.len(), 44 + 10 * 4);
}
