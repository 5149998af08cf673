//! Whole-file decoding against WAV fixtures.

mod common;

use common::*;
use core_decode::{
    decode_file, decode_memory, flac, get_file_info, read_file, wav, write_wav, AdapterKind,
    DecodeError, DecodeOptions, DecodedAudio, SampleFormat, Samples,
};

#[test]
fn test_stereo_info() {
    let dir = tempfile::tempdir().unwrap();
    let path = stereo_wav(dir.path());

    let info = get_file_info(&path).unwrap();
    assert_eq!(info.file_format, "wav");
    assert_eq!(info.name, path.display().to_string());
    assert_eq!(info.channels, 2);
    assert_eq!(info.sample_rate, 44100);
    assert_eq!(info.sample_width, 2);
    assert_eq!(info.sample_format, SampleFormat::S16);
    assert_eq!(info.num_frames, 1000);
    assert!((info.duration - 0.022_675_7).abs() < 1e-6);
}

#[test]
fn test_stereo_read_matches_fixture() {
    let dir = tempfile::tempdir().unwrap();
    let path = stereo_wav(dir.path());

    let audio = read_file(&path).unwrap();
    assert_eq!(audio.num_frames(), 1000);
    assert_eq!(audio.samples().len(), 2000);
    assert_eq!(audio.sample_width(), 2);
    assert_eq!(audio.samples(), &Samples::S16(stereo_samples(FRAMES)));
}

#[test]
fn test_info_and_decode_agree() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_s16(dir.path(), "mono.wav", 1, 22050, &vec![7i16; 4321]);

    let info = get_file_info(&path).unwrap();
    let audio = read_file(&path).unwrap();
    assert_eq!(info.num_frames, audio.num_frames());
    assert_eq!(info.channels, audio.channels());
    assert_eq!(info.sample_rate, audio.sample_rate());
}

#[test]
fn test_u8_wav_is_native_u8() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_u8(dir.path(), "u8.wav", &[-128, 0, 127]);

    let audio = read_file(&path).unwrap();
    assert_eq!(audio.sample_format(), SampleFormat::U8);
    assert_eq!(audio.samples(), &Samples::U8(vec![0, 128, 255]));
}

#[test]
fn test_24_bit_wav_is_left_justified_s32() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_s24(dir.path(), "s24.wav", &[1, -1, 0x12_3456, -0x40_0000]);

    let info = get_file_info(&path).unwrap();
    assert_eq!(info.sample_format, SampleFormat::S32);
    assert_eq!(info.sample_width, 4);

    let audio = read_file(&path).unwrap();
    assert_eq!(
        audio.samples(),
        &Samples::S32(vec![1 << 8, -1 << 8, 0x12_3456 << 8, -0x40_0000 << 8])
    );
}

#[test]
fn test_float_wav_is_native_f32() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_f32(dir.path(), "float.wav", 2, 48000, &[0.5, -0.5, 0.25, -0.25]);

    let audio = read_file(&path).unwrap();
    assert_eq!(audio.sample_format(), SampleFormat::F32);
    assert_eq!(audio.samples(), &Samples::F32(vec![0.5, -0.5, 0.25, -0.25]));
}

#[test]
fn test_wav_read_with_requested_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = stereo_wav(dir.path());

    let audio = wav::read_file(&path, Some(SampleFormat::F32)).unwrap();
    assert_eq!(audio.sample_format(), SampleFormat::F32);
    assert_eq!(audio.sample_width(), 4);
    assert_eq!(audio.num_frames(), 1000);
    assert_eq!(audio.samples().as_f32().unwrap()[0], 0.0);
}

#[test]
fn test_decode_with_conversion() {
    let dir = tempfile::tempdir().unwrap();
    let path = stereo_wav(dir.path());

    let options = DecodeOptions::new(SampleFormat::F32, 1, 22050);
    let audio = decode_file(&path, &options).unwrap();
    assert_eq!(audio.channels(), 1);
    assert_eq!(audio.sample_rate(), 22050);
    assert_eq!(audio.sample_format(), SampleFormat::F32);
    assert_eq!(audio.num_frames(), 500);
}

#[test]
fn test_decode_passthrough_matches_native() {
    let dir = tempfile::tempdir().unwrap();
    let path = stereo_wav(dir.path());

    let converted = decode_file(&path, &DecodeOptions::default()).unwrap();
    let native = read_file(&path).unwrap();
    assert_eq!(converted.samples(), native.samples());
}

#[test]
fn test_decode_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = stereo_wav(dir.path());
    let bytes = std::fs::read(&path).unwrap();

    let audio = decode_memory(bytes.clone(), &DecodeOptions::default()).unwrap();
    assert_eq!(audio.name(), "<memory>");
    assert_eq!(audio.num_frames(), 1000);

    let info = wav::get_info(bytes).unwrap();
    assert_eq!(info.num_frames, 1000);
    assert_eq!(info.name, "<memory>");
}

#[test]
fn test_zero_length_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.wav");
    std::fs::write(&path, b"").unwrap();

    let err = read_file(&path).unwrap_err();
    assert!(matches!(err, DecodeError::Decode(_)), "{:?}", err);
    assert!(get_file_info(&path).is_err());
}

#[test]
fn test_non_audio_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.wav");
    std::fs::write(&path, "this is not audio, just some text").unwrap();

    let err = read_file(&path).unwrap_err();
    assert!(err.is_source_error(), "{:?}", err);
}

#[test]
fn test_missing_file_fails() {
    let err = read_file("/nonexistent/dir/missing.flac").unwrap_err();
    assert!(matches!(err, DecodeError::Decode(_)));
}

#[test]
fn test_unsupported_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = stereo_wav(dir.path());
    let renamed = dir.path().join("stereo.aiff");
    std::fs::rename(&path, &renamed).unwrap();

    let err = read_file(&renamed).unwrap_err();
    assert!(matches!(err, DecodeError::UnsupportedFormat(_)));
}

#[test]
fn test_wrong_codec_adapter_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = stereo_wav(dir.path());

    let err = flac::read_file(&path, None).unwrap_err();
    assert!(matches!(err, DecodeError::Decode(_)), "{:?}", err);
    assert!(AdapterKind::Mp3.open_file(&path, None).is_err());
}

#[test]
fn test_write_wav_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = stereo_wav(dir.path());
    let original = read_file(&path).unwrap();

    let copy = dir.path().join("copy.wav");
    write_wav(&copy, &original).unwrap();
    let reread = read_file(&copy).unwrap();
    assert_eq!(reread.samples(), original.samples());
    assert_eq!(reread.sample_rate(), 44100);
    assert_eq!(reread.channels(), 2);
}

#[test]
fn test_write_wav_every_format() {
    let dir = tempfile::tempdir().unwrap();
    let cases = [
        Samples::U8(vec![0, 64, 128, 255]),
        Samples::S16(vec![i16::MIN, -1, 0, i16::MAX]),
        Samples::S32(vec![i32::MIN, -256, 0, i32::MAX & !0xFF]),
        Samples::F32(vec![-1.0, -0.5, 0.0, 0.75]),
    ];

    for samples in cases {
        let format = samples.format();
        let audio = DecodedAudio::new("case", 2, 16000, samples.clone()).unwrap();
        let path = dir.path().join(format!("{}.wav", format));
        write_wav(&path, &audio).unwrap();

        let reread = read_file(&path).unwrap();
        assert_eq!(reread.sample_format(), format);
        assert_eq!(reread.samples(), &samples, "{}", format);
    }
}
