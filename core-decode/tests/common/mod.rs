//! WAV fixtures written with hound into temporary directories, plus the
//! checked-in codec files under `tests/fixtures`.

#![allow(dead_code)]

use core_decode::Samples;
use std::path::{Path, PathBuf};

pub const FRAMES: usize = 1000;

/// Concatenate stream chunks into one buffer.
pub fn concat(chunks: impl Iterator<Item = core_decode::Result<core_decode::PcmChunk>>) -> Samples {
    let mut all: Option<Samples> = None;
    for chunk in chunks {
        let samples = chunk.unwrap().into_samples();
        match all.as_mut() {
            Some(acc) => acc.extend_from(&samples).unwrap(),
            None => all = Some(samples),
        }
    }
    all.expect("stream produced no chunks")
}

/// Path of a checked-in file under `tests/fixtures`.
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Deterministic stereo ramp: left counts up, right counts down.
pub fn stereo_samples(frames: usize) -> Vec<i16> {
    (0..frames)
        .flat_map(|i| {
            let v = ((i * 37) % 20000) as i16;
            [v, -v]
        })
        .collect()
}

pub fn write_s16(dir: &Path, name: &str, channels: u16, sample_rate: u32, samples: &[i16]) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
    path
}

/// The canonical fixture: 2 channels, 44.1kHz, 16-bit, 1000 frames.
pub fn stereo_wav(dir: &Path) -> PathBuf {
    write_s16(dir, "stereo.wav", 2, 44100, &stereo_samples(FRAMES))
}

pub fn write_s24(dir: &Path, name: &str, samples: &[i32]) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 48000,
        bits_per_sample: 24,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
    path
}

pub fn write_u8(dir: &Path, name: &str, samples: &[i8]) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 8,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
    path
}

pub fn write_f32(dir: &Path, name: &str, channels: u16, sample_rate: u32, samples: &[f32]) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
    path
}
