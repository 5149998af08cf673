//! # WAV Output
//!
//! - [`write_wav`]: write a [`DecodedAudio`] as a canonical RIFF/WAVE file
//! - [`WavReadStream`]: `std::io::Read` adapter that yields a WAV header
//!   followed by the PCM bytes of a chunk producer, e.g. a
//!   [`PcmStream`](crate::PcmStream)
//!
//! Integer formats are written as PCM, `f32` as IEEE float. Unsigned 8-bit
//! samples are stored as-is (WAV's 8-bit PCM is unsigned).

use crate::error::{DecodeError, Result};
use crate::samples::{DecodedAudio, PcmChunk, Samples};
use bridge_traits::audio::SampleFormat;
use std::io::{self, Read};
use std::path::Path;
use tracing::{debug, instrument};

fn wav_spec(channels: u16, sample_rate: u32, format: SampleFormat) -> hound::WavSpec {
    hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: format.bits(),
        sample_format: if format.is_float() {
            hound::SampleFormat::Float
        } else {
            hound::SampleFormat::Int
        },
    }
}

// ============================================================================
// Writer
// ============================================================================

/// Write `audio` to `path` as a WAV file sized for its exact frame count.
#[instrument(skip(path, audio), fields(path = %path.as_ref().display(), frames = audio.num_frames()))]
pub fn write_wav(path: impl AsRef<Path>, audio: &DecodedAudio) -> Result<()> {
    let spec = wav_spec(audio.channels(), audio.sample_rate(), audio.sample_format());
    let mut writer = hound::WavWriter::create(path.as_ref(), spec)?;

    match audio.samples() {
        // hound takes 8-bit samples as i8 and stores them offset by 128.
        Samples::U8(v) => {
            for &s in v {
                writer.write_sample((s as i16 - 128) as i8)?;
            }
        }
        Samples::S16(v) => {
            for &s in v {
                writer.write_sample(s)?;
            }
        }
        Samples::S32(v) => {
            for &s in v {
                writer.write_sample(s)?;
            }
        }
        Samples::F32(v) => {
            for &s in v {
                writer.write_sample(s)?;
            }
        }
    }

    writer.finalize()?;
    debug!("Wrote {}", audio.name());
    Ok(())
}

// ============================================================================
// Read Stream
// ============================================================================

/// WAV bytes produced on demand from a chunk source.
///
/// Without a frame limit the header carries the "unknown length" sizes used
/// for endless streams. With `max_frames` the output stops after that many
/// frames and the header sizes are exact (assuming the source has at least
/// that many).
pub struct WavReadStream<P> {
    producer: P,
    frame_bytes: usize,
    frames_left: Option<u64>,
    format: SampleFormat,
    /// Bytes ready to be read: the header first, then chunk data.
    pending: Vec<u8>,
    offset: usize,
    done: bool,
}

impl<P> WavReadStream<P>
where
    P: Iterator<Item = Result<PcmChunk>>,
{
    pub fn new(
        producer: P,
        channels: u16,
        sample_rate: u32,
        format: SampleFormat,
        max_frames: Option<u64>,
    ) -> Self {
        let mut header = wav_spec(channels, sample_rate, format).into_header_for_infinite_file();
        let frame_bytes = format.width() * channels as usize;

        if let Some(frames) = max_frames {
            let data_len = (frames * frame_bytes as u64).min(u32::MAX as u64 - 64) as u32;
            patch_sizes(&mut header, data_len);
        }

        Self {
            producer,
            frame_bytes,
            frames_left: max_frames,
            format,
            pending: header,
            offset: 0,
            done: false,
        }
    }

    /// Pull the next chunk into `pending`. Returns false when nothing is left.
    fn fill(&mut self) -> io::Result<bool> {
        if self.done || self.frames_left == Some(0) {
            self.done = true;
            return Ok(false);
        }

        let chunk = match self.producer.next() {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => {
                self.done = true;
                return Err(into_io_error(e));
            }
            None => {
                self.done = true;
                return Ok(false);
            }
        };

        if chunk.format() != self.format {
            self.done = true;
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("chunk is {}, stream is {}", chunk.format(), self.format),
            ));
        }

        let mut bytes = chunk.to_le_bytes();
        if let Some(left) = self.frames_left.as_mut() {
            let allowed = (*left as usize).saturating_mul(self.frame_bytes);
            bytes.truncate(allowed);
            *left -= (bytes.len() / self.frame_bytes) as u64;
        }

        self.pending = bytes;
        self.offset = 0;
        Ok(true)
    }
}

impl<P> Read for WavReadStream<P>
where
    P: Iterator<Item = Result<PcmChunk>>,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.offset >= self.pending.len() {
            if !self.fill()? {
                return Ok(0);
            }
        }

        let n = buf.len().min(self.pending.len() - self.offset);
        buf[..n].copy_from_slice(&self.pending[self.offset..self.offset + n]);
        self.offset += n;
        Ok(n)
    }
}

/// Set the RIFF size and the data chunk size of a header for `data_len`
/// bytes of samples.
fn patch_sizes(header: &mut [u8], data_len: u32) {
    let riff_len = (header.len() as u32 - 8).saturating_add(data_len);
    header[4..8].copy_from_slice(&riff_len.to_le_bytes());

    if let Some(pos) = header.windows(4).rposition(|w| w == b"data") {
        header[pos + 4..pos + 8].copy_from_slice(&data_len.to_le_bytes());
    }
}

fn into_io_error(err: DecodeError) -> io::Error {
    match err {
        DecodeError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::Other, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(values: Vec<Vec<i16>>) -> impl Iterator<Item = Result<PcmChunk>> {
        values
            .into_iter()
            .map(|v| PcmChunk::new(Samples::S16(v), 2))
    }

    fn read_to_end(mut reader: impl Read) -> Vec<u8> {
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_header_then_data() {
        let stream = WavReadStream::new(
            chunks(vec![vec![1, 2, 3, 4], vec![5, 6]]),
            2,
            44100,
            SampleFormat::S16,
            None,
        );
        let bytes = read_to_end(stream);
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(bytes.len(), 44 + 12);
        assert_eq!(&bytes[44..48], &[1, 0, 2, 0]);
    }

    #[test]
    fn test_max_frames_limits_output_and_sizes_header() {
        let stream = WavReadStream::new(
            chunks(vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8]]),
            2,
            44100,
            SampleFormat::S16,
            Some(3),
        );
        let bytes = read_to_end(stream);
        assert_eq!(bytes.len(), 44 + 12);
        assert_eq!(u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]), 12);
        assert_eq!(
            u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            (bytes.len() - 8) as u32
        );
        assert_eq!(&bytes[52..56], &[5, 0, 6, 0]);
    }

    #[test]
    fn test_limited_stream_is_readable_by_hound() {
        let stream = WavReadStream::new(
            chunks(vec![vec![10, -10, 20, -20]]),
            2,
            8000,
            SampleFormat::S16,
            Some(2),
        );
        let bytes = read_to_end(stream);
        let reader = hound::WavReader::new(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.duration(), 2);
        let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![10, -10, 20, -20]);
    }

    #[test]
    fn test_producer_error_surfaces_as_io_error() {
        let producer = vec![Err(DecodeError::Decode("corrupt".to_string()))].into_iter();
        let mut stream = WavReadStream::new(producer, 2, 44100, SampleFormat::S16, None);
        let mut out = Vec::new();
        let err = stream.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        // The header was delivered before the failure.
        assert_eq!(out.len(), 44);
    }

    #[test]
    fn test_write_wav_u8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("u8.wav");
        let audio = DecodedAudio::new("u8", 1, 8000, Samples::U8(vec![0, 128, 255])).unwrap();
        write_wav(&path, &audio).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().bits_per_sample, 8);
        let samples: Vec<i8> = reader.samples::<i8>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![-128, 0, 127]);
    }

    #[test]
    fn test_write_wav_bad_path() {
        let audio = DecodedAudio::new("x", 1, 8000, Samples::S16(vec![0])).unwrap();
        let err = write_wav("/nonexistent/dir/out.wav", &audio).unwrap_err();
        assert!(matches!(err, DecodeError::Io(_)));
    }
}
