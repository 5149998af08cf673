//! # Device Routines
//!
//! A routine is the application side of a device: a resumable task that the
//! callback bridge drives once per hardware invocation, on the audio thread.
//!
//! ## Overview
//!
//! - [`PlaybackRoutine`]: resumed with the number of frames the hardware
//!   wants, yields the [`Payload`] to play.
//! - [`CaptureRoutine`]: resumed with the captured bytes.
//! - [`DuplexRoutine`]: resumed with the captured bytes, optionally yields a
//!   payload to play.
//!
//! Each `resume` returns [`Step::Yield`] to stay bound or [`Step::Done`] to
//! finish. An `Err` unbinds the routine and is reported through the device.
//! Closures become routines through [`playback_fn`], [`capture_fn`] and
//! [`duplex_fn`]. [`PcmStream`] is a playback routine as is.
//!
//! Routines run on the real-time thread: they must not block, and should
//! not allocate more than one payload per call.

use crate::error::{DeviceError, Result};
use bridge_traits::audio::{DeviceType, SampleFormat};
use core_decode::{PcmChunk, PcmStream, Samples};
use std::fmt;

// ============================================================================
// Step and Payload
// ============================================================================

/// Outcome of one resumption.
#[derive(Debug, Clone, PartialEq)]
pub enum Step<T> {
    /// The routine produced (or consumed) this invocation and stays bound.
    Yield(T),
    /// The routine is finished; the bridge unbinds it.
    Done,
}

impl<T> Step<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Step::Done)
    }
}

/// PCM handed back to the bridge for the hardware output buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Little-endian interleaved bytes, assumed to be in the device format.
    Bytes(Vec<u8>),
    /// Typed samples; their format must match the device format.
    Samples(Samples),
}

impl Payload {
    /// Encoded size in bytes.
    pub fn byte_len(&self) -> usize {
        match self {
            Payload::Bytes(bytes) => bytes.len(),
            Payload::Samples(samples) => samples.byte_len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.byte_len() == 0
    }

    /// Sample format, when the payload carries one.
    pub fn format(&self) -> Option<SampleFormat> {
        match self {
            Payload::Bytes(_) => None,
            Payload::Samples(samples) => Some(samples.format()),
        }
    }

    /// Copy the payload to the front of `out`. Returns the bytes written.
    pub(crate) fn write_into(&self, out: &mut [u8]) -> usize {
        match self {
            Payload::Bytes(bytes) => {
                let n = bytes.len().min(out.len());
                out[..n].copy_from_slice(&bytes[..n]);
                n
            }
            Payload::Samples(samples) => samples.write_le_bytes(out),
        }
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<Samples> for Payload {
    fn from(samples: Samples) -> Self {
        Payload::Samples(samples)
    }
}

impl From<PcmChunk> for Payload {
    fn from(chunk: PcmChunk) -> Self {
        Payload::Samples(chunk.into_samples())
    }
}

// ============================================================================
// Routine Traits
// ============================================================================

pub trait PlaybackRoutine: Send {
    /// Produce at most `frames` frames of output.
    fn resume(&mut self, frames: usize) -> Result<Step<Payload>>;
}

pub trait CaptureRoutine: Send {
    /// Consume one invocation's worth of captured bytes.
    fn resume(&mut self, input: &[u8]) -> Result<Step<()>>;
}

pub trait DuplexRoutine: Send {
    /// Consume captured bytes and optionally produce output.
    fn resume(&mut self, input: &[u8]) -> Result<Step<Option<Payload>>>;
}

/// Plays a decoded stream until it is exhausted.
///
/// Requests above the stream's capacity are clamped to it; the bridge fills
/// the remainder of the buffer with silence.
impl PlaybackRoutine for PcmStream {
    fn resume(&mut self, frames: usize) -> Result<Step<Payload>> {
        let frames = frames.min(self.capacity());
        match self.next_frames(Some(frames))? {
            Some(chunk) => Ok(Step::Yield(chunk.into())),
            None => Ok(Step::Done),
        }
    }
}

/// Playback routine returned by [`playback_fn`].
pub struct PlaybackFn<F>(F);

impl<F> PlaybackRoutine for PlaybackFn<F>
where
    F: FnMut(usize) -> Result<Step<Payload>> + Send,
{
    fn resume(&mut self, frames: usize) -> Result<Step<Payload>> {
        (self.0)(frames)
    }
}

/// Capture routine returned by [`capture_fn`].
pub struct CaptureFn<F>(F);

impl<F> CaptureRoutine for CaptureFn<F>
where
    F: FnMut(&[u8]) -> Result<Step<()>> + Send,
{
    fn resume(&mut self, input: &[u8]) -> Result<Step<()>> {
        (self.0)(input)
    }
}

/// Duplex routine returned by [`duplex_fn`].
pub struct DuplexFn<F>(F);

impl<F> DuplexRoutine for DuplexFn<F>
where
    F: FnMut(&[u8]) -> Result<Step<Option<Payload>>> + Send,
{
    fn resume(&mut self, input: &[u8]) -> Result<Step<Option<Payload>>> {
        (self.0)(input)
    }
}

/// Playback routine from a closure taking the requested frame count.
pub fn playback_fn<F>(f: F) -> PlaybackFn<F>
where
    F: FnMut(usize) -> Result<Step<Payload>> + Send,
{
    PlaybackFn(f)
}

/// Capture routine from a closure taking the captured bytes.
pub fn capture_fn<F>(f: F) -> CaptureFn<F>
where
    F: FnMut(&[u8]) -> Result<Step<()>> + Send,
{
    CaptureFn(f)
}

/// Duplex routine from a closure taking the captured bytes.
pub fn duplex_fn<F>(f: F) -> DuplexFn<F>
where
    F: FnMut(&[u8]) -> Result<Step<Option<Payload>>> + Send,
{
    DuplexFn(f)
}

// ============================================================================
// Routine
// ============================================================================

/// A routine of any role, as bound to a device.
pub enum Routine {
    Playback(Box<dyn PlaybackRoutine>),
    Capture(Box<dyn CaptureRoutine>),
    Duplex(Box<dyn DuplexRoutine>),
}

impl Routine {
    pub fn playback(routine: impl PlaybackRoutine + 'static) -> Self {
        Routine::Playback(Box::new(routine))
    }

    pub fn capture(routine: impl CaptureRoutine + 'static) -> Self {
        Routine::Capture(Box::new(routine))
    }

    pub fn duplex(routine: impl DuplexRoutine + 'static) -> Self {
        Routine::Duplex(Box::new(routine))
    }

    pub fn playback_fn<F>(f: F) -> Self
    where
        F: FnMut(usize) -> Result<Step<Payload>> + Send + 'static,
    {
        Routine::playback(playback_fn(f))
    }

    pub fn capture_fn<F>(f: F) -> Self
    where
        F: FnMut(&[u8]) -> Result<Step<()>> + Send + 'static,
    {
        Routine::capture(capture_fn(f))
    }

    pub fn duplex_fn<F>(f: F) -> Self
    where
        F: FnMut(&[u8]) -> Result<Step<Option<Payload>>> + Send + 'static,
    {
        Routine::duplex(duplex_fn(f))
    }

    /// Device role this routine serves.
    pub fn role(&self) -> DeviceType {
        match self {
            Routine::Playback(_) => DeviceType::Playback,
            Routine::Capture(_) => DeviceType::Capture,
            Routine::Duplex(_) => DeviceType::Duplex,
        }
    }

    /// Fail with `RoutineMismatch` unless this routine serves `device`.
    pub(crate) fn check_role(&self, device: DeviceType) -> Result<()> {
        let routine = self.role();
        if routine != device {
            return Err(DeviceError::RoutineMismatch { device, routine });
        }
        Ok(())
    }
}

impl fmt::Debug for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Routine::{:?}", self.role())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_sizes() {
        assert_eq!(Payload::from(vec![1u8, 2, 3]).byte_len(), 3);
        let samples = Payload::from(Samples::S16(vec![1, 2, 3]));
        assert_eq!(samples.byte_len(), 6);
        assert_eq!(samples.format(), Some(SampleFormat::S16));
        assert!(Payload::Bytes(Vec::new()).is_empty());
    }

    #[test]
    fn test_payload_write_into() {
        let mut out = [0u8; 6];
        let n = Payload::from(Samples::S16(vec![1, -1])).write_into(&mut out);
        assert_eq!(n, 4);
        assert_eq!(out, [1, 0, 0xFF, 0xFF, 0, 0]);
    }

    #[test]
    fn test_closure_routines_keep_state() {
        let mut calls = 0;
        let routine = Routine::playback_fn(move |frames| {
            calls += 1;
            if calls > 2 {
                return Ok(Step::Done);
            }
            Ok(Step::Yield(Payload::Bytes(vec![0; frames])))
        });
        let Routine::Playback(mut inner) = routine else {
            panic!("expected a playback routine");
        };
        assert_eq!(inner.resume(4).unwrap(), Step::Yield(Payload::Bytes(vec![0; 4])));
        assert!(!inner.resume(4).unwrap().is_done());
        assert!(inner.resume(4).unwrap().is_done());
    }

    #[test]
    fn test_role_check() {
        let capture = Routine::capture_fn(|_input: &[u8]| Ok(Step::Yield(())));
        assert_eq!(capture.role(), DeviceType::Capture);
        assert!(capture.check_role(DeviceType::Capture).is_ok());
        assert!(matches!(
            capture.check_role(DeviceType::Playback),
            Err(DeviceError::RoutineMismatch {
                device: DeviceType::Playback,
                routine: DeviceType::Capture,
            })
        ));

        let duplex = Routine::duplex_fn(|_input: &[u8]| Ok(Step::Yield(None)));
        assert_eq!(format!("{:?}", duplex), "Routine::Duplex");
    }
}
