//! # Stream Callbacks
//!
//! [`StreamCallbacks`] wraps a playback routine and reports on it: a
//! progress callback receives the frame count of every yielded payload and
//! an end callback fires once when the routine finishes.
//!
//! ```ignore
//! let stream = core_decode::stream_file("song.ogg", &options)?;
//! let routine = StreamCallbacks::new(stream, SampleFormat::S16, 2)
//!     .on_progress(|frames| meter.add(frames))
//!     .on_end(|| println!("done"));
//! device.start(routine)?;
//! ```

use crate::error::Result;
use crate::routine::{Payload, PlaybackRoutine, Step};
use bridge_traits::audio::SampleFormat;

type ProgressFn = Box<dyn FnMut(usize) + Send>;
type EndFn = Box<dyn FnOnce() + Send>;

pub struct StreamCallbacks<R> {
    inner: R,
    frame_bytes: usize,
    progress: Option<ProgressFn>,
    end: Option<EndFn>,
    frames_played: u64,
}

impl<R: PlaybackRoutine> StreamCallbacks<R> {
    /// Wrap `inner`, whose payloads are in `format` with `channels` channels.
    pub fn new(inner: R, format: SampleFormat, channels: u16) -> Self {
        Self {
            inner,
            frame_bytes: (format.width() * channels as usize).max(1),
            progress: None,
            end: None,
            frames_played: 0,
        }
    }

    pub fn on_progress(mut self, progress: impl FnMut(usize) + Send + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn on_end(mut self, end: impl FnOnce() + Send + 'static) -> Self {
        self.end = Some(Box::new(end));
        self
    }

    /// Frames yielded so far.
    pub fn frames_played(&self) -> u64 {
        self.frames_played
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn finish(&mut self) {
        if let Some(end) = self.end.take() {
            end();
        }
    }
}

impl<R: PlaybackRoutine> PlaybackRoutine for StreamCallbacks<R> {
    fn resume(&mut self, frames: usize) -> Result<Step<Payload>> {
        match self.inner.resume(frames)? {
            Step::Yield(payload) => {
                let produced = payload.byte_len() / self.frame_bytes;
                self.frames_played += produced as u64;
                if let Some(progress) = self.progress.as_mut() {
                    progress(produced);
                }
                Ok(Step::Yield(payload))
            }
            Step::Done => {
                self.finish();
                Ok(Step::Done)
            }
        }
    }
}
