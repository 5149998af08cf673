//! # Callback Bridge
//!
//! Per-device state driven by the backend callback. One [`BridgeState`]
//! exists per device; the backend's audio thread reaches it through the
//! [`CallbackRegistry`](crate::registry::CallbackRegistry) and holds its lock
//! for the duration of one invocation.
//!
//! Per invocation:
//! - Playback: resume with the frame count, copy the payload to the output,
//!   fill the rest with silence.
//! - Capture: copy the input into the owned scratch buffer, resume with it.
//! - Duplex: as capture, then copy the optional payload as playback does.
//!
//! A payload larger than the invocation allows, or a routine error, unbinds
//! the routine and parks the error until someone takes it. The device keeps
//! running and outputs silence.

use crate::error::{DeviceError, Result};
use crate::routine::{Payload, Routine, Step};
use bridge_traits::audio::{DeviceType, SampleFormat, StreamParams};
use tracing::{debug, error, warn};

/// Format and frame size of one direction, resolved from stream params.
#[derive(Debug, Clone, Copy)]
struct Side {
    format: SampleFormat,
    frame_bytes: usize,
}

pub(crate) struct BridgeState {
    device_type: DeviceType,
    playback: Option<Side>,
    capture: Option<Side>,
    routine: Option<Routine>,
    pending_error: Option<DeviceError>,
    /// Owned copy of the captured input handed to the routine.
    scratch: Vec<u8>,
    invocations: u64,
}

impl BridgeState {
    pub(crate) fn new(params: &StreamParams) -> Self {
        let side = |endpoint: &bridge_traits::audio::EndpointParams| Side {
            format: endpoint.format,
            frame_bytes: endpoint.frame_bytes(),
        };
        let playback = params.playback.as_ref().map(side);
        let capture = params.capture.as_ref().map(side);

        // Sized for one configured buffer so the audio thread does not
        // allocate unless the backend delivers more than it promised.
        let scratch_len = capture
            .map(|c| c.frame_bytes * params.buffer_frames())
            .unwrap_or(0);

        Self {
            device_type: params.device_type,
            playback,
            capture,
            routine: None,
            pending_error: None,
            scratch: Vec::with_capacity(scratch_len),
            invocations: 0,
        }
    }

    /// Bind `routine`, handing back the failure parked by the previous
    /// routine, if nobody has taken it yet.
    pub(crate) fn bind(&mut self, routine: Routine) -> Result<Option<DeviceError>> {
        routine.check_role(self.device_type)?;
        if self.routine.is_some() {
            return Err(DeviceError::AlreadyStarted);
        }
        let parked = self.pending_error.take();
        if let Some(err) = &parked {
            warn!("Binding new routine over an unobserved failure: {}", err);
        }
        self.routine = Some(routine);
        Ok(parked)
    }

    pub(crate) fn unbind(&mut self) -> Option<Routine> {
        self.routine.take()
    }

    pub(crate) fn is_bound(&self) -> bool {
        self.routine.is_some()
    }

    pub(crate) fn take_error(&mut self) -> Option<DeviceError> {
        self.pending_error.take()
    }

    pub(crate) fn invocations(&self) -> u64 {
        self.invocations
    }

    /// Unbind after a failure and park the error for the next observer.
    fn fail(&mut self, err: DeviceError) {
        error!("Device routine failed, unbinding: {}", err);
        self.routine = None;
        if self.pending_error.is_none() {
            self.pending_error = Some(err);
        }
    }

    /// Handle one hardware invocation.
    pub(crate) fn process(&mut self, output: &mut [u8], input: &[u8], frames: usize) {
        if let Some(playback) = self.playback {
            output.fill(playback.format.silence());
        }
        if frames == 0 {
            return;
        }
        self.invocations += 1;

        let outcome = match self.routine.as_mut() {
            None => return,
            Some(Routine::Playback(routine)) => routine.resume(frames).map(|step| match step {
                Step::Yield(payload) => Step::Yield(Some(payload)),
                Step::Done => Step::Done,
            }),
            Some(Routine::Capture(routine)) => {
                let input = copy_input(&mut self.scratch, input, self.capture, frames);
                routine.resume(input).map(|step| match step {
                    Step::Yield(()) => Step::Yield(None),
                    Step::Done => Step::Done,
                })
            }
            Some(Routine::Duplex(routine)) => {
                let input = copy_input(&mut self.scratch, input, self.capture, frames);
                routine.resume(input)
            }
        };

        match outcome {
            Ok(Step::Yield(Some(payload))) => {
                if let Err(err) = self.write_payload(&payload, output, frames) {
                    self.fail(err);
                }
            }
            Ok(Step::Yield(None)) => {}
            Ok(Step::Done) => {
                debug!(invocations = self.invocations, "Device routine finished");
                self.routine = None;
            }
            Err(err) => self.fail(err),
        }
    }

    fn write_payload(&self, payload: &Payload, output: &mut [u8], frames: usize) -> Result<()> {
        let Some(playback) = self.playback else {
            return Ok(());
        };

        let max = (frames * playback.frame_bytes).min(output.len());
        let len = payload.byte_len();
        if len > max {
            return Err(DeviceError::Overflow { len, max });
        }
        if let Some(format) = payload.format() {
            if format != playback.format {
                return Err(DeviceError::Routine(format!(
                    "payload is {} but the device plays {}",
                    format, playback.format
                )));
            }
        }

        payload.write_into(output);
        Ok(())
    }
}

/// Copy at most `frames` frames of `input` into `scratch`.
fn copy_input<'a>(
    scratch: &'a mut Vec<u8>,
    input: &[u8],
    capture: Option<Side>,
    frames: usize,
) -> &'a [u8] {
    let len = capture
        .map(|c| (c.frame_bytes * frames).min(input.len()))
        .unwrap_or(input.len());
    scratch.clear();
    scratch.extend_from_slice(&input[..len]);
    scratch
}
