//! # Native Audio Backend (cpal)
//!
//! Desktop implementation of [`AudioBackend`] on top of `cpal`, which picks
//! the host API for the platform (ALSA/PulseAudio, CoreAudio, WASAPI).
//!
//! ## Overview
//!
//! - Streams are opened with the raw (untyped) cpal builders so the byte
//!   buffers handed to the [`DataCallback`] are exactly the negotiated
//!   [`SampleFormat`].
//! - Duplex devices open one output and one input stream. Captured bytes go
//!   through a [`ByteRingBuffer`] and the data callback runs on the output
//!   thread with both buffers.
//! - The buffer size requested by the core is only a hint; cpal picks the
//!   default period for the device.

use crate::ring_buffer::ByteRingBuffer;
use bridge_traits::{
    audio::{
        AudioBackend, BackendStream, DataCallback, DeviceInfo, DeviceType, EndpointParams,
        SampleFormat, StreamParams,
    },
    error::{BridgeError, Result},
};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

fn backend_error(context: &str, err: impl std::fmt::Display) -> BridgeError {
    BridgeError::OperationFailed(format!("{}: {}", context, err))
}

fn to_cpal_format(format: SampleFormat) -> cpal::SampleFormat {
    match format {
        SampleFormat::U8 => cpal::SampleFormat::U8,
        SampleFormat::S16 => cpal::SampleFormat::I16,
        SampleFormat::S32 => cpal::SampleFormat::I32,
        SampleFormat::F32 => cpal::SampleFormat::F32,
    }
}

fn from_cpal_format(format: cpal::SampleFormat) -> Option<SampleFormat> {
    match format {
        cpal::SampleFormat::U8 => Some(SampleFormat::U8),
        cpal::SampleFormat::I16 => Some(SampleFormat::S16),
        cpal::SampleFormat::I32 => Some(SampleFormat::S32),
        cpal::SampleFormat::F32 => Some(SampleFormat::F32),
        _ => None,
    }
}

/// Input scratch for one duplex output period. cpal's default period is
/// usually well below the configured buffer, so reserving the buffer (and
/// never less than 1024 frames) keeps `resize` in the callback from
/// allocating.
fn duplex_scratch(buffer_frames: usize, frame_bytes: usize) -> Vec<u8> {
    Vec::with_capacity(buffer_frames.max(1024) * frame_bytes)
}

fn stream_config(endpoint: &EndpointParams, sample_rate: u32) -> cpal::StreamConfig {
    cpal::StreamConfig {
        channels: endpoint.channels,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    }
}

/// Opened cpal streams for one device (one, or two for duplex).
struct CpalStream {
    streams: Vec<cpal::Stream>,
}

impl BackendStream for CpalStream {
    fn start(&mut self) -> Result<()> {
        for stream in &self.streams {
            stream
                .play()
                .map_err(|e| backend_error("failed to start stream", e))?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        for stream in &self.streams {
            stream
                .pause()
                .map_err(|e| backend_error("failed to pause stream", e))?;
        }
        Ok(())
    }
}

/// Backend using the platform's default cpal host.
pub struct CpalBackend {
    host_id: cpal::HostId,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self {
            host_id: cpal::default_host().id(),
        }
    }

    fn host(&self) -> Result<cpal::Host> {
        cpal::host_from_id(self.host_id).map_err(|e| BridgeError::NotAvailable(e.to_string()))
    }

    fn output_device(&self, host: &cpal::Host, id: Option<&str>) -> Result<cpal::Device> {
        match id {
            None => host.default_output_device().ok_or_else(|| {
                BridgeError::NotAvailable("no default output device".to_string())
            }),
            Some(id) => host
                .output_devices()
                .map_err(|e| backend_error("failed to enumerate output devices", e))?
                .find(|d| d.name().map(|n| n == id).unwrap_or(false))
                .ok_or_else(|| {
                    BridgeError::NotAvailable(format!("output device '{}' not found", id))
                }),
        }
    }

    fn input_device(&self, host: &cpal::Host, id: Option<&str>) -> Result<cpal::Device> {
        match id {
            None => host.default_input_device().ok_or_else(|| {
                BridgeError::NotAvailable("no default input device".to_string())
            }),
            Some(id) => host
                .input_devices()
                .map_err(|e| backend_error("failed to enumerate input devices", e))?
                .find(|d| d.name().map(|n| n == id).unwrap_or(false))
                .ok_or_else(|| {
                    BridgeError::NotAvailable(format!("input device '{}' not found", id))
                }),
        }
    }

    fn build_output(
        device: &cpal::Device,
        endpoint: &EndpointParams,
        sample_rate: u32,
        mut fill: impl FnMut(&mut [u8], usize) + Send + 'static,
    ) -> Result<cpal::Stream> {
        let frame_samples = endpoint.channels as usize;
        device
            .build_output_stream_raw(
                &stream_config(endpoint, sample_rate),
                to_cpal_format(endpoint.format),
                move |data: &mut cpal::Data, _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / frame_samples;
                    fill(data.bytes_mut(), frames);
                },
                |err| error!("Output stream error: {}", err),
                None,
            )
            .map_err(|e| backend_error("failed to build output stream", e))
    }

    fn build_input(
        device: &cpal::Device,
        endpoint: &EndpointParams,
        sample_rate: u32,
        mut consume: impl FnMut(&[u8], usize) + Send + 'static,
    ) -> Result<cpal::Stream> {
        let frame_samples = endpoint.channels as usize;
        device
            .build_input_stream_raw(
                &stream_config(endpoint, sample_rate),
                to_cpal_format(endpoint.format),
                move |data: &cpal::Data, _: &cpal::InputCallbackInfo| {
                    let frames = data.len() / frame_samples;
                    consume(data.bytes(), frames);
                },
                |err| error!("Input stream error: {}", err),
                None,
            )
            .map_err(|e| backend_error("failed to build input stream", e))
    }

    fn describe(device: &cpal::Device, device_type: DeviceType, is_default: bool) -> DeviceInfo {
        let name = device.name().unwrap_or_else(|_| "<unknown>".to_string());
        let mut info = DeviceInfo::new(name.clone(), name, device_type).with_default(is_default);

        let ranges: Vec<cpal::SupportedStreamConfigRange> = match device_type {
            DeviceType::Capture => device
                .supported_input_configs()
                .map(|it| it.collect())
                .unwrap_or_default(),
            _ => device
                .supported_output_configs()
                .map(|it| it.collect())
                .unwrap_or_default(),
        };

        if !ranges.is_empty() {
            let min_ch = ranges.iter().map(|r| r.channels()).min().unwrap_or(1);
            let max_ch = ranges.iter().map(|r| r.channels()).max().unwrap_or(2);
            let min_rate = ranges.iter().map(|r| r.min_sample_rate().0).min().unwrap_or(8000);
            let max_rate = ranges
                .iter()
                .map(|r| r.max_sample_rate().0)
                .max()
                .unwrap_or(192_000);
            let mut formats: Vec<SampleFormat> = ranges
                .iter()
                .filter_map(|r| from_cpal_format(r.sample_format()))
                .collect();
            formats.sort_by_key(|f| f.width());
            formats.dedup();

            info = info
                .with_channels(min_ch, max_ch)
                .with_sample_rates(min_rate, max_rate)
                .with_formats(formats);
        }

        info
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    fn name(&self) -> &str {
        self.host_id.name()
    }

    #[instrument(skip(self, callback), fields(device_type = %params.device_type))]
    fn open_stream(
        &self,
        params: &StreamParams,
        callback: DataCallback,
    ) -> Result<Box<dyn BackendStream>> {
        params.validate()?;
        let host = self.host()?;
        let rate = params.sample_rate;

        let streams = match (params.device_type, &params.playback, &params.capture) {
            (DeviceType::Playback, Some(out), _) => {
                let device = self.output_device(&host, out.device_id.as_deref())?;
                let mut callback = callback;
                vec![Self::build_output(&device, out, rate, move |output, frames| {
                    callback(output, &[], frames)
                })?]
            }
            (DeviceType::Capture, _, Some(inp)) => {
                let device = self.input_device(&host, inp.device_id.as_deref())?;
                let mut callback = callback;
                vec![Self::build_input(&device, inp, rate, move |input, frames| {
                    callback(&mut [], input, frames)
                })?]
            }
            (DeviceType::Duplex, Some(out), Some(inp)) => {
                let out_device = self.output_device(&host, out.device_id.as_deref())?;
                let in_device = self.input_device(&host, inp.device_id.as_deref())?;

                // Two periods of input absorb jitter between the two clocks.
                let ring =
                    ByteRingBuffer::new(params.buffer_frames().max(1024) * inp.frame_bytes() * 2);
                let in_frame_bytes = inp.frame_bytes();
                let in_silence = inp.format.silence();
                let callback = Arc::new(Mutex::new(callback));

                let writer = ring.clone();
                let input_stream =
                    Self::build_input(&in_device, inp, rate, move |input, _| {
                        writer.write(input);
                    })?;

                let mut scratch = duplex_scratch(params.buffer_frames(), in_frame_bytes);
                let output_stream =
                    Self::build_output(&out_device, out, rate, move |output, frames| {
                        scratch.resize(frames * in_frame_bytes, in_silence);
                        let got = ring.read(&mut scratch);
                        scratch[got..].fill(in_silence);
                        (callback.lock())(output, &scratch, frames);
                    })?;

                vec![input_stream, output_stream]
            }
            _ => {
                return Err(BridgeError::InvalidParameters(
                    "stream parameters missing endpoint".to_string(),
                ))
            }
        };

        info!(backend = self.name(), sample_rate = rate, "Opened cpal stream");
        Ok(Box::new(CpalStream { streams }))
    }

    fn playback_devices(&self) -> Result<Vec<DeviceInfo>> {
        let host = self.host()?;
        let default_name = host.default_output_device().and_then(|d| d.name().ok());
        let devices = host
            .output_devices()
            .map_err(|e| backend_error("failed to enumerate output devices", e))?
            .map(|d| {
                let is_default = d.name().ok() == default_name;
                Self::describe(&d, DeviceType::Playback, is_default)
            })
            .collect::<Vec<_>>();
        debug!(count = devices.len(), "Enumerated playback devices");
        Ok(devices)
    }

    fn capture_devices(&self) -> Result<Vec<DeviceInfo>> {
        let host = self.host()?;
        let default_name = host.default_input_device().and_then(|d| d.name().ok());
        let devices = host
            .input_devices()
            .map_err(|e| backend_error("failed to enumerate input devices", e))?
            .map(|d| {
                let is_default = d.name().ok() == default_name;
                Self::describe(&d, DeviceType::Capture, is_default)
            })
            .collect::<Vec<_>>();
        debug!(count = devices.len(), "Enumerated capture devices");
        Ok(devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_mapping_is_bijective() {
        for format in SampleFormat::ALL {
            assert_eq!(from_cpal_format(to_cpal_format(format)), Some(format));
        }
        assert_eq!(from_cpal_format(cpal::SampleFormat::U16), None);
    }

    #[test]
    fn test_duplex_scratch_is_reserved_up_front() {
        let scratch = duplex_scratch(8820, 4);
        assert!(scratch.is_empty());
        assert!(scratch.capacity() >= 8820 * 4);

        let small = duplex_scratch(10, 2);
        assert!(small.capacity() >= 1024 * 2);
    }

    #[test]
    fn test_stream_config_uses_default_buffer() {
        let config = stream_config(&EndpointParams::new(SampleFormat::F32, 2), 48000);
        assert_eq!(config.channels, 2);
        assert_eq!(config.sample_rate, cpal::SampleRate(48000));
        assert_eq!(config.buffer_size, cpal::BufferSize::Default);
    }
}
