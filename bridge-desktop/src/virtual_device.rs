//! # Virtual Audio Backend
//!
//! A software backend whose "hardware clock" is the caller. Every opened
//! stream is exposed through a [`VirtualDeviceHandle`] that invokes the data
//! callback on demand, exactly like a native backend would from its audio
//! thread. Useful for offline rendering, capture injection and deterministic
//! tests of the callback bridge.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::VirtualBackend;
//!
//! let backend = VirtualBackend::new();
//! // ... open a playback device on `backend` and start it ...
//! let handle = backend.last_stream().unwrap();
//! let rendered = handle.render(512).unwrap(); // 512 frames of output bytes
//! ```

use bridge_traits::{
    audio::{AudioBackend, BackendStream, DataCallback, DeviceInfo, DeviceType, StreamParams},
    error::{BridgeError, Result},
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

struct VirtualStreamShared {
    params: StreamParams,
    callback: Mutex<DataCallback>,
    running: AtomicBool,
    closed: AtomicBool,
    invocations: AtomicU64,
}

/// Stream returned to the device layer. Dropping it closes the stream.
struct VirtualStream {
    shared: Arc<VirtualStreamShared>,
}

impl BackendStream for VirtualStream {
    fn start(&mut self) -> Result<()> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(BridgeError::OperationFailed("stream is closed".to_string()));
        }
        self.shared.running.store(true, Ordering::Release);
        debug!("Virtual stream started");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.shared.running.store(false, Ordering::Release);
        debug!("Virtual stream stopped");
        Ok(())
    }
}

impl Drop for VirtualStream {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.closed.store(true, Ordering::Release);
    }
}

/// Caller-side view of a virtual stream.
#[derive(Clone)]
pub struct VirtualDeviceHandle {
    shared: Arc<VirtualStreamShared>,
}

impl VirtualDeviceHandle {
    pub fn params(&self) -> &StreamParams {
        &self.shared.params
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Number of callback invocations delivered so far.
    pub fn invocations(&self) -> u64 {
        self.shared.invocations.load(Ordering::Acquire)
    }

    /// Drive one invocation of `frames` frames with `input` as captured data.
    ///
    /// Returns the output buffer as left by the callback (pre-filled with
    /// silence), or `None` if the stream is stopped or closed. The output is
    /// empty for capture-only streams.
    pub fn tick(&self, frames: usize, input: &[u8]) -> Option<Vec<u8>> {
        if !self.is_running() || self.is_closed() {
            trace!("Virtual stream idle, invocation skipped");
            return None;
        }

        let mut output = match &self.shared.params.playback {
            Some(endpoint) if self.shared.params.device_type.has_playback() => {
                vec![endpoint.format.silence(); frames * endpoint.frame_bytes()]
            }
            _ => Vec::new(),
        };

        let mut callback = self.shared.callback.lock();
        (callback)(&mut output, input, frames);
        self.shared.invocations.fetch_add(1, Ordering::AcqRel);

        Some(output)
    }

    /// Playback invocation: ask the callback for `frames` frames of output.
    pub fn render(&self, frames: usize) -> Option<Vec<u8>> {
        self.tick(frames, &[])
    }

    /// Capture invocation: deliver `input`; the frame count is derived from
    /// the capture frame size.
    pub fn capture(&self, input: &[u8]) -> bool {
        let frames = self.input_frames(input);
        self.tick(frames, input).is_some()
    }

    /// Duplex invocation: deliver `input` and collect the same number of
    /// output frames.
    pub fn duplex(&self, input: &[u8]) -> Option<Vec<u8>> {
        let frames = self.input_frames(input);
        self.tick(frames, input)
    }

    fn input_frames(&self, input: &[u8]) -> usize {
        self.shared
            .params
            .capture
            .as_ref()
            .map(|endpoint| input.len() / endpoint.frame_bytes().max(1))
            .unwrap_or(0)
    }
}

/// Backend whose streams are clocked by the caller.
pub struct VirtualBackend {
    name: String,
    streams: Mutex<Vec<VirtualDeviceHandle>>,
    fail_open: AtomicBool,
}

impl VirtualBackend {
    pub fn new() -> Self {
        Self::with_name("virtual")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            streams: Mutex::new(Vec::new()),
            fail_open: AtomicBool::new(false),
        }
    }

    /// Make subsequent `open_stream` calls fail, simulating a device the
    /// backend rejects.
    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::Release);
    }

    /// Every stream opened so far, oldest first.
    pub fn streams(&self) -> Vec<VirtualDeviceHandle> {
        self.streams.lock().clone()
    }

    /// Most recently opened stream.
    pub fn last_stream(&self) -> Option<VirtualDeviceHandle> {
        self.streams.lock().last().cloned()
    }
}

impl Default for VirtualBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for VirtualBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn open_stream(
        &self,
        params: &StreamParams,
        callback: DataCallback,
    ) -> Result<Box<dyn BackendStream>> {
        params.validate()?;
        if self.fail_open.load(Ordering::Acquire) {
            return Err(BridgeError::OperationFailed(
                "virtual backend rejected stream parameters".to_string(),
            ));
        }

        let shared = Arc::new(VirtualStreamShared {
            params: params.clone(),
            callback: Mutex::new(callback),
            running: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            invocations: AtomicU64::new(0),
        });

        self.streams.lock().push(VirtualDeviceHandle {
            shared: Arc::clone(&shared),
        });

        debug!(
            device_type = %params.device_type,
            sample_rate = params.sample_rate,
            "Opened virtual stream"
        );

        Ok(Box::new(VirtualStream { shared }))
    }

    fn playback_devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok(vec![DeviceInfo::new(
            "virtual:playback",
            "Virtual Output",
            DeviceType::Playback,
        )
        .with_default(true)
        .with_channels(1, 32)])
    }

    fn capture_devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok(vec![DeviceInfo::new(
            "virtual:capture",
            "Virtual Input",
            DeviceType::Capture,
        )
        .with_default(true)
        .with_channels(1, 32)])
    }
}
