//! # Devices
//!
//! [`Device`] owns one backend stream and walks the lifecycle
//!
//! ```text
//! Created -> Initialized -> Started <-> Stopped -> Closed
//! ```
//!
//! Construction opens the stream (Created -> Initialized) and registers the
//! device's bridge state. `start` binds a routine and starts the stream,
//! `stop` halts the stream and unbinds, `close` releases everything and is
//! terminal.
//!
//! [`PlaybackDevice`], [`CaptureDevice`] and [`DuplexDevice`] are typed
//! wrappers whose `start` takes a routine of the matching role.
//!
//! ## Usage
//!
//! ```ignore
//! use core_device::{DeviceConfig, PlaybackDevice};
//!
//! let mut device = PlaybackDevice::new(DeviceConfig::playback(), backend)?;
//! device.start(core_decode::stream_file("song.flac", &Default::default())?)?;
//! // ... later
//! device.close();
//! ```

use crate::bridge::BridgeState;
use crate::config::DeviceConfig;
use crate::error::{DeviceError, Result};
use crate::registry::{CallbackRegistry, DeviceId, SharedBridge};
use crate::routine::{CaptureRoutine, DuplexRoutine, PlaybackRoutine, Routine};
use bridge_traits::audio::{AudioBackend, BackendStream, DeviceType};
use core_runtime::CoreConfig;
use parking_lot::Mutex;
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Created,
    Initialized,
    Started,
    Stopped,
    Closed,
}

// ============================================================================
// Device
// ============================================================================

pub struct Device {
    id: DeviceId,
    config: DeviceConfig,
    backend: Arc<dyn AudioBackend>,
    registry: Arc<CallbackRegistry>,
    bridge: SharedBridge,
    stream: Option<Box<dyn BackendStream>>,
    state: DeviceState,
}

impl Device {
    /// Open a device on `backend`, registered in the global registry.
    pub fn new(config: DeviceConfig, backend: Arc<dyn AudioBackend>) -> Result<Self> {
        Self::with_registry(config, backend, CallbackRegistry::global())
    }

    /// Open a device of `device_type` with the defaults and backend of a
    /// core configuration.
    pub fn from_core_config(device_type: DeviceType, core: &CoreConfig) -> Result<Self> {
        let config = DeviceConfig::from_defaults(device_type, &core.device_defaults);
        Self::new(config, Arc::clone(&core.backend))
    }

    /// Open a device whose callback is routed through `registry`.
    #[instrument(skip_all, fields(device_type = %config.device_type, backend = backend.name()))]
    pub fn with_registry(
        config: DeviceConfig,
        backend: Arc<dyn AudioBackend>,
        registry: Arc<CallbackRegistry>,
    ) -> Result<Self> {
        let id = DeviceId::new();
        let mut state = DeviceState::Created;
        debug!(%id, ?state, "Creating device");

        config.validate()?;
        if backend.is_null() {
            return Err(DeviceError::InitFailed(
                "no suitable audio backend found".to_string(),
            ));
        }

        let params = config.to_stream_params();
        let bridge: SharedBridge = Arc::new(Mutex::new(BridgeState::new(&params)));
        registry.register(id, Arc::clone(&bridge));

        let callback_registry = Arc::clone(&registry);
        let silence = config.playback.format.silence();
        let callback = Box::new(move |output: &mut [u8], input: &[u8], frames: usize| {
            callback_registry.dispatch(id, output, input, frames, silence);
        });

        let stream = match backend.open_stream(&params, callback) {
            Ok(stream) => stream,
            Err(e) => {
                registry.remove(id);
                warn!("Backend {} rejected device: {}", backend.name(), e);
                return Err(DeviceError::InitFailed(e.to_string()));
            }
        };
        state = DeviceState::Initialized;

        info!(
            %id,
            sample_rate = config.sample_rate,
            buffer_msec = config.buffer_size_msec,
            "Opened {} device on {}",
            config.device_type,
            backend.name()
        );

        Ok(Self {
            id,
            config,
            backend,
            registry,
            bridge,
            stream: Some(stream),
            state,
        })
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn device_type(&self) -> DeviceType {
        self.config.device_type
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Name of the backend the device runs on.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn is_closed(&self) -> bool {
        self.state == DeviceState::Closed
    }

    /// `true` while a routine is bound.
    pub fn is_bound(&self) -> bool {
        self.bridge.lock().is_bound()
    }

    /// Number of non-empty invocations delivered to the device so far.
    pub fn invocations(&self) -> u64 {
        self.bridge.lock().invocations()
    }

    /// Bind `routine` and start the stream.
    ///
    /// Fails with `RoutineMismatch` for a routine of another role and
    /// `AlreadyStarted` while a routine is bound. If the previous routine
    /// failed and nobody has taken the error yet, the new routine is still
    /// bound and started, and that error is returned as `Ok(Some(_))`.
    pub fn start(&mut self, routine: Routine) -> Result<Option<DeviceError>> {
        let stream = self.stream.as_mut().ok_or(DeviceError::Closed)?;
        let parked = self.bridge.lock().bind(routine)?;

        if let Err(e) = stream.start() {
            self.bridge.lock().unbind();
            return Err(e.into());
        }
        self.state = DeviceState::Started;
        debug!(id = %self.id, "Device started");
        Ok(parked)
    }

    /// Halt the stream and unbind the routine. The device can be started
    /// again.
    pub fn stop(&mut self) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(DeviceError::Closed)?;
        if self.state == DeviceState::Started {
            stream.stop()?;
            self.state = DeviceState::Stopped;
        }
        self.bridge.lock().unbind();
        debug!(id = %self.id, "Device stopped");
        Ok(())
    }

    /// Failure parked by the callback since the last call, if any.
    pub fn take_error(&self) -> Option<DeviceError> {
        self.bridge.lock().take_error()
    }

    /// Unbind, unregister and release the stream. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.state == DeviceState::Closed {
            return;
        }
        self.bridge.lock().unbind();
        self.registry.remove(self.id);

        if let Some(mut stream) = self.stream.take() {
            if self.state == DeviceState::Started {
                if let Err(e) = stream.stop() {
                    warn!("Failed to stop stream while closing: {}", e);
                }
            }
        }
        self.state = DeviceState::Closed;
        info!(id = %self.id, "Closed {} device", self.config.device_type);
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("device_type", &self.config.device_type)
            .field("backend", &self.backend.name())
            .field("state", &self.state)
            .finish()
    }
}

// ============================================================================
// Typed Devices
// ============================================================================

fn require_type(config: &DeviceConfig, expected: DeviceType) -> Result<()> {
    if config.device_type != expected {
        return Err(DeviceError::Config(format!(
            "expected a {} configuration, got {}",
            expected, config.device_type
        )));
    }
    Ok(())
}

macro_rules! typed_device {
    ($(#[$meta:meta])* $name:ident, $device_type:expr, $routine:ident, $wrap:path) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name {
            inner: Device,
        }

        impl $name {
            pub fn new(config: DeviceConfig, backend: Arc<dyn AudioBackend>) -> Result<Self> {
                require_type(&config, $device_type)?;
                Ok(Self {
                    inner: Device::new(config, backend)?,
                })
            }

            pub fn with_registry(
                config: DeviceConfig,
                backend: Arc<dyn AudioBackend>,
                registry: Arc<CallbackRegistry>,
            ) -> Result<Self> {
                require_type(&config, $device_type)?;
                Ok(Self {
                    inner: Device::with_registry(config, backend, registry)?,
                })
            }

            pub fn start(
                &mut self,
                routine: impl $routine + 'static,
            ) -> Result<Option<DeviceError>> {
                self.inner.start($wrap(Box::new(routine)))
            }

            pub fn stop(&mut self) -> Result<()> {
                self.inner.stop()
            }

            pub fn close(&mut self) {
                self.inner.close()
            }

            pub fn into_inner(self) -> Device {
                self.inner
            }
        }

        impl Deref for $name {
            type Target = Device;

            fn deref(&self) -> &Device {
                &self.inner
            }
        }
    };
}

typed_device!(
    /// Device that plays what its routine yields.
    PlaybackDevice,
    DeviceType::Playback,
    PlaybackRoutine,
    Routine::Playback
);

typed_device!(
    /// Device that hands captured input to its routine.
    CaptureDevice,
    DeviceType::Capture,
    CaptureRoutine,
    Routine::Capture
);

typed_device!(
    /// Device that captures and plays through a single routine.
    DuplexDevice,
    DeviceType::Duplex,
    DuplexRoutine,
    Routine::Duplex
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routine::{Payload, Step};
    use bridge_desktop::{NullBackend, VirtualBackend};
    use bridge_traits::audio::{DataCallback, DeviceInfo, SampleFormat, StreamParams};
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use mockall::mock;

    mock! {
        Backend {}

        impl AudioBackend for Backend {
            fn name(&self) -> &str;
            fn is_null(&self) -> bool;
            fn open_stream(
                &self,
                params: &StreamParams,
                callback: DataCallback,
            ) -> BridgeResult<Box<dyn BackendStream>>;
            fn playback_devices(&self) -> BridgeResult<Vec<DeviceInfo>>;
            fn capture_devices(&self) -> BridgeResult<Vec<DeviceInfo>>;
        }
    }

    fn registry() -> Arc<CallbackRegistry> {
        Arc::new(CallbackRegistry::new())
    }

    #[test]
    fn test_null_backend_fails_init() {
        let err = Device::with_registry(
            DeviceConfig::playback(),
            Arc::new(NullBackend::new()),
            registry(),
        )
        .unwrap_err();
        assert!(matches!(err, DeviceError::InitFailed(_)));
    }

    #[test]
    fn test_rejected_params_fail_init_and_unregister() {
        let mut backend = MockBackend::new();
        backend.expect_name().return_const("mock".to_string());
        backend.expect_is_null().return_const(false);
        backend
            .expect_open_stream()
            .times(1)
            .returning(|_, _| Err(BridgeError::OperationFailed("no such device".into())));

        let registry = registry();
        let err = Device::with_registry(DeviceConfig::playback(), Arc::new(backend), Arc::clone(&registry))
            .unwrap_err();
        assert!(matches!(err, DeviceError::InitFailed(ref msg) if msg.contains("no such device")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected_before_backend() {
        let mut backend = MockBackend::new();
        backend.expect_name().return_const("mock".to_string());
        backend.expect_open_stream().never();

        let err = Device::with_registry(
            DeviceConfig::playback().with_sample_rate(0),
            Arc::new(backend),
            registry(),
        )
        .unwrap_err();
        assert!(matches!(err, DeviceError::Config(_)));
    }

    #[test]
    fn test_lifecycle() {
        let backend = Arc::new(VirtualBackend::new());
        let registry = registry();
        let mut device =
            Device::with_registry(DeviceConfig::playback(), backend.clone(), Arc::clone(&registry))
                .unwrap();
        assert_eq!(device.state(), DeviceState::Initialized);
        assert_eq!(device.backend_name(), "virtual");
        assert!(registry.contains(device.id()));

        device
            .start(Routine::playback_fn(|_| Ok(Step::Yield(Payload::Bytes(Vec::new())))))
            .unwrap();
        assert_eq!(device.state(), DeviceState::Started);
        assert!(backend.last_stream().unwrap().is_running());

        device.stop().unwrap();
        assert_eq!(device.state(), DeviceState::Stopped);
        assert!(!device.is_bound());
        assert!(!backend.last_stream().unwrap().is_running());

        device.close();
        assert_eq!(device.state(), DeviceState::Closed);
        assert!(!registry.contains(device.id()));
        assert!(backend.last_stream().unwrap().is_closed());
    }

    #[test]
    fn test_close_twice_is_noop() {
        let mut device = Device::with_registry(
            DeviceConfig::capture(),
            Arc::new(VirtualBackend::new()),
            registry(),
        )
        .unwrap();
        device.close();
        device.close();
        assert!(device.is_closed());
    }

    #[test]
    fn test_operations_after_close_fail() {
        let mut device = Device::with_registry(
            DeviceConfig::playback(),
            Arc::new(VirtualBackend::new()),
            registry(),
        )
        .unwrap();
        device.close();

        let routine = Routine::playback_fn(|_| Ok(Step::Done));
        assert!(matches!(device.start(routine), Err(DeviceError::Closed)));
        assert!(matches!(device.stop(), Err(DeviceError::Closed)));
    }

    #[test]
    fn test_start_rejects_wrong_role() {
        let mut device = Device::with_registry(
            DeviceConfig::playback(),
            Arc::new(VirtualBackend::new()),
            registry(),
        )
        .unwrap();
        let err = device
            .start(Routine::capture_fn(|_input: &[u8]| Ok(Step::Yield(()))))
            .unwrap_err();
        assert!(matches!(err, DeviceError::RoutineMismatch { .. }));
        assert_eq!(device.state(), DeviceState::Initialized);
    }

    #[test]
    fn test_drop_unregisters() {
        let registry = registry();
        let device = Device::with_registry(
            DeviceConfig::playback().with_format(SampleFormat::F32),
            Arc::new(VirtualBackend::new()),
            Arc::clone(&registry),
        )
        .unwrap();
        let id = device.id();
        drop(device);
        assert!(!registry.contains(id));
    }

    #[test]
    fn test_typed_device_checks_config_type() {
        let err = PlaybackDevice::with_registry(
            DeviceConfig::capture(),
            Arc::new(VirtualBackend::new()),
            registry(),
        )
        .unwrap_err();
        assert!(matches!(err, DeviceError::Config(_)));
    }
}
