//! # Callback Registry
//!
//! Maps a [`DeviceId`] to the bridge state of its device. Backend callbacks
//! hold only the id and a handle to the registry; they look the device up on
//! every invocation, so a device that has been closed simply stops receiving
//! data.
//!
//! Lookups take a read lock and may run concurrently from several audio
//! threads. Registration and removal happen on application threads under a
//! short write lock.

use crate::bridge::BridgeState;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

/// Identity of one device instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(Uuid);

impl DeviceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub(crate) type SharedBridge = Arc<Mutex<BridgeState>>;

#[derive(Default)]
pub struct CallbackRegistry {
    entries: RwLock<HashMap<DeviceId, SharedBridge>>,
}

static GLOBAL: OnceLock<Arc<CallbackRegistry>> = OnceLock::new();

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry, created on first use.
    pub fn global() -> Arc<CallbackRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(CallbackRegistry::new())))
    }

    pub(crate) fn register(&self, id: DeviceId, bridge: SharedBridge) {
        self.entries.write().insert(id, bridge);
    }

    pub(crate) fn remove(&self, id: DeviceId) -> Option<SharedBridge> {
        self.entries.write().remove(&id)
    }

    pub(crate) fn get(&self, id: DeviceId) -> Option<SharedBridge> {
        self.entries.read().get(&id).cloned()
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.entries.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Route one backend invocation to the device registered under `id`.
    /// An unknown id (a closed device) gets its output filled with
    /// `silence`.
    pub(crate) fn dispatch(
        &self,
        id: DeviceId,
        output: &mut [u8],
        input: &[u8],
        frames: usize,
        silence: u8,
    ) {
        // The read guard is released before the device lock is taken.
        let Some(bridge) = self.get(id) else {
            output.fill(silence);
            return;
        };
        bridge.lock().process(output, input, frames);
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("devices", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routine::{Routine, Step};
    use bridge_traits::audio::{DeviceType, EndpointParams, SampleFormat, StreamParams};

    fn bridge() -> SharedBridge {
        let params = StreamParams::new(DeviceType::Playback, 8000, 10)
            .with_playback(EndpointParams::new(SampleFormat::U8, 1));
        Arc::new(Mutex::new(BridgeState::new(&params)))
    }

    #[test]
    fn test_register_and_remove() {
        let registry = CallbackRegistry::new();
        let id = DeviceId::new();
        assert!(registry.is_empty());

        registry.register(id, bridge());
        assert!(registry.contains(id));
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(id).is_some());
        assert!(registry.remove(id).is_none());
        assert!(!registry.contains(id));
    }

    #[test]
    fn test_dispatch_reaches_registered_device() {
        let registry = CallbackRegistry::new();
        let id = DeviceId::new();
        let shared = bridge();
        shared
            .lock()
            .bind(Routine::playback_fn(|frames| Ok(Step::Yield(vec![1u8; frames].into()))))
            .unwrap();
        registry.register(id, shared);

        let mut out = vec![0u8; 3];
        registry.dispatch(id, &mut out, &[], 3, 0x80);
        assert_eq!(out, vec![1, 1, 1]);
    }

    #[test]
    fn test_dispatch_to_unknown_id_outputs_silence() {
        let registry = CallbackRegistry::new();
        let mut out = vec![5u8; 2];
        registry.dispatch(DeviceId::new(), &mut out, &[], 2, 0x80);
        assert_eq!(out, vec![0x80, 0x80]);

        let mut out = vec![5u8; 4];
        registry.dispatch(DeviceId::new(), &mut out, &[], 1, 0);
        assert_eq!(out, vec![0; 4]);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(DeviceId::new(), DeviceId::new());
    }

    #[test]
    fn test_global_is_shared() {
        let a = CallbackRegistry::global();
        let b = CallbackRegistry::global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
