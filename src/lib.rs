//! Workspace facade crate.
//!
//! Re-exports the workspace crates behind feature flags so a host can depend
//! on `sonic-workspace` alone:
//!
//! - `desktop-shims` (default): [`runtime`] with the desktop backends
//! - `native-audio`: cpal output through `bridge-desktop`
//! - `decoder-all` (default) or `decoder-wav`, `decoder-flac`,
//!   `decoder-mp3`, `decoder-vorbis`: [`decode`]
//! - `devices`: [`device`] and [`decode`]

pub use bridge_traits as bridge;

#[cfg(feature = "desktop-shims")]
pub use core_runtime as runtime;

#[cfg(any(
    feature = "decoder-all",
    feature = "decoder-wav",
    feature = "decoder-flac",
    feature = "decoder-mp3",
    feature = "decoder-vorbis",
    feature = "devices"
))]
pub use core_decode as decode;

#[cfg(feature = "devices")]
pub use core_device as device;
