//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the audio core:
//! - Logging and tracing infrastructure
//! - Configuration management (audio backend injection, device defaults)
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the decode and device
//! crates depend on. It establishes the logging conventions and decides
//! which [`AudioBackend`](bridge_traits::AudioBackend) devices are opened on.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, DeviceDefaults};
pub use error::{Error, Result};
