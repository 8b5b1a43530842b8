//! liquidbridge-backend
//!
//! Subprocess orchestration crate: owns the long-lived interactive
//! liquidctl sessions, the per-address channel registry, the bounded
//! one-shot invocation path, and the per-device facade built from status
//! records. This crate is intended to be used by a fan-control host (or
//! the CLI crate) that drives the polling cadence itself.
//!
//! Public API:
//! - `backend::LiquidctlBackend` — high-level entry point for all I/O
//! - `device::Device` — per-device facade of typed sensors and controls
//! - `channel::ProcessChannel` — one interactive subprocess session
//! - `registry::ChannelRegistry` — single-flight address-to-channel map

pub mod backend;
pub mod channel;
pub mod device;
pub mod oneshot;
pub mod registry;

pub use backend::{DeviceIo, LiquidctlBackend};
pub use channel::{Channel, ChannelState, Launcher, ProcessChannel, ProcessLauncher};
pub use device::{Device, MAX_FANS};
pub use oneshot::{Invocation, OneShot, ProcessRunner, Runner};
pub use registry::ChannelRegistry;
