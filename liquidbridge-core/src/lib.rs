//! liquidbridge Core Library
//!
//! Shared types, wire models, and calibration data for the liquidbridge
//! project. This crate is used by both the backend and CLI components.

pub mod address;
pub mod calibration;
pub mod error;
pub mod status;

// Re-export commonly used types
pub use address::{DeviceAddress, Transport};
pub use calibration::duty_from_rpm;
pub use error::*;
pub use status::{parse_many, Envelope, Reading, StatusRecord};
