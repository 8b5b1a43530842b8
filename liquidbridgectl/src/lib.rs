//! liquidbridge CLI Library
//!
//! Command definitions, configuration, and output formatting for the
//! `liquidbridgectl` binary. The binary is a thin driver exercising the
//! backend crate: it initializes devices, dumps status, and issues pump
//! and fan duty commands.

// Internal CLI implementation - not part of public API
#[doc(hidden)]
pub mod cli;

/// Configuration types for the CLI tool.
pub mod config;

// Internal formatting functions - not part of public API
#[doc(hidden)]
pub mod format;
