//! High-level liquidctl backend
//!
//! Ties the channel registry and the one-shot path together behind one
//! synchronous interface. Every method takes `&self` and blocks until the
//! exchange or subprocess completes; the host drives the polling cadence.

use std::path::Path;

use liquidbridge_core::{
    parse_many, DeviceAddress, Envelope, LiquidbridgeError, Result, StatusRecord,
};
use tracing::warn;

use crate::channel::{Channel, Launcher, ProcessLauncher};
use crate::oneshot::{OneShot, ProcessRunner, Runner, STATUS_ARGS};
use crate::registry::ChannelRegistry;

/// Object-safe I/O surface consumed by the device facade.
///
/// Lets facade logic be tested against a scripted fake instead of real
/// subprocesses.
pub trait DeviceIo {
    /// Global `initialize all`
    fn initialize(&self) -> Result<()>;

    /// Multi-device status dump (tolerant per element)
    fn read_all_status(&self) -> Result<Vec<StatusRecord>>;

    /// Status of the device bound to `address` via its interactive session
    fn read_status(&self, address: &DeviceAddress) -> Result<Vec<StatusRecord>>;

    /// `set pump speed <percent>` on the device's interactive session
    fn set_pump(&self, address: &DeviceAddress, percent: u8) -> Result<()>;

    /// Non-interactive fan duty fallback:
    /// `--address <address> set fan<index> speed <percent>`
    fn set_fan(&self, address: &DeviceAddress, index: usize, percent: u8) -> Result<()>;
}

/// Backend over real liquidctl subprocesses (or mock seams in tests)
pub struct LiquidctlBackend<L: Launcher, R: Runner> {
    registry: ChannelRegistry<L>,
    oneshot: OneShot<R>,
}

impl LiquidctlBackend<ProcessLauncher, ProcessRunner> {
    /// Backend running the liquidctl executable at `exe`
    pub fn new(exe: impl AsRef<Path>) -> Self {
        let exe = exe.as_ref();
        Self::with_parts(
            ChannelRegistry::new(ProcessLauncher::new(exe)),
            OneShot::new(ProcessRunner::new(exe)),
        )
    }
}

impl<L: Launcher, R: Runner> LiquidctlBackend<L, R> {
    /// Assemble a backend from its parts; used by tests to inject mocks
    pub fn with_parts(registry: ChannelRegistry<L>, oneshot: OneShot<R>) -> Self {
        Self { registry, oneshot }
    }

    /// One command/response exchange with the channel for `address`.
    ///
    /// A dead exchange triggers exactly one recovery: global
    /// re-initialization, channel restart, retry. A second dead exchange
    /// is fatal for this call and carries the channel's remaining output.
    fn exchange(&self, address: &DeviceAddress, command: &str) -> Result<String> {
        let first = self
            .registry
            .with_channel(address, |channel| channel.exchange(command))?;
        if let Some(line) = first {
            return Ok(line);
        }

        warn!("Session for {} died, re-initializing and restarting", address);
        self.oneshot.initialize()?;
        self.registry.restart(address)?;

        self.registry.with_channel(address, |channel| {
            match channel.exchange(command)? {
                Some(line) => Ok(line),
                None => {
                    let diagnostics = channel.drain_output();
                    Err(LiquidbridgeError::ChannelDead {
                        detail: format!("Remaining stdout:\n{}", diagnostics.stdout),
                        stderr: diagnostics.stderr,
                    })
                }
            }
        })
    }

    /// One exchange whose response must be a success envelope
    fn exchange_envelope(&self, address: &DeviceAddress, command: &str) -> Result<Envelope> {
        let line = self.exchange(address, command)?;
        Envelope::parse(&line)
    }
}

impl<L: Launcher, R: Runner> DeviceIo for LiquidctlBackend<L, R> {
    fn initialize(&self) -> Result<()> {
        self.oneshot.initialize()
    }

    fn read_all_status(&self) -> Result<Vec<StatusRecord>> {
        let args: Vec<String> = STATUS_ARGS.iter().map(|s| s.to_string()).collect();
        let invocation = self.oneshot.run(&args)?;
        parse_many(&invocation.stdout)
    }

    fn read_status(&self, address: &DeviceAddress) -> Result<Vec<StatusRecord>> {
        self.exchange_envelope(address, "status")?.into_records()
    }

    fn set_pump(&self, address: &DeviceAddress, percent: u8) -> Result<()> {
        let command = format!("set pump speed {}", percent);
        self.exchange_envelope(address, &command)?.into_data()?;
        Ok(())
    }

    fn set_fan(&self, address: &DeviceAddress, index: usize, percent: u8) -> Result<()> {
        let args = vec![
            "--address".to_string(),
            address.as_str().to_string(),
            "set".to_string(),
            format!("fan{}", index),
            "speed".to_string(),
            percent.to_string(),
        ];
        self.oneshot.run(&args)?;
        Ok(())
    }
}
