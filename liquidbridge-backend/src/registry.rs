//! Channel registry for per-address session management
//!
//! Maps each device address to its single live interactive channel.
//! Channels are created on first use, reused while their subprocess is
//! alive, and replaced wholesale (remove then insert) on restart; the
//! registry itself never polls for liveness, it only reacts when a caller
//! reports a dead exchange.

use std::collections::HashMap;
use std::sync::Mutex;

use liquidbridge_core::{DeviceAddress, Result};
use tracing::{debug, warn};

use crate::channel::{Channel, Launcher};

/// Single-flight address-to-channel map.
///
/// The map lives behind a mutex so that a host issuing overlapping
/// refreshes across different devices cannot corrupt it; operations on a
/// given address serialize, which also guarantees at most one live
/// channel per address at any time.
pub struct ChannelRegistry<L: Launcher> {
    launcher: L,
    channels: Mutex<HashMap<String, L::Chan>>,
}

impl<L: Launcher> ChannelRegistry<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Run `f` against the live channel for `address`, creating or
    /// replacing the channel first if the previous one's subprocess has
    /// exited.
    pub fn with_channel<T>(
        &self,
        address: &DeviceAddress,
        f: impl FnOnce(&mut L::Chan) -> Result<T>,
    ) -> Result<T> {
        let mut channels = self.channels.lock().expect("channel registry poisoned");

        let stale = match channels.get_mut(address.as_str()) {
            Some(channel) => {
                if channel.is_alive() {
                    return f(channel);
                }
                true
            }
            None => false,
        };

        if stale {
            warn!("Discarding exited session for {}", address);
            channels.remove(address.as_str());
        }

        debug!("Opening interactive session for {}", address);
        let channel = self.launcher.open(address)?;
        let channel = channels
            .entry(address.as_str().to_string())
            .or_insert(channel);
        f(channel)
    }

    /// Replace the channel for `address`: gracefully shut down the old
    /// one (exit command, short grace, then kill), then open a fresh one.
    ///
    /// Called only after the caller observed a dead exchange.
    pub fn restart(&self, address: &DeviceAddress) -> Result<()> {
        let mut channels = self.channels.lock().expect("channel registry poisoned");

        if let Some(mut old) = channels.remove(address.as_str()) {
            debug!("Shutting down stale session for {}", address);
            old.shutdown();
        }

        let channel = self.launcher.open(address)?;
        channels.insert(address.as_str().to_string(), channel);
        Ok(())
    }

    /// Number of registered channels (live or not)
    pub fn len(&self) -> usize {
        self.channels.lock().expect("channel registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
