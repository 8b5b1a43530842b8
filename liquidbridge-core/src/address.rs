//! Device address parsing
//!
//! liquidctl identifies a device either by a USB bus/port pair or by a
//! bus-specific hardware address (HID). The transport kind decides which
//! flags the interactive session is launched with.

use crate::error::{LiquidbridgeError, Result};

/// How a device is reached, with the transport-specific locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// USB bus/port pair, passed as `--usb-port <locator>`
    Usb { port: String },
    /// Bus-specific hardware address, passed as `--address <address>`
    Hid,
}

/// An opaque device address, decomposed into its transport kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAddress {
    raw: String,
    transport: Transport,
}

impl DeviceAddress {
    /// Parse an address string.
    ///
    /// `usb:<bus>:<port>` selects the USB transport with `<bus>:<port>`
    /// as the locator; any other non-empty string is a HID hardware
    /// address used verbatim.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(LiquidbridgeError::Address("empty address".to_string()));
        }

        let transport = match raw.strip_prefix("usb:") {
            Some(port) if !port.is_empty() => Transport::Usb {
                port: port.to_string(),
            },
            Some(_) => {
                return Err(LiquidbridgeError::Address(format!(
                    "usb address missing bus/port locator: {raw}"
                )))
            }
            None => Transport::Hid,
        };

        Ok(Self {
            raw: raw.to_string(),
            transport,
        })
    }

    /// The full address string as reported by liquidctl
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The transport kind and locator
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Arguments selecting this device for an interactive session
    pub fn interactive_args(&self) -> Vec<String> {
        match &self.transport {
            Transport::Usb { port } => {
                vec!["--usb-port".to_string(), port.clone()]
            }
            Transport::Hid => vec!["--address".to_string(), self.raw.clone()],
        }
    }
}

impl std::fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
