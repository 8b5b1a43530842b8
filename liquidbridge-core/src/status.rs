//! Status record model for the liquidctl JSON wire format
//!
//! liquidctl reports one record per device: an address, a human-readable
//! description, and a list of keyed readings. Interactive sessions wrap
//! their single-line responses in a `{status, data}` envelope.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{LiquidbridgeError, Result};

/// One named data point within a status record.
///
/// A `None` value means the device does not support this reading; it must
/// never be conflated with zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Free-form key defined by liquidctl ("Liquid temperature", ...)
    pub key: String,
    /// Numeric value, absent when the capability is not present
    pub value: Option<f64>,
    /// Unit string, e.g. "°C" or "rpm"
    pub unit: Option<String>,
}

/// One device's telemetry snapshot for one polling cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Opaque device address
    pub address: String,
    /// Human-readable device name
    pub description: String,
    /// Ordered readings; liquidctl names this field "status"
    #[serde(rename = "status")]
    pub readings: Vec<Reading>,
}

impl StatusRecord {
    /// Look up the single reading with the given key.
    ///
    /// Zero or multiple matches is a data-contract violation and fails
    /// loudly rather than silently picking one.
    pub fn reading(&self, key: &str) -> Result<&Reading> {
        let mut matches = self.readings.iter().filter(|r| r.key == key);
        match (matches.next(), matches.next()) {
            (Some(reading), None) => Ok(reading),
            (None, _) => Err(LiquidbridgeError::ReadingContract {
                key: key.to_string(),
                matches: 0,
            }),
            (Some(_), Some(_)) => Err(LiquidbridgeError::ReadingContract {
                key: key.to_string(),
                matches: self.readings.iter().filter(|r| r.key == key).count(),
            }),
        }
    }

    /// Whether a key exists with a non-null value
    pub fn has_value(&self, key: &str) -> bool {
        self.readings
            .iter()
            .any(|r| r.key == key && r.value.is_some())
    }

    /// The value for a key, failing if the reading is absent or null
    pub fn value(&self, key: &str) -> Result<f64> {
        let reading = self.reading(key)?;
        reading.value.ok_or_else(|| {
            LiquidbridgeError::Decode(format!("reading \"{key}\" has no value"))
        })
    }
}

/// Fixed response envelope emitted by interactive sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// "success" or "error"
    pub status: String,
    /// Payload on success, error message on failure
    pub data: serde_json::Value,
}

impl Envelope {
    /// Decode one response line into an envelope.
    ///
    /// A line that is not a well-formed envelope is a decode failure; a
    /// well-formed envelope with a non-success status surfaces the
    /// tool-provided message, never a generic parse error.
    pub fn parse(line: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(line)
            .map_err(|e| LiquidbridgeError::Decode(format!("invalid response line: {e}")))?;
        Ok(envelope)
    }

    /// Extract the payload, turning an error status into a [`LiquidbridgeError::Tool`]
    pub fn into_data(self) -> Result<serde_json::Value> {
        if self.status == "success" {
            Ok(self.data)
        } else {
            let message = match self.data {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            Err(LiquidbridgeError::Tool(message))
        }
    }

    /// Decode the payload strictly into a list of status records
    pub fn into_records(self) -> Result<Vec<StatusRecord>> {
        let data = self.into_data()?;
        serde_json::from_value(data)
            .map_err(|e| LiquidbridgeError::Decode(format!("invalid status payload: {e}")))
    }
}

/// Parse a multi-device status dump, tolerant per element.
///
/// A single malformed device report must not discard the whole batch: the
/// offending element is skipped with a warning and decoding continues,
/// preserving the order of the well-formed subset.
pub fn parse_many(json: &str) -> Result<Vec<StatusRecord>> {
    let elements: Vec<serde_json::Value> = serde_json::from_str(json)
        .map_err(|e| LiquidbridgeError::Decode(format!("invalid status dump: {e}")))?;

    let mut records = Vec::with_capacity(elements.len());
    for element in elements {
        match serde_json::from_value::<StatusRecord>(element.clone()) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Unable to parse {}: {}", element, e),
        }
    }
    Ok(records)
}
