//! Error types for the liquidbridge system

use thiserror::Error;

/// Core error type for liquidbridge operations
#[derive(Error, Debug)]
pub enum LiquidbridgeError {
    /// Malformed JSON or unexpected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Well-formed response envelope whose status was not "success";
    /// carries the tool-provided message verbatim
    #[error("liquidctl reported failure: {0}")]
    Tool(String),

    /// The interactive subprocess produced no output line, even after a
    /// restart; carries whatever stderr the process left behind
    #[error("liquidctl returned empty line. {detail}\nLast stderr output:\n{stderr}")]
    ChannelDead { detail: String, stderr: String },

    /// A one-shot invocation exited non-zero after the single
    /// initialize-and-retry
    #[error("liquidctl returned non-zero exit code {code}. Last stderr output:\n{stderr}")]
    Invocation { code: i32, stderr: String },

    /// A reading lookup did not match exactly one entry; indicates drift
    /// between the device model and the tool's actual output shape
    #[error("reading \"{key}\" matched {matches} entries, expected exactly 1")]
    ReadingContract { key: String, matches: usize },

    /// Unparseable device address
    #[error("Invalid device address: {0}")]
    Address(String),

    /// Device not present in a status batch
    #[error("Device {0} not showing up")]
    DeviceNotFound(String),

    /// I/O errors (spawn, pipe)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for liquidbridge operations
pub type Result<T> = std::result::Result<T, LiquidbridgeError>;

impl From<serde_json::Error> for LiquidbridgeError {
    fn from(err: serde_json::Error) -> Self {
        LiquidbridgeError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: LiquidbridgeError = json_err.into();

        match err {
            LiquidbridgeError::Decode(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Decode error"),
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: LiquidbridgeError = io_err.into();

        match err {
            LiquidbridgeError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_error_display() {
        let err = LiquidbridgeError::Tool("no such device".to_string());
        assert_eq!(
            format!("{}", err),
            "liquidctl reported failure: no such device"
        );

        let err = LiquidbridgeError::ReadingContract {
            key: "Pump speed".to_string(),
            matches: 2,
        };
        assert_eq!(
            format!("{}", err),
            "reading \"Pump speed\" matched 2 entries, expected exactly 1"
        );

        let err = LiquidbridgeError::Invocation {
            code: 2,
            stderr: "usage: liquidctl ...".to_string(),
        };
        let rendered = format!("{}", err);
        assert!(rendered.contains("exit code 2"));
        assert!(rendered.contains("usage: liquidctl"));

        let err = LiquidbridgeError::ChannelDead {
            detail: "Remaining stdout:\n".to_string(),
            stderr: "Traceback".to_string(),
        };
        let rendered = format!("{}", err);
        assert!(rendered.contains("empty line"));
        assert!(rendered.contains("Traceback"));
    }
}
