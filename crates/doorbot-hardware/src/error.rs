//! Error types for hardware operations.
//!
//! Line-level failures are reported here and nowhere else: the timed output
//! logic never retries a failed write, it only logs the error returned by the
//! driver.

use crate::types::LineId;

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while driving or watching lines.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Driver or input source is gone.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Writing a line level failed.
    #[error("Write to line {line} failed: {message}")]
    WriteFailed { line: LineId, message: String },

    /// The output is not mapped to any line.
    #[error("Output not configured: {output}")]
    UnknownOutput { output: String },

    /// Invalid data received from a device.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new write failure.
    pub fn write_failed(line: LineId, message: impl Into<String>) -> Self {
        Self::WriteFailed {
            line,
            message: message.into(),
        }
    }

    /// Create a new unknown output error.
    pub fn unknown_output(output: impl Into<String>) -> Self {
        Self::UnknownOutput {
            output: output.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_error() {
        let error = HardwareError::disconnected("keypad");
        assert!(matches!(error, HardwareError::Disconnected { .. }));
        assert_eq!(error.to_string(), "Device disconnected: keypad");
    }

    #[test]
    fn test_write_failed_error() {
        let error = HardwareError::write_failed(LineId::new(17), "EBUSY");
        assert_eq!(error.to_string(), "Write to line 17 failed: EBUSY");
    }

    #[test]
    fn test_invalid_data_error() {
        let error = HardwareError::invalid_data("Unknown key 'x'");
        assert_eq!(error.to_string(), "Invalid data: Unknown key 'x'");
    }
}
