//! Error types for hardware operations.
//!
//! This module defines error types specific to door hardware: the strike
//! output line and the contact sensor input line.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during hardware device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Invalid data read from a device.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Device initialization failed.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// Writing an output line failed.
    #[error("Output error on pin {pin}: {message}")]
    OutputFailed { pin: u32, message: String },

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

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    /// Create a new output failure error.
    pub fn output_failed(pin: u32, message: impl Into<String>) -> Self {
        Self::OutputFailed {
            pin,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_error() {
        let error = HardwareError::disconnected("contact sensor");
        assert!(matches!(error, HardwareError::Disconnected { .. }));
        assert_eq!(error.to_string(), "Device disconnected: contact sensor");
    }

    #[test]
    fn test_output_failed_error() {
        let error = HardwareError::output_failed(22, "permission denied");
        assert_eq!(
            error.to_string(),
            "Output error on pin 22: permission denied"
        );
    }

    #[test]
    fn test_initialization_failed_error() {
        let error = HardwareError::initialization_failed("gpio17 not exported");
        assert!(matches!(error, HardwareError::InitializationFailed { .. }));
        assert_eq!(
            error.to_string(),
            "Initialization failed: gpio17 not exported"
        );
    }
}
