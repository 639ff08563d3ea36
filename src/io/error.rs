// src/io/error.rs
//
// Typed I/O errors with the device or endpoint they came from attached.

use std::fmt;

/// Error from serial or collector I/O.
///
/// Each variant carries a `device` string identifying the serial port or URL
/// involved, so log lines are diagnosable without access to internal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoError {
    /// Failed to open a port or reach an endpoint.
    Connection { device: String, detail: String },
    /// Failed mid-read (EOF, hardware fault, poisoned handle).
    Read { device: String, detail: String },
    /// The peer answered, but not the way we expected (rejected status,
    /// malformed response).
    Protocol { device: String, detail: String },
}

impl IoError {
    pub fn connection(device: &str, detail: impl Into<String>) -> Self {
        IoError::Connection {
            device: device.to_string(),
            detail: detail.into(),
        }
    }

    pub fn read(device: &str, detail: impl Into<String>) -> Self {
        IoError::Read {
            device: device.to_string(),
            detail: detail.into(),
        }
    }

    pub fn protocol(device: &str, detail: impl Into<String>) -> Self {
        IoError::Protocol {
            device: device.to_string(),
            detail: detail.into(),
        }
    }

    /// The serial port or URL this error came from.
    pub fn device(&self) -> &str {
        match self {
            IoError::Connection { device, .. }
            | IoError::Read { device, .. }
            | IoError::Protocol { device, .. } => device,
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::Connection { device, detail } => {
                write!(f, "connection to {} failed: {}", device, detail)
            }
            IoError::Read { device, detail } => {
                write!(f, "read from {} failed: {}", device, detail)
            }
            IoError::Protocol { device, detail } => {
                write!(f, "{} answered unexpectedly: {}", device, detail)
            }
        }
    }
}

impl std::error::Error for IoError {}
