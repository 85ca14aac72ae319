use thiserror::Error;

use crate::session::SessionState;

#[derive(Error, Debug)]
pub enum DaqError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Driver error during {operation} (code {code}): {message}")]
    Driver {
        operation: &'static str,
        code: i32,
        message: String,
    },
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("Scan list mismatch: expected {expected} channels, got {actual}")]
    ScanListMismatch { expected: usize, actual: usize },
    #[error("Stream buffer of {samples} samples is not a whole number of {channels}-channel scans")]
    PartialScan { samples: usize, channels: usize },
    #[error("Invalid scan rate: {0} Hz")]
    InvalidScanRate(f64),
    #[error("Invalid session transition: {from:?} -> {to:?}")]
    InvalidState { from: SessionState, to: SessionState },
}

impl DaqError {
    /// Shorthand for errors reported by a vendor driver call
    pub fn driver(operation: &'static str, code: i32, message: impl Into<String>) -> Self {
        DaqError::Driver {
            operation,
            code,
            message: message.into(),
        }
    }
}
