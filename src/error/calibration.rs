// Calibration error types and constants

use crate::calibration::CalibrationKey;
use crate::error::ErrorCode;
use log::error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Calibration error code constants
///
/// Single source of truth for the numeric codes reported by
/// [`CalibrationError::code`].
///
/// Error code range: 2001-2004
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Window for the key is not full yet
    pub const NOT_CALIBRATED: i32 = 2001;

    /// Key was never written
    pub const NEVER_WRITTEN: i32 = 2002;

    /// Source handed to a snapshot is not a calibration collection
    pub const INVALID_ARGUMENT: i32 = 2003;

    /// Shared calibration RwLock was poisoned
    pub const STATE_POISONED: i32 = 2004;
}

/// Log a calibration error with structured context
///
/// Logs the error code, the component and the human-readable message.
/// The logging is non-blocking and will not panic on failure.
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=CalibrationStore, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// Raised when a calibration value is requested before it is available.
/// Errors are `Clone + PartialEq` and serializable so a snapshot can store
/// one in place of a value and hand back an identical error later.
///
/// Error code range: 2001-2004
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CalibrationError {
    /// Fewer values than the window size have been collected for the key
    NotCalibrated {
        key: CalibrationKey,
        collected: usize,
        required: usize,
    },

    /// No value was ever written for the key
    NeverWritten { key: CalibrationKey },

    /// Snapshot source is not a calibration collection
    InvalidArgument { reason: String },

    /// Shared calibration state lock was poisoned
    StatePoisoned,
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::NotCalibrated { .. } => CalibrationErrorCodes::NOT_CALIBRATED,
            CalibrationError::NeverWritten { .. } => CalibrationErrorCodes::NEVER_WRITTEN,
            CalibrationError::InvalidArgument { .. } => CalibrationErrorCodes::INVALID_ARGUMENT,
            CalibrationError::StatePoisoned => CalibrationErrorCodes::STATE_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::NotCalibrated {
                key,
                collected,
                required,
            } => {
                format!(
                    "{} is not calibrated yet: collected {} of {} values",
                    key, collected, required
                )
            }
            CalibrationError::NeverWritten { key } => {
                format!("{} is not calibrated yet: no value was ever written", key)
            }
            CalibrationError::InvalidArgument { reason } => {
                format!("Invalid calibration source: {}", reason)
            }
            CalibrationError::StatePoisoned => "Calibration state lock poisoned".to_string(),
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{} (code {}): {}",
            self.variant_name(),
            self.code(),
            self.message()
        )
    }
}

impl CalibrationError {
    fn variant_name(&self) -> &'static str {
        match self {
            CalibrationError::NotCalibrated { .. } => "NotCalibrated",
            CalibrationError::NeverWritten { .. } => "NeverWritten",
            CalibrationError::InvalidArgument { .. } => "InvalidArgument",
            CalibrationError::StatePoisoned => "StatePoisoned",
        }
    }
}

impl std::error::Error for CalibrationError {}
