// Error types for the power monitor core
//
// This module defines custom error types for calibration lookups and pipeline
// stages, providing structured error handling with numeric error codes that
// the surrounding measurement tooling can report without string matching.

mod calibration;
mod pipeline;

pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use pipeline::{log_pipeline_error, PipelineError, PipelineErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the library boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
