// Pipeline error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Pipeline error code constants
///
/// Error code range: 3001-3006
pub struct PipelineErrorCodes {}

impl PipelineErrorCodes {
    /// File or stream I/O failed inside a stage
    pub const IO: i32 = 3001;

    /// Stage received a buffer before its begin hook ran
    pub const NOT_STARTED: i32 = 3002;

    /// Configuration value rejected by validation
    pub const INVALID_CONFIG: i32 = 3003;

    /// Reading source failed to deliver a buffer
    pub const SOURCE_FAILED: i32 = 3004;

    /// Reader or worker thread panicked
    pub const WORKER_PANICKED: i32 = 3005;

    /// Mutex guarding shared stage state was poisoned
    pub const LOCK_POISONED: i32 = 3006;
}

/// Log a pipeline error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_pipeline_error(err: &PipelineError, context: &str) {
    error!(
        "Pipeline error in {}: code={}, component=AssemblyLine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Pipeline-related errors
///
/// Stages surface these to the driver unhandled; the driver is expected to
/// halt the measurement session. No retry happens inside the core.
///
/// Error code range: 3001-3006
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// I/O failure (file open, write, flush)
    Io { context: String, details: String },

    /// Stage used before `on_begin`
    NotStarted { stage: String },

    /// Configuration rejected by validation
    InvalidConfig { reason: String },

    /// Reading source failed
    SourceFailed { reason: String },

    /// Reader or worker thread panicked
    WorkerPanicked { component: String },

    /// Mutex was poisoned
    LockPoisoned { component: String },
}

impl PipelineError {
    /// Wrap an I/O error with the operation that produced it
    pub fn io(context: impl Into<String>, err: std::io::Error) -> Self {
        PipelineError::Io {
            context: context.into(),
            details: err.to_string(),
        }
    }

    fn variant_name(&self) -> &'static str {
        match self {
            PipelineError::Io { .. } => "Io",
            PipelineError::NotStarted { .. } => "NotStarted",
            PipelineError::InvalidConfig { .. } => "InvalidConfig",
            PipelineError::SourceFailed { .. } => "SourceFailed",
            PipelineError::WorkerPanicked { .. } => "WorkerPanicked",
            PipelineError::LockPoisoned { .. } => "LockPoisoned",
        }
    }
}

impl ErrorCode for PipelineError {
    fn code(&self) -> i32 {
        match self {
            PipelineError::Io { .. } => PipelineErrorCodes::IO,
            PipelineError::NotStarted { .. } => PipelineErrorCodes::NOT_STARTED,
            PipelineError::InvalidConfig { .. } => PipelineErrorCodes::INVALID_CONFIG,
            PipelineError::SourceFailed { .. } => PipelineErrorCodes::SOURCE_FAILED,
            PipelineError::WorkerPanicked { .. } => PipelineErrorCodes::WORKER_PANICKED,
            PipelineError::LockPoisoned { .. } => PipelineErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            PipelineError::Io { context, details } => {
                format!("I/O error while {}: {}", context, details)
            }
            PipelineError::NotStarted { stage } => {
                format!("{} received a buffer before on_begin()", stage)
            }
            PipelineError::InvalidConfig { reason } => {
                format!("Invalid configuration: {}", reason)
            }
            PipelineError::SourceFailed { reason } => {
                format!("Reading source failed: {}", reason)
            }
            PipelineError::WorkerPanicked { component } => {
                format!("Thread panicked in {}", component)
            }
            PipelineError::LockPoisoned { component } => {
                format!("Lock poisoned for component: {}", component)
            }
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PipelineError::{} (code {}): {}",
            self.variant_name(),
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for PipelineError {}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::io("processing buffer", err)
    }
}
