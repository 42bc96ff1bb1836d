// Power Monitor Core - calibration store and buffer pipeline
// Processes high-rate current readings from a Monsoon-style power monitor

// Module declarations
pub mod calibration;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod stages;

// Re-exports for convenience
pub use calibration::{
    CalibrationCollection, CalibrationKey, CalibrationScalars, CalibrationSnapshot,
    CalibrationWindows, Channel, Granularity, Origin, SharedCalibration,
};
pub use config::MonitorConfig;
pub use error::{CalibrationError, ErrorCode, PipelineError};
pub use pipeline::{AssemblyLine, Reading, Sample, ThreadedRunner};
pub use session::MeasurementSession;
pub use stages::{DownSampler, SampleAggregator, Tee};

/// Install a tracing subscriber writing to stderr
///
/// `log` records from dependencies are bridged into it. Calling this more than
/// once, or after another subscriber is installed, is a no-op.
pub fn init_logging() {
    if tracing_subscriber::fmt().try_init().is_ok() {
        tracing::info!("[PowerMonitor] Logging initialized");
    }
}
