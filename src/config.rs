//! Configuration for a measurement session
//!
//! Loaded from JSON so sampling, calibration and stage parameters can be
//! tuned per device without recompiling. Every section has defaults matching
//! a Monsoon HVPM at its native rate.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::pipeline::{DEFAULT_QUEUE_CAPACITY, NATIVE_SAMPLE_RATE_HZ};

/// Complete session configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub tee: TeeConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub downsample: DownsampleConfig,
}

/// Reader-side parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Device sampling rate in Hz
    pub native_rate_hz: u32,
    /// Readings per buffer delivered by the reader
    pub buffer_size: usize,
    /// Buffers in flight between reader and pipeline threads
    pub queue_capacity: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            native_rate_hz: NATIVE_SAMPLE_RATE_HZ,
            buffer_size: 1000,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Calibration store parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Raw values averaged per calibration key
    pub window_size: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self { window_size: 1000 }
    }
}

/// Tee stage parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeeConfig {
    /// Output file; no Tee stage when unset
    pub path: Option<PathBuf>,
    /// Samples before this time are not logged
    pub measure_after_seconds: f64,
}

/// SampleAggregator parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Warm-up period excluded from the mean
    pub start_after_seconds: f64,
    /// Worker threads for the aggregation stage
    pub workers: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            start_after_seconds: 0.0,
            workers: 1,
        }
    }
}

/// DownSampler parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownsampleConfig {
    /// Input samples averaged into each output
    pub factor: usize,
}

impl Default for DownsampleConfig {
    fn default() -> Self {
        Self { factor: 1 }
    }
}

impl MonitorConfig {
    /// Load configuration from a JSON file
    ///
    /// # Returns
    /// The parsed configuration, or defaults if the file is missing or the
    /// JSON is invalid. The fallback is logged.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Reject values the stages cannot run with
    pub fn validate(&self) -> Result<(), PipelineError> {
        let checks: [(bool, &str); 7] = [
            (self.sampling.native_rate_hz == 0, "sampling.native_rate_hz must be > 0"),
            (self.sampling.buffer_size == 0, "sampling.buffer_size must be > 0"),
            (self.sampling.queue_capacity == 0, "sampling.queue_capacity must be > 0"),
            (self.calibration.window_size == 0, "calibration.window_size must be > 0"),
            (self.aggregation.workers == 0, "aggregation.workers must be > 0"),
            (self.downsample.factor == 0, "downsample.factor must be > 0"),
            (
                !(self.tee.measure_after_seconds >= 0.0
                    && self.aggregation.start_after_seconds >= 0.0),
                "thresholds must be non-negative",
            ),
        ];

        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, reason)) => Err(PipelineError::InvalidConfig {
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Rate of the down-sampled stream in Hz
    pub fn output_rate_hz(&self) -> f64 {
        self.sampling.native_rate_hz as f64 / self.downsample.factor.max(1) as f64
    }
}
