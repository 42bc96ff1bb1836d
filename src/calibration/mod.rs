// Calibration module - correction values reported by the power monitor
//
// This module provides the calibration store in three variants plus a hub for
// sharing it across threads:
// 1. CalibrationWindows: rolling mean of the last N raw values per key
// 2. CalibrationScalars: latest value per key
// 3. CalibrationSnapshot: immutable copy with deferred per-key errors
// 4. SharedCalibration: live collection + published snapshots
//
// Every value is keyed by (Channel, Origin, Granularity).

pub mod collection;
pub mod key;
pub mod scalars;
pub mod shared;
pub mod snapshot;
pub mod windows;

pub use collection::CalibrationCollection;
pub use key::{CalibrationKey, Channel, Granularity, Origin};
pub use scalars::CalibrationScalars;
pub use shared::SharedCalibration;
pub use snapshot::{CalibrationEntry, CalibrationSnapshot};
pub use windows::CalibrationWindows;
