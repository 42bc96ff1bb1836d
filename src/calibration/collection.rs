// CalibrationCollection - the contract shared by every calibration store

use super::key::{CalibrationKey, Channel, Granularity, Origin};
use crate::error::CalibrationError;

/// A set of correction values keyed by `(channel, origin, granularity)`
///
/// Implementations differ in how `add` folds a new raw value into the stored
/// state and in when `get` starts answering.
pub trait CalibrationCollection: Send + Sync {
    /// Record a raw calibration value for the key
    fn add(&mut self, channel: Channel, origin: Origin, granularity: Granularity, value: f64);

    /// Resolve the calibration value for the key
    ///
    /// # Errors
    /// `CalibrationError` when the key is absent or not calibrated yet.
    fn get(
        &self,
        channel: Channel,
        origin: Origin,
        granularity: Granularity,
    ) -> Result<f64, CalibrationError>;

    /// Every key this collection holds state for, in sorted order
    fn get_keys(&self) -> Vec<CalibrationKey>;

    fn get_key(&self, key: &CalibrationKey) -> Result<f64, CalibrationError> {
        self.get(key.channel, key.origin, key.granularity)
    }

    fn add_key(&mut self, key: &CalibrationKey, value: f64) {
        self.add(key.channel, key.origin, key.granularity, value)
    }
}
