// CalibrationScalars - latest-write-wins calibration values

use std::collections::HashMap;

use super::collection::CalibrationCollection;
use super::key::{CalibrationKey, Channel, Granularity, Origin};
use crate::error::CalibrationError;

/// One value per key; every `add` overwrites
#[derive(Debug, Clone, Default)]
pub struct CalibrationScalars {
    values: HashMap<CalibrationKey, f64>,
}

impl CalibrationScalars {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CalibrationCollection for CalibrationScalars {
    fn add(&mut self, channel: Channel, origin: Origin, granularity: Granularity, value: f64) {
        self.values
            .insert(CalibrationKey::new(channel, origin, granularity), value);
    }

    fn get(
        &self,
        channel: Channel,
        origin: Origin,
        granularity: Granularity,
    ) -> Result<f64, CalibrationError> {
        let key = CalibrationKey::new(channel, origin, granularity);
        self.values
            .get(&key)
            .copied()
            .ok_or(CalibrationError::NeverWritten { key })
    }

    fn get_keys(&self) -> Vec<CalibrationKey> {
        let mut keys: Vec<_> = self.values.keys().copied().collect();
        keys.sort();
        keys
    }
}
