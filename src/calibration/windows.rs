// CalibrationWindows - rolling-mean calibration values
//
// Each key keeps the last N raw values in a bounded FIFO. A key only reports
// a value once the window is full; the value is the arithmetic mean of the
// window. This smooths out single-sample noise in the zero/reference
// measurements the device interleaves with real samples.

use std::collections::{HashMap, VecDeque};

use super::collection::CalibrationCollection;
use super::key::{CalibrationKey, Channel, Granularity, Origin};
use crate::error::CalibrationError;

/// Rolling-window calibration store
#[derive(Debug, Clone)]
pub struct CalibrationWindows {
    window_size: usize,
    windows: HashMap<CalibrationKey, VecDeque<f64>>,
}

impl CalibrationWindows {
    /// Create an empty store whose windows hold `window_size` values
    ///
    /// # Panics
    /// Panics if `window_size` is 0
    pub fn new(window_size: usize) -> Self {
        assert!(window_size > 0, "window_size must be greater than 0");
        Self {
            window_size,
            windows: HashMap::new(),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Number of values currently held for the key (at most `window_size`)
    pub fn collected(&self, key: &CalibrationKey) -> usize {
        self.windows.get(key).map_or(0, VecDeque::len)
    }
}

impl CalibrationCollection for CalibrationWindows {
    fn add(&mut self, channel: Channel, origin: Origin, granularity: Granularity, value: f64) {
        let window_size = self.window_size;
        let window = self
            .windows
            .entry(CalibrationKey::new(channel, origin, granularity))
            .or_insert_with(|| VecDeque::with_capacity(window_size));
        if window.len() == window_size {
            window.pop_front();
        }
        window.push_back(value);
    }

    fn get(
        &self,
        channel: Channel,
        origin: Origin,
        granularity: Granularity,
    ) -> Result<f64, CalibrationError> {
        let key = CalibrationKey::new(channel, origin, granularity);
        let collected = self.collected(&key);
        if collected < self.window_size {
            return Err(CalibrationError::NotCalibrated {
                key,
                collected,
                required: self.window_size,
            });
        }

        let window = &self.windows[&key];
        let sum: f64 = window.iter().sum();
        Ok(sum / window.len() as f64)
    }

    fn get_keys(&self) -> Vec<CalibrationKey> {
        let mut keys: Vec<_> = self.windows.keys().copied().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAIN_ZERO_FINE: (Channel, Origin, Granularity) =
        (Channel::Main, Origin::Zero, Granularity::Fine);

    fn add_all(windows: &mut CalibrationWindows, values: &[f64]) {
        let (c, o, g) = MAIN_ZERO_FINE;
        for &value in values {
            windows.add(c, o, g, value);
        }
    }

    fn get(windows: &CalibrationWindows) -> Result<f64, CalibrationError> {
        let (c, o, g) = MAIN_ZERO_FINE;
        windows.get(c, o, g)
    }

    #[test]
    fn test_not_calibrated_until_window_full() {
        let mut windows = CalibrationWindows::new(3);
        add_all(&mut windows, &[1.0, 2.0]);

        match get(&windows) {
            Err(CalibrationError::NotCalibrated {
                collected: 2,
                required: 3,
                ..
            }) => {}
            other => panic!("Expected NotCalibrated, got: {:?}", other),
        }
    }

    #[test]
    fn test_mean_once_full() {
        let mut windows = CalibrationWindows::new(3);
        add_all(&mut windows, &[1.0, 2.0, 3.0]);
        assert_eq!(get(&windows).unwrap(), 2.0);
    }

    #[test]
    fn test_oldest_value_evicted() {
        let mut windows = CalibrationWindows::new(3);
        add_all(&mut windows, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(get(&windows).unwrap(), 3.0);
        assert_eq!(windows.collected(&MAIN_ZERO_FINE.into()), 3);
    }

    #[test]
    fn test_absent_key_is_not_calibrated() {
        let windows = CalibrationWindows::new(2);
        let result = windows.get(Channel::Usb, Origin::Reference, Granularity::Coarse);
        assert!(matches!(
            result,
            Err(CalibrationError::NotCalibrated { collected: 0, .. })
        ));
        assert!(windows.get_keys().is_empty());
    }

    #[test]
    fn test_keys_are_independent() {
        let mut windows = CalibrationWindows::new(1);
        windows.add(Channel::Main, Origin::Zero, Granularity::Fine, 5.0);
        windows.add(Channel::Main, Origin::Zero, Granularity::Coarse, 7.0);

        assert_eq!(
            windows
                .get(Channel::Main, Origin::Zero, Granularity::Fine)
                .unwrap(),
            5.0
        );
        assert_eq!(
            windows
                .get(Channel::Main, Origin::Zero, Granularity::Coarse)
                .unwrap(),
            7.0
        );
        assert_eq!(windows.get_keys().len(), 2);
    }

    #[test]
    #[should_panic(expected = "window_size must be greater than 0")]
    fn test_zero_window_size_panics() {
        CalibrationWindows::new(0);
    }
}
