// SharedCalibration: single-writer, multi-reader calibration hub
//
// The measurement loop writes raw calibration values into the live collection;
// consumers on other threads never read it directly. Instead the writer
// publishes immutable snapshots through a watch channel and readers borrow the
// latest one without touching the live lock.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::watch;

use super::collection::CalibrationCollection;
use super::key::{Channel, Granularity, Origin};
use super::snapshot::CalibrationSnapshot;
use crate::error::{log_calibration_error, CalibrationError};

/// Owns a live calibration collection and publishes snapshots of it
///
/// # Example
/// ```ignore
/// let shared = SharedCalibration::new(CalibrationWindows::new(1000));
/// let mut readings = shared.subscribe();
///
/// // Measurement loop:
/// shared.add(Channel::Main, Origin::Zero, Granularity::Fine, raw)?;
/// shared.publish()?;
///
/// // Consumer thread:
/// let current = readings.borrow_and_update().clone();
/// let offset = current.get(Channel::Main, Origin::Zero, Granularity::Fine)?;
/// ```
pub struct SharedCalibration<C: CalibrationCollection> {
    live: Arc<RwLock<C>>,
    published: watch::Sender<Arc<CalibrationSnapshot>>,
}

impl<C: CalibrationCollection> SharedCalibration<C> {
    /// Wrap a collection; its current state becomes the first published snapshot
    pub fn new(collection: C) -> Self {
        let initial = Arc::new(CalibrationSnapshot::new(&collection));
        let (published, _) = watch::channel(initial);
        Self {
            live: Arc::new(RwLock::new(collection)),
            published,
        }
    }

    /// Record a raw value in the live collection
    ///
    /// Readers do not observe it until the next [`publish`](Self::publish).
    pub fn add(
        &self,
        channel: Channel,
        origin: Origin,
        granularity: Granularity,
        value: f64,
    ) -> Result<(), CalibrationError> {
        let mut live = self.write_live().inspect_err(|err| {
            log_calibration_error(err, "add_calibration");
        })?;
        live.add(channel, origin, granularity, value);
        Ok(())
    }

    /// Resolve a value from the live collection (writer side)
    pub fn get(
        &self,
        channel: Channel,
        origin: Origin,
        granularity: Granularity,
    ) -> Result<f64, CalibrationError> {
        let live = self.read_live()?;
        live.get(channel, origin, granularity)
    }

    /// Capture the live collection without publishing it
    pub fn snapshot(&self) -> Result<CalibrationSnapshot, CalibrationError> {
        let live = self.read_live().inspect_err(|err| {
            log_calibration_error(err, "snapshot_calibration");
        })?;
        Ok(CalibrationSnapshot::new(&*live))
    }

    /// Capture the live collection and hand it to every subscriber
    pub fn publish(&self) -> Result<Arc<CalibrationSnapshot>, CalibrationError> {
        let snapshot = Arc::new(self.snapshot()?);
        self.published.send_replace(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Most recently published snapshot
    pub fn latest(&self) -> Arc<CalibrationSnapshot> {
        Arc::clone(&self.published.borrow())
    }

    /// Receiver that observes every future publication
    pub fn subscribe(&self) -> watch::Receiver<Arc<CalibrationSnapshot>> {
        self.published.subscribe()
    }

    fn read_live(&self) -> Result<RwLockReadGuard<'_, C>, CalibrationError> {
        self.live.read().map_err(|_| CalibrationError::StatePoisoned)
    }

    fn write_live(&self) -> Result<RwLockWriteGuard<'_, C>, CalibrationError> {
        self.live
            .write()
            .map_err(|_| CalibrationError::StatePoisoned)
    }
}
