// CalibrationSnapshot - immutable point-in-time copy of a calibration store
//
// Built by resolving every key of a source collection once. Keys that were
// not calibrated at capture time keep the error the source produced, so
// taking a snapshot never fails; only querying such a key does, and it fails
// with exactly the error the source would have returned.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::collection::CalibrationCollection;
use super::key::{CalibrationKey, Channel, Granularity, Origin};
use crate::error::CalibrationError;

/// Resolved state of one key at capture time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationEntry {
    Value(f64),
    Uncalibrated(CalibrationError),
}

impl CalibrationEntry {
    pub fn is_calibrated(&self) -> bool {
        matches!(self, CalibrationEntry::Value(_))
    }
}

/// Immutable view of a calibration collection
///
/// Never re-reads its source after construction, which makes it the way to
/// hand calibration state to another thread without locking the live store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "SnapshotDocument", try_from = "SnapshotDocument")]
pub struct CalibrationSnapshot {
    entries: HashMap<CalibrationKey, CalibrationEntry>,
}

/// On-disk layout: JSON objects cannot be keyed by a struct, so entries are a list
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDocument {
    entries: Vec<KeyedEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct KeyedEntry {
    key: CalibrationKey,
    entry: CalibrationEntry,
}

impl CalibrationSnapshot {
    /// Capture the current state of `source`
    pub fn new(source: &dyn CalibrationCollection) -> Self {
        let entries = source
            .get_keys()
            .into_iter()
            .map(|key| {
                let entry = match source.get_key(&key) {
                    Ok(value) => CalibrationEntry::Value(value),
                    Err(err) => CalibrationEntry::Uncalibrated(err),
                };
                (key, entry)
            })
            .collect();
        Self { entries }
    }

    /// Restore a snapshot persisted with `serde_json`
    ///
    /// # Errors
    /// `CalibrationError::InvalidArgument` when the document does not describe
    /// a calibration collection.
    pub fn from_json(json: &str) -> Result<Self, CalibrationError> {
        serde_json::from_str(json).map_err(|err| CalibrationError::InvalidArgument {
            reason: format!("not a calibration collection: {}", err),
        })
    }

    /// Serialize for persistence
    pub fn to_json(&self) -> String {
        // Keys and entries are plain enums and floats; serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Stored entry for the key, if the source held state for it
    pub fn entry(&self, key: &CalibrationKey) -> Option<&CalibrationEntry> {
        self.entries.get(key)
    }

    /// True when every captured key resolved to a value
    pub fn is_fully_calibrated(&self) -> bool {
        self.entries.values().all(CalibrationEntry::is_calibrated)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CalibrationCollection for CalibrationSnapshot {
    /// Snapshots are immutable; the value is dropped
    fn add(&mut self, channel: Channel, origin: Origin, granularity: Granularity, _value: f64) {
        log::warn!(
            "[CalibrationSnapshot] Ignoring add() for {}: snapshots are read-only",
            CalibrationKey::new(channel, origin, granularity)
        );
    }

    fn get(
        &self,
        channel: Channel,
        origin: Origin,
        granularity: Granularity,
    ) -> Result<f64, CalibrationError> {
        let key = CalibrationKey::new(channel, origin, granularity);
        match self.entries.get(&key) {
            Some(CalibrationEntry::Value(value)) => Ok(*value),
            Some(CalibrationEntry::Uncalibrated(err)) => Err(err.clone()),
            None => Err(CalibrationError::NeverWritten { key }),
        }
    }

    fn get_keys(&self) -> Vec<CalibrationKey> {
        let mut keys: Vec<_> = self.entries.keys().copied().collect();
        keys.sort();
        keys
    }
}

impl From<CalibrationSnapshot> for SnapshotDocument {
    fn from(snapshot: CalibrationSnapshot) -> Self {
        let mut entries: Vec<_> = snapshot
            .entries
            .into_iter()
            .map(|(key, entry)| KeyedEntry { key, entry })
            .collect();
        entries.sort_by_key(|keyed| keyed.key);
        Self { entries }
    }
}

impl TryFrom<SnapshotDocument> for CalibrationSnapshot {
    type Error = String;

    fn try_from(document: SnapshotDocument) -> Result<Self, Self::Error> {
        let mut entries = HashMap::with_capacity(document.entries.len());
        for KeyedEntry { key, entry } in document.entries {
            if entries.insert(key, entry).is_some() {
                return Err(format!("duplicate entry for {}", key));
            }
        }
        Ok(Self { entries })
    }
}
