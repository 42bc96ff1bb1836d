// Calibration keys - which source/offset-type/resolution a value applies to

use serde::{Deserialize, Serialize};
use std::fmt;

/// Measurement source on the power monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Main,
    Usb,
    Aux,
}

/// Calibration origin type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Reference voltage measurement
    Reference,
    /// Zero offset measurement
    Zero,
}

/// Calibration resolution class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Coarse,
    Fine,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Main, Channel::Usb, Channel::Aux];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Main => "main",
            Channel::Usb => "usb",
            Channel::Aux => "aux",
        }
    }
}

impl Origin {
    pub const ALL: [Origin; 2] = [Origin::Reference, Origin::Zero];

    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Reference => "reference",
            Origin::Zero => "zero",
        }
    }
}

impl Granularity {
    pub const ALL: [Granularity; 2] = [Granularity::Coarse, Granularity::Fine];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Coarse => "coarse",
            Granularity::Fine => "fine",
        }
    }
}

/// The `(channel, origin, granularity)` triple a calibration value is stored under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CalibrationKey {
    pub channel: Channel,
    pub origin: Origin,
    pub granularity: Granularity,
}

impl CalibrationKey {
    pub fn new(channel: Channel, origin: Origin, granularity: Granularity) -> Self {
        Self {
            channel,
            origin,
            granularity,
        }
    }

    /// Every key the device can report, in sorted order
    pub fn all() -> impl Iterator<Item = CalibrationKey> {
        Channel::ALL.into_iter().flat_map(|channel| {
            Origin::ALL.into_iter().flat_map(move |origin| {
                Granularity::ALL
                    .into_iter()
                    .map(move |granularity| CalibrationKey::new(channel, origin, granularity))
            })
        })
    }
}

impl fmt::Display for CalibrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.channel.as_str(),
            self.origin.as_str(),
            self.granularity.as_str()
        )
    }
}

impl From<(Channel, Origin, Granularity)> for CalibrationKey {
    fn from((channel, origin, granularity): (Channel, Origin, Granularity)) -> Self {
        Self::new(channel, origin, granularity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_keys_are_unique_and_sorted() {
        let keys: Vec<_> = CalibrationKey::all().collect();
        assert_eq!(keys.len(), 12);

        let mut sorted = keys.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, keys);
    }

    #[test]
    fn test_display() {
        let key = CalibrationKey::new(Channel::Usb, Origin::Reference, Granularity::Coarse);
        assert_eq!(key.to_string(), "usb/reference/coarse");
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let key = CalibrationKey::new(Channel::Aux, Origin::Zero, Granularity::Fine);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(
            json,
            r#"{"channel":"aux","origin":"zero","granularity":"fine"}"#
        );
    }
}
