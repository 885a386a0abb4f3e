// Transmit frequency in hundredths of a MHz (9550 = 95.50 MHz)

use super::constants::{MAX_FREQUENCY, MIN_FREQUENCY};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrequencyError {
    #[error("Invalid frequency specification: {0}")]
    InvalidFormat(String),

    #[error("Frequency {0} does not fit in 16 bits of 10 kHz steps")]
    OutOfRange(String),
}

/// A frequency expressed in 10 kHz steps, as the chip expects it on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Frequency(u16);

impl Frequency {
    pub const MIN: Frequency = Frequency(MIN_FREQUENCY);
    pub const MAX: Frequency = Frequency(MAX_FREQUENCY);

    pub const fn from_hundredths(value: u16) -> Self {
        Self(value)
    }

    pub const fn hundredths(self) -> u16 {
        self.0
    }

    pub fn mhz(self) -> f32 {
        f32::from(self.0) / 100.0
    }

    /// Inside the legal 87.50-108.00 MHz transmit band
    pub fn in_band(self) -> bool {
        (MIN_FREQUENCY..=MAX_FREQUENCY).contains(&self.0)
    }

    /// Round down to a multiple of 50 kHz, as TX_TUNE_MEASURE requires
    pub fn round_down_to_50khz(self) -> Self {
        Self(self.0 - self.0 % 5)
    }

    pub fn high_byte(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn low_byte(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Every 0.10 MHz step of the transmit band, both ends included
    pub fn band_steps(step: u16) -> impl Iterator<Item = Frequency> {
        (MIN_FREQUENCY..=MAX_FREQUENCY)
            .step_by(usize::from(step.max(1)))
            .map(Frequency)
    }

    /// Parse "9550", "95.5", "95.50MHz" or "95.5 mhz"
    pub fn parse(s: &str) -> Result<Self, FrequencyError> {
        static RE: OnceLock<regex::Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            regex::Regex::new(r"(?i)^\s*([0-9]+)(?:\.([0-9]{1,2}))?\s*(mhz)?\s*$")
                .expect("frequency pattern is valid")
        });

        let caps = re
            .captures(s)
            .ok_or_else(|| FrequencyError::InvalidFormat(s.to_string()))?;

        let whole: u32 = caps[1]
            .parse()
            .map_err(|_| FrequencyError::InvalidFormat(s.to_string()))?;
        let fraction = caps.get(2).map(|m| m.as_str());
        let has_unit = caps.get(3).is_some();

        // A bare integer without a decimal point or unit is already hundredths
        let hundredths = match fraction {
            None if !has_unit => whole,
            None => whole * 100,
            Some(frac) => {
                let mut digits: u32 = frac
                    .parse()
                    .map_err(|_| FrequencyError::InvalidFormat(s.to_string()))?;
                if frac.len() == 1 {
                    digits *= 10;
                }
                whole * 100 + digits
            }
        };

        u16::try_from(hundredths)
            .map(Frequency)
            .map_err(|_| FrequencyError::OutOfRange(s.to_string()))
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02} MHz", self.0 / 100, self.0 % 100)
    }
}

impl From<u16> for Frequency {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl Serialize for Frequency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.0)
    }
}

impl<'de> Deserialize<'de> for Frequency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Hundredths(u16),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Hundredths(v) => Ok(Frequency(v)),
            Repr::Text(s) => Frequency::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(Frequency::parse("9550").unwrap(), Frequency(9550));
        assert_eq!(Frequency::parse("95.5").unwrap(), Frequency(9550));
        assert_eq!(Frequency::parse("95.50MHz").unwrap(), Frequency(9550));
        assert_eq!(Frequency::parse(" 88.1 mhz ").unwrap(), Frequency(8810));
        assert_eq!(Frequency::parse("100 MHz").unwrap(), Frequency(10000));
        assert!(Frequency::parse("ninety").is_err());
        assert!(Frequency::parse("95.555").is_err());
        assert!(matches!(
            Frequency::parse("700000"),
            Err(FrequencyError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_display_and_bytes() {
        let f = Frequency(9550);
        assert_eq!(f.to_string(), "95.50 MHz");
        assert_eq!(f.high_byte(), 0x25);
        assert_eq!(f.low_byte(), 0x4E);
        assert!((f.mhz() - 95.5).abs() < 0.001);
    }

    #[test]
    fn test_band() {
        assert!(Frequency(8750).in_band());
        assert!(Frequency(10800).in_band());
        assert!(!Frequency(8749).in_band());
        assert!(!Frequency(10801).in_band());
        assert!(!Frequency(0).in_band());

        let steps: Vec<_> = Frequency::band_steps(10).collect();
        assert_eq!(steps.first(), Some(&Frequency(8750)));
        assert_eq!(steps.last(), Some(&Frequency(10800)));
        assert_eq!(steps.len(), 206);
    }

    #[test]
    fn test_round_down() {
        assert_eq!(Frequency(9553).round_down_to_50khz(), Frequency(9550));
        assert_eq!(Frequency(9555).round_down_to_50khz(), Frequency(9555));
        assert_eq!(Frequency(9559).round_down_to_50khz(), Frequency(9555));
    }

    #[test]
    fn test_deserialize() {
        let f: Frequency = serde_json::from_str("9550").unwrap();
        assert_eq!(f, Frequency(9550));
        let f: Frequency = serde_json::from_str("\"95.5 MHz\"").unwrap();
        assert_eq!(f, Frequency(9550));
        assert!(serde_json::from_str::<Frequency>("\"abc\"").is_err());
    }
}
