//! Sensor readings
//!
//! A [`Reading`] is produced fresh on every poll and never persisted.

pub mod encoder;
pub mod reader;

pub use encoder::{EncodeError, EncodedReading, ReadingsEncoder, MAX_ENCODED_LEN};
pub use reader::SensorReader;

use core::fmt::Write;

use heapless::String;

use crate::traits::Measurement;

/// Longest one-decimal rendering of a reading value
pub const MAX_VALUE_LEN: usize = 12;

/// Whether a reading can be shown and transmitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Validity {
    Valid,
    Invalid,
}

/// One humidity/temperature pair
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    /// Relative humidity in percent
    pub humidity: f32,
    /// Temperature in degrees Celsius
    pub temperature: f32,
    pub validity: Validity,
}

impl Reading {
    /// Build a reading; any non-finite value makes it invalid
    pub fn new(humidity: f32, temperature: f32) -> Self {
        let validity = if humidity.is_finite() && temperature.is_finite() {
            Validity::Valid
        } else {
            Validity::Invalid
        };
        Self {
            humidity,
            temperature,
            validity,
        }
    }

    /// A reading standing in for a failed measurement
    pub const fn invalid() -> Self {
        Self {
            humidity: f32::NAN,
            temperature: f32::NAN,
            validity: Validity::Invalid,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validity == Validity::Valid
    }
}

impl From<Measurement> for Reading {
    fn from(m: Measurement) -> Self {
        Self::new(m.humidity, m.temperature)
    }
}

/// Render `value` with exactly one decimal
///
/// Returns `None` if the value does not fit in [`MAX_VALUE_LEN`] characters.
pub fn one_decimal(value: f32) -> Option<String<MAX_VALUE_LEN>> {
    let mut out = String::new();
    write!(out, "{:.1}", value).ok()?;
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_is_invalid() {
        assert!(!Reading::new(f32::NAN, 21.7).is_valid());
        assert!(!Reading::new(55.2, f32::NAN).is_valid());
        assert!(!Reading::new(f32::INFINITY, 21.7).is_valid());
        assert!(Reading::new(55.2, 21.7).is_valid());
        assert!(!Reading::invalid().is_valid());
    }

    #[test]
    fn test_one_decimal() {
        assert_eq!(one_decimal(55.2).unwrap().as_str(), "55.2");
        assert_eq!(one_decimal(-3.0).unwrap().as_str(), "-3.0");
        assert_eq!(one_decimal(21.74).unwrap().as_str(), "21.7");
        assert!(one_decimal(1.0e20).is_none());
    }
}
