//! JSON encoding of readings
//!
//! Produces `{"humidity":"55.2","temperature":"21.7"}`: fixed field names,
//! values as strings with one decimal.

use heapless::String;
use serde::Serialize;

use super::{one_decimal, Reading, MAX_VALUE_LEN};

/// Longest encoded reading
pub const MAX_ENCODED_LEN: usize = 64;

/// An encoded reading, ready for the push channel or the query endpoint
pub type EncodedReading = String<MAX_ENCODED_LEN>;

/// Errors that can occur while encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Reading is not valid
    InvalidReading,
    /// A value is too large to represent
    BufferFull,
}

#[derive(Serialize)]
struct Payload<'a> {
    humidity: &'a str,
    temperature: &'a str,
}

/// Reading encoder
///
/// Stateless; the same reading always encodes to the same bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadingsEncoder;

impl ReadingsEncoder {
    pub const fn new() -> Self {
        Self
    }

    /// Encode a valid reading
    pub fn encode(&self, reading: &Reading) -> Result<EncodedReading, EncodeError> {
        if !reading.is_valid() {
            return Err(EncodeError::InvalidReading);
        }

        let humidity: String<MAX_VALUE_LEN> =
            one_decimal(reading.humidity).ok_or(EncodeError::BufferFull)?;
        let temperature: String<MAX_VALUE_LEN> =
            one_decimal(reading.temperature).ok_or(EncodeError::BufferFull)?;

        serde_json_core::to_string(&Payload {
            humidity: &humidity,
            temperature: &temperature,
        })
        .map_err(|_| EncodeError::BufferFull)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_scenario_reading() {
        let out = ReadingsEncoder::new()
            .encode(&Reading::new(55.2, 21.7))
            .unwrap();
        assert_eq!(out.as_str(), r#"{"humidity":"55.2","temperature":"21.7"}"#);
    }

    #[test]
    fn test_negative_temperature() {
        let out = ReadingsEncoder::new()
            .encode(&Reading::new(80.0, -12.3))
            .unwrap();
        assert_eq!(out.as_str(), r#"{"humidity":"80.0","temperature":"-12.3"}"#);
    }

    #[test]
    fn test_invalid_rejected() {
        let encoder = ReadingsEncoder::new();
        assert_eq!(
            encoder.encode(&Reading::new(f32::NAN, 21.7)),
            Err(EncodeError::InvalidReading)
        );
        assert_eq!(
            encoder.encode(&Reading::invalid()),
            Err(EncodeError::InvalidReading)
        );
    }

    #[test]
    fn test_huge_value_rejected() {
        assert_eq!(
            ReadingsEncoder::new().encode(&Reading::new(1.0e30, 20.0)),
            Err(EncodeError::BufferFull)
        );
    }

    proptest! {
        #[test]
        fn encoding_is_deterministic(h in 0.0f32..100.0, t in -40.0f32..80.0) {
            let encoder = ReadingsEncoder::new();
            let reading = Reading::new(h, t);
            let first = encoder.encode(&reading).unwrap();
            let second = encoder.encode(&reading).unwrap();
            prop_assert_eq!(first.as_bytes(), second.as_bytes());
            prop_assert!(first.starts_with(r#"{"humidity":""#), "encoded prefix");
            prop_assert!(!first.contains("NaN"), "encoded NaN");
        }
    }
}
