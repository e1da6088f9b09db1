//! Sensor reader
//!
//! Wraps a [`ClimateSensor`] so that a failed measurement becomes an
//! invalid [`Reading`] instead of an error.

use super::Reading;
use crate::traits::{ClimateSensor, SensorError};

/// Sensor reader
pub struct SensorReader<S> {
    sensor: S,
    last_error: Option<SensorError>,
}

impl<S: ClimateSensor> SensorReader<S> {
    pub fn new(sensor: S) -> Self {
        Self {
            sensor,
            last_error: None,
        }
    }

    /// Take one measurement
    ///
    /// Performs at most one bus transaction and never retries.
    pub fn read(&mut self) -> Reading {
        match self.sensor.measure() {
            Ok(m) => {
                let reading = Reading::from(m);
                self.last_error = if reading.is_valid() {
                    None
                } else {
                    Some(SensorError::NotANumber)
                };
                reading
            }
            Err(e) => {
                self.last_error = Some(e);
                Reading::invalid()
            }
        }
    }

    /// Why the most recent read was invalid, if it was
    pub fn last_error(&self) -> Option<SensorError> {
        self.last_error
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}
