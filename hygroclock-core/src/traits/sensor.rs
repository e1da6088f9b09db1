//! Climate sensor trait

/// Errors that can occur while measuring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Sensor did not answer within the protocol timing
    Timeout,
    /// Frame checksum mismatch
    Checksum,
    /// Bus or pin error
    Bus,
    /// Sensor returned a value that is not a number
    NotANumber,
    /// Value cannot be represented on the wire
    OutOfRange,
}

/// One humidity/temperature measurement
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    /// Relative humidity in percent
    pub humidity: f32,
    /// Temperature in degrees Celsius
    pub temperature: f32,
}

/// Trait for combined humidity/temperature sensors
///
/// Implementations perform at most one bus transaction per call and never
/// retry. A sensor with a minimum sampling period may answer with its last
/// conversion instead.
/// Takes `&mut self` because the bus requires mutable access.
pub trait ClimateSensor {
    /// Take a measurement
    fn measure(&mut self) -> Result<Measurement, SensorError>;
}
