//! DHT22 / AM2302 humidity and temperature sensor
//!
//! Single-wire protocol on one open-drain GPIO with an external pull-up:
//!
//! ```text
//! host:   ‾‾‾|____ >1ms ____|‾‾ release
//! sensor:                        |_80us_|‾80us‾| then 40 bits
//! bit:    |_50us_|‾26us‾|  = 0    |_50us_|‾70us‾|  = 1
//! ```
//!
//! Bits are sampled 35 us after each rising edge. The frame is
//! humidity x10 (u16), temperature x10 (sign bit + 15 bits), checksum.
//! The sensor needs 2 s between conversions. Within that window the
//! driver answers with its last good conversion instead of starting one.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use hygroclock_core::traits::{ClimateSensor, Measurement, SensorError};

/// Host start pulse (us)
const START_LOW_US: u32 = 1_100;

/// Longest any single level may last before we give up (us)
const LEVEL_TIMEOUT_US: u32 = 100;

/// Delay after a rising edge at which a bit is sampled (us)
const SAMPLE_AFTER_US: u32 = 35;

/// Bytes in one frame
const FRAME_LEN: usize = 5;

/// Shortest time between two conversions (ms)
pub const MIN_INTERVAL_MS: u64 = 2_000;

/// A decoded conversion and the uptime it was taken at
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Conversion {
    pub at_ms: u64,
    pub measurement: Measurement,
}

/// DHT22 driver
pub struct Dht22<P, D, C> {
    pin: P,
    delay: D,
    /// Millisecond uptime source
    now_ms: C,
    last: Option<Conversion>,
}

impl<P, D, C> Dht22<P, D, C>
where
    P: InputPin + OutputPin,
    D: DelayNs,
    C: FnMut() -> u64,
{
    /// Create a new driver
    ///
    /// `pin` must be open-drain so that driving it high releases the line.
    /// `now_ms` returns a monotonic uptime in milliseconds.
    pub fn new(pin: P, delay: D, now_ms: C) -> Self {
        Self {
            pin,
            delay,
            now_ms,
            last: None,
        }
    }

    /// Release the pin and delay
    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }

    /// Most recent good conversion
    pub fn last_conversion(&self) -> Option<Conversion> {
        self.last
    }

    /// Run one conversion and return the raw frame
    pub fn read_frame(&mut self) -> Result<[u8; FRAME_LEN], SensorError> {
        // Start signal
        self.pin.set_low().map_err(|_| SensorError::Bus)?;
        self.delay.delay_us(START_LOW_US);
        self.pin.set_high().map_err(|_| SensorError::Bus)?;

        // Response: low 80us, high 80us
        self.wait_for(false)?;
        self.wait_for(true)?;
        self.wait_for(false)?;

        let mut frame = [0u8; FRAME_LEN];
        for byte in frame.iter_mut() {
            for _ in 0..8 {
                self.wait_for(true)?;
                self.delay.delay_us(SAMPLE_AFTER_US);
                let bit = self.pin.is_high().map_err(|_| SensorError::Bus)?;
                *byte = (*byte << 1) | u8::from(bit);
                if bit {
                    self.wait_for(false)?;
                }
            }
        }

        Ok(frame)
    }

    /// Busy-wait until the line reaches `high`; returns the wait in us
    fn wait_for(&mut self, high: bool) -> Result<u32, SensorError> {
        let mut waited = 0;
        loop {
            if self.pin.is_high().map_err(|_| SensorError::Bus)? == high {
                return Ok(waited);
            }
            if waited >= LEVEL_TIMEOUT_US {
                return Err(SensorError::Timeout);
            }
            self.delay.delay_us(1);
            waited += 1;
        }
    }
}

impl<P, D, C> ClimateSensor for Dht22<P, D, C>
where
    P: InputPin + OutputPin,
    D: DelayNs,
    C: FnMut() -> u64,
{
    fn measure(&mut self) -> Result<Measurement, SensorError> {
        let now = (self.now_ms)();
        if let Some(last) = self.last {
            if now.saturating_sub(last.at_ms) < MIN_INTERVAL_MS {
                return Ok(last.measurement);
            }
        }

        let measurement = decode_frame(self.read_frame()?)?;
        self.last = Some(Conversion {
            at_ms: now,
            measurement,
        });
        Ok(measurement)
    }
}

/// Decode and checksum a raw frame
pub fn decode_frame(frame: [u8; FRAME_LEN]) -> Result<Measurement, SensorError> {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        return Err(SensorError::Checksum);
    }

    let humidity = u16::from_be_bytes([frame[0], frame[1]]);
    let magnitude = u16::from_be_bytes([frame[2] & 0x7F, frame[3]]);
    let temperature = if frame[2] & 0x80 != 0 {
        -(magnitude as f32)
    } else {
        magnitude as f32
    };

    Ok(Measurement {
        humidity: humidity as f32 / 10.0,
        temperature: temperature / 10.0,
    })
}
