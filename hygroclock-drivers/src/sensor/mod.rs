//! Climate sensor drivers

pub mod dht22;

pub use dht22::{decode_frame, Conversion, Dht22, MIN_INTERVAL_MS};
