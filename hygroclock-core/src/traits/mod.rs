//! Hardware abstraction traits
//!
//! These traits define the interface between the coordination logic
//! and hardware- or network-specific implementations.

pub mod sensor;
pub mod sink;

pub use sensor::{ClimateSensor, Measurement, SensorError};
pub use sink::{ConnectionId, PushSink, SinkError};
