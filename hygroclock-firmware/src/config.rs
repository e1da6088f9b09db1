//! Device configuration
//!
//! Generated by build.rs from device.toml, which it has already validated.

use hygroclock_core::config::{DeviceConfig, RelayConfig, StaleReadingPolicy, TimingConfig};

include!(concat!(env!("OUT_DIR"), "/device_config.rs"));
