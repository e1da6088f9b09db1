//! Configuration types
//!
//! Board-agnostic configuration structures. The firmware generates a
//! `DeviceConfig` constant from its TOML file at build time.

pub mod types;

pub use types::*;
