//! Board-agnostic coordination logic for the climate clock
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Hardware abstraction traits (climate sensor, push sink)
//! - Readings, their JSON encoding and the sensor reader
//! - Wall clock seeded from network time
//! - Clock face presenter
//! - Push-channel broadcaster with replay for reconnecting clients
//! - Connectivity state machine and one-shot online notification
//! - The cooperative scheduler tying it all together
//! - Configuration and error types

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod broadcast;
pub mod clock;
pub mod config;
pub mod error;
pub mod notifier;
pub mod presenter;
pub mod readings;
pub mod scheduler;
pub mod state;
pub mod traits;

pub use error::CoordinatorError;
