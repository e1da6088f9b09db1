//! Display abstraction and OLED driver for Hygroclock
//!
//! This crate provides:
//! - `DisplayBackend` trait the clock face is rendered through
//! - `TextSize` for the two text sizes the face uses
//! - `Ssd1306`, a blocking I2C framebuffer driver for 128x64 panels
//!
//! # Architecture
//!
//! The presenter in `hygroclock-core` only knows about `DisplayBackend`.
//! Pixel coordinates are used throughout, with (0, 0) at the top left and
//! text anchored at its top edge. Drawing goes to a local framebuffer and
//! reaches the panel on `flush`, so a frame is always shown whole.

#![cfg_attr(not(test), no_std)]

pub mod backend;
pub mod ssd1306;

// Re-export key types
pub use backend::{DisplayBackend, DisplayError, TextSize};
pub use ssd1306::Ssd1306;
