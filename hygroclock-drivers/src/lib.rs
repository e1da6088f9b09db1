//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in hygroclock-core for the climate clock's hardware:
//!
//! - Climate sensors (DHT22 single-wire)

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod sensor;
