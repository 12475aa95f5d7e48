//! HomeNode edge library.
//!
//! Exposes the device model, wire codec and node runtime for the binary
//! and for integration testing.  Hardware access goes through the
//! `embedded-hal` pin traits; off-target the simulated pins in
//! [`drivers::gpio`] stand in.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod device;
pub mod diagnostics;
pub mod error;
pub mod link;
pub mod node;
pub mod pins;

pub mod adapters;
pub mod drivers;
pub mod sensors;

pub use error::{Error, Result};
