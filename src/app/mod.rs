//! Application boundary: the port traits the runtime is written against.
//!
//! All interaction with hardware and storage happens through the traits
//! in [`ports`], keeping the sampler and the network loops testable
//! without real peripherals.

pub mod ports;
