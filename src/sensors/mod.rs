//! Sensor drivers that are not single GPIO lines.

pub mod environment;
