//! Device drivers for the node's actuators and contacts.

pub mod gpio;
