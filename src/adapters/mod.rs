//! Adapters: concrete implementations of the port traits.

pub mod config_file;
pub mod hardware;
