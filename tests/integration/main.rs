//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises the node over real
//! loopback sockets against a fake hub.  All tests run on the host with
//! simulated GPIO.

mod command_server_tests;
mod mock_hw;
mod node_scenario_tests;
