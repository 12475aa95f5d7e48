//! Hub link: the fixed-size wire codec and the outbound transport.

pub mod codec;
pub mod transport;

pub use codec::{CommandDecoder, CommandMessage, TELEMETRY_MSG_LEN, TelemetryMessage};
pub use transport::{CaptureTransport, NullTransport, Transport, Uplink};
