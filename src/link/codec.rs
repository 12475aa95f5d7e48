//! Hub wire codec.
//!
//! Telemetry (node → hub), always 17 bytes:
//! ```text
//! ┌──────────┬───────────────┬──────────────┬──────────────┐
//! │ Category │ State mask    │ Temperature  │ Humidity     │
//! │ u8       │ BE u64        │ BE f32 bits  │ BE f32 bits  │
//! └──────────┴───────────────┴──────────────┴──────────────┘
//! ```
//!
//! Commands (hub → node): one category byte, followed by a BE u64 mask
//! unless the category is an auto category, which carries no payload.
//!
//! Floats travel as their IEEE-754 bit pattern in network order, so
//! every value (NaN payloads included) survives the trip unchanged.

use std::io::{self, Read};

use heapless::Vec as HVec;

use crate::app::ports::EnvReading;
use crate::device::{DeviceCategory, StateMask, is_auto_code};

/// Exact length of an encoded telemetry message.
pub const TELEMETRY_MSG_LEN: usize = 17;

/// Maximum length of an encoded command.
pub const COMMAND_MAX_LEN: usize = 9;

const MASK_LEN: usize = 8;

/// Temperature / humidity value meaning "no reading attached".
pub const NO_READING: f32 = -1.0;

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryMessage {
    /// Raw category code.  Kept as a byte so the codec stays lossless.
    pub category: u8,
    pub mask: StateMask,
    pub temperature: f32,
    pub humidity: f32,
}

impl TelemetryMessage {
    pub fn new(category: DeviceCategory, mask: StateMask, env: EnvReading) -> Self {
        Self {
            category: category.code(),
            mask,
            temperature: env.temperature_c,
            humidity: env.humidity_pct,
        }
    }

    /// Alarm message: sensor mask with the no-reading sentinels.
    pub fn alert(category: DeviceCategory, mask: StateMask) -> Self {
        Self {
            category: category.code(),
            mask,
            temperature: NO_READING,
            humidity: NO_READING,
        }
    }

    pub fn category(&self) -> Option<DeviceCategory> {
        DeviceCategory::from_code(self.category)
    }
}

/// Serialize a telemetry message into its fixed-size frame.
pub fn encode(msg: &TelemetryMessage) -> [u8; TELEMETRY_MSG_LEN] {
    let mut out = [0u8; TELEMETRY_MSG_LEN];
    let mut pos = 0;

    out[pos] = msg.category;
    pos += 1;
    out[pos..pos + 8].copy_from_slice(&msg.mask.bits().to_be_bytes());
    pos += 8;
    out[pos..pos + 4].copy_from_slice(&msg.temperature.to_bits().to_be_bytes());
    pos += 4;
    out[pos..pos + 4].copy_from_slice(&msg.humidity.to_bits().to_be_bytes());
    pos += 4;

    debug_assert_eq!(pos, TELEMETRY_MSG_LEN);
    out
}

/// Parse a telemetry frame.  Used by the hub side and by tests.
pub fn decode_telemetry(frame: &[u8; TELEMETRY_MSG_LEN]) -> TelemetryMessage {
    let mut mask = [0u8; 8];
    mask.copy_from_slice(&frame[1..9]);
    let mut temp = [0u8; 4];
    temp.copy_from_slice(&frame[9..13]);
    let mut hum = [0u8; 4];
    hum.copy_from_slice(&frame[13..17]);

    TelemetryMessage {
        category: frame[0],
        mask: StateMask::from_bits(u64::from_be_bytes(mask)),
        temperature: f32::from_bits(u32::from_be_bytes(temp)),
        humidity: f32::from_bits(u32::from_be_bytes(hum)),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Inbound command.  `mask` is `None` exactly when the category code is
/// an auto category.  Unknown codes are passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandMessage {
    pub category: u8,
    pub mask: Option<StateMask>,
}

impl CommandMessage {
    pub fn set(category: DeviceCategory, mask: StateMask) -> Self {
        Self {
            category: category.code(),
            mask: Some(mask),
        }
    }

    pub fn auto(category: DeviceCategory) -> Self {
        Self {
            category: category.code(),
            mask: None,
        }
    }

    pub fn category(&self) -> Option<DeviceCategory> {
        DeviceCategory::from_code(self.category)
    }

    /// Hub-side encoding.
    pub fn encode(&self) -> HVec<u8, COMMAND_MAX_LEN> {
        let mut out = HVec::new();
        // Capacity is 9 and we write at most 9 bytes.
        let _ = out.push(self.category);
        if !is_auto_code(self.category) {
            let bits = self.mask.unwrap_or_default().bits();
            let _ = out.extend_from_slice(&bits.to_be_bytes());
        }
        out
    }
}

/// Decoder state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    /// Next byte is a category code.
    AwaitingCategory,
    /// Category received, collecting the big-endian mask.
    ReadingMask { category: u8, collected: usize },
}

/// Streaming command decoder.  Accepts bytes in arbitrary chunks; a
/// single TCP read may carry half a command or several.
#[derive(Debug)]
pub struct CommandDecoder {
    state: DecoderState,
    mask_buf: [u8; MASK_LEN],
}

impl Default for CommandDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::AwaitingCategory,
            mask_buf: [0; MASK_LEN],
        }
    }

    /// Feed one byte.  Returns a command when it completes one.
    pub fn push(&mut self, byte: u8) -> Option<CommandMessage> {
        match &mut self.state {
            DecoderState::AwaitingCategory => {
                if is_auto_code(byte) {
                    return Some(CommandMessage {
                        category: byte,
                        mask: None,
                    });
                }
                self.state = DecoderState::ReadingMask {
                    category: byte,
                    collected: 0,
                };
                None
            }
            DecoderState::ReadingMask {
                category,
                collected,
            } => {
                self.mask_buf[*collected] = byte;
                *collected += 1;
                if *collected < MASK_LEN {
                    return None;
                }
                let msg = CommandMessage {
                    category: *category,
                    mask: Some(StateMask::from_bits(u64::from_be_bytes(self.mask_buf))),
                };
                self.state = DecoderState::AwaitingCategory;
                Some(msg)
            }
        }
    }

    /// Feed a chunk, yielding every command it completes.
    pub fn feed<'d>(&'d mut self, data: &'d [u8]) -> Feed<'d> {
        Feed {
            decoder: self,
            data,
        }
    }

    /// `true` between commands (no partial message buffered).
    pub fn is_idle(&self) -> bool {
        self.state == DecoderState::AwaitingCategory
    }

    /// Drop any partial command (e.g. on a new connection).
    pub fn reset(&mut self) {
        self.state = DecoderState::AwaitingCategory;
    }
}

/// Iterator returned by [`CommandDecoder::feed`].
pub struct Feed<'d> {
    decoder: &'d mut CommandDecoder,
    data: &'d [u8],
}

impl Iterator for Feed<'_> {
    type Item = CommandMessage;

    fn next(&mut self) -> Option<CommandMessage> {
        while let Some((&byte, rest)) = self.data.split_first() {
            self.data = rest;
            if let Some(msg) = self.decoder.push(byte) {
                return Some(msg);
            }
        }
        None
    }
}

/// Blocking read of exactly one command from `reader`.
///
/// Returns `Ok(None)` on a clean end-of-stream before the category byte;
/// end-of-stream inside a mask is `UnexpectedEof`.
pub fn decode_command<R: Read>(reader: &mut R) -> io::Result<Option<CommandMessage>> {
    let mut decoder = CommandDecoder::new();
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) if decoder.is_idle() => return Ok(None),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream closed inside a command",
                ));
            }
            Ok(_) => {
                if let Some(msg) = decoder.push(byte[0]) {
                    return Ok(Some(msg));
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
