//! GPIO assignments for the default room inventory (BCM numbering).
//!
//! Single source of truth for the stock wiring.  A config file may
//! replace the whole inventory; these values only seed
//! [`NodeConfig::default`](crate::config::NodeConfig).

// ---------------------------------------------------------------------------
// Actuators (relay board, active HIGH)
// ---------------------------------------------------------------------------

/// Room lamp 1.
pub const LAMP_ROOM_1_GPIO: u8 = 17;
/// Room lamp 2.
pub const LAMP_ROOM_2_GPIO: u8 = 18;

/// Air conditioning unit, room 1.
pub const AC_ROOM_1_GPIO: u8 = 27;
/// Air conditioning unit, room 2.
pub const AC_ROOM_2_GPIO: u8 = 22;

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// PIR presence sensor, room 1.  HIGH = motion.
pub const PRESENCE_ROOM_1_GPIO: u8 = 25;
/// PIR presence sensor, room 2.
pub const PRESENCE_ROOM_2_GPIO: u8 = 26;

/// Reed contact, front door.  HIGH = open.
pub const OPENING_FRONT_DOOR_GPIO: u8 = 5;
/// Reed contact, room 1 window.
pub const OPENING_WINDOW_1_GPIO: u8 = 6;
/// Reed contact, room 2 window.
pub const OPENING_WINDOW_2_GPIO: u8 = 12;

