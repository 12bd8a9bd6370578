//! GPIO pin assignments for the BoardGuard board.
//!
//! Single source of truth for the pin numbers; the espidf bootstrap
//! asserts its pin selection against these constants at compile time.
//! The four watchdog lines are wired to
//! the supervised SBC's header: heartbeat and power-sense come in, reset
//! and power drive the SBC's front-panel button lines through
//! open-drain transistors.

// ---------------------------------------------------------------------------
// Watchdog lines
// ---------------------------------------------------------------------------

/// Digital input: heartbeat line toggled by the supervised board.
pub const HEARTBEAT_GPIO: i32 = 16;
/// Digital input: supervised board's power rail sense (HIGH = powered).
pub const POWER_SENSE_GPIO: i32 = 17;
/// Digital output: pulse HIGH to press the supervised board's reset button.
pub const RESET_OUT_GPIO: i32 = 14;
/// Digital output: pulse HIGH to press the supervised board's power button.
pub const POWER_OUT_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// Local buttons (active-low with external pull-up)
// ---------------------------------------------------------------------------

/// Momentary push-button: manual reset pulse to the supervised board.
pub const RESET_BUTTON_GPIO: i32 = 5;
/// Flash/boot button: hold for factory reset.
pub const FLASH_BUTTON_GPIO: i32 = 0;

/// Hold duration on the flash button that triggers a factory reset.
pub const FACTORY_RESET_HOLD_MS: u32 = 5_000;

/// Pull-down duration for a manual reset-button pulse.
pub const MANUAL_RESET_PULSE_MS: u64 = 250;
