//! Port traits between the application core and the hardware adapters.
//!
//! The engine only ever talks to these traits. On target they are backed
//! by ESP-IDF peripherals; in tests by mocks that record every call.

use crate::config::BoardConfig;

/// Logic level on a GPIO line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::High => 1,
        }
    }
}

/// The two lines the engine samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputLine {
    /// Toggled periodically by the supervised board while it is healthy.
    Heartbeat,
    /// Follows the supervised board's power rail.
    PowerSense,
}

/// The two lines the engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLine {
    /// Wired to the supervised board's reset button line.
    Reset,
    /// Wired to the supervised board's power button line.
    Power,
}

/// Digital I/O as the engine sees it.
///
/// Writes are infallible by contract: an adapter that can fail a write
/// must latch the line safe itself rather than surface the error, so a
/// pulse can never leave an output asserted halfway.
pub trait GpioPort {
    fn read(&mut self, line: InputLine) -> Level;
    fn write(&mut self, line: OutputLine, level: Level);
}

/// Blocking delay used while shaping output pulses.
pub trait DelayPort {
    fn delay_ms(&mut self, ms: u32);
}

/// Receives every state-machine event the engine emits.
pub trait EventSink {
    fn emit(&mut self, event: &crate::app::events::WatchdogEvent);
}

/// Failures a [`ConfigPort`] backend can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No document has ever been stored.
    NotFound,
    /// Stored bytes are not a parsable document.
    Corrupted,
    /// Parsed fine but the values are unusable.
    ValidationFailed(&'static str),
    /// The storage backend itself failed.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "no stored config"),
            Self::Corrupted => write!(f, "stored config is corrupted"),
            Self::ValidationFailed(msg) => write!(f, "config validation failed: {msg}"),
            Self::IoError => write!(f, "config storage I/O error"),
        }
    }
}

impl core::error::Error for ConfigError {}

/// Persistent configuration storage.
pub trait ConfigPort {
    fn load(&mut self) -> Result<BoardConfig, ConfigError>;
    fn save(&mut self, config: &BoardConfig) -> Result<(), ConfigError>;
    /// Wipe the stored document; the next load reports `NotFound`.
    fn erase(&mut self) -> Result<(), ConfigError>;
}
