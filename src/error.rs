//! Unified error types for the BoardGuard firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping
//! the top-level control loop's error handling uniform.  The watchdog
//! engine itself never returns errors from its tick path — failures are
//! observable only through emitted events (a headless controller has no
//! caller able to act on a richer type).  The one exception is the
//! reserved power-status-aware pulse path, which is an explicit
//! [`Error::NotSupported`].

use core::fmt;

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Configuration is invalid or could not be loaded/saved.
    Config(&'static str),
    /// Persistent storage backend failed.
    Storage(&'static str),
    /// A communication subsystem failed.
    Connectivity(&'static str),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// A deliberately unimplemented code path was invoked.
    NotSupported(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Storage(msg) => write!(f, "storage: {msg}"),
            Self::Connectivity(msg) => write!(f, "connectivity: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::NotSupported(msg) => write!(f, "not supported: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
