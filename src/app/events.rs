//! Structured events emitted by the watchdog engine.
//!
//! The engine never formats text. Sinks decide how an event is rendered
//! (ring log line, `log::info!`, test assertion), so tests match on the
//! variant instead of parsing strings.

/// Everything observable about the engine's decisions.
///
/// Each variant carries the engine clock (`at_ms`) at the moment it was
/// emitted, so sinks need no clock of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchdogEvent {
    /// Engine constructed and outputs driven to their idle level.
    EngineStarted { at_ms: u64, poll_interval_ms: u32 },
    /// The millisecond clock went backwards; timers were re-seeded.
    ClockWrapReset { at_ms: u64 },
    /// A heartbeat timeout was observed but the cooldown window
    /// suppressed recovery.
    CooldownActive { at_ms: u64, remaining_ms: u64 },
    /// Enough heartbeat toggles arrived to end the cooldown early.
    CooldownCollapsed { at_ms: u64 },
    /// The supervised board is considered hung or powered off.
    LockupDetected {
        at_ms: u64,
        heartbeat: u8,
        power_on: bool,
    },
    /// A lockup was detected while the engine is disabled; no pulses.
    ObserveOnly { at_ms: u64 },
    /// The power output was pulsed.
    PowerPulse { at_ms: u64, pull_down_ms: u64 },
    /// The reset output was pulsed.
    ResetPulse { at_ms: u64, pull_down_ms: u64 },
    /// The power-status-aware pulse variant was requested; reserved and
    /// refused without touching the output.
    PowerPulseUnsupported { at_ms: u64 },
    /// The master enable switch changed.
    EnabledChanged { at_ms: u64, enabled: bool },
}

impl core::fmt::Display for WatchdogEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::EngineStarted {
                poll_interval_ms, ..
            } => {
                write!(f, "watchdog started, polling every {poll_interval_ms} ms")
            }
            Self::ClockWrapReset { .. } => write!(f, "clock wrapped, timers re-seeded"),
            Self::CooldownActive { remaining_ms, .. } => {
                write!(f, "in cooldown, {remaining_ms} ms remaining")
            }
            Self::CooldownCollapsed { .. } => write!(f, "heartbeat recovered, cooldown ended"),
            Self::LockupDetected {
                heartbeat,
                power_on,
                ..
            } => write!(
                f,
                "lockup detected (heartbeat={heartbeat} power={})",
                u8::from(*power_on)
            ),
            Self::ObserveOnly { .. } => write!(f, "lockup detected but watchdog disabled"),
            Self::PowerPulse { pull_down_ms, .. } => {
                write!(f, "power pulse {pull_down_ms} ms")
            }
            Self::ResetPulse { pull_down_ms, .. } => {
                write!(f, "reset pulse {pull_down_ms} ms")
            }
            Self::PowerPulseUnsupported { .. } => {
                write!(f, "power-status-aware pulse not supported")
            }
            Self::EnabledChanged { enabled, .. } => {
                write!(f, "watchdog enabled={enabled}")
            }
        }
    }
}

impl WatchdogEvent {
    /// Engine clock at the moment of emission.
    #[must_use]
    pub fn at_ms(&self) -> u64 {
        match self {
            Self::EngineStarted { at_ms, .. }
            | Self::ClockWrapReset { at_ms }
            | Self::CooldownActive { at_ms, .. }
            | Self::CooldownCollapsed { at_ms }
            | Self::LockupDetected { at_ms, .. }
            | Self::ObserveOnly { at_ms }
            | Self::PowerPulse { at_ms, .. }
            | Self::ResetPulse { at_ms, .. }
            | Self::PowerPulseUnsupported { at_ms }
            | Self::EnabledChanged { at_ms, .. } => *at_ms,
        }
    }
}
