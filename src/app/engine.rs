//! Watchdog state machine.
//!
//! Supervises one external board through four GPIO lines:
//!
//! ```text
//!   heartbeat  ──▶ toggles while the board is healthy
//!   power sense──▶ follows the board's power rail
//!   reset out  ◀── pulsed to press the board's reset button
//!   power out  ◀── pulsed to press the board's power button
//! ```
//!
//! The engine is clockless: callers pass the current millisecond uptime
//! into every method, which keeps the whole state machine deterministic
//! and host-testable.
//!
//! Evaluation rules, in order, on each poll:
//!   1. If the clock went backwards, re-seed all timers and wait for the
//!      next poll.
//!   2. At most one evaluation per poll interval.
//!   3. A heartbeat edge refreshes the liveness deadline and advances the
//!      debounce counter; reaching the configured count collapses any
//!      open cooldown window.
//!   4. A stale heartbeat past the timeout triggers recovery, unless the
//!      cooldown window is still open. A low power-sense line triggers
//!      recovery regardless of cooldown.
//!
//! Recovery is a power-button pulse, a settle wait, then a reset-button
//! pulse, after which the cooldown window opens.

use crate::app::events::WatchdogEvent;
use crate::app::ports::{DelayPort, EventSink, GpioPort, InputLine, Level, OutputLine};
use crate::config::BoardConfig;
use crate::error::{Error, Result};

/// Pulse hold time for the recovery power press.
pub const RECOVERY_POWER_PULSE_MS: u64 = 2_000;
/// Pause between the power press and the reset press.
pub const RECOVERY_SETTLE_MS: u32 = 1_000;
/// Pulse hold time for the recovery reset press.
pub const RECOVERY_RESET_PULSE_MS: u64 = 2_000;

/// Pulses are held in short slices so the idle task is never starved.
const PULSE_SLICE_MS: u32 = 50;
/// Dwell after releasing an output before anything else runs.
const PULSE_RELEASE_SETTLE_MS: u32 = 200;

/// The debounce/lockup/cooldown state machine.
#[derive(Debug)]
pub struct WatchdogEngine {
    // Thresholds, snapshotted from config.
    lockup_timeout_ms: u64,
    cooldown_ms: u64,
    debounce_count: u32,
    poll_interval_ms: u32,
    enabled: bool,

    // Line state.
    last_heartbeat: Level,
    last_power: Level,

    // Timers, all on the caller-supplied millisecond clock.
    heartbeat_changed_at: u64,
    next_poll_at: u64,
    cooldown_ends_at: u64,
    last_tick_at: u64,

    /// Heartbeat edges seen since the last recovery, capped at
    /// `debounce_count + 1` so the collapse fires exactly once.
    toggle_counter: u32,
}

impl WatchdogEngine {
    /// Build the engine and drive both outputs to their released level.
    ///
    /// The initial heartbeat level is sampled here, so a line that never
    /// toggles is already on its liveness deadline from `now_ms`.
    pub fn new(
        config: &BoardConfig,
        now_ms: u64,
        gpio: &mut impl GpioPort,
        sink: &mut impl EventSink,
    ) -> Self {
        gpio.write(OutputLine::Reset, Level::Low);
        gpio.write(OutputLine::Power, Level::Low);

        let engine = Self {
            lockup_timeout_ms: config.lockup_timeout_ms,
            cooldown_ms: config.cooldown_ms,
            debounce_count: config.debounce_count,
            poll_interval_ms: config.poll_interval_ms,
            enabled: config.enabled,
            last_heartbeat: gpio.read(InputLine::Heartbeat),
            last_power: gpio.read(InputLine::PowerSense),
            heartbeat_changed_at: now_ms,
            next_poll_at: now_ms + u64::from(config.poll_interval_ms),
            // Boot starts outside any cooldown window.
            cooldown_ends_at: now_ms,
            last_tick_at: now_ms,
            toggle_counter: 0,
        };
        sink.emit(&WatchdogEvent::EngineStarted {
            at_ms: now_ms,
            poll_interval_ms: config.poll_interval_ms,
        });
        engine
    }

    /// One supervision step. Cheap no-op between poll deadlines.
    pub fn tick(
        &mut self,
        now_ms: u64,
        hw: &mut (impl GpioPort + DelayPort),
        sink: &mut impl EventSink,
    ) {
        // A wrapped or rewound clock would leave deadlines stale or
        // unreachable. Comparing against the previous tick catches any
        // backwards step, so re-seed before the poll gate can stall.
        if now_ms < self.last_tick_at {
            self.last_tick_at = now_ms;
            self.heartbeat_changed_at = now_ms;
            self.next_poll_at = now_ms + u64::from(self.poll_interval_ms);
            self.cooldown_ends_at = now_ms;
            sink.emit(&WatchdogEvent::ClockWrapReset { at_ms: now_ms });
            return;
        }
        self.last_tick_at = now_ms;

        if now_ms <= self.next_poll_at {
            return;
        }
        self.next_poll_at += u64::from(self.poll_interval_ms);

        let heartbeat = hw.read(InputLine::Heartbeat);
        let power = hw.read(InputLine::PowerSense);
        self.last_power = power;

        if heartbeat != self.last_heartbeat {
            self.last_heartbeat = heartbeat;
            self.heartbeat_changed_at = now_ms;
            self.on_heartbeat_edge(now_ms, sink);
            return;
        }

        let timed_out = now_ms > self.heartbeat_changed_at + self.lockup_timeout_ms;
        let power_off = power == Level::Low;
        let in_cooldown = now_ms < self.cooldown_ends_at;

        if power_off || (timed_out && !in_cooldown) {
            self.recover(now_ms, heartbeat, power, hw, sink);
        } else if timed_out {
            sink.emit(&WatchdogEvent::CooldownActive {
                at_ms: now_ms,
                remaining_ms: self.cooldown_ends_at - now_ms,
            });
        }
    }

    /// Count a heartbeat edge; the edge that reaches the configured
    /// count closes the cooldown window early.
    fn on_heartbeat_edge(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        if self.toggle_counter > self.debounce_count {
            return;
        }
        if self.toggle_counter < self.debounce_count {
            self.toggle_counter += 1;
        }
        if self.toggle_counter == self.debounce_count {
            if now_ms < self.cooldown_ends_at {
                sink.emit(&WatchdogEvent::CooldownCollapsed { at_ms: now_ms });
            }
            self.cooldown_ends_at = now_ms;
            self.toggle_counter += 1;
        }
    }

    /// Lockup handling: report, pulse (when enabled), open the cooldown.
    fn recover(
        &mut self,
        now_ms: u64,
        heartbeat: Level,
        power: Level,
        hw: &mut (impl GpioPort + DelayPort),
        sink: &mut impl EventSink,
    ) {
        sink.emit(&WatchdogEvent::LockupDetected {
            at_ms: now_ms,
            heartbeat: heartbeat.as_u8(),
            power_on: power == Level::High,
        });
        self.toggle_counter = 0;

        if self.enabled {
            // Power press first: a hung board often needs a hard cycle
            // before the reset line does anything.
            let _ = self.send_power(now_ms, RECOVERY_POWER_PULSE_MS, true, hw, sink);
            hw.delay_ms(RECOVERY_SETTLE_MS);
            self.send_reset(now_ms, RECOVERY_RESET_PULSE_MS, hw, sink);
        } else {
            sink.emit(&WatchdogEvent::ObserveOnly { at_ms: now_ms });
        }

        self.heartbeat_changed_at = now_ms;
        self.cooldown_ends_at = now_ms + self.cooldown_ms;
    }

    /// Press the supervised board's reset button for `pull_down_ms`.
    pub fn send_reset(
        &mut self,
        now_ms: u64,
        pull_down_ms: u64,
        hw: &mut (impl GpioPort + DelayPort),
        sink: &mut impl EventSink,
    ) {
        sink.emit(&WatchdogEvent::ResetPulse {
            at_ms: now_ms,
            pull_down_ms,
        });
        pulse(OutputLine::Reset, pull_down_ms, hw);
    }

    /// Press the supervised board's power button for `pull_down_ms`.
    ///
    /// `ignore_power_status` must be `true`: the variant that first
    /// consults the power-sense line is reserved and refused without
    /// touching the output.
    pub fn send_power(
        &mut self,
        now_ms: u64,
        pull_down_ms: u64,
        ignore_power_status: bool,
        hw: &mut (impl GpioPort + DelayPort),
        sink: &mut impl EventSink,
    ) -> Result<()> {
        if !ignore_power_status {
            sink.emit(&WatchdogEvent::PowerPulseUnsupported { at_ms: now_ms });
            return Err(Error::NotSupported("power-status-aware pulse"));
        }
        sink.emit(&WatchdogEvent::PowerPulse {
            at_ms: now_ms,
            pull_down_ms,
        });
        pulse(OutputLine::Power, pull_down_ms, hw);
        Ok(())
    }

    /// Flip the master switch. Takes effect on the next lockup.
    pub fn set_enabled(&mut self, now_ms: u64, enabled: bool, sink: &mut impl EventSink) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        sink.emit(&WatchdogEvent::EnabledChanged {
            at_ms: now_ms,
            enabled,
        });
    }

    /// Adopt new thresholds without disturbing the running timers.
    pub fn reconfigure(&mut self, config: &BoardConfig) {
        self.lockup_timeout_ms = config.lockup_timeout_ms;
        self.cooldown_ms = config.cooldown_ms;
        self.debounce_count = config.debounce_count;
        self.poll_interval_ms = config.poll_interval_ms;
        self.enabled = config.enabled;
        self.toggle_counter = self.toggle_counter.min(self.debounce_count + 1);
    }

    #[must_use]
    pub fn last_heartbeat_level(&self) -> Level {
        self.last_heartbeat
    }

    #[must_use]
    pub fn last_power_level(&self) -> Level {
        self.last_power
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn cooldown_ends_at(&self) -> u64 {
        self.cooldown_ends_at
    }
}

/// Assert an output, hold it in short slices, release it, settle.
fn pulse(line: OutputLine, pull_down_ms: u64, hw: &mut (impl GpioPort + DelayPort)) {
    hw.write(line, Level::High);
    let mut remaining = pull_down_ms;
    while remaining > 0 {
        let step = remaining.min(u64::from(PULSE_SLICE_MS)) as u32;
        hw.delay_ms(step);
        remaining -= u64::from(step);
    }
    hw.write(line, Level::Low);
    hw.delay_ms(PULSE_RELEASE_SETTLE_MS);
}
