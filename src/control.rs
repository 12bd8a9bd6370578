//! Transport-independent control surface.
//!
//! The HTTP layer (and anything else that might drive the board) maps
//! onto [`ControlRequest`] values and hands them to
//! [`ControlContext::dispatch`]. Keeping the dispatch pure lets the
//! whole surface run under host tests with mocked hardware.

use crate::adapters::log_sink::RingLog;
use crate::app::ports::{ConfigPort, DelayPort, GpioPort};
use crate::app::WatchdogEngine;
use crate::config::{self, BoardConfig};

/// Pull-down used for an operator-requested reset press.
pub const CONTROL_RESET_PULSE_MS: u64 = 500;
/// Pull-down used for an operator-requested shutdown press; long enough
/// to force a hard power-off on boards that ignore a short press.
pub const CONTROL_SHUTDOWN_PULSE_MS: u64 = 6_000;

/// One operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlRequest {
    /// Report the last sampled input levels.
    Status,
    /// Drain and return the buffered log lines.
    Log,
    /// Pulse the supervised board's reset button.
    Reset,
    /// Pulse the supervised board's power button long enough to cut it.
    Shutdown,
    /// Flip the watchdog master switch and persist the choice.
    SetEnabled(bool),
    /// Merge a JSON config document, validate, persist, and adopt it.
    ReplaceConfig(String),
}

/// Outcome of a dispatched command, ready for the transport to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlResponse {
    /// HTTP-shaped status code (200/400/500).
    pub status: u16,
    pub body: String,
}

impl ControlResponse {
    fn ok(body: String) -> Self {
        Self { status: 200, body }
    }

    fn bad_request(msg: &str) -> Self {
        Self {
            status: 400,
            body: msg.to_owned(),
        }
    }

    fn server_error(msg: &str) -> Self {
        Self {
            status: 500,
            body: msg.to_owned(),
        }
    }
}

/// Everything a command may touch, owned by the control loop and shared
/// with the transport behind one lock.
pub struct ControlContext<C: ConfigPort> {
    pub engine: WatchdogEngine,
    pub config: BoardConfig,
    pub storage: C,
}

impl<C: ConfigPort> ControlContext<C> {
    pub fn new(engine: WatchdogEngine, config: BoardConfig, storage: C) -> Self {
        Self {
            engine,
            config,
            storage,
        }
    }

    /// Execute one command. Commands are serialized by the caller's
    /// lock, so the engine never sees interleaved pulses.
    pub fn dispatch(
        &mut self,
        request: &ControlRequest,
        now_ms: u64,
        hw: &mut (impl GpioPort + DelayPort),
        log: &mut RingLog,
    ) -> ControlResponse {
        match request {
            ControlRequest::Status => ControlResponse::ok(format!(
                "heartbeat={} power={}",
                self.engine.last_heartbeat_level().as_u8(),
                self.engine.last_power_level().as_u8()
            )),

            ControlRequest::Log => ControlResponse::ok(log.drain_all()),

            ControlRequest::Reset => {
                self.engine
                    .send_reset(now_ms, CONTROL_RESET_PULSE_MS, hw, log);
                ControlResponse::ok(String::new())
            }

            ControlRequest::Shutdown => {
                match self
                    .engine
                    .send_power(now_ms, CONTROL_SHUTDOWN_PULSE_MS, true, hw, log)
                {
                    Ok(()) => ControlResponse::ok(String::new()),
                    Err(err) => ControlResponse::server_error(&err.to_string()),
                }
            }

            ControlRequest::SetEnabled(on) => {
                self.engine.set_enabled(now_ms, *on, log);
                self.config.enabled = *on;
                // The running engine keeps the new setting even when the
                // persist fails; the operator is told either way.
                match self.storage.save(&self.config) {
                    Ok(()) => ControlResponse::ok(format!("enabled={on}")),
                    Err(err) => {
                        ControlResponse::ok(format!("enabled={on} (persist failed: {err})"))
                    }
                }
            }

            ControlRequest::ReplaceConfig(text) => {
                let mut candidate = self.config.clone();
                if candidate.apply_update(text).is_err() {
                    return ControlResponse::bad_request("malformed config document");
                }
                if let Err(msg) = config::validate(&candidate) {
                    return ControlResponse::bad_request(msg);
                }
                if let Err(err) = self.storage.save(&candidate) {
                    return ControlResponse::server_error(&err.to_string());
                }
                self.config = candidate;
                self.engine.reconfigure(&self.config);
                ControlResponse::ok(String::new())
            }
        }
    }
}
