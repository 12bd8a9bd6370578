//! Hardware-independent application core.
//!
//! ```text
//!            ┌─────────────────────────────┐
//!   inputs──▶│        WatchdogEngine        │──▶ outputs
//!  (GpioPort)│  debounce / lockup / cooldown│  (GpioPort)
//!            │        state machine         │
//!            └──────────────┬──────────────┘
//!                           │ WatchdogEvent
//!                           ▼
//!                       EventSink
//! ```
//!
//! Everything in this module is pure logic over the port traits in
//! [`ports`]; it compiles and runs on the host, which is where the
//! integration tests exercise it.

pub mod engine;
pub mod events;
pub mod ports;

pub use engine::WatchdogEngine;
pub use events::WatchdogEvent;
pub use ports::{
    ConfigError, ConfigPort, DelayPort, EventSink, GpioPort, InputLine, Level, OutputLine,
};
