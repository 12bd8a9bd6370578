//! Mock hardware for driving the engine from tests.

use boardguard::app::events::WatchdogEvent;
use boardguard::app::ports::{DelayPort, EventSink, GpioPort, InputLine, Level, OutputLine};

/// Settable input levels plus a full record of writes and delays.
pub struct MockHw {
    pub heartbeat: Level,
    pub power: Level,
    pub writes: Vec<(OutputLine, Level)>,
    pub delays: Vec<u32>,
}

impl MockHw {
    /// A healthy supervised board: power rail up, heartbeat idle low.
    pub fn healthy() -> Self {
        Self {
            heartbeat: Level::Low,
            power: Level::High,
            writes: Vec::new(),
            delays: Vec::new(),
        }
    }

    pub fn toggle_heartbeat(&mut self) {
        self.heartbeat = match self.heartbeat {
            Level::Low => Level::High,
            Level::High => Level::Low,
        };
    }

    pub fn total_delay_ms(&self) -> u64 {
        self.delays.iter().map(|&ms| u64::from(ms)).sum()
    }

    /// Writes touching one line, in order.
    pub fn writes_to(&self, line: OutputLine) -> Vec<Level> {
        self.writes
            .iter()
            .filter(|(l, _)| *l == line)
            .map(|(_, level)| *level)
            .collect()
    }
}

/// Captures every emitted event for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<WatchdogEvent>,
}

impl RecordingSink {
    pub fn count_lockups(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, WatchdogEvent::LockupDetected { .. }))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &WatchdogEvent) {
        self.events.push(event.clone());
    }
}

impl GpioPort for MockHw {
    fn read(&mut self, line: InputLine) -> Level {
        match line {
            InputLine::Heartbeat => self.heartbeat,
            InputLine::PowerSense => self.power,
        }
    }

    fn write(&mut self, line: OutputLine, level: Level) {
        self.writes.push((line, level));
    }
}

impl DelayPort for MockHw {
    fn delay_ms(&mut self, ms: u32) {
        self.delays.push(ms);
    }
}
