//! Ring-buffered log sink.
//!
//! Implements [`EventSink`] by rendering each engine event to one text
//! line, stamped with the engine clock, and keeping the most recent
//! lines in memory so the control surface can serve them over HTTP.
//! Every line is mirrored to the serial console through the `log`
//! facade as it arrives.

use heapless::Deque;
use log::info;

use crate::app::events::WatchdogEvent;
use crate::app::ports::EventSink;

/// Lines retained before the oldest is dropped.
pub const RING_CAPACITY: usize = 128;

/// Bounded in-memory log with HTTP drain semantics. The ring itself is
/// fixed-capacity, so a chatty engine can never grow the buffer.
pub struct RingLog {
    lines: Deque<String, RING_CAPACITY>,
}

impl Default for RingLog {
    fn default() -> Self {
        Self::new()
    }
}

impl RingLog {
    #[must_use]
    pub fn new() -> Self {
        Self { lines: Deque::new() }
    }

    /// Stamp and buffer one line, evicting the oldest when full.
    pub fn push_line(&mut self, at_ms: u64, text: &str) {
        let line = format!("[{}] {text}", format_stamp(at_ms));
        info!("{line}");
        if self.lines.is_full() {
            self.lines.pop_front();
        }
        // Cannot fail: a slot was just freed if the ring was full.
        let _ = self.lines.push_back(line);
    }

    /// Concatenate every buffered line newest-first and clear the
    /// buffer. A second drain with nothing new returns an empty string.
    pub fn drain_all(&mut self) -> String {
        let mut out = String::new();
        while let Some(line) = self.lines.pop_back() {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl EventSink for RingLog {
    fn emit(&mut self, event: &WatchdogEvent) {
        self.push_line(event.at_ms(), &event.to_string());
    }
}

/// `hh:mm:ss.mmm` since boot; hours keep counting past 24.
fn format_stamp(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms / 60_000) % 60;
    let seconds = (ms / 1_000) % 60;
    let millis = ms % 1_000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}
