//! Monotonic millisecond clock.
//!
//! - **`target_os = "espidf"`** — wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (monotonic since boot).
//! - **other targets** — `std::time::Instant`, for host tests.

/// Millisecond uptime source the control loop feeds into the engine.
pub struct BoardClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for BoardClock {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    #[must_use]
    pub fn uptime_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    #[must_use]
    pub fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}
