//! Polled push-button driver with short-press and long-hold detection.
//!
//! Active-low momentary switch with a pull-up. The main loop samples
//! the pin each pass and feeds the level in here; no ISR involved, so
//! the same driver runs unchanged under host tests.
//!
//! | Gesture    | Condition                      | Event       |
//! |-----------|--------------------------------|-------------|
//! | Short press| Release after >= 50ms held    | `ShortPress`|
//! | Long hold | Held continuously >= threshold | `LongHold`  |

use crate::app::ports::Level;

const DEBOUNCE_MS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    ShortPress,
    /// Fires once while still held; the following release is swallowed.
    LongHold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PressState {
    Released,
    Pressed { since_ms: u64, long_fired: bool },
}

pub struct ButtonDriver {
    long_hold_ms: u64,
    state: PressState,
}

impl ButtonDriver {
    #[must_use]
    pub fn new(long_hold_ms: u64) -> Self {
        Self {
            long_hold_ms,
            state: PressState::Released,
        }
    }

    /// Feed one sampled level. `Level::Low` means pressed.
    pub fn poll(&mut self, now_ms: u64, level: Level) -> Option<ButtonEvent> {
        let pressed = level == Level::Low;
        match self.state {
            PressState::Released => {
                if pressed {
                    self.state = PressState::Pressed {
                        since_ms: now_ms,
                        long_fired: false,
                    };
                }
                None
            }
            PressState::Pressed {
                since_ms,
                long_fired,
            } => {
                if pressed {
                    if !long_fired && now_ms.saturating_sub(since_ms) >= self.long_hold_ms {
                        self.state = PressState::Pressed {
                            since_ms,
                            long_fired: true,
                        };
                        return Some(ButtonEvent::LongHold);
                    }
                    return None;
                }
                self.state = PressState::Released;
                if long_fired || now_ms.saturating_sub(since_ms) < DEBOUNCE_MS {
                    None
                } else {
                    Some(ButtonEvent::ShortPress)
                }
            }
        }
    }
}
