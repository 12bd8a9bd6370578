//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements           | Connects to                  |
//! |------------|----------------------|------------------------------|
//! | `gpio`     | GpioPort, DelayPort  | ESP32 pins / host simulation |
//! | `log_sink` | EventSink            | In-memory ring + serial log  |
//! | `storage`  | ConfigPort           | NVS / in-memory store        |
//! | `time`     | millisecond clock    | ESP32 system timer           |
//! | `wifi`     | network bring-up     | ESP-IDF WiFi STA + AP        |

pub mod gpio;
pub mod log_sink;
pub mod storage;
pub mod time;
pub mod wifi;
