//! Host-side integration tests.
//!
//! Everything runs against the mock hardware in [`mock_hw`]; no ESP-IDF
//! involved. Build with `--no-default-features` on the host.

mod control_tests;
mod engine_tests;
mod mock_hw;
