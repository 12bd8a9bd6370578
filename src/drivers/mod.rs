//! Board-level input drivers.

pub mod button;
