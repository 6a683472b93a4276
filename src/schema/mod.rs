//! Device event schema
//!
//! This module defines the input format the host bridges emit for headset
//! signals, band power snapshots and accessory throws, plus batch parsing and
//! validation helpers.

mod adapter;
mod device_event;

pub use adapter::*;
pub use device_event::*;
