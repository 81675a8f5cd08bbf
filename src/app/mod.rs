//! Application core: the module host and its ports.
//!
//! Everything here is hardware-agnostic. Pin access, time and outbound
//! events flow through the port traits in [`ports`], so the host and every
//! module run unchanged against mock adapters in tests.

pub mod commands;
pub mod host;
pub mod ports;
