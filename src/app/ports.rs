//! Port traits: the boundary between module logic and the outside world.
//!
//! ```text
//!   Board adapter ──▶ Board ──▶ Module ──▶ EventSink ──▶ transport / log
//! ```
//!
//! Modules never touch registers. Every pin access, clock read and
//! outbound event goes through these traits, so the full command and
//! filter logic runs on the host against mock adapters.
//!
//! ## Output locks
//!
//! Guarded writes consult an externally owned lock per [`OutputClass`].
//! When the lock is engaged the write returns [`OutputLocked`] and the
//! pin keeps its level. Modules only react to the rejection; they never
//! set or clear a lock.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;
use serde::{Deserialize, Serialize};

use crate::error::{OutputLocked, PwmError};
use crate::events::ModuleEvent;

// ───────────────────────────────────────────────────────────────
// Pin classes
// ───────────────────────────────────────────────────────────────

/// Which output lock guards a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputClass {
    /// Valves, brakes, relays, buzzers.
    Actuator,
    /// Pins driving TTL lines to other instruments.
    Ttl,
}

/// Input bias applied when a pin is configured as an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputPull {
    Floating,
    Down,
    Up,
}

// ───────────────────────────────────────────────────────────────
// Board port (hardware + time)
// ───────────────────────────────────────────────────────────────

/// Pin-level hardware access plus the monotonic clock.
///
/// The blocking `DelayNs` supertrait is only used by the two calibration
/// routines; staged commands measure elapsed time with [`Board::micros`].
pub trait Board: DelayNs {
    /// Make `pin` an output and drive `initial` without consulting locks.
    /// Only called from module setup.
    fn configure_output(&mut self, pin: u8, initial: PinState);

    /// Make `pin` an input with the given bias.
    fn configure_input(&mut self, pin: u8, pull: InputPull);

    /// Drive a digital level, unless the lock for `class` is engaged.
    fn digital_write(
        &mut self,
        pin: u8,
        level: PinState,
        class: OutputClass,
    ) -> Result<(), OutputLocked>;

    /// Drive a PWM duty cycle (0 – 255), unless the lock for `class` is
    /// engaged. Fails with [`PwmError::Unavailable`] when the pin cannot
    /// get a PWM channel.
    fn analog_write(&mut self, pin: u8, duty: u8, class: OutputClass) -> Result<(), PwmError>;

    /// Average `averaging` raw ADC samples (0 or 1 = single sample).
    fn analog_read(&mut self, pin: u8, averaging: u8) -> u16;

    /// Average `averaging` raw digital samples (0 or 1 = single sample).
    fn digital_read(&mut self, pin: u8, averaging: u8) -> bool;

    /// Microseconds since boot.
    fn micros(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (module → transport / logging)
// ───────────────────────────────────────────────────────────────

/// Fire-and-forget outbound channel for module events.
pub trait EventSink {
    fn send(&mut self, event: ModuleEvent);
}

// ───────────────────────────────────────────────────────────────
// Pulse counter port (quadrature hardware → encoder module)
// ───────────────────────────────────────────────────────────────

/// Signed pulse counter advanced by hardware edges between checks.
pub trait PulseCounter {
    /// Return the pulses counted since the last reset and zero the counter.
    fn read_and_reset(&mut self) -> i32;

    /// Zero the counter, discarding pending pulses.
    fn reset(&mut self);
}
