//! Sensor modules and the filters they share.
//!
//! Sensors are single-shot: each `CheckState` reads, filters, reports at
//! most one event and completes within the same tick. Filter memory lives
//! in the module instance and only changes on a report decision.

pub mod analog;
pub mod encoder;
pub mod lick;
pub mod quadrature;
pub mod torque;

/// Delta gate plus zero debounce for analog sensors.
///
/// A sample only gets past the gate when it differs from the last
/// accepted sample by more than the delta threshold; the accepted sample
/// then becomes the new reference. Sub-threshold readings collapse into a
/// single zero report until a real signal is seen again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeFilter {
    previous: u16,
    last_was_zero: bool,
}

impl ChangeFilter {
    pub const fn new(reference: u16) -> Self {
        Self {
            previous: reference,
            last_was_zero: false,
        }
    }

    /// True (and `sample` becomes the reference) when the sample moved by
    /// more than `delta_threshold` since the last accepted sample.
    pub fn accept(&mut self, sample: u16, delta_threshold: u16) -> bool {
        if sample.abs_diff(self.previous) <= delta_threshold {
            return false;
        }
        self.previous = sample;
        true
    }

    /// True the first time a zero is due after a non-zero report.
    pub fn take_zero(&mut self) -> bool {
        if self.last_was_zero {
            return false;
        }
        self.last_was_zero = true;
        true
    }

    /// Record that a non-zero value was reported.
    pub fn mark_signal(&mut self) {
        self.last_was_zero = false;
    }

    pub fn reference(&self) -> u16 {
        self.previous
    }
}
