//! Actuator modules and the pin-level primitives behind them.
//!
//! Every actuator resolves its physical "on" and "off" levels from a
//! wiring polarity once at construction, so the logical commands behave
//! the same regardless of how the relay or valve is wired.

pub mod brake;
pub mod hw_init;
pub mod screen;
pub mod speaker;
pub mod ttl;
pub mod valve;

use embedded_hal::digital::PinState;

use crate::app::ports::{Board, OutputClass};
use crate::error::OutputLocked;
use crate::module::{Io, ModuleCore};

// ---------------------------------------------------------------------------
// Polarity
// ---------------------------------------------------------------------------

/// Physical levels for the logical on/off states of one output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Polarity {
    pub on: PinState,
    pub off: PinState,
}

impl Polarity {
    /// `on` is HIGH when `active_high`, LOW otherwise.
    pub const fn active_high(active_high: bool) -> Self {
        if active_high {
            Self {
                on: PinState::High,
                off: PinState::Low,
            }
        } else {
            Self {
                on: PinState::Low,
                off: PinState::High,
            }
        }
    }

    pub const fn level(&self, on: bool) -> PinState {
        if on { self.on } else { self.off }
    }
}

// ---------------------------------------------------------------------------
// Pulse stages
// ---------------------------------------------------------------------------

/// Stage numbers shared by the pulse handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PulseStage {
    /// Drive the "on" level.
    Engage = 1,
    /// Wait out the pulse duration.
    Hold = 2,
    /// Drive the "off" level.
    Release = 3,
    /// Keep a coupled tone going for the rest of its duration.
    ToneHold = 4,
    /// Silence the coupled tone.
    ToneRelease = 5,
}

impl PulseStage {
    pub fn from_stage(stage: u8) -> Option<Self> {
        match stage {
            1 => Some(Self::Engage),
            2 => Some(Self::Hold),
            3 => Some(Self::Release),
            4 => Some(Self::ToneHold),
            5 => Some(Self::ToneRelease),
            _ => None,
        }
    }

    pub fn of(core: &ModuleCore) -> Option<Self> {
        Self::from_stage(core.stage())
    }
}

// ---------------------------------------------------------------------------
// Shared output sequences
// ---------------------------------------------------------------------------

/// Drive every pin in `pins` to `level`, in order, stopping at the first
/// rejected write.
pub(crate) fn drive_all(
    board: &mut dyn Board,
    pins: &[u8],
    level: PinState,
    class: OutputClass,
) -> Result<(), OutputLocked> {
    pins.iter()
        .try_for_each(|&pin| board.digital_write(pin, level, class))
}

/// Status codes a simple output reports.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OutputStatuses {
    pub locked: u8,
    pub on: Option<u8>,
    pub off: Option<u8>,
}

/// A three-stage on / hold / off pulse over one or more pins.
pub(crate) struct Pulse<'p> {
    pub pins: &'p [u8],
    pub polarity: Polarity,
    pub class: OutputClass,
    pub duration_us: u64,
    pub statuses: OutputStatuses,
}

impl Pulse<'_> {
    /// Run as many stages as the clock allows this tick.
    pub(crate) fn tick(&self, core: &mut ModuleCore, io: &mut Io<'_>) {
        while let Some(stage) = PulseStage::of(core) {
            match stage {
                PulseStage::Engage => {
                    if drive_all(io.board, self.pins, self.polarity.on, self.class).is_err() {
                        core.reject(io, self.statuses.locked);
                        return;
                    }
                    if let Some(status) = self.statuses.on {
                        core.send(io, status);
                    }
                    core.advance(io);
                }
                PulseStage::Hold => {
                    if !core.wait_micros(io, self.duration_us) {
                        return;
                    }
                    core.advance(io);
                }
                PulseStage::Release => {
                    if drive_all(io.board, self.pins, self.polarity.off, self.class).is_err() {
                        core.reject(io, self.statuses.locked);
                        return;
                    }
                    if let Some(status) = self.statuses.off {
                        core.send(io, status);
                    }
                    core.complete();
                    return;
                }
                PulseStage::ToneHold | PulseStage::ToneRelease => return,
            }
        }
    }
}

/// Single-stage write: drive `level`, report `status`, complete.
pub(crate) fn toggle(
    core: &mut ModuleCore,
    io: &mut Io<'_>,
    pins: &[u8],
    level: PinState,
    class: OutputClass,
    status: Option<u8>,
    locked_status: u8,
) {
    if drive_all(io.board, pins, level, class).is_err() {
        core.reject(io, locked_status);
        return;
    }
    if let Some(status) = status {
        core.send(io, status);
    }
    core.complete();
}
