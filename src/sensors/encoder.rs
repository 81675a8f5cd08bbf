//! Quadrature rotary encoder on the running wheel.
//!
//! Hardware edges advance a [`PulseCounter`] between checks. Each
//! `CheckState` drains the counter into a signed overflow accumulator and
//! reports once the accumulated displacement exceeds `delta_threshold`.
//!
//! ## Amortization
//!
//! Motion in a reported direction accumulates freely. Motion in a
//! direction that is not reported still accumulates, but is clamped so
//! the accumulator never sits further than `delta_threshold` into that
//! direction. Wheel jitter can therefore never bank a large debt that
//! real motion in the reported direction would first have to cancel.
//!
//! Positive counts are counter-clockwise, negative counts clockwise.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{InputPull, PulseCounter};
use crate::config::EncoderConfig;
use crate::error::{ConfigError, ModuleError, ParameterError, Result};
use crate::events::Payload;
use crate::module::params::decode_into;
use crate::module::{Io, Module, ModuleAddress, ModuleCore};

pub const MODULE_TYPE: u8 = 2;

/// Index revolutions averaged by the PPR estimate.
pub const PPR_REVOLUTIONS: u32 = 10;
/// Pause before waiting for each index pulse, so the same pulse is not
/// seen twice.
pub const PPR_SETTLE_MS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EncoderCommand {
    CheckState = 1,
    /// Zero the pulse counter.
    Reset = 2,
    /// Blocking: estimate pulses per revolution from the index channel.
    GetPpr = 3,
}

impl EncoderCommand {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::CheckState),
            2 => Some(Self::Reset),
            3 => Some(Self::GetPpr),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EncoderStatus {
    RotatedCcw = 51,
    RotatedCw = 52,
    Ppr = 53,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderParameters {
    pub report_ccw: bool,
    pub report_cw: bool,
    /// Displacement, in pulses, that must be exceeded before a report.
    pub delta_threshold: u32,
}

impl Default for EncoderParameters {
    fn default() -> Self {
        Self {
            report_ccw: true,
            report_cw: true,
            delta_threshold: 15,
        }
    }
}

/// A reported displacement, in pulses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Ccw(u32),
    Cw(u32),
}

impl Rotation {
    pub fn magnitude(self) -> u32 {
        match self {
            Self::Ccw(m) | Self::Cw(m) => m,
        }
    }
}

/// Signed displacement accumulator with bounded amortization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Amortizer {
    overflow: i32,
}

impl Amortizer {
    pub fn overflow(&self) -> i32 {
        self.overflow
    }

    pub fn reset(&mut self) {
        self.overflow = 0;
    }

    /// Add one check's motion; returns the rotation to report, if any.
    pub fn push(&mut self, motion: i32, params: &EncoderParameters) -> Option<Rotation> {
        if motion == 0 {
            return None;
        }
        let limit = i32::try_from(params.delta_threshold).unwrap_or(i32::MAX);
        let reportable = if motion < 0 {
            params.report_cw
        } else {
            params.report_ccw
        };

        self.overflow = self.overflow.saturating_add(motion);
        if !reportable {
            self.overflow = if motion < 0 {
                self.overflow.max(-limit)
            } else {
                self.overflow.min(limit)
            };
        }

        let magnitude = self.overflow.unsigned_abs();
        if magnitude <= params.delta_threshold {
            return None;
        }
        let rotation = if self.overflow < 0 {
            Rotation::Cw(magnitude)
        } else {
            Rotation::Ccw(magnitude)
        };
        self.overflow = 0;
        Some(rotation)
    }
}

pub struct EncoderModule<C: PulseCounter> {
    core: ModuleCore,
    config: EncoderConfig,
    counter: C,
    params: EncoderParameters,
    amortizer: Amortizer,
}

impl<C: PulseCounter> EncoderModule<C> {
    pub fn new(
        module_id: u8,
        config: EncoderConfig,
        counter: C,
    ) -> core::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            core: ModuleCore::new(ModuleAddress::new(MODULE_TYPE, module_id)),
            config,
            counter,
            params: EncoderParameters::default(),
            amortizer: Amortizer::default(),
        })
    }

    pub fn parameters(&self) -> &EncoderParameters {
        &self.params
    }

    /// Accumulated, not yet reported displacement.
    pub fn overflow(&self) -> i32 {
        self.amortizer.overflow()
    }

    fn read_motion(&mut self) -> i32 {
        let raw = self.counter.read_and_reset();
        if self.config.invert_direction {
            raw.saturating_neg()
        } else {
            raw
        }
    }

    fn check_state(&mut self, io: &mut Io<'_>) {
        let motion = self.read_motion();
        match self.amortizer.push(motion, &self.params) {
            Some(Rotation::Ccw(m)) => {
                self.core
                    .send_value(io, EncoderStatus::RotatedCcw as u8, Payload::U32(m));
            }
            Some(Rotation::Cw(m)) => {
                self.core
                    .send_value(io, EncoderStatus::RotatedCw as u8, Payload::U32(m));
            }
            None => {}
        }
        self.core.complete();
    }

    fn reset_counter(&mut self) {
        self.counter.reset();
        self.core.complete();
    }

    /// Spin until the index channel reads HIGH.
    fn wait_for_index(&self, io: &mut Io<'_>) {
        while !io.board.digital_read(self.config.pin_x, 0) {
            core::hint::spin_loop();
        }
    }

    /// Blocks the whole loop for roughly ten revolutions.
    fn estimate_ppr(&mut self, io: &mut Io<'_>) {
        info!("{} estimating PPR over {} revolutions", self.core.address(), PPR_REVOLUTIONS);
        self.wait_for_index(io);
        self.counter.reset();

        let mut total: u32 = 0;
        for _ in 0..PPR_REVOLUTIONS {
            io.board.delay_ms(PPR_SETTLE_MS);
            self.wait_for_index(io);
            total = total.saturating_add(self.counter.read_and_reset().unsigned_abs());
        }

        let average = total.saturating_add(PPR_REVOLUTIONS / 2) / PPR_REVOLUTIONS;
        let ppr = u16::try_from(average).unwrap_or(u16::MAX);
        info!("{} PPR estimate {}", self.core.address(), ppr);
        self.core
            .send_value(io, EncoderStatus::Ppr as u8, Payload::U16(ppr));
        self.core.complete();
    }
}

impl<C: PulseCounter> Module for EncoderModule<C> {
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    fn setup(&mut self, io: &mut Io<'_>) -> Result<()> {
        self.core.reset();
        self.params = EncoderParameters::default();
        io.board.configure_input(self.config.pin_a, InputPull::Up);
        io.board.configure_input(self.config.pin_b, InputPull::Up);
        io.board.configure_input(self.config.pin_x, InputPull::Floating);
        self.counter.reset();
        self.amortizer.reset();
        // Direction is meaningless for the zero announcement.
        self.core
            .send_value(io, EncoderStatus::RotatedCw as u8, Payload::U32(0));
        info!(
            "{} encoder on pins A{} B{} X{} ready",
            self.core.address(),
            self.config.pin_a,
            self.config.pin_b,
            self.config.pin_x
        );
        Ok(())
    }

    fn apply_parameters(&mut self, bytes: &[u8]) -> core::result::Result<(), ParameterError> {
        decode_into(bytes, &mut self.params)
    }

    fn run_active_command(&mut self, io: &mut Io<'_>) -> Result<()> {
        let Some(code) = self.core.active_command() else {
            return Ok(());
        };
        match EncoderCommand::from_code(code) {
            Some(EncoderCommand::CheckState) => self.check_state(io),
            Some(EncoderCommand::Reset) => self.reset_counter(),
            Some(EncoderCommand::GetPpr) => self.estimate_ppr(io),
            None => {
                warn!("{} unknown command {}", self.core.address(), code);
                return Err(ModuleError::UnknownCommand(code));
            }
        }
        Ok(())
    }
}
