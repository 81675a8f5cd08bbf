//! Wheel torque sensor behind a differential amplifier.
//!
//! The amplifier centres zero torque on a fixed ADC `baseline`. Readings
//! are rescaled into a magnitude (distance from the baseline) plus a
//! direction: below the baseline is clockwise, above is counter-clockwise,
//! optionally swapped by `invert_direction`.
//!
//! Filtering mirrors the lick sensor: a delta gate on the raw reading,
//! then a signal threshold on the magnitude with a debounced zero report.
//! Zero torque is always reported with the CCW status.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::InputPull;
use crate::config::TorqueConfig;
use crate::error::{ConfigError, ModuleError, ParameterError, Result};
use crate::events::Payload;
use crate::module::params::decode_into;
use crate::module::{Io, Module, ModuleAddress, ModuleCore};
use crate::sensors::ChangeFilter;

pub const MODULE_TYPE: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TorqueCommand {
    CheckState = 1,
}

impl TorqueCommand {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::CheckState),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TorqueStatus {
    Ccw = 51,
    Cw = 52,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorqueParameters {
    pub report_ccw: bool,
    pub report_cw: bool,
    /// Smallest magnitude reported as torque.
    pub signal_threshold: u16,
    /// Smallest raw change from the last accepted reading worth reporting.
    pub delta_threshold: u16,
    pub average_pool_size: u8,
}

impl Default for TorqueParameters {
    fn default() -> Self {
        Self {
            report_ccw: true,
            report_cw: true,
            signal_threshold: 100,
            delta_threshold: 70,
            average_pool_size: 5,
        }
    }
}

/// Direction and magnitude of one reading relative to the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Torque {
    pub clockwise: bool,
    pub magnitude: u16,
}

/// Rescale a raw reading around `baseline`. The magnitude never exceeds
/// `baseline`, whichever side of it the reading falls on.
pub fn rescale(signal: u16, baseline: u16, invert_direction: bool) -> Torque {
    if signal == baseline {
        return Torque {
            clockwise: false,
            magnitude: 0,
        };
    }
    Torque {
        clockwise: (signal < baseline) ^ invert_direction,
        magnitude: signal.abs_diff(baseline).min(baseline),
    }
}

pub struct TorqueModule {
    core: ModuleCore,
    config: TorqueConfig,
    params: TorqueParameters,
    filter: ChangeFilter,
}

impl TorqueModule {
    pub fn new(module_id: u8, config: TorqueConfig) -> core::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            core: ModuleCore::new(ModuleAddress::new(MODULE_TYPE, module_id)),
            filter: ChangeFilter::new(config.baseline),
            config,
            params: TorqueParameters::default(),
        })
    }

    pub fn parameters(&self) -> &TorqueParameters {
        &self.params
    }

    fn check_state(&mut self, io: &mut Io<'_>) {
        let signal = io
            .board
            .analog_read(self.config.pin, self.params.average_pool_size);
        if !self.filter.accept(signal, self.params.delta_threshold) {
            self.core.complete();
            return;
        }

        let torque = rescale(signal, self.config.baseline, self.config.invert_direction);
        if torque.magnitude < self.params.signal_threshold {
            if self.filter.take_zero() {
                self.core
                    .send_value(io, TorqueStatus::Ccw as u8, Payload::U16(0));
            }
        } else {
            let status = match (torque.clockwise, self.params.report_cw, self.params.report_ccw) {
                (true, true, _) => Some(TorqueStatus::Cw),
                (false, _, true) => Some(TorqueStatus::Ccw),
                _ => None,
            };
            if let Some(status) = status {
                self.core
                    .send_value(io, status as u8, Payload::U16(torque.magnitude));
            }
            self.filter.mark_signal();
        }
        self.core.complete();
    }
}

impl Module for TorqueModule {
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    fn setup(&mut self, io: &mut Io<'_>) -> Result<()> {
        self.core.reset();
        self.params = TorqueParameters::default();
        self.filter = ChangeFilter::new(self.config.baseline);
        io.board.configure_input(self.config.pin, InputPull::Floating);
        self.core
            .send_value(io, TorqueStatus::Ccw as u8, Payload::U16(0));
        info!(
            "{} torque sensor on pin {} ready (baseline {})",
            self.core.address(),
            self.config.pin,
            self.config.baseline
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
        match TorqueCommand::from_code(code) {
            Some(TorqueCommand::CheckState) => self.check_state(io),
            None => {
                warn!("{} unknown command {}", self.core.address(), code);
                return Err(ModuleError::UnknownCommand(code));
            }
        }
        Ok(())
    }
}
