//! Conductive lick sensor.
//!
//! The tongue closes a small current loop, so the analog reading jumps
//! well above the noise floor while the animal is in contact with the
//! spout. Only significant changes are reported; repeated sub-threshold
//! noise collapses into one `Changed(0)`.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::InputPull;
use crate::config::LickConfig;
use crate::error::{ConfigError, ModuleError, ParameterError, Result};
use crate::events::Payload;
use crate::module::params::decode_into;
use crate::module::{Io, Module, ModuleAddress, ModuleCore};
use crate::sensors::ChangeFilter;

pub const MODULE_TYPE: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LickCommand {
    CheckState = 1,
}

impl LickCommand {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::CheckState),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LickStatus {
    Changed = 51,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LickParameters {
    /// Lowest reading reported as contact.
    pub signal_threshold: u16,
    /// Smallest change from the last accepted reading worth reporting.
    pub delta_threshold: u16,
    pub average_pool_size: u8,
}

impl Default for LickParameters {
    fn default() -> Self {
        Self {
            signal_threshold: 200,
            delta_threshold: 180,
            average_pool_size: 0,
        }
    }
}

pub struct LickModule {
    core: ModuleCore,
    config: LickConfig,
    params: LickParameters,
    filter: ChangeFilter,
}

impl LickModule {
    pub fn new(module_id: u8, config: LickConfig) -> core::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            core: ModuleCore::new(ModuleAddress::new(MODULE_TYPE, module_id)),
            config,
            params: LickParameters::default(),
            filter: ChangeFilter::new(0),
        })
    }

    pub fn parameters(&self) -> &LickParameters {
        &self.params
    }

    fn check_state(&mut self, io: &mut Io<'_>) {
        let signal = io
            .board
            .analog_read(self.config.pin, self.params.average_pool_size);
        if self.filter.accept(signal, self.params.delta_threshold) {
            if signal >= self.params.signal_threshold {
                self.core
                    .send_value(io, LickStatus::Changed as u8, Payload::U16(signal));
                self.filter.mark_signal();
            } else if self.filter.take_zero() {
                self.core
                    .send_value(io, LickStatus::Changed as u8, Payload::U16(0));
            }
        }
        self.core.complete();
    }
}

impl Module for LickModule {
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    fn setup(&mut self, io: &mut Io<'_>) -> Result<()> {
        self.core.reset();
        self.params = LickParameters::default();
        self.filter = ChangeFilter::new(0);
        io.board.configure_input(self.config.pin, InputPull::Down);
        if self.config.announce_initial_state {
            self.core
                .send_value(io, LickStatus::Changed as u8, Payload::U16(0));
        }
        info!("{} lick sensor on pin {} ready", self.core.address(), self.config.pin);
        Ok(())
    }

    fn apply_parameters(&mut self, bytes: &[u8]) -> core::result::Result<(), ParameterError> {
        decode_into(bytes, &mut self.params)
    }

    fn run_active_command(&mut self, io: &mut Io<'_>) -> Result<()> {
        let Some(code) = self.core.active_command() else {
            return Ok(());
        };
        match LickCommand::from_code(code) {
            Some(LickCommand::CheckState) => self.check_state(io),
            None => {
                warn!("{} unknown command {}", self.core.address(), code);
                return Err(ModuleError::UnknownCommand(code));
            }
        }
        Ok(())
    }
}
