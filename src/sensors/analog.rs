//! Generic analog threshold sensor.
//!
//! Reports every averaged reading above the threshold and stays silent
//! otherwise. Unlike the lick sensor there is no delta gate and no zero
//! debounce: consumers get a dense stream while the signal is high.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::InputPull;
use crate::config::AnalogConfig;
use crate::error::{ConfigError, ModuleError, ParameterError, Result};
use crate::events::Payload;
use crate::module::params::decode_into;
use crate::module::{Io, Module, ModuleAddress, ModuleCore};

pub const MODULE_TYPE: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AnalogCommand {
    CheckState = 1,
}

impl AnalogCommand {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::CheckState),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AnalogStatus {
    Changed = 51,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalogParameters {
    /// Readings strictly above this are reported.
    pub signal_threshold: u16,
    pub average_pool_size: u8,
}

impl Default for AnalogParameters {
    fn default() -> Self {
        Self {
            signal_threshold: 100,
            average_pool_size: 5,
        }
    }
}

pub struct AnalogModule {
    core: ModuleCore,
    config: AnalogConfig,
    params: AnalogParameters,
}

impl AnalogModule {
    pub fn new(module_id: u8, config: AnalogConfig) -> core::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            core: ModuleCore::new(ModuleAddress::new(MODULE_TYPE, module_id)),
            config,
            params: AnalogParameters::default(),
        })
    }

    pub fn parameters(&self) -> &AnalogParameters {
        &self.params
    }

    fn check_state(&mut self, io: &mut Io<'_>) {
        let signal = io
            .board
            .analog_read(self.config.pin, self.params.average_pool_size);
        if signal > self.params.signal_threshold {
            self.core
                .send_value(io, AnalogStatus::Changed as u8, Payload::U16(signal));
        }
        self.core.complete();
    }
}

impl Module for AnalogModule {
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    fn setup(&mut self, io: &mut Io<'_>) -> Result<()> {
        self.core.reset();
        self.params = AnalogParameters::default();
        io.board.configure_input(self.config.pin, InputPull::Floating);
        self.core
            .send_value(io, AnalogStatus::Changed as u8, Payload::U16(0));
        info!("{} analog sensor on pin {} ready", self.core.address(), self.config.pin);
        Ok(())
    }

    fn apply_parameters(&mut self, bytes: &[u8]) -> core::result::Result<(), ParameterError> {
        decode_into(bytes, &mut self.params)
    }

    fn run_active_command(&mut self, io: &mut Io<'_>) -> Result<()> {
        let Some(code) = self.core.active_command() else {
            return Ok(());
        };
        match AnalogCommand::from_code(code) {
            Some(AnalogCommand::CheckState) => self.check_state(io),
            None => {
                warn!("{} unknown command {}", self.core.address(), code);
                return Err(ModuleError::UnknownCommand(code));
            }
        }
        Ok(())
    }
}
