//! VR screen power switching.
//!
//! Each screen's control panel has a FET gate soldered across its power
//! button. `Toggle` presses all three buttons together for
//! `pulse_duration`, flipping every screen's power state without
//! disturbing the host PC's display layout.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::OutputClass;
use crate::config::ScreenConfig;
use crate::drivers::{OutputStatuses, Polarity, Pulse};
use crate::error::{ConfigError, ModuleError, ParameterError, Result};
use crate::module::params::decode_into;
use crate::module::{Io, Module, ModuleAddress, ModuleCore};

pub const MODULE_TYPE: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ScreenCommand {
    Toggle = 1,
}

impl ScreenCommand {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Toggle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ScreenStatus {
    OutputLocked = 51,
    On = 52,
    Off = 53,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenParameters {
    /// Microseconds the power buttons are held.
    pub pulse_duration: u32,
}

impl Default for ScreenParameters {
    fn default() -> Self {
        Self {
            pulse_duration: 1_000_000,
        }
    }
}

pub struct ScreenModule {
    core: ModuleCore,
    /// Left, center, right.
    pins: [u8; 3],
    polarity: Polarity,
    params: ScreenParameters,
}

impl ScreenModule {
    pub fn new(module_id: u8, config: ScreenConfig) -> core::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            core: ModuleCore::new(ModuleAddress::new(MODULE_TYPE, module_id)),
            pins: [config.left_pin, config.center_pin, config.right_pin],
            polarity: Polarity::active_high(config.normally_closed),
            params: ScreenParameters::default(),
        })
    }

    pub fn parameters(&self) -> &ScreenParameters {
        &self.params
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }
}

impl Module for ScreenModule {
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    fn setup(&mut self, io: &mut Io<'_>) -> Result<()> {
        self.core.reset();
        self.params = ScreenParameters::default();
        for &pin in &self.pins {
            io.board.configure_output(pin, self.polarity.off);
        }
        self.core.send(io, ScreenStatus::Off as u8);
        info!("{} screens on pins {:?} ready", self.core.address(), self.pins);
        Ok(())
    }

    fn apply_parameters(&mut self, bytes: &[u8]) -> core::result::Result<(), ParameterError> {
        decode_into(bytes, &mut self.params)
    }

    fn run_active_command(&mut self, io: &mut Io<'_>) -> Result<()> {
        let Some(code) = self.core.active_command() else {
            return Ok(());
        };
        match ScreenCommand::from_code(code) {
            Some(ScreenCommand::Toggle) => Pulse {
                pins: &self.pins,
                polarity: self.polarity,
                class: OutputClass::Actuator,
                duration_us: u64::from(self.params.pulse_duration),
                statuses: OutputStatuses {
                    locked: ScreenStatus::OutputLocked as u8,
                    on: Some(ScreenStatus::On as u8),
                    off: Some(ScreenStatus::Off as u8),
                },
            }
            .tick(&mut self.core, io),
            None => {
                warn!("{} unknown command {}", self.core.address(), code);
                return Err(ModuleError::UnknownCommand(code));
            }
        }
        Ok(())
    }
}
