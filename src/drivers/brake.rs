//! Running-wheel brake driven through a PWM-capable FET gate.
//!
//! Supports normally-engaged and normally-disengaged brakes. The logical
//! surface is the same for both: `ToggleOn` always engages at full
//! strength, `ToggleOff` always releases, and a breaking strength of 255
//! always means maximum braking.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::OutputClass;
use crate::config::BrakeConfig;
use crate::drivers::{Polarity, toggle};
use crate::error::{ConfigError, ModuleError, ParameterError, PwmError, Result};
use crate::module::params::decode_into;
use crate::module::{Io, Module, ModuleAddress, ModuleCore};

pub const MODULE_TYPE: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BrakeCommand {
    ToggleOn = 1,
    ToggleOff = 2,
    /// Engage at `breaking_strength` through PWM.
    SetBreakingPower = 3,
}

impl BrakeCommand {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::ToggleOn),
            2 => Some(Self::ToggleOff),
            3 => Some(Self::SetBreakingPower),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BrakeStatus {
    OutputLocked = 51,
    /// The brake pin could not be given a PWM channel.
    PwmUnavailable = 52,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrakeParameters {
    /// 0 = released, 255 = maximum braking.
    pub breaking_strength: u8,
}

impl Default for BrakeParameters {
    fn default() -> Self {
        Self {
            breaking_strength: 128,
        }
    }
}

pub struct BrakeModule {
    core: ModuleCore,
    config: BrakeConfig,
    /// `on` engages the brake.
    polarity: Polarity,
    params: BrakeParameters,
}

impl BrakeModule {
    pub fn new(module_id: u8, config: BrakeConfig) -> core::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            core: ModuleCore::new(ModuleAddress::new(MODULE_TYPE, module_id)),
            // A normally-engaged brake is released by powering it.
            polarity: Polarity::active_high(!config.normally_engaged),
            config,
            params: BrakeParameters::default(),
        })
    }

    pub fn parameters(&self) -> &BrakeParameters {
        &self.params
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// PWM duty producing `strength`, accounting for wiring.
    pub fn duty_for(&self, strength: u8) -> u8 {
        if self.config.normally_engaged {
            u8::MAX - strength
        } else {
            strength
        }
    }

    fn set_breaking_power(&mut self, io: &mut Io<'_>) {
        let duty = self.duty_for(self.params.breaking_strength);
        match io
            .board
            .analog_write(self.config.pin, duty, OutputClass::Actuator)
        {
            Ok(()) => self.core.complete(),
            Err(PwmError::Locked) => self.core.reject(io, BrakeStatus::OutputLocked as u8),
            Err(PwmError::Unavailable) => {
                self.core.reject(io, BrakeStatus::PwmUnavailable as u8);
            }
        }
    }
}

impl Module for BrakeModule {
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    fn setup(&mut self, io: &mut Io<'_>) -> Result<()> {
        self.core.reset();
        self.params = BrakeParameters::default();
        io.board.configure_output(
            self.config.pin,
            self.polarity.level(self.config.start_engaged),
        );
        info!(
            "{} brake on pin {} ready (engaged: {})",
            self.core.address(),
            self.config.pin,
            self.config.start_engaged
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
        let pin = [self.config.pin];
        let locked = BrakeStatus::OutputLocked as u8;
        match BrakeCommand::from_code(code) {
            Some(BrakeCommand::ToggleOn) => toggle(
                &mut self.core,
                io,
                &pin,
                self.polarity.on,
                OutputClass::Actuator,
                None,
                locked,
            ),
            Some(BrakeCommand::ToggleOff) => toggle(
                &mut self.core,
                io,
                &pin,
                self.polarity.off,
                OutputClass::Actuator,
                None,
                locked,
            ),
            Some(BrakeCommand::SetBreakingPower) => self.set_breaking_power(io),
            None => {
                warn!("{} unknown command {}", self.core.address(), code);
                return Err(ModuleError::UnknownCommand(code));
            }
        }
        Ok(())
    }
}
