//! Piezo buzzer behind a FET gate.
//!
//! Loud (80 – 90 dB at full supply); usually paired with the reward valve
//! to give auditory feedback on delivery.

use embedded_hal::digital::PinState;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::OutputClass;
use crate::config::SpeakerConfig;
use crate::drivers::{OutputStatuses, Polarity, Pulse, toggle};
use crate::error::{ConfigError, ModuleError, ParameterError, Result};
use crate::module::params::decode_into;
use crate::module::{Io, Module, ModuleAddress, ModuleCore};

pub const MODULE_TYPE: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SpeakerCommand {
    SendPulse = 1,
    ToggleOn = 2,
    ToggleOff = 3,
}

impl SpeakerCommand {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::SendPulse),
            2 => Some(Self::ToggleOn),
            3 => Some(Self::ToggleOff),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SpeakerStatus {
    OutputLocked = 51,
    On = 52,
    Off = 53,
}

const STATUSES: OutputStatuses = OutputStatuses {
    locked: SpeakerStatus::OutputLocked as u8,
    on: Some(SpeakerStatus::On as u8),
    off: Some(SpeakerStatus::Off as u8),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerParameters {
    /// Microseconds the tone sounds during a pulse.
    pub pulse_duration: u32,
}

impl Default for SpeakerParameters {
    fn default() -> Self {
        Self {
            pulse_duration: 100_000,
        }
    }
}

pub struct SpeakerModule {
    core: ModuleCore,
    config: SpeakerConfig,
    params: SpeakerParameters,
}

impl SpeakerModule {
    pub fn new(module_id: u8, config: SpeakerConfig) -> core::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            core: ModuleCore::new(ModuleAddress::new(MODULE_TYPE, module_id)),
            config,
            params: SpeakerParameters::default(),
        })
    }

    pub fn parameters(&self) -> &SpeakerParameters {
        &self.params
    }
}

impl Module for SpeakerModule {
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    fn setup(&mut self, io: &mut Io<'_>) -> Result<()> {
        self.core.reset();
        self.params = SpeakerParameters::default();
        if self.config.start_off {
            io.board.configure_output(self.config.pin, PinState::Low);
            self.core.send(io, SpeakerStatus::Off as u8);
        } else {
            io.board.configure_output(self.config.pin, PinState::High);
            self.core.send(io, SpeakerStatus::On as u8);
        }
        info!("{} speaker on pin {} ready", self.core.address(), self.config.pin);
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
        match SpeakerCommand::from_code(code) {
            Some(SpeakerCommand::SendPulse) => Pulse {
                pins: &pin,
                polarity: Polarity::active_high(true),
                class: OutputClass::Actuator,
                duration_us: u64::from(self.params.pulse_duration),
                statuses: STATUSES,
            }
            .tick(&mut self.core, io),
            Some(SpeakerCommand::ToggleOn) => toggle(
                &mut self.core,
                io,
                &pin,
                PinState::High,
                OutputClass::Actuator,
                STATUSES.on,
                STATUSES.locked,
            ),
            Some(SpeakerCommand::ToggleOff) => toggle(
                &mut self.core,
                io,
                &pin,
                PinState::Low,
                OutputClass::Actuator,
                STATUSES.off,
                STATUSES.locked,
            ),
            None => {
                warn!("{} unknown command {}", self.core.address(), code);
                return Err(ModuleError::UnknownCommand(code));
            }
        }
        Ok(())
    }
}
