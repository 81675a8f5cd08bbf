//! TTL line to or from another instrument.
//!
//! An instance is statically either an output (pulse / toggle) or an
//! input (edge notification). Commands for the other role are refused
//! with `InvalidPinMode` without touching the pin.

use embedded_hal::digital::PinState;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{InputPull, OutputClass};
use crate::config::{TtlConfig, TtlRole};
use crate::drivers::{OutputStatuses, Polarity, Pulse, toggle};
use crate::error::{ConfigError, ModuleError, ParameterError, Result};
use crate::module::params::decode_into;
use crate::module::{Io, Module, ModuleAddress, ModuleCore};

pub const MODULE_TYPE: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TtlCommand {
    SendPulse = 1,
    ToggleOn = 2,
    ToggleOff = 3,
    CheckState = 4,
}

impl TtlCommand {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::SendPulse),
            2 => Some(Self::ToggleOn),
            3 => Some(Self::ToggleOff),
            4 => Some(Self::CheckState),
            _ => None,
        }
    }

    /// Role this command requires.
    pub fn role(self) -> TtlRole {
        match self {
            Self::CheckState => TtlRole::Input,
            _ => TtlRole::Output,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TtlStatus {
    OutputLocked = 51,
    InputOn = 52,
    InputOff = 53,
    InvalidPinMode = 54,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlParameters {
    /// Microseconds the line is held HIGH during a pulse.
    pub pulse_duration: u32,
    /// Digital samples averaged per check (0 or 1 = single read).
    pub average_pool_size: u8,
}

impl Default for TtlParameters {
    fn default() -> Self {
        Self {
            pulse_duration: 10_000,
            average_pool_size: 0,
        }
    }
}

pub struct TtlModule {
    core: ModuleCore,
    config: TtlConfig,
    params: TtlParameters,
    /// Last level reported by `CheckState`.
    last_level: bool,
}

impl TtlModule {
    pub fn new(module_id: u8, config: TtlConfig) -> core::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            core: ModuleCore::new(ModuleAddress::new(MODULE_TYPE, module_id)),
            config,
            params: TtlParameters::default(),
            last_level: false,
        })
    }

    pub fn parameters(&self) -> &TtlParameters {
        &self.params
    }

    pub fn role(&self) -> TtlRole {
        self.config.role
    }

    fn check_state(&mut self, io: &mut Io<'_>) {
        let level = io
            .board
            .digital_read(self.config.pin, self.params.average_pool_size);
        if level != self.last_level {
            self.last_level = level;
            let status = if level {
                TtlStatus::InputOn
            } else {
                TtlStatus::InputOff
            };
            self.core.send(io, status as u8);
        }
        self.core.complete();
    }
}

impl Module for TtlModule {
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    fn setup(&mut self, io: &mut Io<'_>) -> Result<()> {
        self.core.reset();
        self.params = TtlParameters::default();
        self.last_level = false;
        match self.config.role {
            TtlRole::Output => io
                .board
                .configure_output(self.config.pin, PinState::from(self.config.start_on)),
            TtlRole::Input => io.board.configure_input(self.config.pin, InputPull::Floating),
        }
        info!(
            "{} ttl {:?} on pin {} ready",
            self.core.address(),
            self.config.role,
            self.config.pin
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
        let Some(command) = TtlCommand::from_code(code) else {
            warn!("{} unknown command {}", self.core.address(), code);
            return Err(ModuleError::UnknownCommand(code));
        };
        if command.role() != self.config.role {
            self.core.reject(io, TtlStatus::InvalidPinMode as u8);
            return Ok(());
        }

        let pin = [self.config.pin];
        let locked = TtlStatus::OutputLocked as u8;
        match command {
            TtlCommand::SendPulse => Pulse {
                pins: &pin,
                polarity: Polarity::active_high(true),
                class: OutputClass::Ttl,
                duration_us: u64::from(self.params.pulse_duration),
                statuses: OutputStatuses {
                    locked,
                    on: None,
                    off: None,
                },
            }
            .tick(&mut self.core, io),
            TtlCommand::ToggleOn => toggle(
                &mut self.core,
                io,
                &pin,
                PinState::High,
                OutputClass::Ttl,
                None,
                locked,
            ),
            TtlCommand::ToggleOff => toggle(
                &mut self.core,
                io,
                &pin,
                PinState::Low,
                OutputClass::Ttl,
                None,
                locked,
            ),
            TtlCommand::CheckState => self.check_state(io),
        }
        Ok(())
    }
}
