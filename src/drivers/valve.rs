//! Solenoid reward valve with an optional coupled piezo tone.
//!
//! The valve gate is a single digital output. Opening the valve for a
//! precise number of microseconds dispenses a precise fluid volume, so
//! the pulse is staged against the clock rather than slept.
//!
//! ## Tone coupling
//!
//! When a tone pin is configured, a valve pulse also switches the tone on
//! and keeps it sounding for `tone_duration` measured from the moment the
//! valve opened:
//!
//! ```text
//! stage   1        2              3        4                    5
//! valve   open ──── hold pulse ── close
//! tone    on  ─────────────────────────── hold remaining ────── off
//! ```
//!
//! If `tone_duration` is shorter than `pulse_duration` the remaining hold
//! saturates to zero and the tone stops right after the valve closes.

use embedded_hal::digital::PinState;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::OutputClass;
use crate::config::ValveConfig;
use crate::drivers::{OutputStatuses, Polarity, Pulse, PulseStage, toggle};
use crate::error::{ConfigError, ModuleError, ParameterError, Result};
use crate::module::params::decode_into;
use crate::module::{Io, Module, ModuleAddress, ModuleCore};

/// Module family code.
pub const MODULE_TYPE: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValveCommand {
    /// Open for `pulse_duration`, then close.
    SendPulse = 1,
    /// Open and stay open.
    ToggleOn = 2,
    /// Close and stay closed.
    ToggleOff = 3,
    /// Blocking: pulse `calibration_count` times.
    Calibrate = 4,
    /// Sound the tone for `tone_duration` without moving the valve.
    TonePulse = 5,
}

impl ValveCommand {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::SendPulse),
            2 => Some(Self::ToggleOn),
            3 => Some(Self::ToggleOff),
            4 => Some(Self::Calibrate),
            5 => Some(Self::TonePulse),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValveStatus {
    OutputLocked = 51,
    Open = 52,
    Closed = 53,
    Calibrated = 54,
    ToneOn = 55,
    ToneOff = 56,
    TonePinNotSet = 57,
}

/// Operator-tunable valve timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValveParameters {
    /// Microseconds the valve stays open during a pulse.
    pub pulse_duration: u32,
    /// Microseconds between calibration pulses.
    pub calibration_delay: u32,
    pub calibration_count: u16,
    /// Microseconds the tone sounds, measured from valve opening.
    pub tone_duration: u32,
}

impl Default for ValveParameters {
    fn default() -> Self {
        Self {
            pulse_duration: 35_590,
            calibration_delay: 200_000,
            calibration_count: 500,
            tone_duration: 300_000,
        }
    }
}

pub struct ValveModule {
    core: ModuleCore,
    config: ValveConfig,
    polarity: Polarity,
    params: ValveParameters,
}

impl ValveModule {
    pub fn new(module_id: u8, config: ValveConfig) -> core::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            core: ModuleCore::new(ModuleAddress::new(MODULE_TYPE, module_id)),
            // Powering a normally-closed valve opens it.
            polarity: Polarity::active_high(config.normally_closed),
            config,
            params: ValveParameters::default(),
        })
    }

    pub fn parameters(&self) -> &ValveParameters {
        &self.params
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    fn write_valve(&mut self, io: &mut Io<'_>, open: bool) -> bool {
        let level = self.polarity.level(open);
        if io
            .board
            .digital_write(self.config.pin, level, OutputClass::Actuator)
            .is_err()
        {
            self.core.reject(io, ValveStatus::OutputLocked as u8);
            return false;
        }
        true
    }

    fn write_tone(&mut self, io: &mut Io<'_>, tone_pin: u8, on: bool) -> bool {
        let level = PinState::from(on);
        if io
            .board
            .digital_write(tone_pin, level, OutputClass::Actuator)
            .is_err()
        {
            self.core.reject(io, ValveStatus::OutputLocked as u8);
            return false;
        }
        true
    }

    fn pulse(&mut self, io: &mut Io<'_>) {
        while let Some(stage) = PulseStage::of(&self.core) {
            match stage {
                PulseStage::Engage => {
                    if !self.write_valve(io, true) {
                        return;
                    }
                    self.core.send(io, ValveStatus::Open as u8);
                    if let Some(tone_pin) = self.config.tone_pin {
                        if !self.write_tone(io, tone_pin, true) {
                            return;
                        }
                        self.core.send(io, ValveStatus::ToneOn as u8);
                    }
                    self.core.advance(io);
                }
                PulseStage::Hold => {
                    if !self
                        .core
                        .wait_micros(io, u64::from(self.params.pulse_duration))
                    {
                        return;
                    }
                    self.core.advance(io);
                }
                PulseStage::Release => {
                    if !self.write_valve(io, false) {
                        return;
                    }
                    self.core.send(io, ValveStatus::Closed as u8);
                    if self.config.tone_pin.is_none() {
                        self.core.complete();
                        return;
                    }
                    self.core.advance(io);
                }
                PulseStage::ToneHold => {
                    let remaining = self
                        .params
                        .tone_duration
                        .saturating_sub(self.params.pulse_duration);
                    if !self.core.wait_micros(io, u64::from(remaining)) {
                        return;
                    }
                    self.core.advance(io);
                }
                PulseStage::ToneRelease => {
                    if let Some(tone_pin) = self.config.tone_pin {
                        if !self.write_tone(io, tone_pin, false) {
                            return;
                        }
                        self.core.send(io, ValveStatus::ToneOff as u8);
                    }
                    self.core.complete();
                    return;
                }
            }
        }
    }

    /// Blocks the whole loop for `calibration_count` pulse cycles.
    fn calibrate(&mut self, io: &mut Io<'_>) {
        let p = self.params;
        info!(
            "{} calibrating: {} pulses of {}us",
            self.core.address(),
            p.calibration_count,
            p.pulse_duration
        );
        for _ in 0..p.calibration_count {
            if !self.write_valve(io, true) {
                return;
            }
            io.board.delay_us(p.pulse_duration);
            if !self.write_valve(io, false) {
                return;
            }
            io.board.delay_us(p.calibration_delay);
        }
        info!("{} calibration finished", self.core.address());
        self.core.send(io, ValveStatus::Calibrated as u8);
        self.core.complete();
    }

    fn tone(&mut self, io: &mut Io<'_>) {
        let Some(tone_pin) = self.config.tone_pin else {
            self.core.reject(io, ValveStatus::TonePinNotSet as u8);
            return;
        };
        Pulse {
            pins: &[tone_pin],
            polarity: Polarity::active_high(true),
            class: OutputClass::Actuator,
            duration_us: u64::from(self.params.tone_duration),
            statuses: OutputStatuses {
                locked: ValveStatus::OutputLocked as u8,
                on: Some(ValveStatus::ToneOn as u8),
                off: Some(ValveStatus::ToneOff as u8),
            },
        }
        .tick(&mut self.core, io);
    }
}

impl Module for ValveModule {
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    fn setup(&mut self, io: &mut Io<'_>) -> Result<()> {
        self.core.reset();
        self.params = ValveParameters::default();

        if let Some(tone_pin) = self.config.tone_pin {
            io.board.configure_output(tone_pin, PinState::Low);
            self.core.send(io, ValveStatus::ToneOff as u8);
        }

        let open = !self.config.start_closed;
        io.board
            .configure_output(self.config.pin, self.polarity.level(open));
        let status = if open {
            ValveStatus::Open
        } else {
            ValveStatus::Closed
        };
        self.core.send(io, status as u8);
        info!(
            "{} valve on pin {} ready ({:?})",
            self.core.address(),
            self.config.pin,
            status
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
        match ValveCommand::from_code(code) {
            Some(ValveCommand::SendPulse) => self.pulse(io),
            Some(ValveCommand::ToggleOn) => toggle(
                &mut self.core,
                io,
                &pin,
                self.polarity.on,
                OutputClass::Actuator,
                Some(ValveStatus::Open as u8),
                ValveStatus::OutputLocked as u8,
            ),
            Some(ValveCommand::ToggleOff) => toggle(
                &mut self.core,
                io,
                &pin,
                self.polarity.off,
                OutputClass::Actuator,
                Some(ValveStatus::Closed as u8),
                ValveStatus::OutputLocked as u8,
            ),
            Some(ValveCommand::Calibrate) => self.calibrate(io),
            Some(ValveCommand::TonePulse) => self.tone(io),
            None => {
                warn!("{} unknown command {}", self.core.address(), code);
                return Err(ModuleError::UnknownCommand(code));
            }
        }
        Ok(())
    }
}
