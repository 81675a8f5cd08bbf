//! Construction-time module configuration
//!
//! Pin numbers and wiring polarity are fixed per rig build. Each module
//! takes one of the config structs below; constructors call `validate()`
//! so a bad layout is caught at bring-up rather than on first command.
//!
//! Runtime-tunable values (thresholds, durations) are not here; they live
//! in each module's `*Parameters` record.

use serde::{Deserialize, Serialize};

use crate::drivers::{brake, screen, speaker, ttl, valve};
use crate::error::ConfigError;
use crate::module::ModuleAddress;
use crate::pins;
use crate::sensors::{analog, encoder, lick, torque};

/// Reject reserved pins and pins listed twice.
fn check_pins(claimed: &[u8]) -> Result<(), ConfigError> {
    for (i, &pin) in claimed.iter().enumerate() {
        if pins::is_reserved(pin) {
            return Err(ConfigError::ReservedPin(pin));
        }
        if claimed[..i].contains(&pin) {
            return Err(ConfigError::DuplicatePin(pin));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Actuators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValveConfig {
    pub pin: u8,
    /// Closed when unpowered.
    pub normally_closed: bool,
    pub start_closed: bool,
    /// Buzzer relay sounded alongside valve pulses.
    pub tone_pin: Option<u8>,
}

impl ValveConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.tone_pin {
            Some(tone) => check_pins(&[self.pin, tone]),
            None => check_pins(&[self.pin]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrakeConfig {
    pub pin: u8,
    /// Engaged when unpowered.
    pub normally_engaged: bool,
    pub start_engaged: bool,
}

impl BrakeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_pins(&[self.pin])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenConfig {
    pub left_pin: u8,
    pub center_pin: u8,
    pub right_pin: u8,
    /// Relay is open (screen button released) when the gate is LOW.
    pub normally_closed: bool,
}

impl ScreenConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_pins(&[self.left_pin, self.center_pin, self.right_pin])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerConfig {
    pub pin: u8,
    pub start_off: bool,
}

impl SpeakerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_pins(&[self.pin])
    }
}

/// Static direction of a TTL module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TtlRole {
    Output,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlConfig {
    pub pin: u8,
    pub role: TtlRole,
    /// Initial level of an output line. Ignored for inputs.
    pub start_on: bool,
}

impl TtlConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_pins(&[self.pin])
    }
}

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LickConfig {
    pub pin: u8,
    /// Emit `Changed(0)` at setup.
    pub announce_initial_state: bool,
}

impl LickConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_pins(&[self.pin])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalogConfig {
    pub pin: u8,
}

impl AnalogConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_pins(&[self.pin])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorqueConfig {
    pub pin: u8,
    /// ADC reading at zero torque.
    pub baseline: u16,
    pub invert_direction: bool,
}

impl TorqueConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baseline == 0 {
            return Err(ConfigError::ZeroBaseline);
        }
        check_pins(&[self.pin])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    pub pin_a: u8,
    pub pin_b: u8,
    /// Index channel.
    pub pin_x: u8,
    pub invert_direction: bool,
}

impl EncoderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_pins(&[self.pin_a, self.pin_b, self.pin_x])
    }
}

// ---------------------------------------------------------------------------
// Controller layouts
// ---------------------------------------------------------------------------

/// One module slot in a controller layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleSpec {
    Valve { id: u8, config: ValveConfig },
    Brake { id: u8, config: BrakeConfig },
    Screen { id: u8, config: ScreenConfig },
    Speaker { id: u8, config: SpeakerConfig },
    Ttl { id: u8, config: TtlConfig },
    Lick { id: u8, config: LickConfig },
    Analog { id: u8, config: AnalogConfig },
    Torque { id: u8, config: TorqueConfig },
    Encoder { id: u8, config: EncoderConfig },
}

impl ModuleSpec {
    pub fn address(&self) -> ModuleAddress {
        let (module_type, id) = match *self {
            Self::Valve { id, .. } => (valve::MODULE_TYPE, id),
            Self::Brake { id, .. } => (brake::MODULE_TYPE, id),
            Self::Screen { id, .. } => (screen::MODULE_TYPE, id),
            Self::Speaker { id, .. } => (speaker::MODULE_TYPE, id),
            Self::Ttl { id, .. } => (ttl::MODULE_TYPE, id),
            Self::Lick { id, .. } => (lick::MODULE_TYPE, id),
            Self::Analog { id, .. } => (analog::MODULE_TYPE, id),
            Self::Torque { id, .. } => (torque::MODULE_TYPE, id),
            Self::Encoder { id, .. } => (encoder::MODULE_TYPE, id),
        };
        ModuleAddress::new(module_type, id)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Valve { config, .. } => config.validate(),
            Self::Brake { config, .. } => config.validate(),
            Self::Screen { config, .. } => config.validate(),
            Self::Speaker { config, .. } => config.validate(),
            Self::Ttl { config, .. } => config.validate(),
            Self::Lick { config, .. } => config.validate(),
            Self::Analog { config, .. } => config.validate(),
            Self::Torque { config, .. } => config.validate(),
            Self::Encoder { config, .. } => config.validate(),
        }
    }
}

/// Which of the rig's microcontrollers this build drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerTarget {
    /// Brake, reward valve, screens.
    Actor,
    /// Frame TTL, lick, torque.
    Sensor,
    /// Wheel encoder alone, for the interrupt budget.
    Encoder,
}

impl ControllerTarget {
    pub const fn controller_id(self) -> u8 {
        match self {
            Self::Actor => 101,
            Self::Sensor => 152,
            Self::Encoder => 203,
        }
    }

    /// Unused level-shifter pins to drive LOW at bring-up.
    pub fn parked_pins(self) -> &'static [u8] {
        match self {
            Self::Actor => &pins::ACTOR_PARKED_PINS,
            Self::Sensor => &pins::SENSOR_PARKED_PINS,
            Self::Encoder => &pins::ENCODER_PARKED_PINS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerLayout {
    pub target: ControllerTarget,
    pub modules: Vec<ModuleSpec>,
}

impl ControllerLayout {
    pub fn for_target(target: ControllerTarget) -> Self {
        let modules = match target {
            ControllerTarget::Actor => vec![
                ModuleSpec::Brake {
                    id: 1,
                    config: BrakeConfig {
                        pin: pins::BRAKE_PIN,
                        normally_engaged: false,
                        start_engaged: true,
                    },
                },
                ModuleSpec::Valve {
                    id: 1,
                    config: ValveConfig {
                        pin: pins::VALVE_PIN,
                        normally_closed: true,
                        start_closed: true,
                        tone_pin: Some(pins::VALVE_TONE_PIN),
                    },
                },
                ModuleSpec::Screen {
                    id: 1,
                    config: ScreenConfig {
                        left_pin: pins::SCREEN_LEFT_PIN,
                        center_pin: pins::SCREEN_CENTER_PIN,
                        right_pin: pins::SCREEN_RIGHT_PIN,
                        normally_closed: true,
                    },
                },
            ],
            ControllerTarget::Sensor => vec![
                ModuleSpec::Ttl {
                    id: 1,
                    config: TtlConfig {
                        pin: pins::FRAME_TTL_PIN,
                        role: TtlRole::Input,
                        start_on: false,
                    },
                },
                ModuleSpec::Lick {
                    id: 1,
                    config: LickConfig {
                        pin: pins::LICK_PIN,
                        announce_initial_state: true,
                    },
                },
                ModuleSpec::Torque {
                    id: 1,
                    config: TorqueConfig {
                        pin: pins::TORQUE_PIN,
                        baseline: pins::TORQUE_BASELINE,
                        invert_direction: true,
                    },
                },
            ],
            ControllerTarget::Encoder => vec![ModuleSpec::Encoder {
                id: 1,
                config: EncoderConfig {
                    pin_a: pins::ENCODER_A_PIN,
                    pin_b: pins::ENCODER_B_PIN,
                    pin_x: pins::ENCODER_X_PIN,
                    invert_direction: true,
                },
            }],
        };
        Self { target, modules }
    }

    /// Validate every module and reject repeated addresses.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, spec) in self.modules.iter().enumerate() {
            spec.validate()?;
            let address = spec.address();
            if self.modules[..i].iter().any(|s| s.address() == address) {
                return Err(ConfigError::DuplicateAddress {
                    module_type: address.module_type,
                    module_id: address.module_id,
                });
            }
        }
        Ok(())
    }
}
