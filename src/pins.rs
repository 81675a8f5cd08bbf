//! Pin assignments for the three rig controllers (ESP32-S3 GPIO numbers).
//!
//! Single source of truth: the controller layouts in [`crate::config`]
//! reference these constants rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Reserved
// ---------------------------------------------------------------------------

/// On-board status LED. No module may claim it.
pub const STATUS_LED_PIN: u8 = 48;

/// Pins no module may claim.
pub const RESERVED_PINS: [u8; 1] = [STATUS_LED_PIN];

/// True when `pin` is held back for board functions.
pub fn is_reserved(pin: u8) -> bool {
    RESERVED_PINS.contains(&pin)
}

// ---------------------------------------------------------------------------
// Actor controller
// ---------------------------------------------------------------------------

/// Running-wheel brake FET gate (LEDC PWM).
pub const BRAKE_PIN: u8 = 4;
/// Reward valve FET gate.
pub const VALVE_PIN: u8 = 5;
/// Piezo buzzer relay coupled to valve pulses.
pub const VALVE_TONE_PIN: u8 = 6;
/// VR screen power-button relays (left, center, right).
pub const SCREEN_LEFT_PIN: u8 = 15;
pub const SCREEN_CENTER_PIN: u8 = 16;
pub const SCREEN_RIGHT_PIN: u8 = 17;

// ---------------------------------------------------------------------------
// Sensor controller
// ---------------------------------------------------------------------------

/// Mesoscope frame TTL input.
pub const FRAME_TTL_PIN: u8 = 12;
/// Conductive lick sensor (ADC1 CH0).
pub const LICK_PIN: u8 = 1;
/// Torque amplifier output (ADC1 CH1).
pub const TORQUE_PIN: u8 = 2;
/// ADC reading produced by the torque amplifier at zero torque (12-bit).
pub const TORQUE_BASELINE: u16 = 2048;

// ---------------------------------------------------------------------------
// Encoder controller
// ---------------------------------------------------------------------------

pub const ENCODER_A_PIN: u8 = 10;
pub const ENCODER_B_PIN: u8 = 11;
/// Index channel, one pulse per revolution.
pub const ENCODER_X_PIN: u8 = 13;

// ---------------------------------------------------------------------------
// Converter hygiene
// ---------------------------------------------------------------------------

/// Unused level-shifter inputs per controller. Left floating they make
/// the shifter drive HIGH, so bring-up parks them LOW.
pub const ACTOR_PARKED_PINS: [u8; 4] = [38, 39, 40, 41];
pub const SENSOR_PARKED_PINS: [u8; 3] = [38, 40, 41];
pub const ENCODER_PARKED_PINS: [u8; 1] = [41];

// ---------------------------------------------------------------------------
// ADC / PWM configuration
// ---------------------------------------------------------------------------

/// ADC resolution. 12 bits is the S3 oneshot maximum.
pub const ADC_RESOLUTION_BITS: u32 = 12;
/// PWM resolution. 8-bit gives 0 – 255 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 8;
/// PWM base frequency for brake gates.
pub const BRAKE_PWM_FREQ_HZ: u32 = 1_000;
/// LEDC channels available for PWM outputs.
pub const PWM_CHANNELS: usize = 8;
