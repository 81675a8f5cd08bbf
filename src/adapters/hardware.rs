//! Hardware adapter: bridges the pin primitives to the [`Board`] port.
//!
//! The only module in the system that touches actual hardware. On
//! non-espidf targets the primitives in [`crate::drivers::hw_init`] fall
//! back to their simulated pin table.
//!
//! Output locks live in process-wide atomics so whatever supervises the
//! rig (a serial command, a safety input) can engage them without holding
//! a reference to the board.

use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;
use heapless::Vec;
use log::warn;

use crate::adapters::time::MonotonicClock;
use crate::app::ports::{Board, InputPull, OutputClass};
use crate::drivers::hw_init;
use crate::error::{OutputLocked, PwmError};
use crate::pins::PWM_CHANNELS;

// ── Output locks ──────────────────────────────────────────────

static ACTUATOR_LOCK: AtomicBool = AtomicBool::new(false);
static TTL_LOCK: AtomicBool = AtomicBool::new(false);

fn lock_for(class: OutputClass) -> &'static AtomicBool {
    match class {
        OutputClass::Actuator => &ACTUATOR_LOCK,
        OutputClass::Ttl => &TTL_LOCK,
    }
}

/// Engage or release the output lock for `class`.
pub fn set_output_lock(class: OutputClass, locked: bool) {
    lock_for(class).store(locked, Ordering::Release);
}

pub fn output_locked(class: OutputClass) -> bool {
    lock_for(class).load(Ordering::Acquire)
}

fn check_lock(class: OutputClass) -> Result<(), OutputLocked> {
    if output_locked(class) {
        Err(OutputLocked)
    } else {
        Ok(())
    }
}

// ── HardwareBoard ─────────────────────────────────────────────

/// Concrete [`Board`] over the ESP32-S3 GPIO, ADC1 and LEDC peripherals.
pub struct HardwareBoard {
    clock: MonotonicClock,
    /// LEDC channel per PWM pin, assigned on first write.
    pwm_pins: Vec<u8, PWM_CHANNELS>,
}

impl Default for HardwareBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareBoard {
    pub fn new() -> Self {
        Self {
            clock: MonotonicClock::new(),
            pwm_pins: Vec::new(),
        }
    }

    /// LEDC channel for `pin`, attaching a fresh one the first time.
    fn pwm_channel(&mut self, pin: u8) -> Result<u32, PwmError> {
        if let Some(i) = self.pwm_pins.iter().position(|&p| p == pin) {
            return Ok(i as u32);
        }
        let channel = self.pwm_pins.len() as u32;
        if self.pwm_pins.push(pin).is_err() {
            warn!("hardware: no free PWM channel for GPIO{}", pin);
            return Err(PwmError::Unavailable);
        }
        if let Err(e) = hw_init::attach_pwm(pin, channel) {
            warn!("hardware: PWM attach on GPIO{} failed: {}", pin, e);
            self.pwm_pins.pop();
            return Err(PwmError::Unavailable);
        }
        Ok(channel)
    }
}

impl DelayNs for HardwareBoard {
    #[cfg(target_os = "espidf")]
    fn delay_ns(&mut self, ns: u32) {
        esp_idf_svc::hal::delay::Ets::delay_us(ns.div_ceil(1_000));
    }

    #[cfg(not(target_os = "espidf"))]
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }
}

impl Board for HardwareBoard {
    fn configure_output(&mut self, pin: u8, initial: PinState) {
        if let Err(e) = hw_init::configure_output(pin, initial == PinState::High) {
            warn!("hardware: GPIO{} output config: {}", pin, e);
        }
    }

    fn configure_input(&mut self, pin: u8, pull: InputPull) {
        if let Err(e) = hw_init::configure_input(pin, pull) {
            warn!("hardware: GPIO{} input config: {}", pin, e);
        }
    }

    fn digital_write(
        &mut self,
        pin: u8,
        level: PinState,
        class: OutputClass,
    ) -> Result<(), OutputLocked> {
        check_lock(class)?;
        hw_init::gpio_write(pin, level == PinState::High);
        Ok(())
    }

    fn analog_write(
        &mut self,
        pin: u8,
        duty: u8,
        class: OutputClass,
    ) -> Result<(), PwmError> {
        check_lock(class)?;
        let channel = self.pwm_channel(pin)?;
        hw_init::pwm_write(pin, channel, duty);
        Ok(())
    }

    fn analog_read(&mut self, pin: u8, averaging: u8) -> u16 {
        let samples = u32::from(averaging.max(1));
        let sum: u32 = (0..samples).map(|_| u32::from(hw_init::adc_read(pin))).sum();
        (sum / samples) as u16
    }

    fn digital_read(&mut self, pin: u8, averaging: u8) -> bool {
        let samples = averaging.max(1);
        let highs = (0..samples).filter(|_| hw_init::gpio_read(pin)).count();
        // Strict majority; a tie reads LOW.
        highs * 2 > usize::from(samples)
    }

    fn micros(&self) -> u64 {
        self.clock.micros()
    }
}
