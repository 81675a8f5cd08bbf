//! Pin-level hardware primitives.
//!
//! Thin wrappers over raw ESP-IDF sys calls for GPIO, the ADC1 oneshot
//! unit, LEDC PWM and the GPIO ISR service. The board adapter in
//! [`crate::adapters::hardware`] builds the [`Board`](crate::app::ports::Board)
//! port on top of these.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: real registers via `esp_idf_svc::sys`.
//! On host/test: an in-memory pin table that tests can poke through the
//! `sim_*` functions.

use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU16, Ordering};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::info;

use crate::app::ports::InputPull;
#[cfg(target_os = "espidf")]
use crate::pins;
use crate::sensors::quadrature::QuadratureDecoder;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc) => write!(f, "LEDC timer/channel config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
        }
    }
}

impl core::error::Error for HwInitError {}

/// Number of GPIOs tracked by the host simulation.
pub const SIM_PINS: usize = 64;

// ── Host simulation state ─────────────────────────────────────

static SIM_LEVEL: [AtomicBool; SIM_PINS] = [const { AtomicBool::new(false) }; SIM_PINS];
static SIM_ADC: [AtomicU16; SIM_PINS] = [const { AtomicU16::new(0) }; SIM_PINS];
static SIM_DUTY: [AtomicU8; SIM_PINS] = [const { AtomicU8::new(0) }; SIM_PINS];

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_level(pin: u8, high: bool) {
    if let Some(slot) = SIM_LEVEL.get(usize::from(pin)) {
        slot.store(high, Ordering::Relaxed);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_level(pin: u8) -> bool {
    SIM_LEVEL
        .get(usize::from(pin))
        .is_some_and(|s| s.load(Ordering::Relaxed))
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_adc(pin: u8, raw: u16) {
    if let Some(slot) = SIM_ADC.get(usize::from(pin)) {
        slot.store(raw, Ordering::Relaxed);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_duty(pin: u8) -> u8 {
    SIM_DUTY
        .get(usize::from(pin))
        .map_or(0, |s| s.load(Ordering::Relaxed))
}

// ── One-shot init ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the poll loop; single-threaded.
    unsafe {
        init_adc()?;
        init_ledc_timer()?;
    }
    info!("hw_init: ADC1 + LEDC timer configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO ──────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn configure_output(pin: u8, high: bool) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: gpio_config only touches the pins named in the bit mask.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    gpio_write(pin, high);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn configure_output(pin: u8, high: bool) -> Result<(), HwInitError> {
    sim_set_level(pin, high);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn configure_input(pin: u8, pull: InputPull) -> Result<(), HwInitError> {
    let (up, down) = match pull {
        InputPull::Floating => (false, false),
        InputPull::Down => (false, true),
        InputPull::Up => (true, false),
    };
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: if up {
            gpio_pullup_t_GPIO_PULLUP_ENABLE
        } else {
            gpio_pullup_t_GPIO_PULLUP_DISABLE
        },
        pull_down_en: if down {
            gpio_pulldown_t_GPIO_PULLDOWN_ENABLE
        } else {
            gpio_pulldown_t_GPIO_PULLDOWN_DISABLE
        },
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: gpio_config only touches the pins named in the bit mask.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn configure_input(pin: u8, pull: InputPull) -> Result<(), HwInitError> {
    match pull {
        InputPull::Up => sim_set_level(pin, true),
        InputPull::Down => sim_set_level(pin, false),
        InputPull::Floating => {}
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: u8, high: bool) {
    // SAFETY: register write on a pin configured as output; main loop only.
    unsafe {
        gpio_set_level(i32::from(pin), u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: u8, high: bool) {
    sim_set_level(pin, high);
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: u8) -> bool {
    // SAFETY: read-only register access; also safe from ISR context.
    (unsafe { gpio_get_level(i32::from(pin)) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(pin: u8) -> bool {
    sim_level(pin)
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// Bit per ADC1 channel already configured.
#[cfg(target_os = "espidf")]
static ADC_CONFIGURED: core::sync::atomic::AtomicU16 = core::sync::atomic::AtomicU16::new(0);

/// SAFETY: ADC1_HANDLE is written once in `init_adc()` before the poll
/// loop starts; afterwards it is only read from the main loop.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }
    Ok(())
}

/// Resolve and, on first use, configure the ADC1 channel behind `pin`.
#[cfg(target_os = "espidf")]
fn adc_channel(pin: u8) -> Option<adc_channel_t> {
    let mut unit: adc_unit_t = 0;
    let mut channel: adc_channel_t = 0;
    // SAFETY: pure lookup table query.
    let ret = unsafe { adc_oneshot_io_to_channel(i32::from(pin), &mut unit, &mut channel) };
    if ret != ESP_OK as i32 || unit != adc_unit_t_ADC_UNIT_1 {
        return None;
    }
    let bit = 1u16 << channel;
    if ADC_CONFIGURED.load(Ordering::Relaxed) & bit == 0 {
        let chan_cfg = adc_oneshot_chan_cfg_t {
            atten: adc_atten_t_ADC_ATTEN_DB_12,
            bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        // SAFETY: adc1_handle() contract; main-loop access only.
        let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), channel, &chan_cfg) };
        if ret != ESP_OK as i32 {
            return None;
        }
        ADC_CONFIGURED.fetch_or(bit, Ordering::Relaxed);
    }
    Some(channel)
}

/// One raw 12-bit sample, or 0 when `pin` has no ADC1 channel.
#[cfg(target_os = "espidf")]
pub fn adc_read(pin: u8) -> u16 {
    let Some(channel) = adc_channel(pin) else {
        return 0;
    };
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract; main-loop access only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return 0;
    }
    raw.clamp(0, (1 << pins::ADC_RESOLUTION_BITS) - 1) as u16
}

#[cfg(not(target_os = "espidf"))]
pub fn adc_read(pin: u8) -> u16 {
    SIM_ADC
        .get(usize::from(pin))
        .map_or(0, |s| s.load(Ordering::Relaxed))
}

// ── LEDC PWM ─────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_ledc_timer() -> Result<(), HwInitError> {
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_8_BIT,
        freq_hz: pins::BRAKE_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    // SAFETY: single main-task context via init_peripherals().
    let ret = unsafe { ledc_timer_config(&timer) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::LedcInitFailed(ret));
    }
    Ok(())
}

/// Route LEDC `channel` to `pin`, starting at zero duty.
#[cfg(target_os = "espidf")]
pub fn attach_pwm(pin: u8, channel: u32) -> Result<(), HwInitError> {
    // SAFETY: channel config is main-loop only; the timer was set up in
    // init_peripherals().
    let ret = unsafe {
        ledc_channel_config(&ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel,
            timer_sel: ledc_timer_t_LEDC_TIMER_0,
            gpio_num: i32::from(pin),
            duty: 0,
            hpoint: 0,
            ..Default::default()
        })
    };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::LedcInitFailed(ret));
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn attach_pwm(_pin: u8, _channel: u32) -> Result<(), HwInitError> {
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn pwm_write(_pin: u8, channel: u32, duty: u8) {
    // SAFETY: channel configured by attach_pwm(); main loop only.
    unsafe {
        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, u32::from(duty));
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn pwm_write(pin: u8, _channel: u32, duty: u8) {
    if let Some(slot) = SIM_DUTY.get(usize::from(pin)) {
        slot.store(duty, Ordering::Relaxed);
    }
}

// ── Quadrature ISR ────────────────────────────────────────────

static ENCODER_A: AtomicU8 = AtomicU8::new(0);
static ENCODER_B: AtomicU8 = AtomicU8::new(0);

#[cfg(target_os = "espidf")]
unsafe extern "C" fn quadrature_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the &'static QuadratureDecoder registered below.
    let decoder = unsafe { &*(arg as *const QuadratureDecoder) };
    let a = gpio_read(ENCODER_A.load(Ordering::Relaxed));
    let b = gpio_read(ENCODER_B.load(Ordering::Relaxed));
    decoder.update(a, b);
}

/// Feed `decoder` from any-edge interrupts on both encoder channels.
/// Call after module setup has configured the pins as inputs.
#[cfg(target_os = "espidf")]
pub fn attach_quadrature(
    pin_a: u8,
    pin_b: u8,
    decoder: &'static QuadratureDecoder,
) -> Result<(), HwInitError> {
    ENCODER_A.store(pin_a, Ordering::Relaxed);
    ENCODER_B.store(pin_b, Ordering::Relaxed);
    decoder.seed(gpio_read(pin_a), gpio_read(pin_b));

    let arg = core::ptr::from_ref(decoder).cast_mut().cast::<core::ffi::c_void>();
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it is already installed. The handler only touches atomics.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
        for pin in [pin_a, pin_b] {
            let pin = i32::from(pin);
            let ret = gpio_set_intr_type(pin, gpio_int_type_t_GPIO_INTR_ANYEDGE);
            if ret != ESP_OK as i32 {
                return Err(HwInitError::IsrInstallFailed(ret));
            }
            let ret = gpio_isr_handler_add(pin, Some(quadrature_isr), arg);
            if ret != ESP_OK as i32 {
                return Err(HwInitError::IsrInstallFailed(ret));
            }
            let ret = gpio_intr_enable(pin);
            if ret != ESP_OK as i32 {
                return Err(HwInitError::IsrInstallFailed(ret));
            }
        }
    }
    info!("hw_init: quadrature ISR on A{} B{}", pin_a, pin_b);
    Ok(())
}

/// Host builds have no interrupts: the simulated levels are sampled once
/// to seed the decoder and tests drive it with `update()` directly.
#[cfg(not(target_os = "espidf"))]
pub fn attach_quadrature(
    pin_a: u8,
    pin_b: u8,
    decoder: &'static QuadratureDecoder,
) -> Result<(), HwInitError> {
    ENCODER_A.store(pin_a, Ordering::Relaxed);
    ENCODER_B.store(pin_b, Ordering::Relaxed);
    decoder.seed(gpio_read(pin_a), gpio_read(pin_b));
    Ok(())
}
