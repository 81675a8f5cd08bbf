//! Fuzz target: `Module::apply_parameters`
//!
//! Feeds arbitrary bytes to every module kind's parameter decoder and
//! asserts that a rejected record leaves the previous parameters intact.
//!
//! cargo fuzz run fuzz_parameter_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use rigmodules::config::{
    AnalogConfig, BrakeConfig, EncoderConfig, LickConfig, ScreenConfig, SpeakerConfig,
    TorqueConfig, TtlConfig, TtlRole, ValveConfig,
};
use rigmodules::drivers::brake::BrakeModule;
use rigmodules::drivers::screen::ScreenModule;
use rigmodules::drivers::speaker::SpeakerModule;
use rigmodules::drivers::ttl::TtlModule;
use rigmodules::drivers::valve::ValveModule;
use rigmodules::module::Module;
use rigmodules::sensors::analog::AnalogModule;
use rigmodules::sensors::encoder::EncoderModule;
use rigmodules::sensors::lick::LickModule;
use rigmodules::sensors::quadrature::QuadratureDecoder;
use rigmodules::sensors::torque::TorqueModule;

static DECODER: QuadratureDecoder = QuadratureDecoder::new();

macro_rules! check {
    ($module:expr, $data:expr) => {{
        let mut m = $module;
        let before = *m.parameters();
        if m.apply_parameters($data).is_err() {
            assert_eq!(*m.parameters(), before, "rejected record changed parameters");
        }
    }};
}

fuzz_target!(|data: &[u8]| {
    if let Ok(valve) = ValveModule::new(
        1,
        ValveConfig { pin: 5, normally_closed: true, start_closed: true, tone_pin: Some(6) },
    ) {
        check!(valve, data);
    }

    if let Ok(brake) = BrakeModule::new(
        1,
        BrakeConfig { pin: 4, normally_engaged: true, start_engaged: true },
    ) {
        check!(brake, data);
    }
    if let Ok(screen) = ScreenModule::new(
        1,
        ScreenConfig { left_pin: 7, center_pin: 8, right_pin: 9, normally_closed: true },
    ) {
        check!(screen, data);
    }
    if let Ok(speaker) = SpeakerModule::new(1, SpeakerConfig { pin: 10, start_off: true }) {
        check!(speaker, data);
    }
    if let Ok(ttl) = TtlModule::new(1, TtlConfig { pin: 11, role: TtlRole::Output, start_on: false }) {
        check!(ttl, data);
    }
    if let Ok(lick) = LickModule::new(1, LickConfig { pin: 1, announce_initial_state: true }) {
        check!(lick, data);
    }
    if let Ok(analog) = AnalogModule::new(1, AnalogConfig { pin: 3 }) {
        check!(analog, data);
    }
    if let Ok(torque) = TorqueModule::new(
        1,
        TorqueConfig { pin: 2, baseline: 2_048, invert_direction: false },
    ) {
        check!(torque, data);
    }
    if let Ok(encoder) = EncoderModule::new(
        1,
        EncoderConfig { pin_a: 12, pin_b: 13, pin_x: 14, invert_direction: false },
        &DECODER,
    ) {
        check!(encoder, data);
    }
});
