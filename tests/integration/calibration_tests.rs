//! Integration tests: the two blocking routines (valve calibration and
//! encoder PPR estimation).

use embedded_hal::digital::PinState;
use rigmodules::config::{EncoderConfig, ValveConfig};
use rigmodules::drivers::valve::{ValveCommand, ValveModule, ValveParameters, ValveStatus};
use rigmodules::events::Payload;
use rigmodules::module::Module;
use rigmodules::sensors::encoder::{EncoderCommand, EncoderModule, EncoderStatus};

use crate::mock_hw::{Rig, ScriptedCounter};

const VALVE_PIN: u8 = 5;
const INDEX_PIN: u8 = 13;

fn calibrating_valve(rig: &mut Rig, count: u16) -> ValveModule {
    let mut v = ValveModule::new(
        1,
        ValveConfig {
            pin: VALVE_PIN,
            normally_closed: true,
            start_closed: true,
            tone_pin: None,
        },
    )
    .unwrap();
    rig.setup(&mut v);
    rig.sink.clear();
    let params = ValveParameters {
        pulse_duration: 1_000,
        calibration_delay: 2_000,
        calibration_count: count,
        ..ValveParameters::default()
    };
    v.apply_parameters(&postcard::to_allocvec(&params).unwrap()).unwrap();
    v
}

#[test]
fn calibration_pulses_then_reports_once() {
    let mut rig = Rig::new();
    let mut v = calibrating_valve(&mut rig, 3);

    rig.run(&mut v, ValveCommand::Calibrate as u8);
    assert!(!v.core().is_busy());
    assert_eq!(
        rig.board.digital_history(VALVE_PIN),
        vec![
            PinState::High,
            PinState::Low,
            PinState::High,
            PinState::Low,
            PinState::High,
            PinState::Low,
        ]
    );
    assert_eq!(rig.board.delayed_us, 9_000);
    assert_eq!(rig.board.now(), 9_000);
    assert_eq!(rig.sink.statuses(), vec![ValveStatus::Calibrated as u8]);
}

#[test]
fn zero_count_calibration_only_reports() {
    let mut rig = Rig::new();
    let mut v = calibrating_valve(&mut rig, 0);
    rig.run(&mut v, ValveCommand::Calibrate as u8);
    assert!(rig.board.writes.is_empty());
    assert_eq!(rig.sink.statuses(), vec![ValveStatus::Calibrated as u8]);
}

#[test]
fn locked_calibration_aborts_immediately() {
    let mut rig = Rig::new();
    let mut v = calibrating_valve(&mut rig, 500);
    rig.board.actuator_locked = true;
    rig.run(&mut v, ValveCommand::Calibrate as u8);
    assert!(rig.board.writes.is_empty());
    assert_eq!(rig.board.delayed_us, 0);
    assert_eq!(rig.sink.statuses(), vec![ValveStatus::OutputLocked as u8]);
    assert!(v.core().is_halted());
}

fn encoder(counter: &ScriptedCounter) -> EncoderModule<ScriptedCounter> {
    EncoderModule::new(
        1,
        EncoderConfig {
            pin_a: 10,
            pin_b: 11,
            pin_x: INDEX_PIN,
            invert_direction: false,
        },
        counter.clone(),
    )
    .unwrap()
}

#[test]
fn ppr_is_the_rounded_mean_over_ten_revolutions() {
    let mut rig = Rig::new();
    let counter = ScriptedCounter::new();
    let mut e = encoder(&counter);
    rig.setup(&mut e);
    rig.sink.clear();
    rig.board.set_digital(INDEX_PIN, true);

    let mut per_rev = vec![1_024; 9];
    per_rev.push(1_020);
    counter.push(&per_rev);

    rig.run(&mut e, EncoderCommand::GetPpr as u8);
    assert!(!e.core().is_busy());
    assert_eq!(
        rig.sink.events.iter().map(|ev| (ev.status, ev.payload)).collect::<Vec<_>>(),
        vec![(EncoderStatus::Ppr as u8, Some(Payload::U16(1_024)))]
    );
    // Ten settle pauses of 100 ms.
    assert_eq!(rig.board.delayed_us, 1_000_000);
}

#[test]
fn ppr_ignores_rotation_direction() {
    let mut rig = Rig::new();
    let counter = ScriptedCounter::new();
    let mut e = encoder(&counter);
    rig.setup(&mut e);
    rig.sink.clear();
    rig.board.set_digital(INDEX_PIN, true);
    counter.push(&[-360; 10]);

    rig.run(&mut e, EncoderCommand::GetPpr as u8);
    assert_eq!(rig.sink.events[0].payload, Some(Payload::U16(360)));
}

#[test]
fn ppr_waits_for_the_index_pulse() {
    let mut rig = Rig::new();
    let counter = ScriptedCounter::new();
    let mut e = encoder(&counter);
    rig.setup(&mut e);
    let resets_after_setup = counter.resets();
    rig.board.script_digital(INDEX_PIN, &[false, false, false]);
    rig.board.set_digital(INDEX_PIN, true);
    counter.push(&[100; 10]);

    rig.run(&mut e, EncoderCommand::GetPpr as u8);
    // The counter is zeroed once the first index pulse is seen.
    assert_eq!(counter.resets(), resets_after_setup + 1);
    assert_eq!(rig.sink.events.last().and_then(|ev| ev.payload), Some(Payload::U16(100)));
}
