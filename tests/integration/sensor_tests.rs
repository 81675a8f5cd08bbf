//! Integration tests: sensor filtering and reporting.

use rigmodules::app::ports::InputPull;
use rigmodules::config::{AnalogConfig, EncoderConfig, LickConfig, TorqueConfig, TtlConfig, TtlRole};
use rigmodules::drivers::ttl::{TtlCommand, TtlModule, TtlStatus};
use rigmodules::events::Payload;
use rigmodules::module::Module;
use rigmodules::sensors::analog::{AnalogCommand, AnalogModule, AnalogStatus};
use rigmodules::sensors::encoder::{EncoderCommand, EncoderModule, EncoderParameters, EncoderStatus};
use rigmodules::sensors::lick::{LickCommand, LickModule, LickParameters, LickStatus};
use rigmodules::sensors::quadrature::QuadratureDecoder;
use rigmodules::sensors::torque::{TorqueCommand, TorqueModule, TorqueParameters, TorqueStatus};

use crate::mock_hw::{Rig, ScriptedCounter};

/// (status, payload value) of every recorded event.
fn reports(rig: &Rig) -> Vec<(u8, Option<Payload>)> {
    rig.sink.events.iter().map(|e| (e.status, e.payload)).collect()
}

// ── Lick ──────────────────────────────────────────────────────

const LICK_PIN: u8 = 1;

fn lick(announce_initial_state: bool) -> LickModule {
    LickModule::new(
        1,
        LickConfig {
            pin: LICK_PIN,
            announce_initial_state,
        },
    )
    .unwrap()
}

#[test]
fn lick_setup_announces_zero_and_pulls_down() {
    let mut rig = Rig::new();
    let mut l = lick(true);
    rig.setup(&mut l);
    assert_eq!(
        reports(&rig),
        vec![(LickStatus::Changed as u8, Some(Payload::U16(0)))]
    );
    assert_eq!(rig.board.inputs.get(&LICK_PIN), Some(&InputPull::Down));

    let mut quiet = lick(false);
    rig.sink.clear();
    rig.setup(&mut quiet);
    assert!(rig.sink.events.is_empty());
}

#[test]
fn lick_reports_contact_then_a_single_release() {
    let mut rig = Rig::new();
    let mut l = lick(false);
    rig.setup(&mut l);
    let params = LickParameters {
        signal_threshold: 200,
        delta_threshold: 100,
        average_pool_size: 0,
    };
    l.apply_parameters(&postcard::to_allocvec(&params).unwrap()).unwrap();

    rig.board.script_analog(LICK_PIN, &[250, 50, 60]);
    for _ in 0..3 {
        rig.run(&mut l, LickCommand::CheckState as u8);
        assert!(!l.core().is_busy());
    }
    let changed = LickStatus::Changed as u8;
    assert_eq!(
        reports(&rig),
        vec![
            (changed, Some(Payload::U16(250))),
            (changed, Some(Payload::U16(0))),
        ]
    );
}

#[test]
fn repeated_low_readings_collapse_into_one_zero() {
    let mut rig = Rig::new();
    let mut l = lick(false);
    rig.setup(&mut l);
    // Defaults: signal 200, delta 180.
    rig.board.script_analog(LICK_PIN, &[400, 10, 195, 2, 190]);
    for _ in 0..5 {
        rig.run(&mut l, LickCommand::CheckState as u8);
    }
    let changed = LickStatus::Changed as u8;
    assert_eq!(
        reports(&rig),
        vec![
            (changed, Some(Payload::U16(400))),
            (changed, Some(Payload::U16(0))),
        ]
    );
}

// ── Analog ────────────────────────────────────────────────────

#[test]
fn analog_reports_only_above_threshold() {
    let mut rig = Rig::new();
    let mut a = AnalogModule::new(1, AnalogConfig { pin: 3 }).unwrap();
    rig.setup(&mut a);
    rig.sink.clear();
    rig.board.script_analog(3, &[100, 101, 40]);
    for _ in 0..3 {
        rig.run(&mut a, AnalogCommand::CheckState as u8);
    }
    assert_eq!(
        reports(&rig),
        vec![(AnalogStatus::Changed as u8, Some(Payload::U16(101)))]
    );
}

// ── Torque ────────────────────────────────────────────────────

const TORQUE_PIN: u8 = 2;

fn torque(invert_direction: bool) -> TorqueModule {
    TorqueModule::new(
        1,
        TorqueConfig {
            pin: TORQUE_PIN,
            baseline: 2_048,
            invert_direction,
        },
    )
    .unwrap()
}

#[test]
fn torque_reports_direction_around_baseline() {
    let mut rig = Rig::new();
    let mut t = torque(false);
    rig.setup(&mut t);
    assert_eq!(
        reports(&rig),
        vec![(TorqueStatus::Ccw as u8, Some(Payload::U16(0)))]
    );
    rig.sink.clear();

    rig.board
        .script_analog(TORQUE_PIN, &[2_100, 2_200, 1_900, 2_000, 2_080]);
    for _ in 0..5 {
        rig.run(&mut t, TorqueCommand::CheckState as u8);
    }
    assert_eq!(
        reports(&rig),
        vec![
            (TorqueStatus::Ccw as u8, Some(Payload::U16(152))),
            (TorqueStatus::Cw as u8, Some(Payload::U16(148))),
            (TorqueStatus::Ccw as u8, Some(Payload::U16(0))),
        ]
    );
}

#[test]
fn inverted_torque_swaps_status() {
    let mut rig = Rig::new();
    let mut t = torque(true);
    rig.setup(&mut t);
    rig.sink.clear();
    rig.board.script_analog(TORQUE_PIN, &[2_300]);
    rig.run(&mut t, TorqueCommand::CheckState as u8);
    assert_eq!(
        reports(&rig),
        vec![(TorqueStatus::Cw as u8, Some(Payload::U16(252)))]
    );
}

#[test]
fn disabled_direction_is_silent() {
    let mut rig = Rig::new();
    let mut t = torque(false);
    rig.setup(&mut t);
    let params = TorqueParameters {
        report_cw: false,
        ..TorqueParameters::default()
    };
    t.apply_parameters(&postcard::to_allocvec(&params).unwrap()).unwrap();
    rig.sink.clear();

    rig.board.script_analog(TORQUE_PIN, &[1_800, 2_048]);
    rig.run(&mut t, TorqueCommand::CheckState as u8);
    assert!(rig.sink.events.is_empty());
    // Back at baseline: the zero still goes out.
    rig.run(&mut t, TorqueCommand::CheckState as u8);
    assert_eq!(
        reports(&rig),
        vec![(TorqueStatus::Ccw as u8, Some(Payload::U16(0)))]
    );
}

// ── TTL input ─────────────────────────────────────────────────

#[test]
fn ttl_input_reports_edges_only() {
    let mut rig = Rig::new();
    let mut t = TtlModule::new(
        1,
        TtlConfig {
            pin: 12,
            role: TtlRole::Input,
            start_on: false,
        },
    )
    .unwrap();
    rig.setup(&mut t);
    assert_eq!(rig.board.inputs.get(&12), Some(&InputPull::Floating));

    rig.board.script_digital(12, &[false, true, true, false]);
    for _ in 0..4 {
        rig.run(&mut t, TtlCommand::CheckState as u8);
    }
    assert_eq!(
        rig.sink.statuses(),
        vec![TtlStatus::InputOn as u8, TtlStatus::InputOff as u8]
    );
}

// ── Encoder ───────────────────────────────────────────────────

fn encoder_config(invert_direction: bool) -> EncoderConfig {
    EncoderConfig {
        pin_a: 10,
        pin_b: 11,
        pin_x: 13,
        invert_direction,
    }
}

#[test]
fn encoder_setup_announces_zero_and_resets_counter() {
    let mut rig = Rig::new();
    let counter = ScriptedCounter::new();
    let mut e = EncoderModule::new(1, encoder_config(false), counter.clone()).unwrap();
    rig.setup(&mut e);
    assert_eq!(counter.resets(), 1);
    assert_eq!(rig.board.inputs.get(&10), Some(&InputPull::Up));
    assert_eq!(rig.board.inputs.get(&11), Some(&InputPull::Up));
    assert_eq!(
        reports(&rig),
        vec![(EncoderStatus::RotatedCw as u8, Some(Payload::U32(0)))]
    );
}

#[test]
fn encoder_amortizes_small_moves() {
    let mut rig = Rig::new();
    let counter = ScriptedCounter::new();
    let mut e = EncoderModule::new(1, encoder_config(false), counter.clone()).unwrap();
    rig.setup(&mut e);
    rig.sink.clear();

    counter.push(&[5, 5, 5, 5]);
    let mut overflow = Vec::new();
    for _ in 0..4 {
        rig.run(&mut e, EncoderCommand::CheckState as u8);
        overflow.push(e.overflow());
    }
    assert_eq!(overflow, vec![5, 10, 15, 0]);
    assert_eq!(
        reports(&rig),
        vec![(EncoderStatus::RotatedCcw as u8, Some(Payload::U32(20)))]
    );
}

#[test]
fn inverted_encoder_flips_direction() {
    let mut rig = Rig::new();
    let counter = ScriptedCounter::new();
    let mut e = EncoderModule::new(1, encoder_config(true), counter.clone()).unwrap();
    rig.setup(&mut e);
    rig.sink.clear();
    counter.push(&[-20, 30]);
    rig.run(&mut e, EncoderCommand::CheckState as u8);
    rig.run(&mut e, EncoderCommand::CheckState as u8);
    assert_eq!(
        reports(&rig),
        vec![
            (EncoderStatus::RotatedCcw as u8, Some(Payload::U32(20))),
            (EncoderStatus::RotatedCw as u8, Some(Payload::U32(30))),
        ]
    );
}

#[test]
fn unreported_direction_only_delays_the_other() {
    let mut rig = Rig::new();
    let counter = ScriptedCounter::new();
    let mut e = EncoderModule::new(1, encoder_config(false), counter.clone()).unwrap();
    rig.setup(&mut e);
    let params = EncoderParameters {
        report_cw: false,
        ..EncoderParameters::default()
    };
    e.apply_parameters(&postcard::to_allocvec(&params).unwrap()).unwrap();
    rig.sink.clear();

    counter.push(&[-500, 31]);
    rig.run(&mut e, EncoderCommand::CheckState as u8);
    assert_eq!(e.overflow(), -15);
    rig.run(&mut e, EncoderCommand::CheckState as u8);
    assert_eq!(
        reports(&rig),
        vec![(EncoderStatus::RotatedCcw as u8, Some(Payload::U32(16)))]
    );
}

#[test]
fn reset_command_zeroes_counter() {
    let mut rig = Rig::new();
    let counter = ScriptedCounter::new();
    let mut e = EncoderModule::new(1, encoder_config(false), counter.clone()).unwrap();
    rig.setup(&mut e);
    rig.run(&mut e, EncoderCommand::Reset as u8);
    assert_eq!(counter.resets(), 2);
    assert!(!e.core().is_busy());
}

static DECODER: QuadratureDecoder = QuadratureDecoder::new();

#[test]
fn quadrature_edges_reach_the_encoder() {
    let mut rig = Rig::new();
    let mut e = EncoderModule::new(1, encoder_config(false), &DECODER).unwrap();
    rig.setup(&mut e);
    rig.sink.clear();

    DECODER.seed(false, false);
    // A leads B: four full cycles, four counts each.
    for _ in 0..4 {
        for (a, b) in [(true, false), (true, true), (false, true), (false, false)] {
            DECODER.update(a, b);
        }
    }
    rig.run(&mut e, EncoderCommand::CheckState as u8);
    assert_eq!(
        reports(&rig),
        vec![(EncoderStatus::RotatedCcw as u8, Some(Payload::U32(16)))]
    );
    assert_eq!(DECODER.count(), 0);
}
