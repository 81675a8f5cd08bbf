//! Integration tests: the module host built from controller layouts.

use embedded_hal::digital::PinState;
use rigmodules::app::commands::HostRequest;
use rigmodules::app::host::ModuleHost;
use rigmodules::config::{
    ControllerLayout, ControllerTarget, ModuleSpec, TorqueConfig, ValveConfig,
};
use rigmodules::drivers::valve::{self, ValveCommand, ValveModule, ValveParameters, ValveStatus};
use rigmodules::drivers::{brake, screen};
use rigmodules::error::{ConfigError, ModuleError, ParameterError};
use rigmodules::events::EventQueue;
use rigmodules::module::{Io, Module, ModuleAddress};
use rigmodules::pins;
use rigmodules::sensors::{encoder, lick, torque};

use crate::mock_hw::{MockBoard, ScriptedCounter};

const VALVE: ModuleAddress = ModuleAddress::new(valve::MODULE_TYPE, 1);

fn actor_host() -> ModuleHost {
    ModuleHost::from_layout(&ControllerLayout::for_target(ControllerTarget::Actor), ScriptedCounter::new)
        .unwrap()
}

fn run(host: &mut ModuleHost, board: &mut MockBoard, queue: &mut EventQueue<32>) -> Vec<(ModuleAddress, ModuleError)> {
    let mut io = Io::new(board, queue);
    host.tick(&mut io)
}

#[test]
fn layouts_build_their_modules() {
    let host = actor_host();
    let addresses: Vec<_> = host.addresses().collect();
    assert_eq!(
        addresses,
        vec![
            ModuleAddress::new(brake::MODULE_TYPE, 1),
            VALVE,
            ModuleAddress::new(screen::MODULE_TYPE, 1),
        ]
    );

    let sensor = ModuleHost::from_layout(
        &ControllerLayout::for_target(ControllerTarget::Sensor),
        ScriptedCounter::new,
    )
    .unwrap();
    assert_eq!(sensor.len(), 3);
    assert!(sensor.module(ModuleAddress::new(lick::MODULE_TYPE, 1)).is_some());
    assert!(sensor.module(ModuleAddress::new(torque::MODULE_TYPE, 1)).is_some());

    let enc = ModuleHost::from_layout(
        &ControllerLayout::for_target(ControllerTarget::Encoder),
        ScriptedCounter::new,
    )
    .unwrap();
    assert_eq!(
        enc.addresses().collect::<Vec<_>>(),
        vec![ModuleAddress::new(encoder::MODULE_TYPE, 1)]
    );
}

#[test]
fn invalid_layout_is_refused() {
    let mut layout = ControllerLayout::for_target(ControllerTarget::Sensor);
    layout.modules.push(ModuleSpec::Torque {
        id: 2,
        config: TorqueConfig {
            pin: 9,
            baseline: 0,
            invert_direction: false,
        },
    });
    assert_eq!(
        ModuleHost::from_layout(&layout, ScriptedCounter::new).err(),
        Some(ConfigError::ZeroBaseline)
    );
}

#[test]
fn duplicate_address_is_refused() {
    let mut host = actor_host();
    let again = ValveModule::new(
        1,
        ValveConfig {
            pin: 7,
            normally_closed: true,
            start_closed: true,
            tone_pin: None,
        },
    )
    .unwrap();
    assert_eq!(
        host.add(Box::new(again)),
        Err(ConfigError::DuplicateAddress {
            module_type: valve::MODULE_TYPE,
            module_id: 1
        })
    );
}

#[test]
fn setup_announces_initial_states() {
    let mut host = actor_host();
    let mut board = MockBoard::new();
    let mut queue: EventQueue<32> = EventQueue::new();
    host.setup_all(&mut Io::new(&mut board, &mut queue)).unwrap();

    let mut seen = Vec::new();
    queue.drain(|e| seen.push((e.address, e.status)));
    assert_eq!(
        seen,
        vec![
            (VALVE, ValveStatus::ToneOff as u8),
            (VALVE, ValveStatus::Closed as u8),
            (ModuleAddress::new(screen::MODULE_TYPE, 1), screen::ScreenStatus::Off as u8),
        ]
    );
}

#[test]
fn requests_route_by_address() {
    let mut host = actor_host();
    let mut board = MockBoard::new();
    let mut queue: EventQueue<32> = EventQueue::new();
    host.setup_all(&mut Io::new(&mut board, &mut queue)).unwrap();
    queue.drain(|_| {});

    let params = ValveParameters {
        pulse_duration: 500,
        tone_duration: 500,
        ..ValveParameters::default()
    };
    let bytes = postcard::to_allocvec(&params).unwrap();
    host.handle(
        &HostRequest::Configure {
            address: VALVE,
            parameters: heapless::Vec::from_slice(&bytes).unwrap(),
        },
        0,
    )
    .unwrap();
    host.handle(
        &HostRequest::Run {
            address: VALVE,
            command: ValveCommand::SendPulse as u8,
        },
        0,
    )
    .unwrap();
    assert!(host.any_busy());

    assert!(run(&mut host, &mut board, &mut queue).is_empty());
    board.advance(500);
    assert!(run(&mut host, &mut board, &mut queue).is_empty());
    assert!(!host.any_busy());

    let mut statuses = Vec::new();
    queue.drain(|e| statuses.push(e.status));
    assert_eq!(
        statuses,
        vec![
            ValveStatus::Open as u8,
            ValveStatus::ToneOn as u8,
            ValveStatus::Closed as u8,
            ValveStatus::ToneOff as u8,
        ]
    );
}

#[test]
fn parameters_are_frozen_while_a_command_runs() {
    let mut host = actor_host();
    let mut board = MockBoard::new();
    let mut queue: EventQueue<32> = EventQueue::new();
    host.setup_all(&mut Io::new(&mut board, &mut queue)).unwrap();
    queue.drain(|_| {});

    host.submit(VALVE, ValveCommand::SendPulse as u8, 0).unwrap();
    run(&mut host, &mut board, &mut queue);
    assert_eq!(host.module(VALVE).unwrap().core().stage(), 2);

    let longer = ValveParameters {
        pulse_duration: 5_000_000,
        ..ValveParameters::default()
    };
    assert_eq!(
        host.configure(VALVE, &postcard::to_allocvec(&longer).unwrap()),
        Err(ModuleError::Busy)
    );

    // The pulse still ends after the duration it started with.
    board.advance(u64::from(ValveParameters::default().pulse_duration));
    run(&mut host, &mut board, &mut queue);
    assert_eq!(board.level(pins::VALVE_PIN), Some(PinState::Low));

    // Once idle the same record is accepted.
    while host.any_busy() {
        board.advance(1_000);
        run(&mut host, &mut board, &mut queue);
    }
    assert!(host.configure(VALVE, &postcard::to_allocvec(&longer).unwrap()).is_ok());
}

#[test]
fn busy_and_missing_modules_are_reported() {
    let mut host = actor_host();
    host.submit(VALVE, ValveCommand::SendPulse as u8, 0).unwrap();
    assert_eq!(
        host.submit(VALVE, ValveCommand::ToggleOn as u8, 0),
        Err(ModuleError::Busy)
    );
    assert_eq!(
        host.submit(ModuleAddress::new(99, 1), 1, 0),
        Err(ModuleError::NoSuchModule {
            module_type: 99,
            module_id: 1
        })
    );
}

#[test]
fn bad_parameters_surface_as_errors() {
    let mut host = actor_host();
    assert_eq!(
        host.configure(VALVE, &[0xFF]),
        Err(ModuleError::Parameters(ParameterError::Malformed))
    );
}

#[test]
fn unknown_command_resets_only_that_module() {
    let mut host = actor_host();
    let mut board = MockBoard::new();
    let mut queue: EventQueue<32> = EventQueue::new();
    host.submit(VALVE, 77, 0).unwrap();
    host.submit(ModuleAddress::new(screen::MODULE_TYPE, 1), 1, 0).unwrap();

    let failures = run(&mut host, &mut board, &mut queue);
    assert_eq!(failures, vec![(VALVE, ModuleError::UnknownCommand(77))]);
    assert!(!host.module(VALVE).unwrap().core().is_busy());
    assert!(host.module(ModuleAddress::new(screen::MODULE_TYPE, 1)).unwrap().core().is_busy());
}

#[test]
fn halted_module_needs_clearing() {
    let mut host = actor_host();
    let mut board = MockBoard::new();
    let mut queue: EventQueue<32> = EventQueue::new();
    board.actuator_locked = true;
    host.submit(VALVE, ValveCommand::ToggleOn as u8, 0).unwrap();
    run(&mut host, &mut board, &mut queue);
    assert!(host.module(VALVE).unwrap().core().is_halted());

    assert_eq!(
        host.submit(VALVE, ValveCommand::ToggleOn as u8, 0),
        Err(ModuleError::Halted)
    );
    host.handle(&HostRequest::ClearHalt { address: VALVE }, 0).unwrap();
    assert!(host.submit(VALVE, ValveCommand::ToggleOn as u8, 0).is_ok());
}
