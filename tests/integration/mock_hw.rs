//! Mock hardware for integration tests.
//!
//! Records every pin write so tests can assert on the full output
//! history without touching real GPIO/PWM registers. Time only moves
//! when a test moves it (or a blocking delay consumes it).

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;
use rigmodules::app::ports::{Board, EventSink, InputPull, OutputClass, PulseCounter};
use rigmodules::error::{OutputLocked, PwmError};
use rigmodules::events::ModuleEvent;
use rigmodules::module::{Io, Module};

// ── Write journal ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinWrite {
    Digital { pin: u8, level: PinState, at_us: u64 },
    Analog { pin: u8, duty: u8, at_us: u64 },
}

// ── MockBoard ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockBoard {
    now_ns: u64,
    pub levels: HashMap<u8, PinState>,
    pub duties: HashMap<u8, u8>,
    pub inputs: HashMap<u8, InputPull>,
    pub writes: Vec<PinWrite>,
    analog_script: HashMap<u8, VecDeque<u16>>,
    analog_default: HashMap<u8, u16>,
    digital_script: HashMap<u8, VecDeque<bool>>,
    digital_default: HashMap<u8, bool>,
    pub actuator_locked: bool,
    pub ttl_locked: bool,
    /// PWM pins that cannot get a channel.
    pub pwm_unavailable: Vec<u8>,
    /// Total time consumed by blocking delays.
    pub delayed_us: u64,
}

#[allow(dead_code)]
impl MockBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.now_ns / 1_000
    }

    pub fn set_time(&mut self, us: u64) {
        self.now_ns = us * 1_000;
    }

    pub fn advance(&mut self, us: u64) {
        self.now_ns += us * 1_000;
    }

    pub fn level(&self, pin: u8) -> Option<PinState> {
        self.levels.get(&pin).copied()
    }

    /// Queue analog samples for `pin`, returned one per read.
    pub fn script_analog(&mut self, pin: u8, samples: &[u16]) {
        self.analog_script
            .entry(pin)
            .or_default()
            .extend(samples.iter().copied());
    }

    /// Value returned once the analog script for `pin` runs dry.
    pub fn set_analog(&mut self, pin: u8, value: u16) {
        self.analog_default.insert(pin, value);
    }

    pub fn script_digital(&mut self, pin: u8, samples: &[bool]) {
        self.digital_script
            .entry(pin)
            .or_default()
            .extend(samples.iter().copied());
    }

    pub fn set_digital(&mut self, pin: u8, value: bool) {
        self.digital_default.insert(pin, value);
    }

    /// Digital writes to `pin`, in order.
    pub fn digital_history(&self, pin: u8) -> Vec<PinState> {
        self.writes
            .iter()
            .filter_map(|w| match *w {
                PinWrite::Digital { pin: p, level, .. } if p == pin => Some(level),
                _ => None,
            })
            .collect()
    }

    fn locked(&self, class: OutputClass) -> bool {
        match class {
            OutputClass::Actuator => self.actuator_locked,
            OutputClass::Ttl => self.ttl_locked,
        }
    }
}

impl DelayNs for MockBoard {
    fn delay_ns(&mut self, ns: u32) {
        self.now_ns += u64::from(ns);
        self.delayed_us += u64::from(ns) / 1_000;
    }
}

impl Board for MockBoard {
    fn configure_output(&mut self, pin: u8, initial: PinState) {
        self.levels.insert(pin, initial);
    }

    fn configure_input(&mut self, pin: u8, pull: InputPull) {
        self.inputs.insert(pin, pull);
    }

    fn digital_write(
        &mut self,
        pin: u8,
        level: PinState,
        class: OutputClass,
    ) -> Result<(), OutputLocked> {
        if self.locked(class) {
            return Err(OutputLocked);
        }
        self.levels.insert(pin, level);
        let at_us = self.now();
        self.writes.push(PinWrite::Digital { pin, level, at_us });
        Ok(())
    }

    fn analog_write(&mut self, pin: u8, duty: u8, class: OutputClass) -> Result<(), PwmError> {
        if self.locked(class) {
            return Err(PwmError::Locked);
        }
        if self.pwm_unavailable.contains(&pin) {
            return Err(PwmError::Unavailable);
        }
        self.duties.insert(pin, duty);
        let at_us = self.now();
        self.writes.push(PinWrite::Analog { pin, duty, at_us });
        Ok(())
    }

    fn analog_read(&mut self, pin: u8, _averaging: u8) -> u16 {
        self.analog_script
            .get_mut(&pin)
            .and_then(VecDeque::pop_front)
            .or_else(|| self.analog_default.get(&pin).copied())
            .unwrap_or(0)
    }

    fn digital_read(&mut self, pin: u8, _averaging: u8) -> bool {
        self.digital_script
            .get_mut(&pin)
            .and_then(VecDeque::pop_front)
            .or_else(|| self.digital_default.get(&pin).copied())
            .unwrap_or(false)
    }

    fn micros(&self) -> u64 {
        self.now()
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<ModuleEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn statuses(&self) -> Vec<u8> {
        self.events.iter().map(|e| e.status).collect()
    }

    pub fn take(&mut self) -> Vec<ModuleEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn send(&mut self, event: ModuleEvent) {
        self.events.push(event);
    }
}

// ── ScriptedCounter ───────────────────────────────────────────

#[derive(Default)]
pub struct CounterState {
    pub pending: VecDeque<i32>,
    pub resets: u32,
}

/// Pulse counter whose readings are queued by the test. Clones share
/// state, so the test keeps a handle after moving one into a module.
#[derive(Clone, Default)]
pub struct ScriptedCounter(pub Rc<RefCell<CounterState>>);

#[allow(dead_code)]
impl ScriptedCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, pulses: &[i32]) {
        self.0.borrow_mut().pending.extend(pulses.iter().copied());
    }

    pub fn resets(&self) -> u32 {
        self.0.borrow().resets
    }
}

impl PulseCounter for ScriptedCounter {
    fn read_and_reset(&mut self) -> i32 {
        self.0.borrow_mut().pending.pop_front().unwrap_or(0)
    }

    fn reset(&mut self) {
        self.0.borrow_mut().resets += 1;
    }
}

// ── Rig: board + sink + helpers ───────────────────────────────

#[derive(Default)]
pub struct Rig {
    pub board: MockBoard,
    pub sink: RecordingSink,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn io(&mut self) -> Io<'_> {
        Io::new(&mut self.board, &mut self.sink)
    }

    pub fn setup(&mut self, module: &mut dyn Module) {
        module.setup(&mut self.io()).unwrap();
    }

    /// Start `command` on `module` at the current mock time.
    pub fn start(&mut self, module: &mut dyn Module, command: u8) {
        let now = self.board.now();
        module.core_mut().begin(command, now).unwrap();
    }

    /// One host tick.
    pub fn tick(&mut self, module: &mut dyn Module) {
        module.run_active_command(&mut self.io()).unwrap();
    }

    /// Start `command` and tick once.
    pub fn run(&mut self, module: &mut dyn Module, command: u8) {
        self.start(module, command);
        self.tick(module);
    }
}
