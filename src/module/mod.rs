//! The contract every hardware module implements.
//!
//! A module owns its runtime parameters and an [`ExecutionState`]. The
//! host calls [`Module::run_active_command`] once per loop iteration
//! while a command is in flight; the module performs at most the action
//! belonging to its current stage and returns. Waiting is a check of
//! elapsed time against the stage anchor, never a sleep.
//!
//! ```text
//!  host tick ──▶ run_active_command ──▶ handler(stage N)
//!                                         ├─ write + advance ──▶ stage N+1
//!                                         ├─ wait not elapsed ─▶ return
//!                                         ├─ complete ────────▶ Idle
//!                                         └─ lock rejected ───▶ event + Halted
//! ```

pub mod execution;
pub mod params;

use core::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{Board, EventSink};
use crate::error::{ParameterError, Result};
use crate::events::{ModuleEvent, NO_COMMAND, Payload};

pub use execution::ExecutionState;

// ───────────────────────────────────────────────────────────────
// Addressing
// ───────────────────────────────────────────────────────────────

/// Identity of one module instance: its family code and instance id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleAddress {
    pub module_type: u8,
    pub module_id: u8,
}

impl ModuleAddress {
    pub const fn new(module_type: u8, module_id: u8) -> Self {
        Self {
            module_type,
            module_id,
        }
    }
}

impl fmt::Display for ModuleAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module_type, self.module_id)
    }
}

// ───────────────────────────────────────────────────────────────
// Per-call I/O bundle
// ───────────────────────────────────────────────────────────────

/// Hardware and outbound channel lent to a module for one call.
pub struct Io<'a> {
    pub board: &'a mut dyn Board,
    pub sink: &'a mut dyn EventSink,
}

impl<'a> Io<'a> {
    pub fn new(board: &'a mut dyn Board, sink: &'a mut dyn EventSink) -> Self {
        Self { board, sink }
    }

    pub fn now_us(&self) -> u64 {
        self.board.micros()
    }
}

// ───────────────────────────────────────────────────────────────
// Shared execution core
// ───────────────────────────────────────────────────────────────

/// Address plus execution state, embedded in every module.
///
/// The stage primitives (`advance`, `complete`, `abort`, `wait_micros`)
/// are what the staged handlers are written against.
#[derive(Debug, Clone)]
pub struct ModuleCore {
    address: ModuleAddress,
    state: ExecutionState,
}

impl ModuleCore {
    pub const fn new(address: ModuleAddress) -> Self {
        Self {
            address,
            state: ExecutionState::Idle,
        }
    }

    pub fn address(&self) -> ModuleAddress {
        self.address
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    // ── Kernel side ──────────────────────────────────────────

    /// Make `command` the active command, starting at stage 1.
    pub fn begin(&mut self, command: u8, now_us: u64) -> Result<()> {
        self.state.begin(command, now_us)?;
        debug!("{} begin command {}", self.address, command);
        Ok(())
    }

    /// Return a halted module to Idle so it accepts commands again.
    pub fn clear_halt(&mut self) {
        if self.state.clear_halt() {
            debug!("{} halt cleared", self.address);
        }
    }

    /// Force Idle regardless of state.
    pub fn reset(&mut self) {
        self.state = ExecutionState::Idle;
    }

    pub fn active_command(&self) -> Option<u8> {
        self.state.active_command()
    }

    pub fn stage(&self) -> u8 {
        self.state.stage()
    }

    pub fn is_halted(&self) -> bool {
        self.state.is_halted()
    }

    pub fn is_busy(&self) -> bool {
        self.state.active_command().is_some()
    }

    // ── Module side ──────────────────────────────────────────

    /// Move to the next stage, re-anchoring the wait origin at now.
    pub fn advance(&mut self, io: &Io<'_>) {
        self.state.advance(io.now_us());
        debug!("{} stage -> {}", self.address, self.state.stage());
    }

    /// Finish the active command.
    pub fn complete(&mut self) {
        if let Some(command) = self.state.active_command() {
            debug!("{} command {} complete", self.address, command);
        }
        self.state.complete();
    }

    /// Terminate the active command and halt the module.
    pub fn abort(&mut self) {
        if let Some(command) = self.state.active_command() {
            warn!("{} command {} aborted", self.address, command);
        }
        self.state.abort();
    }

    /// True once `duration_us` has elapsed since the current stage began.
    pub fn wait_micros(&self, io: &Io<'_>, duration_us: u64) -> bool {
        self.state.elapsed(io.now_us(), duration_us)
    }

    /// Emit a status-only event.
    pub fn send(&self, io: &mut Io<'_>, status: u8) {
        io.sink.send(self.event(status, None));
    }

    /// Emit a status event carrying a value.
    pub fn send_value(&self, io: &mut Io<'_>, status: u8, payload: Payload) {
        io.sink.send(self.event(status, Some(payload)));
    }

    /// Emit a failure `status` and abort the active command.
    pub fn reject(&mut self, io: &mut Io<'_>, status: u8) {
        warn!("{} rejected with status {}", self.address, status);
        self.send(io, status);
        self.abort();
    }

    fn event(&self, status: u8, payload: Option<Payload>) -> ModuleEvent {
        ModuleEvent {
            address: self.address,
            command: self.state.active_command().unwrap_or(NO_COMMAND),
            status,
            payload,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Module trait
// ───────────────────────────────────────────────────────────────

/// Lifecycle shared by every actuator and sensor module.
pub trait Module {
    fn core(&self) -> &ModuleCore;

    fn core_mut(&mut self) -> &mut ModuleCore;

    /// Configure pins, restore default parameters and emit any initial
    /// state event.
    fn setup(&mut self, io: &mut Io<'_>) -> Result<()>;

    /// Replace the runtime parameters from a postcard buffer. Nothing
    /// changes on failure.
    fn apply_parameters(&mut self, bytes: &[u8]) -> core::result::Result<(), ParameterError>;

    /// Run one tick of the active command.
    ///
    /// `Ok` whether or not the command finished this tick; also `Ok` when
    /// nothing is active. `Err(UnknownCommand)` when the code has no
    /// handler.
    fn run_active_command(&mut self, io: &mut Io<'_>) -> Result<()>;

    fn address(&self) -> ModuleAddress {
        self.core().address()
    }
}
