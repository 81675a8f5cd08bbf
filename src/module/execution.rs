//! Per-module command execution state.
//!
//! ```text
//!            begin(cmd)             advance()
//!   Idle ──────────────▶ Running{stage 1} ──▶ Running{stage 2} ──▶ …
//!    ▲                         │                       │
//!    │        complete()       │        abort()        ▼
//!    └─────────────────────────┴─────────────────▶ Halted{cmd}
//!                                                      │
//!    ◀──────────────────── clear_halt() ───────────────┘
//! ```
//!
//! `stage` only moves forward while a command runs. Each stage records the
//! microsecond timestamp at which it was entered; non-blocking waits
//! measure from that anchor.

use serde::{Deserialize, Serialize};

use crate::error::ModuleError;

/// Stage number a freshly started command begins at.
pub const FIRST_STAGE: u8 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionState {
    /// No command in flight.
    #[default]
    Idle,
    /// A command is in flight.
    Running {
        command: u8,
        stage: u8,
        /// `micros()` when the current stage was entered.
        anchor_us: u64,
    },
    /// The last command aborted; commands are refused until cleared.
    Halted { command: u8 },
}

impl ExecutionState {
    /// Start `command` at the first stage.
    pub fn begin(&mut self, command: u8, now_us: u64) -> Result<(), ModuleError> {
        match *self {
            Self::Idle => {
                *self = Self::Running {
                    command,
                    stage: FIRST_STAGE,
                    anchor_us: now_us,
                };
                Ok(())
            }
            Self::Running { .. } => Err(ModuleError::Busy),
            Self::Halted { .. } => Err(ModuleError::Halted),
        }
    }

    /// Move to the next stage and re-anchor the elapsed-time origin.
    /// No effect unless a command is running.
    pub fn advance(&mut self, now_us: u64) {
        if let Self::Running {
            stage, anchor_us, ..
        } = self
        {
            *stage = stage.saturating_add(1);
            *anchor_us = now_us;
        }
    }

    /// Finish the running command successfully.
    pub fn complete(&mut self) {
        if matches!(self, Self::Running { .. }) {
            *self = Self::Idle;
        }
    }

    /// Terminate the running command and halt.
    pub fn abort(&mut self) {
        if let Self::Running { command, .. } = *self {
            *self = Self::Halted { command };
        }
    }

    /// Leave the halted state. Returns whether the module was halted.
    pub fn clear_halt(&mut self) -> bool {
        if matches!(self, Self::Halted { .. }) {
            *self = Self::Idle;
            true
        } else {
            false
        }
    }

    /// Running command code, if any.
    pub fn active_command(&self) -> Option<u8> {
        match *self {
            Self::Running { command, .. } => Some(command),
            _ => None,
        }
    }

    /// Current stage, or 0 when nothing is running.
    pub fn stage(&self) -> u8 {
        match *self {
            Self::Running { stage, .. } => stage,
            _ => 0,
        }
    }

    /// True once `duration_us` has elapsed since the current stage began.
    /// Always false when nothing is running.
    pub fn elapsed(&self, now_us: u64, duration_us: u64) -> bool {
        match *self {
            Self::Running { anchor_us, .. } => now_us.saturating_sub(anchor_us) >= duration_us,
            _ => false,
        }
    }

    pub fn is_halted(&self) -> bool {
        matches!(self, Self::Halted { .. })
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}
