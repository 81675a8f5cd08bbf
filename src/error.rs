//! Unified error types for the rig module firmware.
//!
//! Every variant is `Copy`; errors travel from a module back to the host
//! loop without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Output lock rejection
// ---------------------------------------------------------------------------

/// A guarded write was refused because the output lock for its pin class
/// is engaged. No hardware state changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLocked;

impl fmt::Display for OutputLocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "output lock engaged")
    }
}

/// A PWM write that did not reach the pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmError {
    /// The output lock for the pin's class is engaged.
    Locked,
    /// No PWM channel could be attached to the pin.
    Unavailable,
}

impl fmt::Display for PwmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locked => write!(f, "{}", OutputLocked),
            Self::Unavailable => write!(f, "no PWM channel available"),
        }
    }
}

impl From<OutputLocked> for PwmError {
    fn from(_: OutputLocked) -> Self {
        Self::Locked
    }
}

// ---------------------------------------------------------------------------
// Parameter decode errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterError {
    /// The buffer ended early or a field did not decode.
    Malformed,
    /// The record decoded but bytes were left over (shape mismatch).
    TrailingBytes(usize),
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed parameter buffer"),
            Self::TrailingBytes(n) => write!(f, "{n} unexpected trailing bytes"),
        }
    }
}

// ---------------------------------------------------------------------------
// Construction-time configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The pin is reserved for board functions (status LED).
    ReservedPin(u8),
    /// The same pin was assigned twice within one module.
    DuplicatePin(u8),
    /// A torque sensor needs a non-zero zero-torque baseline.
    ZeroBaseline,
    /// Two modules in one layout share a type and id.
    DuplicateAddress { module_type: u8, module_id: u8 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReservedPin(pin) => write!(f, "pin {pin} is reserved"),
            Self::DuplicatePin(pin) => write!(f, "pin {pin} assigned more than once"),
            Self::ZeroBaseline => write!(f, "torque baseline must be non-zero"),
            Self::DuplicateAddress {
                module_type,
                module_id,
            } => write!(f, "duplicate module address {module_type}:{module_id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Module errors
// ---------------------------------------------------------------------------

/// Errors a module reports back to the host loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleError {
    /// The active command code has no handler in this module.
    UnknownCommand(u8),
    /// The module aborted earlier and has not been cleared.
    Halted,
    /// Another command is still executing.
    Busy,
    /// No module answers to the requested address.
    NoSuchModule { module_type: u8, module_id: u8 },
    /// Runtime parameters were rejected.
    Parameters(ParameterError),
    /// Construction-time configuration is invalid.
    Config(ConfigError),
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand(code) => write!(f, "unknown command {code}"),
            Self::Halted => write!(f, "module halted"),
            Self::Busy => write!(f, "module busy"),
            Self::NoSuchModule {
                module_type,
                module_id,
            } => write!(f, "no module at {module_type}:{module_id}"),
            Self::Parameters(e) => write!(f, "parameters: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl From<ParameterError> for ModuleError {
    fn from(e: ParameterError) -> Self {
        Self::Parameters(e)
    }
}

impl From<ConfigError> for ModuleError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl core::error::Error for OutputLocked {}
impl core::error::Error for PwmError {}
impl core::error::Error for ParameterError {}
impl core::error::Error for ConfigError {}
impl core::error::Error for ModuleError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, ModuleError>;
