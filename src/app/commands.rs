//! Inbound requests to the module host.
//!
//! These are what an external dispatcher (serial link, scheduler, test
//! harness) asks of the [`ModuleHost`](super::host::ModuleHost): push new
//! runtime parameters, start a command, or clear a halted module.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::module::ModuleAddress;

/// Largest parameter record any module accepts, in bytes.
pub const MAX_PARAMETER_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostRequest {
    /// Replace a module's runtime parameters (postcard-encoded).
    Configure {
        address: ModuleAddress,
        parameters: Vec<u8, MAX_PARAMETER_BYTES>,
    },

    /// Start `command` on a module.
    Run { address: ModuleAddress, command: u8 },

    /// Allow a halted module to accept commands again.
    ClearHalt { address: ModuleAddress },
}

impl HostRequest {
    pub fn address(&self) -> ModuleAddress {
        match self {
            Self::Configure { address, .. }
            | Self::Run { address, .. }
            | Self::ClearHalt { address } => *address,
        }
    }
}
