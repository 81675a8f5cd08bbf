//! Module host: the cooperative loop every module runs under.
//!
//! [`ModuleHost`] owns the modules of one controller, routes requests to
//! them by address and gives every module with a command in flight one
//! call per tick. It knows nothing about scheduling policy
//! (recurring checks, priorities) or wire framing.
//!
//! ```text
//!  HostRequest ──▶ ┌──────────────────┐ ──▶ EventSink
//!                  │    ModuleHost     │
//!        Board ◀──▶│  valve · lick ·…  │
//!                  └──────────────────┘
//! ```

use log::{info, warn};

use crate::app::commands::HostRequest;
use crate::app::ports::PulseCounter;
use crate::config::{ControllerLayout, ModuleSpec};
use crate::drivers::{
    brake::BrakeModule, screen::ScreenModule, speaker::SpeakerModule, ttl::TtlModule,
    valve::ValveModule,
};
use crate::error::{ConfigError, ModuleError, Result};
use crate::module::{Io, Module, ModuleAddress};
use crate::sensors::{
    analog::AnalogModule, encoder::EncoderModule, lick::LickModule, torque::TorqueModule,
};

// ───────────────────────────────────────────────────────────────
// ModuleHost
// ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct ModuleHost {
    modules: Vec<Box<dyn Module>>,
}

impl ModuleHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every module named by `layout`. `counter` supplies the pulse
    /// counter for each encoder slot.
    pub fn from_layout<C, F>(layout: &ControllerLayout, mut counter: F) -> core::result::Result<Self, ConfigError>
    where
        C: PulseCounter + 'static,
        F: FnMut() -> C,
    {
        layout.validate()?;
        let mut host = Self::new();
        for spec in &layout.modules {
            let module: Box<dyn Module> = match *spec {
                ModuleSpec::Valve { id, config } => Box::new(ValveModule::new(id, config)?),
                ModuleSpec::Brake { id, config } => Box::new(BrakeModule::new(id, config)?),
                ModuleSpec::Screen { id, config } => Box::new(ScreenModule::new(id, config)?),
                ModuleSpec::Speaker { id, config } => Box::new(SpeakerModule::new(id, config)?),
                ModuleSpec::Ttl { id, config } => Box::new(TtlModule::new(id, config)?),
                ModuleSpec::Lick { id, config } => Box::new(LickModule::new(id, config)?),
                ModuleSpec::Analog { id, config } => Box::new(AnalogModule::new(id, config)?),
                ModuleSpec::Torque { id, config } => Box::new(TorqueModule::new(id, config)?),
                ModuleSpec::Encoder { id, config } => {
                    Box::new(EncoderModule::new(id, config, counter())?)
                }
            };
            host.add(module)?;
        }
        info!(
            "host built {} modules for {:?} (controller {})",
            host.len(),
            layout.target,
            layout.target.controller_id()
        );
        Ok(host)
    }

    /// Register a module. Addresses must be unique.
    pub fn add(&mut self, module: Box<dyn Module>) -> core::result::Result<(), ConfigError> {
        let address = module.address();
        if self.find(address).is_some() {
            return Err(ConfigError::DuplicateAddress {
                module_type: address.module_type,
                module_id: address.module_id,
            });
        }
        self.modules.push(module);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn addresses(&self) -> impl Iterator<Item = ModuleAddress> + '_ {
        self.modules.iter().map(|m| m.address())
    }

    pub fn module(&self, address: ModuleAddress) -> Option<&dyn Module> {
        self.find(address).map(|i| self.modules[i].as_ref())
    }

    fn find(&self, address: ModuleAddress) -> Option<usize> {
        self.modules.iter().position(|m| m.address() == address)
    }

    fn module_mut(&mut self, address: ModuleAddress) -> Result<&mut Box<dyn Module>> {
        match self.find(address) {
            Some(i) => Ok(&mut self.modules[i]),
            None => Err(ModuleError::NoSuchModule {
                module_type: address.module_type,
                module_id: address.module_id,
            }),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Run `setup` on every module, in registration order.
    pub fn setup_all(&mut self, io: &mut Io<'_>) -> Result<()> {
        for module in &mut self.modules {
            module.setup(io)?;
        }
        info!("host: {} modules set up", self.modules.len());
        Ok(())
    }

    // ── Requests ──────────────────────────────────────────────

    /// Route one inbound request.
    pub fn handle(&mut self, request: &HostRequest, now_us: u64) -> Result<()> {
        match request {
            HostRequest::Configure {
                address,
                parameters,
            } => self.configure(*address, parameters),
            HostRequest::Run { address, command } => self.submit(*address, *command, now_us),
            HostRequest::ClearHalt { address } => self.clear_halt(*address),
        }
    }

    /// Replace a module's runtime parameters. Refused while a command is
    /// in flight; parameters are read-only until it finishes.
    pub fn configure(&mut self, address: ModuleAddress, bytes: &[u8]) -> Result<()> {
        let module = self.module_mut(address)?;
        if module.core().is_busy() {
            warn!("host: {} busy, parameters not applied", address);
            return Err(ModuleError::Busy);
        }
        module.apply_parameters(bytes)?;
        Ok(())
    }

    /// Start `command` on a module. Refused while the module is busy or
    /// halted.
    pub fn submit(&mut self, address: ModuleAddress, command: u8, now_us: u64) -> Result<()> {
        self.module_mut(address)?.core_mut().begin(command, now_us)
    }

    pub fn clear_halt(&mut self, address: ModuleAddress) -> Result<()> {
        self.module_mut(address)?.core_mut().clear_halt();
        Ok(())
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Give every module with a command in flight one call.
    ///
    /// A module whose active command has no handler is returned to Idle
    /// and reported in the returned list; the other modules still run.
    pub fn tick(&mut self, io: &mut Io<'_>) -> Vec<(ModuleAddress, ModuleError)> {
        let mut failures = Vec::new();
        for module in &mut self.modules {
            if !module.core().is_busy() {
                continue;
            }
            if let Err(e) = module.run_active_command(io) {
                let address = module.address();
                warn!("host: {} failed: {}", address, e);
                module.core_mut().reset();
                failures.push((address, e));
            }
        }
        failures
    }

    /// True while any module still has a command in flight.
    pub fn any_busy(&self) -> bool {
        self.modules.iter().any(|m| m.core().is_busy())
    }
}
