//! Rig controller firmware: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │   HardwareBoard (Board)   LogEventSink   MonotonicClock      │
//! │                                                              │
//! │  ───────────────── Port Trait Boundary ─────────────────     │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │            ModuleHost (pure logic)                     │  │
//! │  │  valve · brake · screen · ttl · lick · torque · encoder│  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  Poll loop: recurring checks · tick · drain events           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_svc::hal::delay::FreeRtos;
use embedded_hal::digital::PinState;
use log::{debug, info, warn};

use rigmodules::adapters::hardware::HardwareBoard;
use rigmodules::adapters::log_sink::LogEventSink;
use rigmodules::app::host::ModuleHost;
use rigmodules::app::ports::{Board, EventSink};
use rigmodules::config::{ControllerLayout, ControllerTarget, ModuleSpec, TtlRole};
use rigmodules::drivers::{self, ttl::TtlCommand};
use rigmodules::error::ModuleError;
use rigmodules::events::EventQueue;
use rigmodules::module::{Io, Module, ModuleAddress};
use rigmodules::sensors::{
    analog::AnalogCommand, encoder::EncoderCommand, lick::LickCommand,
    quadrature::QuadratureDecoder, torque::TorqueCommand,
};

/// Which controller this image is flashed onto.
const TARGET: ControllerTarget = ControllerTarget::Actor;

/// Outbound events buffered between drains.
const EVENT_QUEUE_DEPTH: usize = 64;

/// Yield between poll iterations when no command spans ticks, so the
/// FreeRTOS idle task (and its watchdog) gets to run.
const IDLE_POLL_MS: u32 = 1;

static ENCODER_DECODER: QuadratureDecoder = QuadratureDecoder::new();

/// Command a sensor module should run on every idle poll, if any.
fn recurring_check(spec: &ModuleSpec) -> Option<(ModuleAddress, u8)> {
    let code = match spec {
        ModuleSpec::Ttl { config, .. } if config.role == TtlRole::Input => {
            TtlCommand::CheckState as u8
        }
        ModuleSpec::Lick { .. } => LickCommand::CheckState as u8,
        ModuleSpec::Analog { .. } => AnalogCommand::CheckState as u8,
        ModuleSpec::Torque { .. } => TorqueCommand::CheckState as u8,
        ModuleSpec::Encoder { .. } => EncoderCommand::CheckState as u8,
        _ => return None,
    };
    Some((spec.address(), code))
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  rigmodules v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    drivers::hw_init::init_peripherals()?;

    // ── 2. Board bring-up ─────────────────────────────────────
    let mut board = HardwareBoard::new();
    for &pin in TARGET.parked_pins() {
        board.configure_output(pin, PinState::Low);
    }

    // ── 3. Modules ────────────────────────────────────────────
    let layout = ControllerLayout::for_target(TARGET);
    let mut host = ModuleHost::from_layout(&layout, || &ENCODER_DECODER)?;
    let checks: Vec<(ModuleAddress, u8)> = layout.modules.iter().filter_map(recurring_check).collect();

    let mut queue: EventQueue<EVENT_QUEUE_DEPTH> = EventQueue::new();
    let mut log_sink = LogEventSink::new();
    {
        let mut io = Io::new(&mut board, &mut queue);
        host.setup_all(&mut io)?;
    }
    queue.drain(|event| log_sink.send(event));

    // The ISR may only run once setup has configured the encoder inputs.
    for spec in &layout.modules {
        if let ModuleSpec::Encoder { config, .. } = spec {
            drivers::hw_init::attach_quadrature(config.pin_a, config.pin_b, &ENCODER_DECODER)?;
        }
    }

    info!(
        "controller {} ready with {} modules, entering poll loop",
        TARGET.controller_id(),
        host.len()
    );

    // ── 4. Poll loop ──────────────────────────────────────────
    let mut dropped_seen = 0;
    loop {
        let now = board.micros();
        for &(address, command) in &checks {
            let idle = host.module(address).is_some_and(|m| !m.core().is_busy());
            if !idle {
                continue;
            }
            match host.submit(address, command, now) {
                Ok(()) | Err(ModuleError::Halted) => {}
                Err(e) => debug!("poll: {} check refused: {}", address, e),
            }
        }

        let busy = {
            let mut io = Io::new(&mut board, &mut queue);
            for (address, e) in host.tick(&mut io) {
                warn!("poll: {} reset after {}", address, e);
            }
            host.any_busy()
        };

        queue.drain(|event| log_sink.send(event));
        if queue.dropped() != dropped_seen {
            dropped_seen = queue.dropped();
            warn!("poll: {} events lost so far", dropped_seen);
        }

        if !busy {
            FreeRtos::delay_ms(IDLE_POLL_MS);
        }
    }
}
