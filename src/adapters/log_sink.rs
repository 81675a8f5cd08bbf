//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one JSON line per module event to
//! the ESP-IDF logger (UART / USB-CDC in production). A binary serial
//! transport would implement the same trait with [`ModuleEvent::encode`].

use log::{info, warn};

use crate::app::ports::EventSink;
use crate::events::ModuleEvent;

#[derive(Default)]
pub struct LogEventSink {
    sent: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events written since construction.
    pub fn sent(&self) -> u32 {
        self.sent
    }
}

impl EventSink for LogEventSink {
    fn send(&mut self, event: ModuleEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => info!("EVENT | {}", line),
            Err(e) => warn!("EVENT | {} status {} (unserialisable: {})", event.address, event.status, e),
        }
        self.sent = self.sent.wrapping_add(1);
    }
}
