//! Outbound module events.
//!
//! Every status report a module makes (a valve opening, a lick sample,
//! an encoder displacement) becomes one [`ModuleEvent`]. Events are
//! pushed into an [`EventSink`]; on target that is the bounded
//! [`EventQueue`] drained by the transport once per loop iteration.
//!
//! ```text
//! ┌──────────┐   send()   ┌──────────────┐   drain()   ┌───────────┐
//! │ Module A │──────────▶│              │────────────▶│ Transport │
//! │ Module B │──────────▶│  EventQueue  │             │  / Log    │
//! └──────────┘            └──────────────┘             └───────────┘
//! ```

use heapless::Deque;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::app::ports::EventSink;
use crate::module::ModuleAddress;

/// Command code stamped on events emitted outside any command (setup).
pub const NO_COMMAND: u8 = 0;

/// Optional value attached to an event. The variant doubles as the wire
/// type tag, so the receiver knows how wide `value` is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    U8(u8),
    U16(u16),
    U32(u32),
}

impl Payload {
    /// Wire type tag for this payload's encoding.
    pub const fn type_tag(self) -> u8 {
        match self {
            Self::U8(_) => 1,
            Self::U16(_) => 3,
            Self::U32(_) => 5,
        }
    }

    /// The carried value, widened.
    pub const fn value(self) -> u32 {
        match self {
            Self::U8(v) => v as u32,
            Self::U16(v) => v as u32,
            Self::U32(v) => v,
        }
    }
}

/// One outbound status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEvent {
    pub address: ModuleAddress,
    /// Command that produced the event, or [`NO_COMMAND`].
    pub command: u8,
    /// Module-specific status code (51 – 255).
    pub status: u8,
    pub payload: Option<Payload>,
}

impl ModuleEvent {
    /// Serialise into `buf` using postcard. Returns the used prefix.
    pub fn encode<'b>(&self, buf: &'b mut [u8]) -> Result<&'b mut [u8], postcard::Error> {
        postcard::to_slice(self, buf)
    }

    /// Decode an event produced by [`ModuleEvent::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

// ── Bounded outbound queue ────────────────────────────────────

/// Fixed-capacity FIFO of pending events.
///
/// When full, the newest event is dropped and counted; older events
/// keep their place so the receiver sees a gap rather than reordering.
pub struct EventQueue<const N: usize> {
    queue: Deque<ModuleEvent, N>,
    dropped: u32,
}

impl<const N: usize> Default for EventQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> EventQueue<N> {
    pub const fn new() -> Self {
        Self {
            queue: Deque::new(),
            dropped: 0,
        }
    }

    /// Pop the oldest pending event.
    pub fn pop(&mut self) -> Option<ModuleEvent> {
        self.queue.pop_front()
    }

    /// Hand every pending event to `handler` in FIFO order.
    pub fn drain(&mut self, mut handler: impl FnMut(ModuleEvent)) {
        while let Some(event) = self.queue.pop_front() {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Events lost to a full queue since construction.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl<const N: usize> EventSink for EventQueue<N> {
    fn send(&mut self, event: ModuleEvent) {
        if self.queue.push_back(event).is_err() {
            self.dropped = self.dropped.saturating_add(1);
            warn!(
                "event queue full, dropped status {} from {}:{}",
                event.status, event.address.module_type, event.address.module_id
            );
        }
    }
}
