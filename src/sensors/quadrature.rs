//! Lock-free quadrature decoder.
//!
//! Channel A and B edges are fed in from GPIO interrupts; the main loop
//! drains the signed count through [`PulseCounter`]. Decoding uses the
//! usual 16-entry transition table indexed by (previous state, new state)
//! where a state is `(a << 1) | b`. Invalid double transitions (both
//! channels flipped between two edges) count as zero.
//!
//! A rising before B counts up, B rising before A counts down:
//!
//! ```text
//! (a, b)  00 → 10 → 11 → 01 → 00   = +4
//! (a, b)  00 → 01 → 11 → 10 → 00   = -4
//! ```

use core::sync::atomic::{AtomicI32, AtomicU8, Ordering};

use crate::app::ports::PulseCounter;

#[rustfmt::skip]
const TRANSITIONS: [i8; 16] = [
//  new: 00  01  10  11
         0, -1,  1,  0, // prev 00
         1,  0,  0, -1, // prev 01
        -1,  0,  0,  1, // prev 10
         0,  1, -1,  0, // prev 11
];

pub struct QuadratureDecoder {
    state: AtomicU8,
    count: AtomicI32,
}

impl Default for QuadratureDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl QuadratureDecoder {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(0),
            count: AtomicI32::new(0),
        }
    }

    /// Set the current channel levels without counting. Call once before
    /// enabling interrupts.
    pub fn seed(&self, a: bool, b: bool) {
        self.state.store(encode(a, b), Ordering::Release);
    }

    /// Feed the channel levels sampled in an edge interrupt.
    pub fn update(&self, a: bool, b: bool) {
        let new = encode(a, b);
        let prev = self.state.swap(new, Ordering::AcqRel);
        let step = TRANSITIONS[usize::from((prev << 2) | new)];
        if step != 0 {
            self.count.fetch_add(i32::from(step), Ordering::AcqRel);
        }
    }

    /// Pulses counted since the last reset.
    pub fn count(&self) -> i32 {
        self.count.load(Ordering::Acquire)
    }
}

fn encode(a: bool, b: bool) -> u8 {
    (u8::from(a) << 1) | u8::from(b)
}

impl PulseCounter for &QuadratureDecoder {
    fn read_and_reset(&mut self) -> i32 {
        self.count.swap(0, Ordering::AcqRel)
    }

    fn reset(&mut self) {
        self.count.store(0, Ordering::Release);
    }
}
