//! Circular Ring Buffer (C2) — bounded in-memory store of recent Derived
//! Samples (spec §4.2).

mod ring;

pub use ring::RingBuffer;
