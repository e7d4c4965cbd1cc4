//! Derivation Engine (C3) — stateful causal filters converting raw
//! IMU/electrical samples into physically meaningful signals (spec §4.3).

mod engine;

pub use engine::DerivationEngine;
