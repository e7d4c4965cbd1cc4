//! Synthetic broker/store fixtures driving the `evtelctl demo` subcommand
//! and available to integration tests.

mod fixtures;

pub use fixtures::{synthetic_sample, SyntheticBroker, SyntheticStore};
