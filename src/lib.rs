#![forbid(unsafe_code)]

//! Realtime EV telemetry triangulation and processing pipeline: a
//! browser-resident core that turns a broker stream and a durable store
//! into a chronologically ordered sample buffer, derived physical
//! quantities, KPIs, and quality-scored alerts.

pub mod buffer;
#[cfg(feature = "cli")]
pub mod cli;
pub mod clockid;
pub mod controller;
pub mod core;
pub mod demo;
pub mod derive;
pub mod kpi;
pub mod logging;
pub mod model;
pub mod quality;
pub mod render;
pub mod transport;
pub mod triangulate;
pub mod worker;
