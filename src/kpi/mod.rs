//! KPI Calculator (C4) — aggregate statistics over a Ring Buffer snapshot
//! (spec §4.4).

mod calculator;

pub use calculator::{BatteryCurve, KpiCalculator, KpiSnapshot};
