//! Developer tooling: read-only inspection of a running simulation.
//!
//! # Invariants
//! - Tools never mutate simulation state.

pub mod inspector;

pub use inspector::{BodyInfo, SimulationInspector, SimulationSummary};
