//! Native dynamics backend: the kernel's bodies mirrored into a rapier3d world.
//!
//! # Invariants
//! - Data flows one way per step: app accumulators in, engine state out.
//! - Every mirrored body has exactly one engine handle, keyed by `BodyId`.
//! - Construction happens off the host thread and is bounded by a timeout.

pub mod backend;
pub mod config;
pub mod error;

pub use backend::NativeBackend;
pub use config::NativeConfig;
pub use error::BackendError;
