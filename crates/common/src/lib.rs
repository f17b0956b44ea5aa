//! Shared types for the twinsim physics core.
//!
//! # Invariants
//! - Body identity is a stable opaque string, matched verbatim against
//!   authoritative snapshots.

pub mod types;

pub use types::{BodyId, BodySnapshot, InputEvent};
