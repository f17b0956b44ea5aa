//! Network reconciliation client: probes an authoritative simulation server,
//! forwards controller input to it, and queues the snapshots it pushes back.
//!
//! # Invariants
//! - At most one connection attempt per client lifetime, unless explicitly
//!   re-armed with [`NetworkClient::reset_and_retry`].
//! - Any failure is permanent for the attempt and reported once.
//! - Snapshots are only queued here; blending happens in the simulation step.

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;

pub use client::NetworkClient;
pub use config::NetworkConfig;
pub use error::NetError;
pub use protocol::{ClientMessage, ServerMessage, WireBody, WireVec3};
