//! Backend router: one stepping surface over the analytic integrator and the
//! native engine, with asynchronous native bring-up and silent fallback.
//!
//! # Invariants
//! - Exactly one backend steps the world per tick.
//! - At most one native initialization is in flight; its result is applied
//!   only at a step boundary.
//! - A failed initialization is reported once per attempt cycle and never
//!   retried until [`Router::reset_native`].

pub mod config;
pub mod mode;
pub mod registry;
pub mod router;

pub use config::RouterConfig;
pub use mode::{InitObserver, InitStatus, Mode};
pub use registry::RegistryHandle;
pub use router::Router;
