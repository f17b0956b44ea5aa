//! Fixed-timestep scheduling: converts variable frame times into whole
//! simulation steps of uniform size.
//!
//! # Invariants
//! - Every step uses the same `fixed_dt`, regardless of frame duration.
//! - A single frame never contributes more than `max_frame_delta` seconds.
//! - Positions are pushed to the sink once per frame, after stepping.

pub mod diagnostics;
pub mod scheduler;
pub mod timer;

pub use diagnostics::TickDiagnostics;
pub use scheduler::{FixedStepScheduler, SchedulerConfig, SchedulerError};
pub use timer::FrameTimer;
