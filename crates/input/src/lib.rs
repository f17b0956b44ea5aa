//! Controller intent: key presses become actions, actions become forces,
//! torques and target velocities on a controlled body. Routes become planar
//! target velocities and a hard stop on arrival.
//!
//! # Invariants
//! - Controllers never write positions or actual velocity directly; the one
//!   exception is the brake or route arrival, which goes through the router's
//!   hard stop.
//! - Every bound key press is also reported as an `InputEvent` so an
//!   authoritative server can replay it.

pub mod action;
pub mod autonomous;
pub mod controller;

pub use action::Action;
pub use autonomous::{AutonomousController, AutopilotConfig, RouteStatus};
pub use controller::{ControllerConfig, KeyboardController};
