//! Scenario execution
//!
//! [`Session`] drives one adapter through the check lifecycle;
//! [`runner::run_scenario`] wraps it with fixture building, breakpoint
//! resolution, and step reporting.

pub mod runner;
pub mod session;

pub use runner::{run_scenario, RunReport};
pub use session::Session;
