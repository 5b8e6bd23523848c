//! dapcheck - scripted expression checks against DAP debug adapters
//!
//! This library builds a debuggee fixture, runs it to a marked source line
//! through the Debug Adapter Protocol, and asserts on a scripted sequence of
//! expression evaluations.

pub mod check;
pub mod cli;
pub mod commands;
pub mod common;
pub mod dap;
pub mod fixture;
pub mod harness;
pub mod scenario;

// Re-export commonly used types
pub use common::{Error, Result};
pub use harness::{run_scenario, RunReport, Session};
pub use scenario::Scenario;
