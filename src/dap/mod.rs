//! Debug Adapter Protocol (DAP) client
//!
//! Implements the client side of DAP for driving adapters like lldb-dap.

pub mod client;
pub mod codec;
pub mod types;

pub use client::DapClient;
pub use types::*;
