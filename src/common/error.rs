//! Error types for the check harness
//!
//! Error messages name the failing expression, file, or adapter so that a
//! failed scenario can be diagnosed from the report alone.

use std::fmt;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
///
/// Display, Error, and From are implemented by hand because the
/// `FixtureBuild::source` field is a plain String (the fixture source file
/// name), which thiserror's derive would insist on treating as an error
/// source.
#[derive(Debug)]
pub enum Error {
    // === Adapter Errors ===
    AdapterNotFound { name: String, searched: String },

    AdapterStartFailed(String),

    AdapterCrashed,

    // === DAP Protocol Errors ===
    DapProtocol(String),

    DapRequestFailed { command: String, message: String },

    // === Fixture Errors ===
    FixtureBuild { source: String, detail: String },

    MarkerNotFound { marker: String, file: String },

    BreakpointUnverified { location: String, reason: String },

    // === Check Errors ===
    Check { expression: String, detail: String },

    UnexpectedStop(String),

    ScenariosFailed { failed: usize, total: usize },

    // === Timeout Errors ===
    RequestTimeout(u64),

    StopTimeout(u64),

    // === Scenario/Configuration Errors ===
    Scenario(String),

    Config(String),

    ConfigParse(String),

    // === IO Errors ===
    Io(io::Error),

    FileRead { path: String, error: String },

    // === Serialization Errors ===
    Json(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdapterNotFound { name, searched } => {
                write!(f, "Debug adapter '{name}' not found. Searched: {searched}")
            }
            Self::AdapterStartFailed(detail) => {
                write!(f, "Debug adapter failed to start: {detail}")
            }
            Self::AdapterCrashed => write!(f, "Debug adapter exited unexpectedly"),
            Self::DapProtocol(detail) => write!(f, "DAP protocol error: {detail}"),
            Self::DapRequestFailed { command, message } => {
                write!(f, "DAP request '{command}' failed: {message}")
            }
            Self::FixtureBuild { source, detail } => {
                write!(f, "Failed to build fixture '{source}': {detail}")
            }
            Self::MarkerNotFound { marker, file } => {
                write!(f, "Breakpoint marker '{marker}' not found in {file}")
            }
            Self::BreakpointUnverified { location, reason } => {
                write!(f, "Breakpoint at {location} was not verified: {reason}")
            }
            Self::Check { expression, detail } => {
                write!(f, "Check failed for '{expression}': {detail}")
            }
            Self::UnexpectedStop(detail) => write!(f, "Unexpected stop: {detail}"),
            Self::ScenariosFailed { failed, total } => {
                write!(f, "{failed} of {total} scenarios failed")
            }
            Self::RequestTimeout(secs) => {
                write!(f, "DAP request timed out after {secs} seconds")
            }
            Self::StopTimeout(secs) => {
                write!(f, "Timed out after {secs} seconds waiting for the program to stop")
            }
            Self::Scenario(detail) => write!(f, "Scenario error: {detail}"),
            Self::Config(detail) => write!(f, "Configuration error: {detail}"),
            Self::ConfigParse(detail) => write!(f, "Invalid configuration file: {detail}"),
            Self::Io(error) => write!(f, "IO error: {error}"),
            Self::FileRead { path, error } => {
                write!(f, "Failed to read file '{path}': {error}")
            }
            Self::Json(error) => write!(f, "JSON error: {error}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(error) => Some(error),
            Self::Json(error) => Some(error),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error)
    }
}

impl Error {
    /// Create an adapter not found error with search paths
    pub fn adapter_not_found<S: AsRef<str>>(name: &str, paths: &[S]) -> Self {
        Self::AdapterNotFound {
            name: name.to_string(),
            searched: paths.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(", "),
        }
    }

    /// Create a DAP request failed error
    pub fn dap_request_failed(command: &str, message: &str) -> Self {
        Self::DapRequestFailed {
            command: command.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a check failure for an expression
    pub fn check(expression: &str, detail: impl Into<String>) -> Self {
        Self::Check {
            expression: expression.to_string(),
            detail: detail.into(),
        }
    }
}
