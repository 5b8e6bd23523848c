//! Scenario configuration
//!
//! Scenarios are YAML files describing one scripted check sequence: which
//! fixture to debug, where to stop, and the expression checks to run there.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::check::ExprExpect;
use crate::common::{Error, Result};

/// A complete scenario loaded from a YAML file
#[derive(Debug, Deserialize)]
pub struct Scenario {
    /// Name of the scenario
    pub name: String,
    /// Optional description of what the scenario verifies
    pub description: Option<String>,
    /// The program to debug
    pub fixture: FixtureSpec,
    /// Debug adapter to use (default from config)
    pub adapter: Option<String>,
    /// Where to stop before running the steps
    pub breakpoint: BreakpointSpec,
    /// The sequence of steps to execute at the stop
    pub steps: Vec<Step>,
}

/// The program a scenario debugs
#[derive(Debug, Deserialize)]
pub struct FixtureSpec {
    /// Source file to compile (relative paths resolve against the scenario file)
    pub source: Option<PathBuf>,
    /// Prebuilt binary to use instead of compiling
    pub program: Option<PathBuf>,
    /// Compiler override for this fixture (default from config)
    pub compiler: Option<String>,
    /// Extra compiler flags for this fixture
    #[serde(default)]
    pub flags: Vec<String>,
}

/// Where the initial breakpoint goes
#[derive(Debug, Deserialize)]
pub struct BreakpointSpec {
    /// Marker comment to search for in the source
    pub marker: Option<String>,
    /// Explicit 1-based line number
    pub line: Option<u32>,
    /// Source file for the breakpoint; defaults to the fixture source
    pub file: Option<PathBuf>,
}

/// A single step in the check sequence
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Run a debugger console command (e.g. a settings toggle)
    Command {
        /// The console command to execute
        command: String,
        /// Optional expectations for the command
        expect: Option<CommandExpect>,
    },
    /// Evaluate an expression and check the result
    ExpectExpr {
        /// Expression to evaluate
        expression: String,
        /// Expected result
        #[serde(default)]
        expect: ExprExpect,
    },
    /// Resume execution and wait for the next stop
    Continue {
        /// Expected stop properties
        expect: Option<StopExpect>,
    },
}

/// Expectations for a console command
#[derive(Debug, Deserialize)]
pub struct CommandExpect {
    /// Whether the command should succeed (default: true)
    pub success: Option<bool>,
}

/// Expectations for a stop event
#[derive(Debug, Deserialize)]
pub struct StopExpect {
    /// Expected stop reason (e.g. "breakpoint", "step")
    pub reason: Option<String>,
    /// Expected 1-based line number
    pub line: Option<u32>,
}

impl Scenario {
    /// Load and validate a scenario file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        let mut scenario: Scenario = serde_yaml::from_str(&content)
            .map_err(|e| Error::Scenario(format!("Failed to parse '{}': {}", path.display(), e)))?;

        let base = path.parent().unwrap_or(Path::new("."));
        scenario.resolve_paths(base);
        scenario.validate()?;
        Ok(scenario)
    }

    /// Resolve relative paths against the scenario file's directory
    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&p);
            }
        };
        if let Some(source) = &mut self.fixture.source {
            resolve(source);
        }
        if let Some(program) = &mut self.fixture.program {
            resolve(program);
        }
        if let Some(file) = &mut self.breakpoint.file {
            resolve(file);
        }
    }

    fn validate(&self) -> Result<()> {
        match (&self.fixture.source, &self.fixture.program) {
            (None, None) => {
                return Err(Error::Scenario(
                    "fixture needs either 'source' or 'program'".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(Error::Scenario(
                    "fixture cannot have both 'source' and 'program'".to_string(),
                ))
            }
            _ => {}
        }

        if self.breakpoint.marker.is_none() && self.breakpoint.line.is_none() {
            return Err(Error::Scenario(
                "breakpoint needs either 'marker' or 'line'".to_string(),
            ));
        }

        // A marker needs a source file to scan
        if self.breakpoint.marker.is_some() && self.breakpoint_source().is_none() {
            return Err(Error::Scenario(
                "breakpoint 'marker' requires a fixture 'source' or breakpoint 'file'".to_string(),
            ));
        }

        if self.steps.is_empty() {
            return Err(Error::Scenario("scenario has no steps".to_string()));
        }

        Ok(())
    }

    /// Source file the breakpoint is set in
    pub fn breakpoint_source(&self) -> Option<&Path> {
        self.breakpoint
            .file
            .as_deref()
            .or(self.fixture.source.as_deref())
    }
}
