//! Debuggee fixture handling
//!
//! A fixture is the small program a scenario debugs. It is either compiled
//! from a single source file with debug info, or named as a prebuilt binary.
//! Breakpoint lines are resolved from marker comments in the source so that
//! editing the fixture never silently invalidates a scenario.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tempfile::TempDir;
use tokio::process::Command;

use crate::common::config::BuildConfig;
use crate::common::{Error, Result};

/// A built (or prebuilt) debuggee
#[derive(Debug)]
pub struct Fixture {
    /// Path to the executable
    pub binary: PathBuf,
    /// Source file the binary was built from, if any
    pub source: Option<PathBuf>,
    /// Scratch directory holding the build output; removed on drop
    _scratch: Option<TempDir>,
}

impl Fixture {
    /// Use a prebuilt binary as the fixture
    pub fn prebuilt(binary: PathBuf) -> Self {
        Self {
            binary,
            source: None,
            _scratch: None,
        }
    }

    /// Compile a source file into a scratch directory
    ///
    /// Compiler diagnostics are captured and returned on failure.
    pub async fn build(
        source: &Path,
        build: &BuildConfig,
        extra_flags: &[String],
    ) -> Result<Self> {
        let scratch = TempDir::with_prefix("dapcheck-fixture-")?;

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "a.out".to_string());
        let binary = scratch.path().join(stem);

        tracing::info!(
            source = %source.display(),
            compiler = %build.compiler,
            "Building fixture"
        );

        let output = Command::new(&build.compiler)
            .args(&build.flags)
            .args(extra_flags)
            .arg("-o")
            .arg(&binary)
            .arg(source)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::FixtureBuild {
                source: source.display().to_string(),
                detail: format!("failed to run {}: {}", build.compiler, e),
            })?;

        if !output.status.success() {
            return Err(Error::FixtureBuild {
                source: source.display().to_string(),
                detail: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(Self {
            binary,
            source: Some(source.to_path_buf()),
            _scratch: Some(scratch),
        })
    }
}

/// Find the 1-based line of the first occurrence of a marker comment
///
/// The breakpoint goes on the line containing the marker itself, matching
/// the usual `// Set break point at this line.` convention.
pub fn marker_line(source: &Path, marker: &str) -> Result<u32> {
    let content = std::fs::read_to_string(source).map_err(|e| Error::FileRead {
        path: source.display().to_string(),
        error: e.to_string(),
    })?;

    content
        .lines()
        .position(|line| line.contains(marker))
        .map(|idx| (idx + 1) as u32)
        .ok_or_else(|| Error::MarkerNotFound {
            marker: marker.to_string(),
            file: source.display().to_string(),
        })
}
