//! CLI command definitions

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run one or more scenario files
    Run {
        /// Paths to YAML scenario files
        #[arg(required = true)]
        scenarios: Vec<PathBuf>,

        /// Debug adapter to use, overriding scenario and config
        #[arg(long)]
        adapter: Option<String>,

        /// Verbose output
        #[arg(long, short)]
        verbose: bool,
    },

    /// Parse and validate scenario files without running them
    Validate {
        /// Paths to YAML scenario files
        #[arg(required = true)]
        scenarios: Vec<PathBuf>,
    },

    /// Resolve a breakpoint marker to a line number
    Markers {
        /// Source file to scan
        source: PathBuf,

        /// Marker substring to look for
        #[arg(long, default_value = "// Set break point at this line.")]
        marker: String,
    },
}
