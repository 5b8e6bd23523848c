//! dapcheck - scripted expression checks against DAP debug adapters
//!
//! Runs YAML scenarios that stop a debuggee at a marked source line and
//! assert on a sequence of expression results.

use clap::Parser;
use dapcheck::commands::Commands;
use dapcheck::{cli, common};

#[derive(Parser)]
#[command(name = "dapcheck", about = "Expression-check harness for DAP debug adapters")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    common::logging::init();

    let cli = Cli::parse();

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
