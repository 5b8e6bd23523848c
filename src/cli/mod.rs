//! Command dispatch

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::{fixture, harness, scenario::Scenario};

/// Execute a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            scenarios,
            adapter,
            verbose,
        } => run(scenarios, adapter.as_deref(), verbose).await,
        Commands::Validate { scenarios } => validate(scenarios),
        Commands::Markers { source, marker } => {
            let line = fixture::marker_line(&source, &marker)?;
            println!("{}:{}", source.display(), line);
            Ok(())
        }
    }
}

async fn run(
    scenarios: Vec<std::path::PathBuf>,
    adapter: Option<&str>,
    verbose: bool,
) -> Result<()> {
    let config = Config::load()?;
    let total = scenarios.len();
    let mut failed = 0usize;

    for path in &scenarios {
        match harness::run_scenario(path, &config, adapter, verbose).await {
            Ok(report) if report.passed => {}
            Ok(report) => {
                failed += 1;
                if let Some(error) = &report.error {
                    tracing::error!(scenario = %report.name, %error, "Scenario failed");
                }
            }
            Err(e) => {
                failed += 1;
                println!("\n{} {}: {}", "✗".red().bold(), path.display(), e);
            }
        }
    }

    println!(
        "\n{} {} passed, {} failed",
        "Summary:".bold(),
        total - failed,
        failed
    );

    if failed > 0 {
        return Err(Error::ScenariosFailed { failed, total });
    }
    Ok(())
}

fn validate(scenarios: Vec<std::path::PathBuf>) -> Result<()> {
    let mut failed = 0usize;
    let total = scenarios.len();

    for path in &scenarios {
        match Scenario::load(path) {
            Ok(scenario) => {
                println!(
                    "{} {} ({}, {} steps)",
                    "✓".green(),
                    path.display(),
                    scenario.name,
                    scenario.steps.len()
                );
            }
            Err(e) => {
                failed += 1;
                println!("{} {}: {}", "✗".red(), path.display(), e);
            }
        }
    }

    if failed > 0 {
        return Err(Error::ScenariosFailed { failed, total });
    }
    Ok(())
}
