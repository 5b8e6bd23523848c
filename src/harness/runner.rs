//! Scenario runner
//!
//! Executes one scenario end to end: build the fixture, run to the
//! breakpoint, execute the steps, and tear the session down whether the
//! checks passed or not.

use std::path::Path;

use colored::Colorize;

use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::fixture::{self, Fixture};
use crate::scenario::{CommandExpect, Scenario, Step, StopExpect};
use crate::check::ExprExpect;

use super::session::Session;

/// Result of running one scenario
#[derive(Debug)]
pub struct RunReport {
    pub name: String,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    pub error: Option<String>,
}

/// Run a scenario from a YAML file
pub async fn run_scenario(
    path: &Path,
    config: &Config,
    adapter_override: Option<&str>,
    verbose: bool,
) -> Result<RunReport> {
    let scenario = Scenario::load(path)?;
    let steps_total = scenario.steps.len();

    println!(
        "\n{} {}",
        "Running:".blue().bold(),
        scenario.name.white().bold()
    );
    if let Some(desc) = &scenario.description {
        println!("  {}", desc.dimmed());
    }

    // Build or locate the debuggee
    let fixture = match &scenario.fixture.source {
        Some(source) => {
            let mut build = config.build.clone();
            if let Some(compiler) = &scenario.fixture.compiler {
                build.compiler = compiler.clone();
            }
            Fixture::build(source, &build, &scenario.fixture.flags).await?
        }
        None => {
            // validate() guarantees program is set here
            let program = scenario.fixture.program.clone().ok_or_else(|| {
                Error::Scenario("fixture has neither source nor program".to_string())
            })?;
            Fixture::prebuilt(program)
        }
    };
    if verbose {
        println!("  {} {}", "binary:".dimmed(), fixture.binary.display());
    }

    // Resolve the breakpoint line
    let bp_source = scenario
        .breakpoint_source()
        .ok_or_else(|| Error::Scenario("no source file for the breakpoint".to_string()))?
        .to_path_buf();
    let bp_line = match (&scenario.breakpoint.marker, scenario.breakpoint.line) {
        (Some(marker), _) => fixture::marker_line(&bp_source, marker)?,
        (None, Some(line)) => line,
        (None, None) => {
            return Err(Error::Scenario(
                "breakpoint needs either 'marker' or 'line'".to_string(),
            ))
        }
    };
    if verbose {
        println!(
            "  {} {}:{}",
            "breakpoint:".dimmed(),
            bp_source.display(),
            bp_line
        );
    }

    let adapter_name = adapter_override
        .map(str::to_string)
        .or_else(|| scenario.adapter.clone())
        .unwrap_or_else(|| config.defaults.adapter.clone());

    println!("{}", "Launching...".cyan());
    let mut session =
        Session::launch(config, &adapter_name, &fixture.binary, &bp_source, bp_line).await?;
    println!(
        "  {} Stopped at {}:{}",
        "✓".green(),
        bp_source.display(),
        bp_line
    );

    println!("{}", "Steps:".cyan());
    for (i, step) in scenario.steps.iter().enumerate() {
        let step_num = i + 1;

        if let Err(e) = execute_step(&mut session, step, step_num).await {
            println!("  {} Step {}: {}", "✗".red(), step_num, e);
            session.shutdown().await;

            return Ok(RunReport {
                name: scenario.name,
                passed: false,
                steps_run: step_num,
                steps_total,
                error: Some(e.to_string()),
            });
        }
    }

    session.shutdown().await;
    println!("{} {}", "✓".green().bold(), "Passed".green().bold());

    Ok(RunReport {
        name: scenario.name,
        passed: true,
        steps_run: steps_total,
        steps_total,
        error: None,
    })
}

/// Execute a single step
async fn execute_step(session: &mut Session, step: &Step, step_num: usize) -> Result<()> {
    match step {
        Step::Command { command, expect } => {
            execute_command_step(session, command, expect.as_ref(), step_num).await
        }
        Step::ExpectExpr { expression, expect } => {
            execute_expect_expr_step(session, expression, expect, step_num).await
        }
        Step::Continue { expect } => {
            execute_continue_step(session, expect.as_ref(), step_num).await
        }
    }
}

async fn execute_command_step(
    session: &mut Session,
    command: &str,
    expect: Option<&CommandExpect>,
    step_num: usize,
) -> Result<()> {
    let result = session.console_command(command).await;
    let should_succeed = expect.and_then(|e| e.success).unwrap_or(true);

    if !should_succeed {
        return match result {
            Err(_) => {
                println!(
                    "  {} Step {}: {} (expected failure)",
                    "✓".green(),
                    step_num,
                    command.dimmed()
                );
                Ok(())
            }
            Ok(output) => Err(Error::check(
                command,
                format!("expected the command to fail, got '{}'", output),
            )),
        };
    }

    result?;
    println!("  {} Step {}: {}", "✓".green(), step_num, command.dimmed());
    Ok(())
}

async fn execute_expect_expr_step(
    session: &mut Session,
    expression: &str,
    expect: &ExprExpect,
    step_num: usize,
) -> Result<()> {
    let rendered = session.expect_expr(expression, expect).await?;

    println!(
        "  {} Step {}: {} = {}",
        "✓".green(),
        step_num,
        expression.dimmed(),
        rendered.dimmed()
    );
    Ok(())
}

async fn execute_continue_step(
    session: &mut Session,
    expect: Option<&StopExpect>,
    step_num: usize,
) -> Result<()> {
    let stopped = session.continue_to_stop(expect).await?;

    println!(
        "  {} Step {}: continue ({})",
        "✓".green(),
        step_num,
        stopped.reason.dimmed()
    );
    Ok(())
}
