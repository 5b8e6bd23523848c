//! Debug session driving
//!
//! Walks a DAP adapter through the lifecycle needed for an expression-check
//! run: initialize, launch, set the one breakpoint, configurationDone, wait
//! for the stop, then evaluate expressions in the stopped frame.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use crate::check::{self, ExprExpect, ValueCheck};
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::dap::{
    DapClient, EvaluateResponseBody, Event, LaunchArguments, SourceBreakpoint, StoppedEventBody,
};
use crate::scenario::StopExpect;

/// A live debug session stopped at the scenario breakpoint
pub struct Session {
    client: DapClient,
    thread_id: i64,
    frame_id: Option<i64>,
    stop_timeout: Duration,
}

impl Session {
    /// Launch `program` under the named adapter and run to the breakpoint
    ///
    /// Returns once the program is stopped on `bp_line` of `bp_source`.
    #[tracing::instrument(skip(config), fields(adapter = %adapter_name))]
    pub async fn launch(
        config: &Config,
        adapter_name: &str,
        program: &Path,
        bp_source: &Path,
        bp_line: u32,
    ) -> Result<Self> {
        let adapter_config = config
            .get_adapter(adapter_name)
            .ok_or_else(|| Error::adapter_not_found(adapter_name, &[adapter_name, "$PATH"]))?;

        let request_timeout = Duration::from_secs(config.timeouts.request_secs);
        let stop_timeout = Duration::from_secs(config.timeouts.stop_secs);

        let mut client =
            DapClient::spawn(&adapter_config.path, &adapter_config.args, request_timeout).await?;

        let init_timeout = Duration::from_secs(config.timeouts.initialize_secs);
        tokio::time::timeout(init_timeout, client.initialize(adapter_name))
            .await
            .map_err(|_| Error::RequestTimeout(config.timeouts.initialize_secs))??;

        let launch_args = LaunchArguments {
            program: program.to_string_lossy().into_owned(),
            args: Vec::new(),
            cwd: std::env::current_dir()
                .ok()
                .map(|p| p.to_string_lossy().into_owned()),
            stop_on_entry: false,
            init_commands: None,
            pre_run_commands: None,
        };

        tracing::debug!(program = %program.display(), "Sending DAP launch request");
        client.launch(launch_args).await?;

        // The initialized event follows launch per the DAP lifecycle;
        // breakpoints must be in place before configurationDone
        client.wait_initialized().await?;

        let breakpoints = client
            .set_breakpoints(
                bp_source,
                vec![SourceBreakpoint {
                    line: bp_line,
                    condition: None,
                }],
            )
            .await?;

        let location = format!("{}:{}", bp_source.display(), bp_line);
        match breakpoints.first() {
            Some(bp) if bp.verified => {}
            Some(bp) => {
                return Err(Error::BreakpointUnverified {
                    location,
                    reason: bp
                        .message
                        .clone()
                        .unwrap_or_else(|| "adapter gave no reason".to_string()),
                });
            }
            None => {
                return Err(Error::BreakpointUnverified {
                    location,
                    reason: "adapter reported no breakpoints".to_string(),
                });
            }
        }

        // Adapters that don't support configurationDone reject the request
        if client.capabilities.supports_configuration_done_request {
            client.configuration_done().await?;
        }

        let stopped = Self::wait_stopped(&mut client, stop_timeout).await?;
        let thread_id = match stopped.thread_id {
            Some(id) => id,
            None => {
                // Some adapters omit the thread; fall back to the first one
                client
                    .threads()
                    .await?
                    .first()
                    .map(|t| t.id)
                    .ok_or_else(|| Error::DapProtocol("no threads reported".to_string()))?
            }
        };

        let mut session = Self {
            client,
            thread_id,
            frame_id: None,
            stop_timeout,
        };

        let frame = session.top_frame().await?;
        if frame.line != bp_line {
            return Err(Error::UnexpectedStop(format!(
                "expected to stop at {}:{}, stopped at {}:{} in '{}'",
                bp_source.display(),
                bp_line,
                frame
                    .source
                    .as_ref()
                    .and_then(|s| s.path.as_deref())
                    .unwrap_or("<unknown>"),
                frame.line,
                frame.name
            )));
        }

        tracing::info!(line = frame.line, frame = %frame.name, "Stopped at breakpoint");
        Ok(session)
    }

    /// Wait for a stopped event, treating an early exit as a failure
    async fn wait_stopped(
        client: &mut DapClient,
        timeout: Duration,
    ) -> Result<StoppedEventBody> {
        let event = client
            .wait_event(timeout, |e| {
                matches!(e, Event::Stopped(_) | Event::Exited(_) | Event::Terminated)
            })
            .await?;

        match event {
            Event::Stopped(body) => Ok(body),
            Event::Exited(body) => Err(Error::UnexpectedStop(format!(
                "program exited with code {} before reaching the breakpoint",
                body.exit_code
            ))),
            Event::Terminated => Err(Error::UnexpectedStop(
                "debug session terminated before reaching the breakpoint".to_string(),
            )),
            _ => unreachable!(),
        }
    }

    /// Fetch the top stack frame and cache its id for evaluation
    async fn top_frame(&mut self) -> Result<crate::dap::StackFrame> {
        let frames = self.client.stack_trace(self.thread_id, 1).await?;
        let frame = frames
            .into_iter()
            .next()
            .ok_or_else(|| Error::DapProtocol("empty stack trace at stop".to_string()))?;
        self.frame_id = Some(frame.id);
        Ok(frame)
    }

    /// Evaluate an expression and check it against the expectation
    ///
    /// Returns the rendered result string for reporting.
    pub async fn expect_expr(&mut self, expression: &str, expect: &ExprExpect) -> Result<String> {
        // "watch" context asks for plain expression evaluation; "repl" would
        // let short expressions collide with console command aliases
        let result = self
            .client
            .evaluate(expression, self.frame_id, "watch")
            .await
            .map_err(|e| match e {
                Error::DapRequestFailed { message, .. } => Error::check(expression, message),
                other => other,
            })?;

        check::match_result(expression, expect, &result)?;

        if !expect.children.is_empty() {
            self.check_children(
                expression.to_string(),
                result.variables_reference,
                &expect.children,
            )
            .await?;
        }

        Ok(render(&result))
    }

    /// Check a variables subtree against the expected children
    fn check_children<'a>(
        &'a mut self,
        path: String,
        variables_reference: i64,
        checks: &'a [ValueCheck],
    ) -> Pin<Box<dyn Future<Output = Result<()>> + 'a>> {
        Box::pin(async move {
            let variables = self.client.variables(variables_reference).await?;

            for child_check in checks {
                let var = check::match_child(&path, child_check, &variables)?;
                if !child_check.children.is_empty() {
                    let child_ref = var.variables_reference;
                    let child_path = format!("{}.{}", path, child_check.name);
                    self.check_children(child_path, child_ref, &child_check.children)
                        .await?;
                }
            }

            Ok(())
        })
    }

    /// Run a debugger console command (e.g. a settings toggle)
    pub async fn console_command(&mut self, command: &str) -> Result<String> {
        let result = self
            .client
            .evaluate(command, self.frame_id, "repl")
            .await?;
        Ok(result.result)
    }

    /// Resume execution and wait for the next stop
    pub async fn continue_to_stop(
        &mut self,
        expect: Option<&StopExpect>,
    ) -> Result<StoppedEventBody> {
        self.client.continue_execution(self.thread_id).await?;

        let stopped = Self::wait_stopped(&mut self.client, self.stop_timeout).await?;
        if let Some(id) = stopped.thread_id {
            self.thread_id = id;
        }
        let frame = self.top_frame().await?;

        if let Some(exp) = expect {
            if let Some(expected_reason) = &exp.reason {
                if !stopped.reason.contains(expected_reason.as_str()) {
                    return Err(Error::UnexpectedStop(format!(
                        "expected stop reason '{}', got '{}'",
                        expected_reason, stopped.reason
                    )));
                }
            }
            if let Some(expected_line) = exp.line {
                if frame.line != expected_line {
                    return Err(Error::UnexpectedStop(format!(
                        "expected stop at line {}, got line {}",
                        expected_line, frame.line
                    )));
                }
            }
        }

        Ok(stopped)
    }

    /// Tear the session down, terminating the debuggee
    pub async fn shutdown(mut self) {
        self.client.shutdown().await;
    }
}

/// Render an evaluate result for the step report
fn render(result: &EvaluateResponseBody) -> String {
    match result.type_name.as_deref() {
        Some(type_name) if !result.result.is_empty() => {
            format!("({}) {}", type_name, result.result)
        }
        _ => result.result.clone(),
    }
}
