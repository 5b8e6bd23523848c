//! DAP client for communicating with debug adapters
//!
//! Spawns the adapter as a subprocess and talks to it over stdio. The
//! harness is strictly sequential, so responses are matched to the single
//! in-flight request; events arriving in between are queued and drained by
//! [`DapClient::wait_event`].

use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::common::{Error, Result};

use super::codec;
use super::types::*;

/// DAP client owning an adapter subprocess
pub struct DapClient {
    adapter: Child,
    reader: BufReader<ChildStdout>,
    writer: BufWriter<ChildStdin>,
    /// Sequence number for requests
    seq: i64,
    /// Adapter capabilities (populated after initialize)
    pub capabilities: Capabilities,
    /// Events received while waiting for a response
    queued_events: VecDeque<Event>,
    /// Per-request timeout
    request_timeout: Duration,
}

impl DapClient {
    /// Spawn a debug adapter and create a client for it
    pub async fn spawn(
        adapter_path: &Path,
        args: &[String],
        request_timeout: Duration,
    ) -> Result<Self> {
        let mut cmd = Command::new(adapter_path);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut adapter = cmd.spawn().map_err(|e| {
            Error::AdapterStartFailed(format!("Failed to start {}: {}", adapter_path.display(), e))
        })?;

        let stdin = adapter
            .stdin
            .take()
            .ok_or_else(|| Error::AdapterStartFailed("Failed to get adapter stdin".to_string()))?;
        let stdout = adapter
            .stdout
            .take()
            .ok_or_else(|| Error::AdapterStartFailed("Failed to get adapter stdout".to_string()))?;

        Ok(Self {
            adapter,
            reader: BufReader::new(stdout),
            writer: BufWriter::new(stdin),
            seq: 1,
            capabilities: Capabilities::default(),
            queued_events: VecDeque::new(),
            request_timeout,
        })
    }

    fn next_seq(&mut self) -> i64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }

    /// Send a request and return its sequence number
    async fn send_request(&mut self, command: &str, arguments: Option<Value>) -> Result<i64> {
        let seq = self.next_seq();

        let request = match arguments {
            Some(args) => serde_json::json!({
                "seq": seq,
                "type": "request",
                "command": command,
                "arguments": args
            }),
            None => serde_json::json!({
                "seq": seq,
                "type": "request",
                "command": command
            }),
        };

        tracing::debug!(target: "dapcheck::dap", ">>> {}", request);
        codec::write_message(&mut self.writer, &request).await?;

        Ok(seq)
    }

    /// Read the next message from the adapter
    async fn read_message(&mut self) -> Result<Value> {
        let msg = codec::read_message(&mut self.reader).await?;
        tracing::debug!(target: "dapcheck::dap", "<<< {}", msg);
        Ok(msg)
    }

    /// Send a request and wait for its response, queuing any events that
    /// arrive in between
    pub async fn request<T: serde::de::DeserializeOwned>(
        &mut self,
        command: &str,
        arguments: Option<Value>,
    ) -> Result<T> {
        let seq = self.send_request(command, arguments).await?;
        let request_timeout = self.request_timeout;

        let wait = async {
            loop {
                let msg = self.read_message().await?;
                let msg_type = msg.get("type").and_then(|v| v.as_str()).unwrap_or("unknown");

                match msg_type {
                    "response" => {
                        let response: ResponseMessage = serde_json::from_value(msg)?;
                        if response.request_seq != seq {
                            // Sequential protocol use; a stray response means
                            // the adapter is confused
                            tracing::warn!(
                                request_seq = response.request_seq,
                                "Discarding response for unknown request"
                            );
                            continue;
                        }
                        if !response.success {
                            return Err(Error::dap_request_failed(
                                command,
                                response
                                    .message
                                    .as_deref()
                                    .unwrap_or("Unknown error"),
                            ));
                        }
                        let body = response.body.unwrap_or(Value::Null);
                        return serde_json::from_value(body).map_err(|e| {
                            Error::DapProtocol(format!(
                                "Failed to parse {} response: {}",
                                command, e
                            ))
                        });
                    }
                    "event" => {
                        let event_msg: EventMessage = serde_json::from_value(msg)?;
                        self.queue_event(Event::from_message(&event_msg));
                    }
                    _ => {
                        tracing::warn!("Unknown message type: {}", msg_type);
                    }
                }
            }
        };

        tokio::time::timeout(request_timeout, wait)
            .await
            .map_err(|_| Error::RequestTimeout(request_timeout.as_secs()))?
    }

    fn queue_event(&mut self, event: Event) {
        if let Event::Output(body) = &event {
            let category = body.category.as_deref().unwrap_or("console");
            tracing::debug!(category, output = %body.output.trim_end(), "Adapter output");
        }
        self.queued_events.push_back(event);
    }

    /// Wait until an event matching `want` arrives, draining the queue first
    ///
    /// Non-matching events are dropped; the harness only ever waits for the
    /// next lifecycle event of a given kind.
    pub async fn wait_event<F>(&mut self, timeout: Duration, want: F) -> Result<Event>
    where
        F: Fn(&Event) -> bool,
    {
        while let Some(event) = self.queued_events.pop_front() {
            if want(&event) {
                return Ok(event);
            }
        }

        let wait = async {
            loop {
                let msg = self.read_message().await?;
                let msg_type = msg.get("type").and_then(|v| v.as_str()).unwrap_or("unknown");

                if msg_type == "event" {
                    let event_msg: EventMessage = serde_json::from_value(msg)?;
                    let event = Event::from_message(&event_msg);
                    if let Event::Output(body) = &event {
                        let category = body.category.as_deref().unwrap_or("console");
                        tracing::debug!(category, output = %body.output.trim_end(), "Adapter output");
                    }
                    if want(&event) {
                        return Ok(event);
                    }
                }
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| Error::StopTimeout(timeout.as_secs()))?
    }

    // === Typed request wrappers ===

    /// Initialize the debug adapter
    pub async fn initialize(&mut self, adapter_id: &str) -> Result<Capabilities> {
        let args = InitializeArguments {
            adapter_id: adapter_id.to_string(),
            ..Default::default()
        };

        let caps: Capabilities = self
            .request("initialize", Some(serde_json::to_value(&args)?))
            .await?;

        self.capabilities = caps.clone();
        Ok(caps)
    }

    /// Launch a program for debugging
    pub async fn launch(&mut self, args: LaunchArguments) -> Result<()> {
        self.request::<Value>("launch", Some(serde_json::to_value(&args)?))
            .await?;
        Ok(())
    }

    /// Wait for the initialized event
    pub async fn wait_initialized(&mut self) -> Result<()> {
        self.wait_event(self.request_timeout, |e| matches!(e, Event::Initialized))
            .await?;
        Ok(())
    }

    /// Set breakpoints for a source file, replacing any previous set
    pub async fn set_breakpoints(
        &mut self,
        source_path: &Path,
        breakpoints: Vec<SourceBreakpoint>,
    ) -> Result<Vec<Breakpoint>> {
        let args = SetBreakpointsArguments {
            source: Source {
                name: source_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned()),
                path: Some(source_path.to_string_lossy().into_owned()),
            },
            breakpoints,
        };

        let response: SetBreakpointsResponseBody = self
            .request("setBreakpoints", Some(serde_json::to_value(&args)?))
            .await?;

        Ok(response.breakpoints)
    }

    /// Signal that configuration is done
    pub async fn configuration_done(&mut self) -> Result<()> {
        self.request::<Value>("configurationDone", None).await?;
        Ok(())
    }

    /// Continue execution
    pub async fn continue_execution(&mut self, thread_id: i64) -> Result<()> {
        let args = ContinueArguments {
            thread_id,
            single_thread: false,
        };

        self.request::<ContinueResponseBody>("continue", Some(serde_json::to_value(&args)?))
            .await?;
        Ok(())
    }

    /// Get threads
    pub async fn threads(&mut self) -> Result<Vec<Thread>> {
        let response: ThreadsResponseBody = self.request("threads", None).await?;
        Ok(response.threads)
    }

    /// Get stack trace for a thread
    pub async fn stack_trace(&mut self, thread_id: i64, levels: i64) -> Result<Vec<StackFrame>> {
        let args = StackTraceArguments {
            thread_id,
            start_frame: Some(0),
            levels: Some(levels),
        };

        let response: StackTraceResponseBody = self
            .request("stackTrace", Some(serde_json::to_value(&args)?))
            .await?;

        Ok(response.stack_frames)
    }

    /// Evaluate an expression
    pub async fn evaluate(
        &mut self,
        expression: &str,
        frame_id: Option<i64>,
        context: &str,
    ) -> Result<EvaluateResponseBody> {
        let args = EvaluateArguments {
            expression: expression.to_string(),
            frame_id,
            context: Some(context.to_string()),
        };

        self.request("evaluate", Some(serde_json::to_value(&args)?))
            .await
    }

    /// Get the children of a variables reference
    pub async fn variables(&mut self, variables_reference: i64) -> Result<Vec<Variable>> {
        let args = VariablesArguments {
            variables_reference,
        };

        let response: VariablesResponseBody = self
            .request("variables", Some(serde_json::to_value(&args)?))
            .await?;

        Ok(response.variables)
    }

    /// Disconnect from the adapter, then kill it if it lingers
    pub async fn shutdown(&mut self) {
        let args = DisconnectArguments {
            restart: false,
            terminate_debuggee: Some(true),
        };

        // The adapter may exit without answering; don't propagate errors
        if let Ok(json) = serde_json::to_value(&args) {
            let _ = self.send_request("disconnect", Some(json)).await;
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
        let _ = self.adapter.kill().await;
    }
}

impl Drop for DapClient {
    fn drop(&mut self) {
        // Best effort; we can't await in drop
        let _ = self.adapter.start_kill();
    }
}
