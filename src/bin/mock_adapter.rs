//! Mock DAP adapter binary for integration testing
//!
//! Implements a minimal Debug Adapter Protocol server over stdio so the
//! harness can be tested without a real debugger. The simulated debuggee is
//! a paused C++ program holding `std::shared_ptr<int> s = make_shared(3)`,
//! with enough behavior for the shared_ptr scenario: dereference, pointee
//! assignment, `(bool)s`, `s.reset()`, and the `target.import-std-module`
//! setting. Two magic breakpoint lines trigger failure modes: 999 comes back
//! unverified, and 998 suppresses all stopped events.

use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Read, Write};

fn main() {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut reader = BufReader::new(stdin.lock());
    let mut writer = stdout.lock();

    let mut state = MockState::default();

    loop {
        // Read Content-Length header
        let mut header_line = String::new();
        if reader.read_line(&mut header_line).unwrap_or(0) == 0 {
            break; // EOF
        }

        if !header_line.starts_with("Content-Length:") {
            continue;
        }

        let content_length: usize = header_line
            .trim_start_matches("Content-Length:")
            .trim()
            .parse()
            .unwrap_or(0);

        // Read empty line
        let mut empty_line = String::new();
        reader.read_line(&mut empty_line).ok();

        // Read JSON body
        let mut body = vec![0u8; content_length];
        if reader.read_exact(&mut body).is_err() {
            break;
        }

        let message: Value = match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(_) => continue,
        };

        if let Some(responses) = state.process_message(&message) {
            for response in responses {
                send_message(&mut writer, &response);
            }
        }

        if state.disconnected {
            break;
        }
    }
}

fn send_message<W: Write>(writer: &mut W, message: &Value) {
    let body = serde_json::to_string(message).unwrap();
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    writer.write_all(header.as_bytes()).ok();
    writer.write_all(body.as_bytes()).ok();
    writer.flush().ok();
}

/// Variables reference handed out for the shared_ptr's children
const SHARED_PTR_CHILDREN: i64 = 17;

/// Breakpoint line that is reported back unverified
const UNVERIFIED_LINE: u64 = 999;
/// Breakpoint line after which no stopped event is ever emitted
const SILENT_LINE: u64 = 998;

struct MockState {
    seq: i64,
    breakpoint_line: u32,
    source_path: String,
    import_std_module: bool,
    /// Pointee of `s`; None after `s.reset()`
    pointee: Option<i64>,
    /// Cleared when the breakpoint asks for the silent failure mode
    emit_stops: bool,
    disconnected: bool,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            seq: 1,
            breakpoint_line: 1,
            source_path: "main.cpp".to_string(),
            import_std_module: false,
            pointee: Some(3),
            emit_stops: true,
            disconnected: false,
        }
    }
}

impl MockState {
    fn next_seq(&mut self) -> i64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }

    /// Type name lldb reports for the pointee once the std module is imported
    fn element_type(&self) -> &'static str {
        if self.import_std_module {
            "element_type"
        } else {
            "int"
        }
    }

    fn stopped_event(&mut self, reason: &str) -> Value {
        let seq = self.next_seq();
        json!({
            "seq": seq,
            "type": "event",
            "event": "stopped",
            "body": {
                "reason": reason,
                "threadId": 1,
                "allThreadsStopped": true,
                "hitBreakpointIds": [1]
            }
        })
    }

    fn process_message(&mut self, message: &Value) -> Option<Vec<Value>> {
        let msg_type = message.get("type")?.as_str()?;
        if msg_type != "request" {
            return None;
        }

        let command = message.get("command")?.as_str()?;
        let request_seq = message.get("seq")?.as_i64()?;
        let arguments = message.get("arguments").cloned().unwrap_or(json!({}));

        let mut responses = Vec::new();
        let seq = self.next_seq();

        let (success, body) = match command {
            "initialize" => (
                true,
                json!({
                    "supportsConfigurationDoneRequest": true,
                    "supportsConditionalBreakpoints": true,
                    "supportsEvaluateForHovers": true,
                    "supportsSetVariable": true,
                    "supportsTerminateRequest": true
                }),
            ),
            "launch" => {
                // The initialized event follows the launch response
                let event_seq = self.next_seq();
                responses.push(json!({
                    "seq": event_seq,
                    "type": "event",
                    "event": "initialized"
                }));
                (true, json!(null))
            }
            "setBreakpoints" => {
                if let Some(path) = arguments
                    .get("source")
                    .and_then(|s| s.get("path"))
                    .and_then(|p| p.as_str())
                {
                    self.source_path = path.to_string();
                }
                let lines: Vec<u64> = arguments
                    .get("breakpoints")
                    .and_then(|b| b.as_array())
                    .map(|bps| {
                        bps.iter()
                            .filter_map(|bp| bp.get("line").and_then(|l| l.as_u64()))
                            .collect()
                    })
                    .unwrap_or_default();

                if let Some(line) = lines.first() {
                    self.breakpoint_line = *line as u32;
                    self.emit_stops = *line != SILENT_LINE;
                }

                let breakpoints: Vec<Value> = lines
                    .iter()
                    .enumerate()
                    .map(|(i, line)| {
                        if *line == UNVERIFIED_LINE {
                            json!({
                                "id": i + 1,
                                "verified": false,
                                "message": "could not resolve a location for this line"
                            })
                        } else {
                            json!({
                                "id": i + 1,
                                "verified": true,
                                "line": line,
                                "source": { "path": &self.source_path }
                            })
                        }
                    })
                    .collect();
                (true, json!({ "breakpoints": breakpoints }))
            }
            "configurationDone" => {
                if self.emit_stops {
                    let stopped = self.stopped_event("breakpoint");
                    responses.push(stopped);
                }
                (true, json!(null))
            }
            "threads" => (
                true,
                json!({
                    "threads": [ { "id": 1, "name": "main" } ]
                }),
            ),
            "stackTrace" => (
                true,
                json!({
                    "stackFrames": [
                        {
                            "id": 1,
                            "name": "main",
                            "source": {
                                "name": "main.cpp",
                                "path": &self.source_path
                            },
                            "line": self.breakpoint_line,
                            "column": 3
                        }
                    ],
                    "totalFrames": 1
                }),
            ),
            "continue" => {
                if self.emit_stops {
                    let stopped = self.stopped_event("breakpoint");
                    responses.push(stopped);
                }
                (true, json!({ "allThreadsContinued": true }))
            }
            "evaluate" => {
                let expression = arguments
                    .get("expression")
                    .and_then(|e| e.as_str())
                    .unwrap_or("");
                let context = arguments
                    .get("context")
                    .and_then(|c| c.as_str())
                    .unwrap_or("");

                if context == "repl" {
                    self.run_console_command(expression)
                } else {
                    self.evaluate_expression(expression)
                }
            }
            "variables" => {
                let reference = arguments
                    .get("variablesReference")
                    .and_then(|v| v.as_i64())
                    .unwrap_or(0);
                let variables: Vec<Value> = if reference == SHARED_PTR_CHILDREN {
                    let pointer = match self.pointee {
                        Some(_) => "0x0000600001d4c2d0",
                        None => "0x0000000000000000",
                    };
                    vec![json!({
                        "name": "pointer",
                        "value": pointer,
                        "type": "int *",
                        "variablesReference": 0
                    })]
                } else {
                    Vec::new()
                };
                (true, json!({ "variables": variables }))
            }
            "disconnect" => {
                self.disconnected = true;
                (true, json!(null))
            }
            _ => (
                false,
                json!({ "message": format!("Unknown command: {}", command) }),
            ),
        };

        responses.insert(
            0,
            json!({
                "seq": seq,
                "type": "response",
                "request_seq": request_seq,
                "success": success,
                "command": command,
                "body": body
            }),
        );

        Some(responses)
    }

    /// Handle a repl-context evaluate as a console command
    fn run_console_command(&mut self, command: &str) -> (bool, Value) {
        let command = command.trim();

        if let Some(rest) = command.strip_prefix("settings set target.import-std-module") {
            self.import_std_module = rest.trim() == "true";
            return (true, json!({ "result": "", "variablesReference": 0 }));
        }

        if let Some(expression) = command.strip_prefix("expr ") {
            return self.evaluate_expression(expression.trim());
        }

        (
            false,
            json!({ "message": format!("error: '{}' is not a valid command.", command) }),
        )
    }

    /// Evaluate an expression against the simulated shared_ptr
    fn evaluate_expression(&mut self, expression: &str) -> (bool, Value) {
        let expression = expression.trim();

        match expression {
            "s" => {
                let summary = match self.pointee {
                    Some(value) => format!("{} strong=1 weak=0", value),
                    None => "nullptr".to_string(),
                };
                (
                    true,
                    json!({
                        "result": summary,
                        "type": "std::shared_ptr<int>",
                        "variablesReference": SHARED_PTR_CHILDREN
                    }),
                )
            }
            "*s" => match self.pointee {
                Some(value) => (
                    true,
                    json!({
                        "result": value.to_string(),
                        "type": self.element_type(),
                        "variablesReference": 0
                    }),
                ),
                None => (
                    false,
                    json!({ "message": "error: dereference of a null shared_ptr" }),
                ),
            },
            "(bool)s" => (
                true,
                json!({
                    "result": self.pointee.is_some().to_string(),
                    "type": "bool",
                    "variablesReference": 0
                }),
            ),
            "s.reset()" => {
                self.pointee = None;
                (true, json!({ "result": "", "variablesReference": 0 }))
            }
            _ => {
                // Pointee assignment: "*s = <value>"
                if let Some(rhs) = expression.strip_prefix("*s =") {
                    if let Ok(value) = rhs.trim().parse::<i64>() {
                        if self.pointee.is_none() {
                            return (
                                false,
                                json!({ "message": "error: dereference of a null shared_ptr" }),
                            );
                        }
                        self.pointee = Some(value);
                        return (
                            true,
                            json!({
                                "result": value.to_string(),
                                "type": self.element_type(),
                                "variablesReference": 0
                            }),
                        );
                    }
                }
                (
                    false,
                    json!({ "message": format!("error: use of undeclared identifier '{}'", expression) }),
                )
            }
        }
    }
}
