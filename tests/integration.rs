//! Integration tests driving the harness against the mock DAP adapter
//!
//! The mock adapter (src/bin/mock_adapter.rs) simulates a debuggee stopped
//! with `std::shared_ptr<int> s = make_shared(3)` in scope, so the full
//! scenario pipeline can run without a compiler or a real debugger.

use std::path::{Path, PathBuf};
use std::time::Duration;

use dapcheck::common::config::{AdapterConfig, BuildConfig, Config};
use dapcheck::common::Error;
use dapcheck::dap::DapClient;
use dapcheck::fixture::Fixture;
use dapcheck::harness::{run_scenario, Session};
use dapcheck::scenario::Scenario;

fn mock_adapter_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mock-adapter"))
}

fn mock_config() -> Config {
    let mut config = Config::default();
    config.adapters.insert(
        "mock".to_string(),
        AdapterConfig {
            path: mock_adapter_path(),
            args: Vec::new(),
        },
    );
    config
}

/// Lay out a fake prebuilt debuggee and a marked source file
fn write_debuggee(dir: &Path) -> (PathBuf, PathBuf) {
    let program = dir.join("a.out");
    std::fs::write(&program, b"").unwrap();

    let source = dir.join("main.cpp");
    std::fs::write(
        &source,
        "#include <memory>\n\
         \n\
         int main(int argc, char **argv) {\n\
         \x20\x20std::shared_ptr<int> s = std::make_shared<int>(3);\n\
         \x20\x20return *s; // Set break point at this line.\n\
         }\n",
    )
    .unwrap();

    (program, source)
}

fn write_scenario(dir: &Path, yaml: &str) -> PathBuf {
    let path = dir.join("scenario.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

const SHARED_PTR_STEPS: &str = r#"
steps:
  - action: command
    command: settings set target.import-std-module true
  - action: expect_expr
    expression: s
    expect:
      type: std::shared_ptr<int>
      summary: 3 strong=1 weak=0
      children:
        - name: pointer
  - action: expect_expr
    expression: "*s"
    expect:
      type: element_type
      value: "3"
  - action: expect_expr
    expression: "*s = 5"
    expect:
      type: element_type
      value: "5"
  - action: expect_expr
    expression: "*s"
    expect:
      type: element_type
      value: "5"
  - action: expect_expr
    expression: (bool)s
    expect:
      type: bool
      value: "true"
  - action: command
    command: expr s.reset()
  - action: expect_expr
    expression: (bool)s
    expect:
      type: bool
      value: "false"
"#;

#[tokio::test]
async fn test_shared_ptr_scenario_passes() {
    let dir = tempfile::tempdir().unwrap();
    write_debuggee(dir.path());

    let yaml = format!(
        r#"
name: shared_ptr against the mock
fixture:
  program: a.out
adapter: mock
breakpoint:
  file: main.cpp
  marker: "// Set break point at this line."
{}"#,
        SHARED_PTR_STEPS
    );
    let scenario_path = write_scenario(dir.path(), &yaml);

    let config = mock_config();
    let report = run_scenario(&scenario_path, &config, None, false)
        .await
        .unwrap();

    assert!(report.passed, "scenario failed: {:?}", report.error);
    assert_eq!(report.steps_run, 8);
    assert_eq!(report.steps_total, 8);
}

#[tokio::test]
async fn test_type_depends_on_import_std_module() {
    // Without the setting the pointee type stays the raw "int"
    let dir = tempfile::tempdir().unwrap();
    write_debuggee(dir.path());

    let yaml = r#"
name: raw pointee type
fixture:
  program: a.out
adapter: mock
breakpoint:
  file: main.cpp
  marker: "// Set break point at this line."
steps:
  - action: expect_expr
    expression: "*s"
    expect:
      type: int
      value: "3"
"#;
    let scenario_path = write_scenario(dir.path(), yaml);

    let config = mock_config();
    let report = run_scenario(&scenario_path, &config, None, false)
        .await
        .unwrap();

    assert!(report.passed, "scenario failed: {:?}", report.error);
}

#[tokio::test]
async fn test_wrong_expectation_fails_the_scenario() {
    let dir = tempfile::tempdir().unwrap();
    write_debuggee(dir.path());

    let yaml = r#"
name: wrong value
fixture:
  program: a.out
adapter: mock
breakpoint:
  file: main.cpp
  marker: "// Set break point at this line."
steps:
  - action: expect_expr
    expression: "*s"
    expect:
      value: "42"
"#;
    let scenario_path = write_scenario(dir.path(), yaml);

    let config = mock_config();
    let report = run_scenario(&scenario_path, &config, None, false)
        .await
        .unwrap();

    assert!(!report.passed);
    assert_eq!(report.steps_run, 1);
    let error = report.error.unwrap();
    assert!(error.contains("42"), "unexpected error: {}", error);
}

#[tokio::test]
async fn test_missing_child_fails_the_scenario() {
    let dir = tempfile::tempdir().unwrap();
    write_debuggee(dir.path());

    let yaml = r#"
name: missing child
fixture:
  program: a.out
adapter: mock
breakpoint:
  file: main.cpp
  marker: "// Set break point at this line."
steps:
  - action: expect_expr
    expression: s
    expect:
      children:
        - name: no_such_child
"#;
    let scenario_path = write_scenario(dir.path(), yaml);

    let config = mock_config();
    let report = run_scenario(&scenario_path, &config, None, false)
        .await
        .unwrap();

    assert!(!report.passed);
    let error = report.error.unwrap();
    assert!(
        error.contains("no_such_child"),
        "unexpected error: {}",
        error
    );
}

#[tokio::test]
async fn test_unknown_expression_reports_adapter_message() {
    let dir = tempfile::tempdir().unwrap();
    write_debuggee(dir.path());

    let yaml = r#"
name: unknown identifier
fixture:
  program: a.out
adapter: mock
breakpoint:
  file: main.cpp
  marker: "// Set break point at this line."
steps:
  - action: expect_expr
    expression: bogus
    expect:
      value: "1"
"#;
    let scenario_path = write_scenario(dir.path(), yaml);

    let config = mock_config();
    let report = run_scenario(&scenario_path, &config, None, false)
        .await
        .unwrap();

    assert!(!report.passed);
    let error = report.error.unwrap();
    assert!(
        error.contains("undeclared identifier"),
        "unexpected error: {}",
        error
    );
}

#[tokio::test]
async fn test_expected_command_failure_passes() {
    let dir = tempfile::tempdir().unwrap();
    write_debuggee(dir.path());

    let yaml = r#"
name: command expected to fail
fixture:
  program: a.out
adapter: mock
breakpoint:
  file: main.cpp
  marker: "// Set break point at this line."
steps:
  - action: command
    command: not a real command
    expect:
      success: false
"#;
    let scenario_path = write_scenario(dir.path(), yaml);

    let config = mock_config();
    let report = run_scenario(&scenario_path, &config, None, false)
        .await
        .unwrap();

    assert!(report.passed, "scenario failed: {:?}", report.error);
}

#[tokio::test]
async fn test_continue_stops_at_breakpoint_again() {
    let dir = tempfile::tempdir().unwrap();
    write_debuggee(dir.path());

    let yaml = r#"
name: continue and stop
fixture:
  program: a.out
adapter: mock
breakpoint:
  file: main.cpp
  marker: "// Set break point at this line."
steps:
  - action: continue
    expect:
      reason: breakpoint
      line: 5
  - action: expect_expr
    expression: "*s"
    expect:
      value: "3"
"#;
    let scenario_path = write_scenario(dir.path(), yaml);

    let config = mock_config();
    let report = run_scenario(&scenario_path, &config, None, false)
        .await
        .unwrap();

    assert!(report.passed, "scenario failed: {:?}", report.error);
}

#[tokio::test]
async fn test_adapter_override_takes_precedence() {
    // Scenario names a nonexistent adapter; the override points at the mock
    let dir = tempfile::tempdir().unwrap();
    write_debuggee(dir.path());

    let yaml = r#"
name: overridden adapter
fixture:
  program: a.out
adapter: no-such-adapter-on-this-machine
breakpoint:
  file: main.cpp
  marker: "// Set break point at this line."
steps:
  - action: expect_expr
    expression: "*s"
    expect:
      value: "3"
"#;
    let scenario_path = write_scenario(dir.path(), yaml);

    let config = mock_config();
    let report = run_scenario(&scenario_path, &config, Some("mock"), false)
        .await
        .unwrap();

    assert!(report.passed, "scenario failed: {:?}", report.error);
}

#[tokio::test]
async fn test_session_direct_drive() {
    let dir = tempfile::tempdir().unwrap();
    let (program, source) = write_debuggee(dir.path());

    let config = mock_config();
    let mut session = Session::launch(&config, "mock", &program, &source, 5)
        .await
        .unwrap();

    session
        .console_command("settings set target.import-std-module true")
        .await
        .unwrap();

    let expect = dapcheck::check::ExprExpect {
        type_name: Some("element_type".to_string()),
        value: Some("3".to_string()),
        ..Default::default()
    };
    let rendered = session.expect_expr("*s", &expect).await.unwrap();
    assert_eq!(rendered, "(element_type) 3");

    session.shutdown().await;
}

#[tokio::test]
async fn test_unverified_breakpoint_aborts_before_steps() {
    // The mock reports breakpoints on line 999 as unverified
    let dir = tempfile::tempdir().unwrap();
    write_debuggee(dir.path());

    let yaml = r#"
name: unverified breakpoint
fixture:
  program: a.out
adapter: mock
breakpoint:
  file: main.cpp
  line: 999
steps:
  - action: expect_expr
    expression: "*s"
    expect:
      value: "3"
"#;
    let scenario_path = write_scenario(dir.path(), yaml);

    let config = mock_config();
    let err = run_scenario(&scenario_path, &config, None, false)
        .await
        .unwrap_err();

    match err {
        Error::BreakpointUnverified { reason, .. } => {
            assert!(
                reason.contains("could not resolve"),
                "unexpected reason: {}",
                reason
            );
        }
        other => panic!("Expected BreakpointUnverified, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_stop_times_out_instead_of_hanging() {
    // Line 998 makes the mock swallow stopped events entirely
    let dir = tempfile::tempdir().unwrap();
    write_debuggee(dir.path());

    let yaml = r#"
name: adapter never stops
fixture:
  program: a.out
adapter: mock
breakpoint:
  file: main.cpp
  line: 998
steps:
  - action: expect_expr
    expression: "*s"
    expect:
      value: "3"
"#;
    let scenario_path = write_scenario(dir.path(), yaml);

    let mut config = mock_config();
    config.timeouts.stop_secs = 1;

    let err = run_scenario(&scenario_path, &config, None, false)
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::StopTimeout(1)),
        "Expected StopTimeout, got {:?}",
        err
    );
}

#[tokio::test]
async fn test_fixture_build_failure_carries_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let (_, source) = write_debuggee(dir.path());

    let build = BuildConfig {
        compiler: "/nonexistent/dapcheck-test-compiler".to_string(),
        flags: vec!["-g".to_string()],
    };

    let err = Fixture::build(&source, &build, &[]).await.unwrap_err();
    match err {
        Error::FixtureBuild { source, detail } => {
            assert!(source.ends_with("main.cpp"), "unexpected source: {}", source);
            assert!(
                detail.contains("failed to run"),
                "unexpected detail: {}",
                detail
            );
        }
        other => panic!("Expected FixtureBuild, got {:?}", other),
    }
}

#[tokio::test]
async fn test_initialize_populates_capabilities() {
    let mut client = DapClient::spawn(&mock_adapter_path(), &[], Duration::from_secs(5))
        .await
        .unwrap();

    let caps = client.initialize("mock").await.unwrap();
    assert!(caps.supports_configuration_done_request);
    assert!(client.capabilities.supports_configuration_done_request);

    client.shutdown().await;
}

#[test]
fn test_bundled_scenario_parses() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios/shared_ptr.yaml");
    let scenario = Scenario::load(&path).unwrap();

    assert_eq!(scenario.steps.len(), 8);
    assert!(scenario
        .breakpoint
        .marker
        .as_deref()
        .unwrap()
        .contains("Set break point"));
    assert!(scenario.fixture.source.as_ref().unwrap().exists());
}

/// End-to-end run against a real debugger; needs lldb-dap and clang++
#[tokio::test]
#[ignore = "requires lldb-dap and clang++ on PATH"]
async fn test_shared_ptr_against_lldb() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios/shared_ptr.yaml");
    let config = Config::default();

    let report = run_scenario(&path, &config, Some("lldb-dap"), true)
        .await
        .unwrap();

    assert!(report.passed, "scenario failed: {:?}", report.error);
}
