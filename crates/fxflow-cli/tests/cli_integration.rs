//! Integration tests for the fxflow-cli commands.
//!
//! These exercise the same code paths as the binary, using temporary
//! workflow and tool-definition files for isolation.

use std::path::PathBuf;

use fxflow_cli::commands::{self, workflow::RunArgs};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write fixture file");
    path
}

const SNAPSHOT: &str = r#"
name: "Snapshot"
tools:
  - name: quotes
    tool_type: fixture
    parameters:
      responses:
        get_quote: { success: true, rate: 1.08 }
variables:
  pair: "EUR/USD"
workflow:
  - name: ask_days
    type: INPUT
    prompt: "Lookback days"
    variable: days
    validation: { type: integer, min: 1, max: 30 }
  - name: quote
    tool: quotes
    method: get_quote
    inputs:
      symbol: "{{pair}}"
      days: "{{days}}"
  - name: show
    type: PRINT
    message: "{{pair}} over {{days}} days: {{quote.rate}}"
"#;

#[test]
fn test_validate_accepts_well_formed_workflow() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(&dir, "snapshot.yaml", SNAPSHOT);
    assert!(commands::workflow::validate(&file).is_ok());
}

#[test]
fn test_validate_reports_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(&dir, "broken.yaml", "name: broken\nworkflow:\n  - name: x\n    type: TELEPORT\n");
    let err = commands::workflow::validate(&file).unwrap_err();
    assert!(err.contains("failed to parse workflow"), "unexpected error: {err}");

    let missing = dir.path().join("nope.yaml");
    assert!(commands::workflow::validate(&missing).is_err());
}

#[tokio::test]
async fn test_run_in_parameter_mode_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(&dir, "snapshot.yaml", SNAPSHOT);
    let args = RunArgs {
        params: vec!["days=14".to_string()],
        ..Default::default()
    };
    let result = commands::workflow::run(&file, args, None).await;
    assert!(result.is_ok(), "run failed: {:?}", result);
}

#[tokio::test]
async fn test_run_reports_failed_steps() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(
        &dir,
        "failing.yaml",
        r#"
name: "Failing"
tools:
  - { name: e, tool_type: echo }
workflow:
  - { name: boom, tool: e, method: fail, inputs: { message: "upstream down" } }
  - { name: after, type: PRINT, message: "after" }
"#,
    );
    let err = commands::workflow::run(&file, RunArgs::default(), None)
        .await
        .unwrap_err();
    assert_eq!(err, "Workflow failed. Failed steps: boom");
}

#[tokio::test]
async fn test_run_uses_tools_dir_definitions() {
    let dir = tempfile::tempdir().unwrap();
    let tools = tempfile::tempdir().unwrap();
    write(
        &tools,
        "calendar.yaml",
        r#"
name: calendar
description: "Canned economic calendar"
implementation: "builtin::fixture"
parameters:
  - name: responses
    default:
      fetch_data: { success: true, events: ["NFP", "CPI"] }
"#,
    );
    let file = write(
        &dir,
        "calendar_flow.yaml",
        r#"
name: "Calendar"
tools:
  - { name: cal, tool_type: calendar }
workflow:
  - { step: events, tool: cal }
  - { name: show, type: PRINT, message: "first: {{events.events.0}}" }
"#,
    );
    let result = commands::workflow::run(&file, RunArgs::default(), Some(tools.path())).await;
    assert!(result.is_ok(), "run failed: {:?}", result);
}

#[test]
fn test_build_registry_and_list_tools() {
    let tools = tempfile::tempdir().unwrap();
    write(&tools, "rates.yml", "name: rates\nimplementation: builtin::echo\n");

    let registry = commands::build_registry(Some(tools.path())).unwrap();
    let names = registry.list_tools();
    assert!(names.contains(&"rates".to_string()));
    assert!(names.contains(&"echo".to_string()));
    assert!(names.contains(&"fixture".to_string()));

    assert!(commands::tools::list(Some(tools.path())).is_ok());
}

#[test]
fn test_build_registry_rejects_missing_tools_dir() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent");
    assert!(commands::build_registry(Some(&missing)).is_err());
}
