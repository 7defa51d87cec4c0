//! End-to-end workflow runs against stub tools.

use std::sync::{Arc, Mutex};

use fxflow_core::error::{ToolError, WorkflowError};
use fxflow_core::workflow::ScriptedConsole;
use fxflow_core::{
    InstanceManager, Outcome, RunOptions, Tool, ToolArgs, ToolDefinition, ToolRegistry,
    WorkflowDefinition, WorkflowExecutor,
};
use serde_json::{json, Value};

/// Quote stub: answers `get_quote` with a fixed envelope and remembers its arguments.
struct QuoteStub {
    envelope: Value,
    calls: Arc<Mutex<Vec<ToolArgs>>>,
}

impl Tool for QuoteStub {
    fn methods(&self) -> Vec<String> {
        vec!["get_quote".to_string(), "crash".to_string()]
    }

    fn call(&self, method: &str, args: &ToolArgs) -> Result<Value, ToolError> {
        if method == "crash" {
            return Err(ToolError::Failed("feed disconnected".to_string()));
        }
        self.calls.lock().unwrap().push(args.clone());
        Ok(self.envelope.clone())
    }
}

fn executor_with_stub(envelope: Value) -> (WorkflowExecutor, Arc<Mutex<Vec<ToolArgs>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&calls);

    let mut registry = ToolRegistry::with_builtins();
    registry.register_factory("test::quotes", move |_params| {
        Ok(Box::new(QuoteStub {
            envelope: envelope.clone(),
            calls: Arc::clone(&captured),
        }) as Box<dyn Tool>)
    });
    registry.register(ToolDefinition::new("fx_quotes", "test::quotes"));

    (WorkflowExecutor::new(InstanceManager::new(registry)), calls)
}

const QUOTE_WORKFLOW: &str = r#"
name: "EUR/USD snapshot"
tools:
  - name: quotes
    tool_type: fx_quotes
variables:
  pair: "EUR/USD"
workflow:
  - name: quote
    type: TOOL
    tool: quotes
    method: get_quote
    inputs:
      symbol: "{{pair}}"
  - name: show
    type: PRINT
    message: "Rate: {{quote.rate}}"
  - name: note
    type: SET_VARIABLE
    variable: checked
    value: "{{pair}} checked"
"#;

#[test]
fn test_scenario_a_tool_payload_feeds_print() {
    let (mut executor, calls) = executor_with_stub(json!({"success": true, "rate": 1.08}));
    let workflow = WorkflowDefinition::from_yaml(QUOTE_WORKFLOW).unwrap();
    let mut console = ScriptedConsole::default();

    let report = executor
        .execute(&workflow, &RunOptions::default(), &mut console)
        .unwrap();

    assert!(console.printed("Rate: 1.08"));
    assert_eq!(calls.lock().unwrap()[0]["symbol"], json!("EUR/USD"));
    assert!(report.is_success());
    assert_eq!(report.succeeded(), 3);
    assert_eq!(report.stored["quote"]["rate"], json!(1.08));
}

#[test]
fn test_scenario_b_failed_tool_leaves_placeholder() {
    let (mut executor, _) = executor_with_stub(json!({"success": false, "error": "timeout"}));
    let workflow = WorkflowDefinition::from_yaml(QUOTE_WORKFLOW).unwrap();
    let mut console = ScriptedConsole::default();

    let report = executor
        .execute(&workflow, &RunOptions::default(), &mut console)
        .unwrap();

    assert!(console.printed("Rate: {{quote.rate}}"));
    assert_eq!(report.results["quote"], Outcome::failure("timeout"));
    assert_eq!(report.failures(), vec![("quote", "timeout")]);
    assert_eq!(report.stored["checked"], json!("EUR/USD checked"));
    assert!(!report.stored.contains_key("quote"));
}

#[test]
fn test_scenario_c_input_retries_until_valid() {
    let yaml = r#"
name: "Lookback"
workflow:
  - name: ask
    type: INPUT
    prompt: "Lookback (1-5)"
    variable: lookback
    validation:
      type: integer
      min: 1
      max: 5
"#;
    let workflow = WorkflowDefinition::from_yaml(yaml).unwrap();
    let mut executor = WorkflowExecutor::new(InstanceManager::new(ToolRegistry::with_builtins()));
    let mut console = ScriptedConsole::new(["abc", "9", "3"]);

    let report = executor
        .execute(&workflow, &RunOptions::default(), &mut console)
        .unwrap();

    assert_eq!(console.prompts().len(), 3);
    let warnings: Vec<&String> = console.output().iter().filter(|l| l.starts_with("⚠️")).collect();
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].contains("expected an integer"));
    assert!(warnings[1].contains("outside the allowed range"));
    assert_eq!(report.stored["lookback"], json!(3));
}

#[test]
fn test_input_exhaustion_fails_only_that_step() {
    let yaml = r#"
name: "Exhaust"
workflow:
  - name: ask
    type: INPUT
    prompt: "Level"
    variable: level
    max_attempts: 2
    validation: { type: integer }
  - name: after
    type: PRINT
    message: "still running"
"#;
    let workflow = WorkflowDefinition::from_yaml(yaml).unwrap();
    let mut executor = WorkflowExecutor::new(InstanceManager::new(ToolRegistry::with_builtins()));
    let mut console = ScriptedConsole::new(["x", "y", "3"]);

    let report = executor
        .execute(&workflow, &RunOptions::default(), &mut console)
        .unwrap();

    assert!(report.results["ask"]
        .error()
        .unwrap()
        .starts_with("input rejected after 2 attempt(s)"));
    assert!(console.printed("still running"));
    assert!(!report.stored.contains_key("level"));
}

#[test]
fn test_tool_error_is_recorded_and_run_continues() {
    let yaml = r#"
name: "Crash"
tools:
  - { name: quotes, tool_type: fx_quotes }
workflow:
  - { name: broken, tool: quotes, method: crash }
  - { name: missing, tool: quotes, method: no_such_method }
  - { name: fine, tool: quotes, method: get_quote }
"#;
    let (mut executor, _) = executor_with_stub(json!({"success": true, "rate": 1.1}));
    let workflow = WorkflowDefinition::from_yaml(yaml).unwrap();
    let mut console = ScriptedConsole::default();

    let report = executor
        .execute(&workflow, &RunOptions::default(), &mut console)
        .unwrap();

    assert_eq!(
        report.results["broken"].error(),
        Some("fx_quotes.crash failed: feed disconnected")
    );
    assert_eq!(
        report.results["missing"].error(),
        Some("tool method not found: fx_quotes.no_such_method")
    );
    assert!(report.results["fine"].is_success());
    assert!(console.printed("❌ broken: fx_quotes.crash failed: feed disconnected"));
}

#[test]
fn test_pool_exhaustion_stops_run_before_first_step() {
    let yaml = r#"
name: "Too many"
tools:
  - { name: a, tool_type: echo }
  - { name: b, tool_type: fixture }
workflow:
  - { name: hello, type: PRINT, message: "hello" }
"#;
    let workflow = WorkflowDefinition::from_yaml(yaml).unwrap();
    let manager = InstanceManager::with_id_pool(ToolRegistry::with_builtins(), 1..2);
    let mut executor = WorkflowExecutor::new(manager);
    let mut console = ScriptedConsole::default();

    let err = executor
        .execute(&workflow, &RunOptions::default(), &mut console)
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Startup(_)));
    assert!(!console.printed("hello"));
    assert!(executor.manager().running().is_empty());
}

#[test]
fn test_structured_payload_passes_whole_and_prints_as_outline() {
    let yaml = r#"
name: "Structured"
tools:
  - name: analysis
    tool_type: fixture
    parameters:
      responses:
        fetch_data:
          success: true
          trend: { direction: up }
  - { name: e, tool_type: echo }
workflow:
  - { name: trend, tool: analysis }
  - name: forward
    tool: e
    method: echo
    inputs:
      report: "{{trend.trend}}"
  - name: show
    type: PRINT
    message: "Trend:\n{{forward.report}}"
"#;
    let workflow = WorkflowDefinition::from_yaml(yaml).unwrap();
    let mut executor = WorkflowExecutor::new(InstanceManager::new(ToolRegistry::with_builtins()));
    let mut console = ScriptedConsole::default();

    let report = executor
        .execute(&workflow, &RunOptions::default(), &mut console)
        .unwrap();

    assert_eq!(report.stored["forward"]["report"], json!({"direction": "up"}));
    assert!(console.printed("Trend:\n- direction: up"));
}

#[test]
fn test_env_expansion_in_variables() {
    std::env::set_var("FXFLOW_SCENARIO_PAIR", "GBP/JPY");
    let yaml = r#"
name: "Env"
variables:
  pair: "${FXFLOW_SCENARIO_PAIR}"
  venue: "${FXFLOW_SCENARIO_MISSING:-oanda}"
workflow:
  - { name: show, type: PRINT, message: "{{pair}} @ {{venue}}" }
"#;
    let workflow = WorkflowDefinition::from_yaml(yaml).unwrap();
    let mut executor = WorkflowExecutor::new(InstanceManager::new(ToolRegistry::with_builtins()));
    let mut console = ScriptedConsole::default();

    executor
        .execute(&workflow, &RunOptions::default(), &mut console)
        .unwrap();

    assert!(console.printed("GBP/JPY @ oanda"));
    std::env::remove_var("FXFLOW_SCENARIO_PAIR");
}
