//! YAML schema types for workflow definitions.
//!
//! ```yaml
//! name: "EUR/USD snapshot"
//!
//! tools:
//!   - name: quotes
//!     tool_type: fx_quotes
//!     parameters:
//!       api_key: "${FX_API_KEY}"
//!
//! variables:
//!   pair: "EUR/USD"
//!
//! workflow:
//!   - name: quote
//!     type: TOOL
//!     tool: quotes
//!     method: get_quote
//!     inputs:
//!       symbol: "{{pair}}"
//!
//!   - name: show
//!     type: PRINT
//!     message: "Rate: {{quote.rate}}"
//! ```
//!
//! A step without `type` is a TOOL step, and `step` is accepted in place of
//! `name`.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::WorkflowError;
use crate::workflow::input::InputValidation;

/// Top-level workflow definition loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Tools to start before the first step
    #[serde(default)]
    pub tools: Vec<ToolBinding>,

    /// Initial stored data (string values expand `${ENV_VAR}`)
    #[serde(default)]
    pub variables: Map<String, Value>,

    /// Ordered step list
    #[serde(rename = "workflow", alias = "steps")]
    pub steps: Vec<WorkflowStep>,
}

fn default_name() -> String {
    "unnamed workflow".to_string()
}

/// Binds a workflow-local tool name to a registered tool type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolBinding {
    /// Name referenced by TOOL steps
    pub name: String,

    /// Registered tool type to start
    #[serde(alias = "server_type", alias = "toolType")]
    pub tool_type: String,

    /// Instance parameters (string values expand `${ENV_VAR}`)
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// A single step in the workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawStep")]
pub struct WorkflowStep {
    /// Step name, the key of its entry in the run results
    pub name: String,

    #[serde(flatten)]
    pub kind: StepKind,
}

#[derive(Deserialize)]
struct RawStep {
    #[serde(alias = "step")]
    name: String,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl TryFrom<RawStep> for WorkflowStep {
    type Error = String;

    fn try_from(raw: RawStep) -> Result<Self, Self::Error> {
        let mut fields = raw.fields;
        if !fields.contains_key("type") {
            fields.insert("type".to_string(), Value::String("TOOL".to_string()));
        }
        let kind = serde_json::from_value(Value::Object(fields))
            .map_err(|e| format!("step '{}': {}", raw.name, e))?;
        Ok(Self {
            name: raw.name,
            kind,
        })
    }
}

/// Step type and its type-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepKind {
    #[serde(alias = "tool")]
    Tool(ToolStep),
    #[serde(alias = "print")]
    Print(PrintStep),
    #[serde(alias = "input")]
    Input(InputStep),
    #[serde(alias = "set_variable")]
    SetVariable(SetVariableStep),
    #[serde(alias = "loop")]
    Loop(LoopStep),
    #[serde(alias = "branch")]
    Branch(BranchStep),
    #[serde(alias = "router")]
    Router(RouterStep),
}

impl StepKind {
    pub fn label(&self) -> &'static str {
        match self {
            StepKind::Tool(_) => "TOOL",
            StepKind::Print(_) => "PRINT",
            StepKind::Input(_) => "INPUT",
            StepKind::SetVariable(_) => "SET_VARIABLE",
            StepKind::Loop(_) => "LOOP",
            StepKind::Branch(_) => "BRANCH",
            StepKind::Router(_) => "ROUTER",
        }
    }

    /// Nested step lists, in declaration order.
    fn children(&self) -> Vec<&[WorkflowStep]> {
        match self {
            StepKind::Loop(l) => vec![l.steps.as_slice()],
            StepKind::Branch(b) => b
                .branches
                .iter()
                .map(|arm| arm.steps.as_slice())
                .chain(std::iter::once(b.default.as_slice()))
                .collect(),
            StepKind::Router(r) => r
                .routes
                .iter()
                .map(|arm| arm.steps.as_slice())
                .chain(std::iter::once(r.default.as_slice()))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolStep {
    /// Workflow-local tool name (see `tools`)
    pub tool: String,

    #[serde(default = "default_method")]
    pub method: String,

    /// Keyword arguments; strings are templates
    #[serde(default)]
    pub inputs: Map<String, Value>,

    /// Extra stored-data key for the payload
    #[serde(default, alias = "output_alias", alias = "outputAlias")]
    pub output: Option<String>,
}

fn default_method() -> String {
    "fetch_data".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintStep {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputStep {
    pub prompt: String,

    /// Stored-data key receiving the accepted value
    #[serde(alias = "output_variable", alias = "outputVariable")]
    pub variable: String,

    #[serde(default)]
    pub validation: InputValidation,

    /// Used for an empty answer, or when prompting is disabled
    #[serde(default)]
    pub default: Option<Value>,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Prompt even when the value was supplied externally
    #[serde(default)]
    pub force_prompt: bool,
}

fn default_max_attempts() -> u32 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetVariableStep {
    #[serde(alias = "variable_name", alias = "variableName")]
    pub variable: String,

    /// Literal or template
    #[serde(alias = "value_expression", alias = "valueExpression")]
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopStep {
    #[serde(alias = "iteration_count", alias = "iterationCount", alias = "times")]
    pub count: u32,

    /// Receives the 1-based iteration number
    #[serde(default)]
    pub index_variable: Option<String>,

    pub steps: Vec<WorkflowStep>,
}

/// First arm whose condition holds runs; otherwise `default`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchStep {
    pub branches: Vec<BranchArm>,
    pub default: Vec<WorkflowStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchArm {
    /// Condition template, e.g. `"{{quote.rate}}"` or `"{{mode}} == fast"`
    pub when: String,
    pub steps: Vec<WorkflowStep>,
}

/// First arm whose `match` equals the rendered `route` runs; otherwise `default`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterStep {
    pub route: String,
    pub routes: Vec<RouteArm>,
    pub default: Vec<WorkflowStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteArm {
    #[serde(rename = "match")]
    pub value: Value,
    pub steps: Vec<WorkflowStep>,
}

impl WorkflowDefinition {
    /// Parse a workflow definition from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, WorkflowError> {
        serde_yaml::from_str(yaml).map_err(|e| WorkflowError::Parse(e.to_string()))
    }

    /// Load a workflow definition from a file path.
    pub fn from_file(path: &Path) -> Result<Self, WorkflowError> {
        let content = std::fs::read_to_string(path).map_err(|source| WorkflowError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Non-fatal problems: shadowed step names, undeclared tools, empty loops.
    pub fn lint(&self) -> Vec<String> {
        let declared: HashSet<&str> = self.tools.iter().map(|t| t.name.as_str()).collect();
        let mut seen = HashSet::new();
        let mut warnings = Vec::new();
        lint_steps(&self.steps, &declared, &mut seen, &mut warnings);
        warnings
    }

    /// Total number of steps, nested ones included.
    pub fn step_count(&self) -> usize {
        fn count(steps: &[WorkflowStep]) -> usize {
            steps
                .iter()
                .map(|s| 1 + s.kind.children().into_iter().map(count).sum::<usize>())
                .sum()
        }
        count(&self.steps)
    }
}

fn lint_steps<'a>(
    steps: &'a [WorkflowStep],
    declared: &HashSet<&str>,
    seen: &mut HashSet<&'a str>,
    warnings: &mut Vec<String>,
) {
    for step in steps {
        if !seen.insert(step.name.as_str()) {
            warnings.push(format!(
                "step name '{}' is used more than once; later results shadow earlier ones",
                step.name
            ));
        }
        match &step.kind {
            StepKind::Tool(t) if !declared.contains(t.tool.as_str()) => {
                warnings.push(format!("step '{}' uses undeclared tool '{}'", step.name, t.tool));
            }
            StepKind::Loop(l) if l.count == 0 => {
                warnings.push(format!("loop '{}' never runs (count is 0)", step.name));
            }
            _ => {}
        }
        for children in step.kind.children() {
            lint_steps(children, declared, seen, warnings);
        }
    }
}

// ─── Environment expansion ──────────────────────────────────────────────

static ENV_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex"));

/// Expand `${VAR}` and `${VAR:-default}` from the process environment.
/// Unknown variables without a default are left as written.
pub fn resolve_env_vars(input: &str) -> String {
    ENV_REF
        .replace_all(input, |caps: &regex::Captures| {
            let var_expr = &caps[1];
            if let Some(idx) = var_expr.find(":-") {
                let var_name = &var_expr[..idx];
                let default_val = &var_expr[idx + 2..];
                std::env::var(var_name).unwrap_or_else(|_| default_val.to_string())
            } else {
                std::env::var(var_expr).unwrap_or_else(|_| format!("${{{}}}", var_expr))
            }
        })
        .to_string()
}

/// `resolve_env_vars` applied to every string inside `value`.
pub fn expand_env(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(resolve_env_vars(s)),
        Value::Array(items) => Value::Array(items.iter().map(expand_env).collect()),
        Value::Object(map) => {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), expand_env(v))).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::input::InputType;

    #[test]
    fn test_parse_minimal_workflow() {
        let yaml = r#"
name: "Snapshot"
tools:
  - name: quotes
    server_type: fixture
workflow:
  - step: "quote"
    tool: quotes
    inputs:
      symbol: "{{pair}}"
"#;
        let wf = WorkflowDefinition::from_yaml(yaml).unwrap();
        assert_eq!(wf.name, "Snapshot");
        assert_eq!(wf.tools[0].tool_type, "fixture");
        match &wf.steps[0].kind {
            StepKind::Tool(t) => {
                assert_eq!(t.tool, "quotes");
                assert_eq!(t.method, "fetch_data");
                assert_eq!(t.inputs["symbol"], "{{pair}}");
            }
            other => panic!("expected TOOL step, got {}", other.label()),
        }
    }

    #[test]
    fn test_parse_all_step_types() {
        let yaml = r#"
name: "Everything"
variables:
  pair: "EUR/USD"
steps:
  - name: ask
    type: INPUT
    prompt: "Lookback days"
    variable: days
    validation: { type: integer, min: 1, max: 30 }
    default: 7
  - name: set
    type: set_variable
    variable: label
    value: "{{pair}} x {{days}}"
  - name: repeat
    type: LOOP
    count: 2
    index_variable: i
    steps:
      - name: say
        type: PRINT
        message: "pass {{i}}"
  - name: pick
    type: BRANCH
    branches:
      - when: "{{days}} == 7"
        steps:
          - { name: week, type: PRINT, message: "weekly" }
    default:
      - { name: other, type: PRINT, message: "custom" }
  - name: route
    type: ROUTER
    route: "{{pair}}"
    routes:
      - match: "EUR/USD"
        steps: []
    default: []
"#;
        let wf = WorkflowDefinition::from_yaml(yaml).unwrap();
        assert_eq!(wf.steps.len(), 5);
        assert_eq!(wf.step_count(), 8);
        match &wf.steps[0].kind {
            StepKind::Input(input) => {
                assert_eq!(input.validation.kind, InputType::Integer);
                assert_eq!(input.validation.max, Some(30.0));
                assert_eq!(input.max_attempts, 3);
            }
            other => panic!("expected INPUT step, got {}", other.label()),
        }
        assert_eq!(wf.steps[1].kind.label(), "SET_VARIABLE");
        assert_eq!(wf.steps[4].kind.label(), "ROUTER");
    }

    #[test]
    fn test_branch_requires_default_arm() {
        let yaml = r#"
name: "Bad"
workflow:
  - name: pick
    type: BRANCH
    branches:
      - when: "{{x}}"
        steps: []
"#;
        assert!(WorkflowDefinition::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_lint_reports_shadowing_and_undeclared_tools() {
        let yaml = r#"
name: "Lint"
workflow:
  - { name: a, type: PRINT, message: "x" }
  - { name: a, tool: missing }
"#;
        let warnings = WorkflowDefinition::from_yaml(yaml).unwrap().lint();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("more than once"));
        assert!(warnings[1].contains("undeclared tool 'missing'"));
    }

    #[test]
    fn test_expand_env_walks_nested_variables() {
        std::env::set_var("FXFLOW_TEST_PAIR", "GBP/USD");
        let variables = serde_json::json!({
            "pair": "${FXFLOW_TEST_PAIR}",
            "feeds": ["${FXFLOW_TEST_UNSET:-feed:primary}", "${FXFLOW_TEST_UNSET}"],
            "window": { "days": 7, "label": "${FXFLOW_TEST_PAIR} x${FXFLOW_TEST_UNSET:-2}" }
        });

        let expanded = expand_env(&variables);
        std::env::remove_var("FXFLOW_TEST_PAIR");

        assert_eq!(
            expanded,
            serde_json::json!({
                "pair": "GBP/USD",
                "feeds": ["feed:primary", "${FXFLOW_TEST_UNSET}"],
                "window": { "days": 7, "label": "GBP/USD x2" }
            })
        );
    }
}
