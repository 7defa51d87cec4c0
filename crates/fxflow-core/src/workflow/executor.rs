//! Workflow Executor — runs a workflow definition step by step.
//!
//! The executor:
//! 1. Seeds stored data from the declared variables and run parameters
//! 2. Starts every declared tool through the instance manager
//! 3. Executes steps strictly in declared order, nested ones included
//! 4. Resolves templates against stored data and earlier step payloads
//!
//! A failed step is recorded and the run moves on. Only pool exhaustion at
//! startup and a cancelled prompt stop a run.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::error::{ManagerError, PromptError, StepError, WorkflowError};
use crate::manager::InstanceManager;
use crate::template::{
    has_placeholder, is_truthy, outline, render_text, resolve_value, single_placeholder, Lookup,
    TextStyle,
};
use crate::tools::{Outcome, ToolArgs};
use crate::workflow::console::Console;
use crate::workflow::context::ExecutionContext;
use crate::workflow::input::{accept_value, validate_and_coerce, value_text};
use crate::workflow::schema::{
    expand_env, BranchStep, InputStep, LoopStep, RouterStep, StepKind, ToolStep, WorkflowDefinition,
    WorkflowStep,
};

/// Run-mode inputs supplied by the driver.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Prompt even when parameters were supplied (hybrid mode)
    pub interactive: bool,
    /// Externally supplied variable values
    pub params: Map<String, Value>,
    /// Emit the outline of every successful tool payload
    pub verbose: bool,
}

impl RunOptions {
    /// Prompting is allowed unless parameters were supplied without `interactive`.
    pub fn may_prompt(&self) -> bool {
        self.interactive || self.params.is_empty()
    }
}

/// Result of executing the entire workflow.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub workflow_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Outcome per step name, in first-execution order
    pub results: IndexMap<String, Outcome>,
    /// Stored data at the end of the run
    pub stored: Map<String, Value>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.results.values().filter(|o| o.is_success()).count()
    }

    /// `(step, error)` for every failed step.
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.results
            .iter()
            .filter_map(|(step, outcome)| outcome.error().map(|e| (step.as_str(), e)))
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.results.values().all(Outcome::is_success)
    }
}

/// The workflow executor engine.
pub struct WorkflowExecutor {
    manager: InstanceManager,
}

impl WorkflowExecutor {
    pub fn new(manager: InstanceManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &InstanceManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut InstanceManager {
        &mut self.manager
    }

    /// Execute `workflow` and return its report.
    ///
    /// Tools started for the run are stopped again before returning, whether
    /// the run finished or was cancelled.
    pub fn execute(
        &mut self,
        workflow: &WorkflowDefinition,
        options: &RunOptions,
        console: &mut dyn Console,
    ) -> Result<RunReport, WorkflowError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        tracing::info!(
            "[WorkflowExecutor] Starting workflow '{}' (run {}, {} steps)",
            workflow.name,
            run_id,
            workflow.steps.len()
        );

        let mut stored = Map::new();
        for (name, value) in &workflow.variables {
            stored.insert(name.clone(), expand_env(value));
        }
        for (name, value) in &options.params {
            stored.insert(name.clone(), value.clone());
        }
        let mut ctx = ExecutionContext::new(stored);

        let outcome = self
            .start_tools(workflow, console)
            .and_then(|bindings| {
                let mut run = Run {
                    manager: &self.manager,
                    bindings,
                    options,
                    console: &mut *console,
                };
                run.steps(&workflow.steps, &mut ctx).map(|_| ())
            });
        self.manager.stop_all();
        outcome?;

        let (stored, results) = ctx.into_parts();
        let report = RunReport {
            run_id,
            workflow_name: workflow.name.clone(),
            started_at,
            finished_at: Utc::now(),
            results,
            stored,
        };
        tracing::info!(
            "[WorkflowExecutor] Finished workflow '{}': {}/{} steps succeeded",
            workflow.name,
            report.succeeded(),
            report.results.len()
        );
        Ok(report)
    }

    /// Start every declared tool. Returns workflow-local name → tool type.
    fn start_tools(
        &mut self,
        workflow: &WorkflowDefinition,
        console: &mut dyn Console,
    ) -> Result<HashMap<String, String>, WorkflowError> {
        let mut bindings = HashMap::new();
        for binding in &workflow.tools {
            let params: ToolArgs = binding
                .parameters
                .iter()
                .map(|(k, v)| (k.clone(), expand_env(v)))
                .collect();
            match self.manager.start(&binding.tool_type, &params) {
                Ok(handle) => {
                    tracing::info!(
                        "[WorkflowExecutor] Tool '{}' ready ({} id {})",
                        binding.name,
                        handle.tool_type,
                        handle.id
                    );
                }
                Err(e @ ManagerError::ResourceExhausted { .. }) => {
                    return Err(WorkflowError::Startup(e));
                }
                Err(e) => {
                    tracing::warn!("[WorkflowExecutor] Failed to start tool '{}': {}", binding.name, e);
                    console.emit(&format!("❌ tool {}: {}", binding.name, e));
                }
            }
            bindings.insert(binding.name.clone(), binding.tool_type.clone());
        }
        Ok(bindings)
    }
}

// ─── Step dispatch ──────────────────────────────────────────────────────

struct Run<'a> {
    manager: &'a InstanceManager,
    bindings: HashMap<String, String>,
    options: &'a RunOptions,
    console: &'a mut dyn Console,
}

impl Run<'_> {
    /// Run `steps` in order. Returns the outcome of the last one.
    fn steps(
        &mut self,
        steps: &[WorkflowStep],
        ctx: &mut ExecutionContext,
    ) -> Result<Option<Outcome>, WorkflowError> {
        let mut last = None;
        for step in steps {
            last = Some(self.step(step, ctx)?);
        }
        Ok(last)
    }

    fn step(&mut self, step: &WorkflowStep, ctx: &mut ExecutionContext) -> Result<Outcome, WorkflowError> {
        tracing::debug!("[WorkflowExecutor] Step '{}' ({})", step.name, step.kind.label());
        let outcome = match &step.kind {
            StepKind::Tool(tool) => self.tool(&step.name, tool, ctx),
            StepKind::Print(print) => {
                let message = render_text(&print.message, &*ctx, TextStyle::Outline);
                self.console.emit(&message);
                Outcome::success(json!({ "message": message }))
            }
            StepKind::Input(input) => self.input(&step.name, input, ctx)?,
            StepKind::SetVariable(set) => {
                let value = resolve_value(&set.value, &*ctx);
                ctx.set(set.variable.clone(), value.clone());
                Outcome::Success(value)
            }
            StepKind::Loop(body) => self.repeat(body, ctx)?,
            StepKind::Branch(branch) => self.branch(branch, ctx)?,
            StepKind::Router(router) => self.route(router, ctx)?,
        };

        match &outcome {
            Outcome::Success(_) => {
                if !matches!(step.kind, StepKind::Print(_)) {
                    self.console.emit(&format!("✅ {}", step.name));
                }
            }
            Outcome::Failure(error) => {
                tracing::warn!("[WorkflowExecutor] Step '{}' failed: {}", step.name, error);
                self.console.emit(&format!("❌ {}: {}", step.name, error));
            }
        }
        ctx.record(step.name.clone(), outcome.clone());
        Ok(outcome)
    }

    fn tool(&mut self, step_name: &str, tool: &ToolStep, ctx: &mut ExecutionContext) -> Outcome {
        let tool_type = match self.bindings.get(&tool.tool) {
            Some(tool_type) => tool_type.as_str(),
            None if self.manager.is_running(&tool.tool) => tool.tool.as_str(),
            None => return Outcome::failure(StepError::ToolNotFound(tool.tool.clone()).to_string()),
        };
        self.console.emit(&format!("🔹 {} → {}.{}", step_name, tool.tool, tool.method));

        let args: ToolArgs = tool
            .inputs
            .iter()
            .map(|(k, v)| (k.clone(), resolve_value(v, &*ctx)))
            .collect();

        let outcome = match self.manager.call_method(tool_type, &tool.method, &args) {
            Ok(envelope) => Outcome::from_envelope(envelope),
            Err(e) => Outcome::failure(StepError::from(e).to_string()),
        };

        if let Outcome::Success(payload) = &outcome {
            ctx.set(step_name, payload.clone());
            if let Some(alias) = &tool.output {
                ctx.set(alias.clone(), payload.clone());
            }
            if self.options.verbose {
                for line in outline(payload).lines() {
                    self.console.emit(&format!("   {}", line));
                }
            }
        }
        outcome
    }

    fn input(
        &mut self,
        step_name: &str,
        input: &InputStep,
        ctx: &mut ExecutionContext,
    ) -> Result<Outcome, WorkflowError> {
        let may_prompt = self.options.may_prompt() || input.force_prompt;

        if !input.force_prompt {
            if let Some(supplied) = self.options.params.get(&input.variable) {
                match accept_value(supplied, &input.validation) {
                    Ok(value) => return Ok(store(ctx, &input.variable, value)),
                    Err(e) if !may_prompt => {
                        ctx.remove(&input.variable);
                        return Ok(Outcome::failure(
                            StepError::ValidationExhausted { attempts: 1, last: e }.to_string(),
                        ));
                    }
                    Err(e) => {
                        tracing::warn!(
                            "[WorkflowExecutor] Supplied value for '{}' rejected: {}",
                            input.variable,
                            e
                        );
                        ctx.remove(&input.variable);
                    }
                }
            }
        }

        if !may_prompt {
            return Ok(match &input.default {
                Some(default) => match accept_default(input, default) {
                    Ok(value) => store(ctx, &input.variable, value),
                    Err(e) => Outcome::failure(e.to_string()),
                },
                None => Outcome::failure(StepError::MissingInput(input.variable.clone()).to_string()),
            });
        }

        let prompt = render_text(&input.prompt, &*ctx, TextStyle::Compact);
        let default_text = input.default.as_ref().map(value_text);
        let attempts = input.max_attempts.max(1);
        let mut last = None;

        for _ in 0..attempts {
            let line = match self.console.read_line(&prompt, default_text.as_deref()) {
                Ok(line) => line,
                Err(PromptError::Cancelled) => {
                    return Err(WorkflowError::Cancelled {
                        step: step_name.to_string(),
                    })
                }
                Err(PromptError::Unavailable(reason)) => {
                    return Ok(Outcome::failure(
                        StepError::PromptUnavailable {
                            variable: input.variable.clone(),
                            reason,
                        }
                        .to_string(),
                    ))
                }
            };

            if line.trim().is_empty() {
                if let Some(default) = &input.default {
                    return Ok(match accept_default(input, default) {
                        Ok(value) => store(ctx, &input.variable, value),
                        Err(e) => Outcome::failure(e.to_string()),
                    });
                }
            }

            match validate_and_coerce(&line, &input.validation) {
                Ok(value) => return Ok(store(ctx, &input.variable, value)),
                Err(e) => {
                    self.console.emit(&format!("⚠️  {}", e));
                    last = Some(e);
                }
            }
        }

        Ok(Outcome::failure(match last {
            Some(last) => StepError::ValidationExhausted { attempts, last }.to_string(),
            None => StepError::MissingInput(input.variable.clone()).to_string(),
        }))
    }

    fn repeat(&mut self, body: &LoopStep, ctx: &mut ExecutionContext) -> Result<Outcome, WorkflowError> {
        let mut last = None;
        for i in 1..=body.count {
            if let Some(var) = &body.index_variable {
                ctx.set(var.clone(), json!(i));
            }
            if let Some(outcome) = self.steps(&body.steps, ctx)? {
                last = Some(outcome);
            }
        }
        Ok(last.unwrap_or_else(|| Outcome::success(json!({ "iterations": body.count }))))
    }

    fn branch(&mut self, branch: &BranchStep, ctx: &mut ExecutionContext) -> Result<Outcome, WorkflowError> {
        let selected = branch
            .branches
            .iter()
            .enumerate()
            .find(|(_, arm)| condition_holds(&arm.when, &*ctx));
        let (arm, steps) = match selected {
            Some((i, arm)) => (format!("branches[{}]", i), &arm.steps),
            None => ("default".to_string(), &branch.default),
        };
        tracing::debug!("[WorkflowExecutor] Branch selected {}", arm);
        let result = self.steps(steps, ctx)?;
        Ok(Outcome::success(json!({ "arm": arm, "result": result })))
    }

    fn route(&mut self, router: &RouterStep, ctx: &mut ExecutionContext) -> Result<Outcome, WorkflowError> {
        let route = render_text(&router.route, &*ctx, TextStyle::Compact);
        let route = route.trim();
        let selected = router.routes.iter().find(|arm| value_text(&arm.value) == route);
        let (arm, steps) = match selected {
            Some(arm) => (value_text(&arm.value), &arm.steps),
            None => ("default".to_string(), &router.default),
        };
        tracing::debug!("[WorkflowExecutor] Route '{}' selected {}", route, arm);
        let result = self.steps(steps, ctx)?;
        Ok(Outcome::success(json!({ "arm": arm, "result": result })))
    }
}

fn store(ctx: &mut ExecutionContext, variable: &str, value: Value) -> Outcome {
    ctx.set(variable, value.clone());
    Outcome::Success(value)
}

/// A declared default goes through the same validation as a typed answer.
fn accept_default(input: &InputStep, default: &Value) -> Result<Value, StepError> {
    accept_value(default, &input.validation).map_err(|last| {
        tracing::warn!(
            "[WorkflowExecutor] Default for '{}' rejected: {}",
            input.variable,
            last
        );
        StepError::InvalidDefault {
            variable: input.variable.to_string(),
            last,
        }
    })
}

// ─── Conditions ─────────────────────────────────────────────────────────

/// Evaluate a branch condition.
///
/// A lone placeholder tests the value it resolves to. Otherwise both sides
/// of `!=` / `==` are rendered and compared as text, or the rendered text is
/// tested on its own.
fn condition_holds(expr: &str, scope: &dyn Lookup) -> bool {
    let expr = expr.trim();
    if let Some(path) = single_placeholder(expr) {
        return scope.lookup(path).is_some_and(is_truthy);
    }

    let side = |text: &str| {
        let rendered = render_text(text.trim(), scope, TextStyle::Compact);
        unquote(rendered.trim()).to_string()
    };
    if let Some((lhs, rhs)) = expr.split_once("!=") {
        return side(lhs) != side(rhs);
    }
    if let Some((lhs, rhs)) = expr.split_once("==") {
        return side(lhs) == side(rhs);
    }

    let text = side(expr);
    !(text.is_empty()
        || has_placeholder(&text)
        || matches!(text.to_ascii_lowercase().as_str(), "false" | "0" | "null" | "none"))
}

fn unquote(text: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = text.strip_prefix(quote).and_then(|t| t.strip_suffix(quote)) {
            return inner;
        }
    }
    text
}
