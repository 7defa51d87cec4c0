//! `fxflow run` / `fxflow validate` — YAML-defined tool workflows.

use std::path::Path;

use fxflow_core::error::WorkflowError;
use fxflow_core::{InstanceManager, RunOptions, RunReport, WorkflowDefinition, WorkflowExecutor};
use serde_json::{Map, Value};

use crate::prompt::TerminalConsole;

/// Flags of `fxflow run`.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub verbose: bool,
    pub interactive: bool,
    /// Raw `KEY=VALUE` pairs
    pub params: Vec<String>,
}

/// Run a workflow from a YAML file.
pub async fn run(workflow_file: &Path, args: RunArgs, tools_dir: Option<&Path>) -> Result<(), String> {
    // Load .env / .env.local if present (for API keys, etc.)
    load_dotenv();

    let workflow = WorkflowDefinition::from_file(workflow_file).map_err(|e| e.to_string())?;
    println!("📄 Loaded workflow: {} ({})", workflow.name, workflow_file.display());
    println!(
        "   {} step(s), {} tool(s)",
        workflow.step_count(),
        workflow.tools.len()
    );
    for warning in workflow.lint() {
        println!("   ⚠️  {}", warning);
    }
    println!();

    let options = RunOptions {
        interactive: args.interactive,
        params: parse_params(&args.params)?,
        verbose: args.verbose,
    };
    let registry = super::build_registry(tools_dir)?;

    // The executor blocks on prompts; keep it off the runtime so Ctrl-C stays responsive.
    let task = tokio::task::spawn_blocking(move || {
        let mut executor = WorkflowExecutor::new(InstanceManager::new(registry));
        let mut console = TerminalConsole::new();
        executor.execute(&workflow, &options, &mut console)
    });

    let outcome = tokio::select! {
        joined = task => joined.map_err(|e| format!("workflow task failed: {}", e))?,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\n⛔ Workflow cancelled");
            std::process::exit(130);
        }
    };

    match outcome {
        Ok(report) => summarize(&report),
        Err(WorkflowError::Cancelled { step }) => {
            eprintln!("⛔ Workflow cancelled during step '{}'", step);
            std::process::exit(130);
        }
        Err(e) => Err(e.to_string()),
    }
}

/// Validate a workflow YAML file without executing it.
pub fn validate(workflow_file: &Path) -> Result<(), String> {
    let workflow = WorkflowDefinition::from_file(workflow_file).map_err(|e| e.to_string())?;

    println!("✅ Workflow '{}' is valid", workflow.name);
    if let Some(description) = &workflow.description {
        println!("   {}", description);
    }
    println!("   Tools: {}", workflow.tools.len());
    for tool in &workflow.tools {
        println!("   - {} ({})", tool.name, tool.tool_type);
    }
    println!("   Steps: {}", workflow.steps.len());
    for (i, step) in workflow.steps.iter().enumerate() {
        println!("   {}. {} [{}]", i + 1, step.name, step.kind.label());
    }
    for warning in workflow.lint() {
        println!("   ⚠️  {}", warning);
    }

    Ok(())
}

/// Parse `KEY=VALUE` pairs. Values are read as YAML scalars, so `days=14`
/// yields a number and `pair=EUR/USD` a string.
pub fn parse_params(raw: &[String]) -> Result<Map<String, Value>, String> {
    let mut params = Map::new();
    for pair in raw {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("invalid parameter '{}': expected KEY=VALUE", pair))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("invalid parameter '{}': empty key", pair));
        }
        let value = value.trim();
        let parsed = if value.is_empty() {
            Value::String(String::new())
        } else {
            serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
        };
        params.insert(key.to_string(), parsed);
    }
    Ok(params)
}

fn summarize(report: &RunReport) -> Result<(), String> {
    let total = report.results.len();
    let succeeded = report.succeeded();

    println!();
    println!("═══════════════════════════════════════════════════════════");
    println!("  Workflow Complete: {}", report.workflow_name);
    println!("  Run: {}", report.run_id);
    println!(
        "  Duration: {} ms",
        (report.finished_at - report.started_at).num_milliseconds()
    );

    if report.is_success() {
        println!("  ✅ done ({}/{} steps)", succeeded, total);
        println!("═══════════════════════════════════════════════════════════");
        return Ok(());
    }

    let failures = report.failures();
    println!("  ❌ {}/{} steps succeeded", succeeded, total);
    for (step, error) in &failures {
        println!("     - {}: {}", step, error);
    }
    println!("═══════════════════════════════════════════════════════════");

    let failed_steps: Vec<&str> = failures.iter().map(|(step, _)| *step).collect();
    Err(format!(
        "Workflow failed. Failed steps: {}",
        failed_steps.join(", ")
    ))
}

/// Load .env and .env.local files for environment variables.
fn load_dotenv() {
    // Try .env.local first (higher priority), then .env
    for filename in &[".env.local", ".env"] {
        let path = Path::new(filename);
        let Ok(content) = std::fs::read_to_string(path) else {
            continue;
        };
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            // Existing env vars take priority
            if std::env::var(key).is_err() {
                std::env::set_var(key, value);
            }
        }
        tracing::info!("[Workflow] Loaded environment from '{}'", filename);
    }
}
