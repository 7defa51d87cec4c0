//! CLI command implementations.
//!
//! Each submodule corresponds to a top-level CLI command.

pub mod tools;
pub mod workflow;

use std::path::Path;

use fxflow_core::ToolRegistry;

/// Registry with the built-in tools, the default search directories and,
/// when given, `tools_dir`.
pub fn build_registry(tools_dir: Option<&Path>) -> Result<ToolRegistry, String> {
    let mut registry = ToolRegistry::with_builtins();
    registry.load_default_dirs();

    if let Some(dir) = tools_dir {
        let count = registry.load_dir(dir).map_err(|e| e.to_string())?;
        tracing::info!("[fxflow] Loaded {} tool definition(s) from '{}'", count, dir.display());
    }
    Ok(registry)
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
