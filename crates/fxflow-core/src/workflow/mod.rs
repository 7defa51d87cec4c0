//! Workflow engine — YAML-driven step sequences over registered tools.
//!
//! # Architecture
//!
//! ```text
//! workflow.yaml ──► WorkflowDefinition ──► WorkflowExecutor ──► RunReport
//!                                              │      │
//!                              ExecutionContext      InstanceManager
//!                              (stored + results)         │
//!                                                    ToolRegistry
//! ```

pub mod console;
pub mod context;
pub mod executor;
pub mod input;
pub mod schema;

pub use console::{Console, ScriptedConsole, StdConsole};
pub use context::ExecutionContext;
pub use executor::{RunOptions, RunReport, WorkflowExecutor};
pub use input::{InputType, InputValidation};
pub use schema::{StepKind, ToolBinding, WorkflowDefinition, WorkflowStep};
