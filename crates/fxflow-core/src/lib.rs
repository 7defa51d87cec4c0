//! fxflow Core — declarative workflow runtime for forex analysis tools.
//!
//! A [`registry::ToolRegistry`] knows how to build tools, an
//! [`manager::InstanceManager`] keeps one live instance per tool type, and a
//! [`workflow::WorkflowExecutor`] runs YAML workflows against them, resolving
//! `{{...}}` templates through [`template`] at every step.
//!
//! The crate is synchronous and has no terminal dependency; drivers plug in
//! through [`workflow::Console`].

pub mod error;
pub mod manager;
pub mod registry;
pub mod template;
pub mod tools;
pub mod workflow;

// Convenience re-exports
pub use error::{ManagerError, RegistryError, StepError, ToolError, WorkflowError};
pub use manager::InstanceManager;
pub use registry::{ParameterSpec, ToolDefinition, ToolRegistry};
pub use tools::{Outcome, Tool, ToolArgs};
pub use workflow::{RunOptions, RunReport, WorkflowDefinition, WorkflowExecutor};
