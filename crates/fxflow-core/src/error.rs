//! Error types for the fxflow runtime.
//!
//! Each layer owns its error enum: tools raise `ToolError`, the registry
//! raises `RegistryError`, the instance manager `ManagerError`. Inside a run,
//! step-level problems are `StepError`s and are recorded as failed outcomes;
//! only `WorkflowError` unwinds `WorkflowExecutor::execute`.

use std::ops::Range;

/// Failure raised by a tool implementation or its factory.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{0}")]
    Failed(String),

    #[error("missing argument `{0}`")]
    MissingArgument(String),

    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("tool not registered: {0}")]
    NotFound(String),

    #[error("no factory for implementation `{implementation}` of tool `{tool}`")]
    FactoryMissing { tool: String, implementation: String },

    #[error("invalid parameters for tool `{tool}`: {reason}")]
    InvalidParameters { tool: String, reason: String },

    #[error("failed to construct tool `{tool}`: {source}")]
    Construction {
        tool: String,
        #[source]
        source: ToolError,
    },

    #[error("invalid tool definition '{path}': {reason}")]
    Definition { path: String, reason: String },

    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("tool instance not running: {0}")]
    NotRunning(String),

    #[error("tool method not found: {tool_type}.{method}")]
    MethodMissing { tool_type: String, method: String },

    #[error("no free instance identifier (pool {pool:?} exhausted)")]
    ResourceExhausted { pool: Range<u16> },

    #[error("{tool_type}.{method} failed: {reason}")]
    Invocation {
        tool_type: String,
        method: String,
        reason: String,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Rejection of a single line of user input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("expected {expected}, got `{input}`")]
    Format { expected: &'static str, input: String },

    #[error("value {value} is outside the allowed range {range}")]
    Range { value: f64, range: String },

    #[error("length {length} is outside the allowed range {range}")]
    Length { length: usize, range: String },

    #[error("`{input}` is not one of: {choices}")]
    Choice { input: String, choices: String },

    #[error("`{input}` does not match pattern `{pattern}`")]
    Pattern { input: String, pattern: String },

    #[error("invalid pattern `{pattern}`: {reason}")]
    BadPattern { pattern: String, reason: String },
}

/// Failure of one step. Recorded in the run results, never propagated.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error(transparent)]
    Dispatch(#[from] ManagerError),

    #[error("input rejected after {attempts} attempt(s): {last}")]
    ValidationExhausted { attempts: u32, last: ValidationError },

    #[error("default for `{variable}` is invalid: {last}")]
    InvalidDefault { variable: String, last: ValidationError },

    #[error("no value supplied for `{0}` and prompting is disabled")]
    MissingInput(String),

    #[error("cannot prompt for `{variable}`: {reason}")]
    PromptUnavailable { variable: String, reason: String },
}

/// Conditions that stop a whole workflow run.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("workflow startup failed: {0}")]
    Startup(#[source] ManagerError),

    #[error("workflow cancelled during step `{step}`")]
    Cancelled { step: String },

    #[error("failed to parse workflow: {0}")]
    Parse(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to obtain a line from the console.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("input cancelled")]
    Cancelled,

    #[error("{0}")]
    Unavailable(String),
}
