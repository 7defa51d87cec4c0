//! Built-in tools for dry runs and tests.
//!
//! - `echo`    — `echo` returns its arguments, `fail` returns a failure envelope.
//! - `fixture` — answers each method with a canned envelope from its
//!   `responses` parameter, e.g.
//!
//! ```yaml
//! tools:
//!   - name: quotes
//!     tool_type: fixture
//!     parameters:
//!       responses:
//!         get_quote: { success: true, rate: 1.08 }
//! ```

use serde_json::{json, Map, Value};

use crate::error::ToolError;
use crate::tools::{Tool, ToolArgs};

pub const ECHO_IMPLEMENTATION: &str = "builtin::echo";
pub const FIXTURE_IMPLEMENTATION: &str = "builtin::fixture";

pub struct EchoTool;

impl EchoTool {
    pub fn new(_params: &ToolArgs) -> Result<Self, ToolError> {
        Ok(Self)
    }
}

impl Tool for EchoTool {
    fn methods(&self) -> Vec<String> {
        vec!["echo".to_string(), "fail".to_string()]
    }

    fn call(&self, method: &str, args: &ToolArgs) -> Result<Value, ToolError> {
        match method {
            "echo" => {
                let mut envelope = args.clone();
                envelope.insert("success".to_string(), Value::Bool(true));
                Ok(Value::Object(envelope))
            }
            "fail" => {
                let message = args
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("echo failure");
                Ok(json!({ "success": false, "error": message }))
            }
            other => Err(ToolError::Failed(format!("unsupported method `{}`", other))),
        }
    }
}

pub struct FixtureTool {
    responses: Map<String, Value>,
}

impl FixtureTool {
    pub fn new(params: &ToolArgs) -> Result<Self, ToolError> {
        let responses = match params.get("responses") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(ToolError::InvalidArgument {
                    name: "responses".to_string(),
                    reason: "expected a mapping of method name to envelope".to_string(),
                })
            }
        };
        Ok(Self { responses })
    }
}

impl Tool for FixtureTool {
    fn methods(&self) -> Vec<String> {
        self.responses.keys().cloned().collect()
    }

    fn call(&self, method: &str, _args: &ToolArgs) -> Result<Value, ToolError> {
        self.responses
            .get(method)
            .cloned()
            .ok_or_else(|| ToolError::Failed(format!("no fixture response for `{}`", method)))
    }

    fn health_check(&self) -> Option<Value> {
        Some(json!({ "status": "running", "fixtures": self.responses.len() }))
    }
}
