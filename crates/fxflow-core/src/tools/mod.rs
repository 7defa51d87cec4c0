//! Tool contract — the boundary between the runtime and external tools.
//!
//! A tool is any type implementing [`Tool`]. Each call receives keyword
//! arguments as a JSON object and answers with a native *envelope*: a JSON
//! object carrying a boolean `success` flag plus either domain payload keys
//! or an `error` message. The runtime never inspects the payload; it adapts
//! the envelope into an [`Outcome`] and moves on.
//!
//! ```text
//! {"success": true,  "rate": 1.08}     ──► Outcome::Success(payload)
//! {"success": false, "error": "..."}   ──► Outcome::Failure(error)
//! ```

pub mod builtin;

use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::ToolError;

/// Keyword arguments passed to a tool method.
pub type ToolArgs = Map<String, Value>;

/// An externally implemented capability, invoked by method name.
pub trait Tool: Send + Sync {
    /// Names of the callable methods.
    fn methods(&self) -> Vec<String>;

    fn has_method(&self, method: &str) -> bool {
        self.methods().iter().any(|m| m == method)
    }

    /// Invoke `method` with keyword arguments and return its native envelope.
    fn call(&self, method: &str, args: &ToolArgs) -> Result<Value, ToolError>;

    /// Tool-specific health report. `None` means the tool has no check of its own.
    fn health_check(&self) -> Option<Value> {
        None
    }
}

/// Constructor registered for an implementation locator.
pub type ToolFactory = Arc<dyn Fn(&ToolArgs) -> Result<Box<dyn Tool>, ToolError> + Send + Sync>;

// ─── Outcome ────────────────────────────────────────────────────────────

/// Tagged result of a tool call or workflow step.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Value),
    Failure(String),
}

impl Outcome {
    pub fn success(payload: impl Serialize) -> Self {
        Outcome::Success(serde_json::to_value(payload).unwrap_or_default())
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Outcome::Failure(error.into())
    }

    /// Adapt a native tool envelope.
    ///
    /// `success: true` keeps the whole envelope as payload so later steps can
    /// address any of its keys. A missing or non-boolean flag is a failure.
    pub fn from_envelope(envelope: Value) -> Self {
        match envelope.get("success").and_then(Value::as_bool) {
            Some(true) => Outcome::Success(envelope),
            Some(false) => {
                let error = envelope
                    .get("error")
                    .map(|e| match e {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .unwrap_or_else(|| "unknown error".to_string());
                Outcome::Failure(error)
            }
            None => Outcome::Failure("tool result has no boolean `success` flag".to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            Outcome::Success(payload) => Some(payload),
            Outcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(error) => Some(error),
        }
    }
}

/// Serializes back into the envelope shape: `{success, payload}` or `{success, error}`.
impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            Outcome::Success(payload) => {
                map.serialize_entry("success", &true)?;
                map.serialize_entry("payload", payload)?;
            }
            Outcome::Failure(error) => {
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_success_keeps_payload() {
        let outcome = Outcome::from_envelope(json!({"success": true, "rate": 1.08}));
        assert!(outcome.is_success());
        assert_eq!(outcome.payload().unwrap()["rate"], json!(1.08));
    }

    #[test]
    fn test_envelope_failure_and_missing_flag() {
        let failed = Outcome::from_envelope(json!({"success": false, "error": "timeout"}));
        assert_eq!(failed.error(), Some("timeout"));

        let no_message = Outcome::from_envelope(json!({"success": false}));
        assert_eq!(no_message.error(), Some("unknown error"));

        let no_flag = Outcome::from_envelope(json!({"rate": 1.0}));
        assert!(!no_flag.is_success());
    }

    #[test]
    fn test_outcome_serializes_as_envelope() {
        let value = serde_json::to_value(Outcome::failure("boom")).unwrap();
        assert_eq!(value, json!({"success": false, "error": "boom"}));
    }
}
