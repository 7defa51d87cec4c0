//! Execution context shared by every step of a run.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::template::{split_path, walk, Lookup};
use crate::tools::Outcome;

/// Stored data plus per-step results, passed by `&mut` through every step.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    stored: Map<String, Value>,
    results: IndexMap<String, Outcome>,
}

impl ExecutionContext {
    pub fn new(stored: Map<String, Value>) -> Self {
        Self {
            stored,
            results: IndexMap::new(),
        }
    }

    pub fn stored(&self) -> &Map<String, Value> {
        &self.stored
    }

    pub fn results(&self) -> &IndexMap<String, Outcome> {
        &self.results
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.stored.get(name)
    }

    /// Store `value` under `name`, replacing any earlier value.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.stored.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.stored.remove(name)
    }

    /// Record the outcome of a step. A reused step name replaces the earlier entry.
    pub fn record(&mut self, step: impl Into<String>, outcome: Outcome) {
        self.results.insert(step.into(), outcome);
    }

    pub fn into_parts(self) -> (Map<String, Value>, IndexMap<String, Outcome>) {
        (self.stored, self.results)
    }
}

/// Template lookup over a run.
///
/// Stored data is tried first: the whole path as one key, then segment by
/// segment. When that misses, the leading segment names a step and the rest
/// is walked inside its successful payload.
impl Lookup for ExecutionContext {
    fn lookup(&self, path: &str) -> Option<&Value> {
        let segments = split_path(path)?;
        let (head, rest) = segments.split_first()?;

        if segments.len() > 1 {
            if let Some(value) = self.stored.get(&segments.join(".")) {
                return Some(value);
            }
        }
        if let Some(value) = self.stored.get(*head).and_then(|root| walk(root, rest)) {
            return Some(value);
        }
        self.results
            .get(*head)
            .and_then(Outcome::payload)
            .and_then(|payload| walk(payload, rest))
    }
}
