//! Instance manager — one live instance per tool type.
//!
//! `start` is idempotent per tool type and draws an identifier from a fixed
//! pool; `call_method` is the single dispatch entry point. Dispatch is a
//! direct, synchronous call into the instance. The manager does not
//! serialize concurrent calls into the same instance.

use std::collections::{BTreeSet, HashMap};
use std::ops::Range;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::ManagerError;
use crate::registry::ToolRegistry;
use crate::tools::{Tool, ToolArgs};

/// Identifier range handed out to started instances.
pub const DEFAULT_ID_POOL: Range<u16> = 8000..8100;

/// Public view of a running instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceHandle {
    pub tool_type: String,
    pub id: u16,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Running,
    Stopped,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

struct RunningInstance {
    handle: InstanceHandle,
    instance: Arc<dyn Tool>,
    config: ToolArgs,
}

pub struct InstanceManager {
    registry: ToolRegistry,
    instances: HashMap<String, RunningInstance>,
    pool_range: Range<u16>,
    free_ids: BTreeSet<u16>,
}

impl InstanceManager {
    pub fn new(registry: ToolRegistry) -> Self {
        Self::with_id_pool(registry, DEFAULT_ID_POOL)
    }

    pub fn with_id_pool(registry: ToolRegistry, pool: Range<u16>) -> Self {
        Self {
            registry,
            instances: HashMap::new(),
            free_ids: pool.clone().collect(),
            pool_range: pool,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ToolRegistry {
        &mut self.registry
    }

    /// Start `tool_type` unless it is already running.
    ///
    /// Fails with `ResourceExhausted` when no identifier is free; the drawn
    /// identifier goes back to the pool if construction fails.
    pub fn start(&mut self, tool_type: &str, config: &ToolArgs) -> Result<InstanceHandle, ManagerError> {
        if let Some(running) = self.instances.get(tool_type) {
            tracing::warn!(
                "[InstanceManager] Instance already running: {} (id {})",
                tool_type,
                running.handle.id
            );
            return Ok(running.handle.clone());
        }

        let id = self.free_ids.pop_first().ok_or_else(|| ManagerError::ResourceExhausted {
            pool: self.pool_range.clone(),
        })?;

        let instance = match self.registry.create_instance(tool_type, config) {
            Ok(instance) => instance,
            Err(e) => {
                self.free_ids.insert(id);
                return Err(e.into());
            }
        };

        let handle = InstanceHandle {
            tool_type: tool_type.to_string(),
            id,
            started_at: Utc::now(),
        };
        self.instances.insert(
            tool_type.to_string(),
            RunningInstance {
                handle: handle.clone(),
                instance: Arc::from(instance),
                config: config.clone(),
            },
        );
        tracing::info!("[InstanceManager] Started {} (id {})", tool_type, id);
        Ok(handle)
    }

    /// Stop `tool_type` and release its identifier. Returns the released handle.
    pub fn stop(&mut self, tool_type: &str) -> Option<InstanceHandle> {
        let running = self.instances.remove(tool_type)?;
        self.free_ids.insert(running.handle.id);
        tracing::info!("[InstanceManager] Stopped {} (id {})", tool_type, running.handle.id);
        Some(running.handle)
    }

    pub fn stop_all(&mut self) {
        let tool_types: Vec<String> = self.instances.keys().cloned().collect();
        for tool_type in tool_types {
            self.stop(&tool_type);
        }
    }

    pub fn is_running(&self, tool_type: &str) -> bool {
        self.instances.contains_key(tool_type)
    }

    /// Parameter configuration the running instance was started with.
    pub fn instance_config(&self, tool_type: &str) -> Option<&ToolArgs> {
        self.instances.get(tool_type).map(|r| &r.config)
    }

    /// Handles of all running instances, ordered by identifier.
    pub fn running(&self) -> Vec<InstanceHandle> {
        let mut handles: Vec<InstanceHandle> =
            self.instances.values().map(|r| r.handle.clone()).collect();
        handles.sort_by_key(|h| h.id);
        handles
    }

    /// Invoke `method` on the running instance of `tool_type`.
    ///
    /// The returned envelope is passed through untouched. Tool errors and
    /// panics surface as `ManagerError::Invocation`.
    pub fn call_method(
        &self,
        tool_type: &str,
        method: &str,
        args: &ToolArgs,
    ) -> Result<Value, ManagerError> {
        let running = self
            .instances
            .get(tool_type)
            .ok_or_else(|| ManagerError::NotRunning(tool_type.to_string()))?;

        if !running.instance.has_method(method) {
            return Err(ManagerError::MethodMissing {
                tool_type: tool_type.to_string(),
                method: method.to_string(),
            });
        }

        tracing::debug!("[InstanceManager] Dispatch {}.{}", tool_type, method);
        let instance = Arc::clone(&running.instance);
        let invocation_error = |reason: String| ManagerError::Invocation {
            tool_type: tool_type.to_string(),
            method: method.to_string(),
            reason,
        };

        match catch_unwind(AssertUnwindSafe(|| instance.call(method, args))) {
            Ok(Ok(envelope)) => Ok(envelope),
            Ok(Err(e)) => Err(invocation_error(e.to_string())),
            Err(panic) => Err(invocation_error(panic_message(panic.as_ref()))),
        }
    }

    pub fn health_check(&self, tool_type: &str) -> HealthReport {
        let Some(running) = self.instances.get(tool_type) else {
            return HealthReport {
                status: HealthStatus::Stopped,
                detail: None,
            };
        };

        let instance = Arc::clone(&running.instance);
        match catch_unwind(AssertUnwindSafe(|| instance.health_check())) {
            Ok(Some(detail)) => HealthReport {
                status: HealthStatus::Running,
                detail: Some(detail),
            },
            Ok(None) => HealthReport {
                status: HealthStatus::Running,
                detail: None,
            },
            Err(panic) => HealthReport {
                status: HealthStatus::Error,
                detail: Some(Value::String(panic_message(panic.as_ref()))),
            },
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}
