//! Tool registry — tool definitions plus the factories that build them.
//!
//! A definition names a tool, points at an implementation locator and
//! declares its parameters. Locators resolve through an explicit factory
//! map filled at startup; nothing is loaded from disk at call time.
//!
//! Definitions can also be kept as YAML files:
//!
//! ```yaml
//! name: "quotes"
//! description: "Canned FX quotes for offline runs"
//! implementation: "builtin::fixture"
//! parameters:
//!   - name: responses
//!     required: true
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RegistryError;
use crate::tools::builtin::{EchoTool, FixtureTool, ECHO_IMPLEMENTATION, FIXTURE_IMPLEMENTATION};
use crate::tools::{Tool, ToolArgs, ToolFactory};

/// Immutable description of a registrable tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool type name, the key used by workflows and the instance manager
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Factory key this tool is built from
    pub implementation: String,

    /// Declared parameter schema
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,

    #[serde(default)]
    pub required: bool,

    /// Value used when the workflow does not set the parameter
    #[serde(default)]
    pub default: Option<Value>,

    #[serde(default)]
    pub description: Option<String>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, implementation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            implementation: implementation.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, RegistryError> {
        serde_yaml::from_str(yaml).map_err(|e| RegistryError::Definition {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|e| RegistryError::Definition {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Fill declared defaults and reject missing required parameters.
    fn bind_parameters(&self, config: &ToolArgs) -> Result<ToolArgs, RegistryError> {
        let mut bound = config.clone();
        for spec in &self.parameters {
            if bound.contains_key(&spec.name) {
                continue;
            }
            match (&spec.default, spec.required) {
                (Some(default), _) => {
                    bound.insert(spec.name.clone(), default.clone());
                }
                (None, true) => {
                    return Err(RegistryError::InvalidParameters {
                        tool: self.name.clone(),
                        reason: format!("missing required parameter `{}`", spec.name),
                    });
                }
                (None, false) => {}
            }
        }
        Ok(bound)
    }
}

impl ParameterSpec {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            default: None,
            description: None,
        }
    }

    pub fn optional(name: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            required: false,
            default: Some(default),
            description: None,
        }
    }
}

/// Registry of tool definitions and implementation factories.
#[derive(Default)]
pub struct ToolRegistry {
    definitions: HashMap<String, ToolDefinition>,
    factories: HashMap<String, ToolFactory>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the `echo` and `fixture` tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_factory(ECHO_IMPLEMENTATION, |params| {
            Ok(Box::new(EchoTool::new(params)?) as Box<dyn Tool>)
        });
        registry.register_factory(FIXTURE_IMPLEMENTATION, |params| {
            Ok(Box::new(FixtureTool::new(params)?) as Box<dyn Tool>)
        });
        registry.register(
            ToolDefinition::new("echo", ECHO_IMPLEMENTATION)
                .with_description("Returns its arguments; `fail` returns an error envelope"),
        );
        registry.register(
            ToolDefinition::new("fixture", FIXTURE_IMPLEMENTATION)
                .with_description("Answers each method with a canned envelope")
                .with_parameter(ParameterSpec::optional("responses", Value::Object(Default::default()))),
        );
        registry
    }

    /// Store a definition. Re-registering a name replaces the previous one.
    pub fn register(&mut self, definition: ToolDefinition) {
        if self.definitions.contains_key(&definition.name) {
            tracing::debug!("[ToolRegistry] Replacing definition for '{}'", definition.name);
        }
        tracing::info!(
            "[ToolRegistry] Registered tool: {} ({})",
            definition.name,
            definition.implementation
        );
        self.definitions.insert(definition.name.clone(), definition);
    }

    /// Bind an implementation locator to a constructor.
    pub fn register_factory<F>(&mut self, implementation: impl Into<String>, factory: F)
    where
        F: Fn(&ToolArgs) -> Result<Box<dyn Tool>, crate::error::ToolError> + Send + Sync + 'static,
    {
        self.factories.insert(implementation.into(), Arc::new(factory));
    }

    /// Resolve a tool name to the factory of its implementation.
    pub fn load_implementation(&self, name: &str) -> Result<ToolFactory, RegistryError> {
        let definition = self
            .definitions
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        self.factories
            .get(&definition.implementation)
            .cloned()
            .ok_or_else(|| RegistryError::FactoryMissing {
                tool: name.to_string(),
                implementation: definition.implementation.clone(),
            })
    }

    /// Build a fresh instance of `name` from its parameter configuration.
    pub fn create_instance(
        &self,
        name: &str,
        config: &ToolArgs,
    ) -> Result<Box<dyn Tool>, RegistryError> {
        let factory = self.load_implementation(name)?;
        let definition = &self.definitions[name];
        let params = definition.bind_parameters(config)?;
        factory(&params).map_err(|source| RegistryError::Construction {
            tool: name.to_string(),
            source,
        })
    }

    pub fn get_definition(&self, name: &str) -> Option<&ToolDefinition> {
        self.definitions.get(name)
    }

    /// Registered tool names, sorted.
    pub fn list_tools(&self) -> Vec<String> {
        let mut names: Vec<String> = self.definitions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Register every `.yaml`/`.yml` definition found in `dir`.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, RegistryError> {
        if !dir.is_dir() {
            return Err(RegistryError::Definition {
                path: dir.display().to_string(),
                reason: "tool definition directory does not exist".to_string(),
            });
        }

        let entries = std::fs::read_dir(dir).map_err(|source| RegistryError::Io {
            path: dir.display().to_string(),
            source,
        })?;

        let mut count = 0;
        for entry in entries {
            let entry = entry.map_err(|source| RegistryError::Io {
                path: dir.display().to_string(),
                source,
            })?;
            let path = entry.path();
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !matches!(ext, "yaml" | "yml") {
                continue;
            }
            let definition = ToolDefinition::from_file(&path)?;
            self.register(definition);
            count += 1;
        }

        Ok(count)
    }

    /// Load definitions from `./tools` and `./servers` when present.
    pub fn load_default_dirs(&mut self) -> usize {
        let mut total = 0;
        for dir in ["tools", "servers"] {
            let path = Path::new(dir);
            if !path.is_dir() {
                continue;
            }
            match self.load_dir(path) {
                Ok(n) => {
                    tracing::info!("[ToolRegistry] Loaded {} definitions from '{}'", n, dir);
                    total += n;
                }
                Err(e) => {
                    tracing::warn!("[ToolRegistry] Failed to load from '{}': {}", dir, e);
                }
            }
        }
        total
    }
}
