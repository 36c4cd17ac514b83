use flowmodel::{ComponentError, ComponentExecutor, GraphError, PortDef, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Factory trait for creating component executor instances
pub trait ExecutorFactory: Send + Sync {
    /// Create a new executor for the given configuration
    fn create(
        &self,
        config: &HashMap<String, Value>,
    ) -> Result<Box<dyn ComponentExecutor>, ComponentError>;

    /// Component type identifier
    fn type_name(&self) -> &str;

    /// Optional: metadata (description, port schema, etc.)
    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata::default()
    }
}

/// Metadata about a component type
#[derive(Debug, Clone)]
pub struct ExecutorMetadata {
    pub description: String,
    pub category: String,
    pub inputs: Vec<InputDoc>,
    pub outputs: Vec<OutputDoc>,
}

impl ExecutorMetadata {
    /// The declared input ports, as the model sees them.
    pub fn input_ports(&self) -> impl Iterator<Item = &PortDef> {
        self.inputs.iter().map(|i| &i.port)
    }
}

impl Default for ExecutorMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

/// A documented input port: the model's `PortDef` plus a short description.
#[derive(Debug, Clone)]
pub struct InputDoc {
    pub port: PortDef,
    pub doc: String,
}

impl InputDoc {
    pub fn required(name: impl Into<String>, doc: impl Into<String>) -> Self {
        Self {
            port: PortDef::required(name),
            doc: doc.into(),
        }
    }

    pub fn optional(name: impl Into<String>, doc: impl Into<String>) -> Self {
        Self {
            port: PortDef::optional(name),
            doc: doc.into(),
        }
    }
}

/// A documented output port. Outputs carry no requiredness in the model.
#[derive(Debug, Clone)]
pub struct OutputDoc {
    pub name: String,
    pub doc: String,
}

impl OutputDoc {
    pub fn new(name: impl Into<String>, doc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: doc.into(),
        }
    }
}

/// Registry of available component types
pub struct ExecutorRegistry {
    factories: HashMap<String, Arc<dyn ExecutorFactory>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register an executor factory
    pub fn register(&mut self, factory: Arc<dyn ExecutorFactory>) {
        let type_name = factory.type_name().to_string();
        tracing::info!("Registering component type: {}", type_name);
        self.factories.insert(type_name, factory);
    }

    /// Create an executor for a component type and config
    pub fn create(
        &self,
        type_name: &str,
        config: &HashMap<String, Value>,
    ) -> Result<Box<dyn ComponentExecutor>, GraphError> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| GraphError::UnknownComponentType(type_name.to_string()))?;

        factory
            .create(config)
            .map_err(|e| GraphError::Invalid(format!("Failed to create executor: {}", e)))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// All registered component types
    pub fn list_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }

    /// Metadata for a component type
    pub fn metadata(&self, type_name: &str) -> Option<ExecutorMetadata> {
        self.factories.get(type_name).map(|f| f.metadata())
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
