use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Component error: {0}")]
    Component(#[from] ComponentError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error raised by a component's own run logic. Isolated to the failing
/// task: the scheduler records it and keeps draining the queue.
#[derive(Error, Debug, Clone)]
pub enum ComponentError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input type for '{field}': expected {expected}, got {actual}")]
    InvalidInputType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Cancelled")]
    Cancelled,
}

/// Resolution failure against the authored graph: the offending task is
/// dropped after logging, never retried.
#[derive(Error, Debug, Clone)]
pub enum GraphError {
    #[error("Flow not found: {0}")]
    FlowNotFound(String),

    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    #[error("Action not found: {0}")]
    ActionNotFound(String),

    #[error("Unknown component type: {0}")]
    UnknownComponentType(String),

    #[error("Invalid connection: {0}")]
    InvalidConnection(String),

    #[error("Unknown port '{port}' on component {component}")]
    UnknownPort { component: String, port: String },

    #[error("Action '{0}' has no start component")]
    NoStartComponent(String),

    #[error("Invalid project: {0}")]
    Invalid(String),
}
