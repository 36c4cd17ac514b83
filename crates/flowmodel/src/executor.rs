use crate::{
    data::DataContext, events::EventEmitter, ComponentError, ComponentId, FlowStateId, Value,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// How the scheduler drives a component body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Awaited by the scheduler before the next queued task.
    Inline,
    /// Spawned; the component state reads as running until the completion is
    /// applied, and re-deliveries to it are deferred in the meantime.
    Detached,
}

/// Execution contract every component type implements. The runtime knows
/// nothing about component semantics; it only propagates whatever outputs a
/// run produces along matching connection lines and obeys the returned
/// control verb.
#[async_trait]
pub trait ComponentExecutor: Send + Sync {
    /// Registry key, e.g. "math.arithmetic".
    fn type_name(&self) -> &str;

    fn dispatch(&self) -> Dispatch {
        Dispatch::Inline
    }

    async fn run(&self, ctx: ComponentContext) -> Result<RunOutcome, ComponentError>;

    /// Optional: validate configuration at project load time.
    fn validate_config(&self, _config: &HashMap<String, Value>) -> Result<(), ComponentError> {
        Ok(())
    }
}

/// Context passed to each component run.
#[derive(Clone)]
pub struct ComponentContext {
    pub flow_state: FlowStateId,
    pub component: ComponentId,

    /// Buffered input values, keyed by input port name.
    pub inputs: HashMap<String, Value>,

    /// Static configuration from the authored component.
    pub config: HashMap<String, Value>,

    /// Values the caller passed when this flow instance was invoked as an
    /// action. Empty for page flows.
    pub call_inputs: HashMap<String, Value>,

    /// Scoped variable store of the owning flow instance.
    pub data: DataContext,

    /// Scratch state surviving across runs of this component instance.
    pub state: Arc<RwLock<ExecutorState>>,

    /// Real-time event emitter.
    pub events: EventEmitter,

    /// Signalled when the session is shutting down.
    pub cancellation: tokio_util::sync::CancellationToken,
}

impl ComponentContext {
    pub fn new(
        flow_state: FlowStateId,
        component: ComponentId,
        data: DataContext,
        events: EventEmitter,
    ) -> Self {
        Self {
            flow_state,
            component,
            inputs: HashMap::new(),
            config: HashMap::new(),
            call_inputs: HashMap::new(),
            data,
            state: Arc::new(RwLock::new(ExecutorState::default())),
            events,
            cancellation: tokio_util::sync::CancellationToken::new(),
        }
    }

    pub fn input(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name)
    }

    /// Get required input or return error.
    pub fn require_input(&self, name: &str) -> Result<&Value, ComponentError> {
        self.inputs
            .get(name)
            .ok_or_else(|| ComponentError::MissingInput(name.to_string()))
    }

    /// Get config value or return error.
    pub fn require_config(&self, name: &str) -> Result<&Value, ComponentError> {
        self.config
            .get(name)
            .ok_or_else(|| ComponentError::Configuration(format!("Missing config: {}", name)))
    }

    /// Get config with default.
    pub fn config_or(&self, name: &str, default: Value) -> Value {
        self.config.get(name).cloned().unwrap_or(default)
    }

    pub fn call_input(&self, name: &str) -> Option<&Value> {
        self.call_inputs.get(name)
    }
}

/// Scratch state for stateful component instances (counters, accumulators).
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ExecutorState {
    pub data: HashMap<String, Value>,
}

/// Control verb a run hands back to the scheduler alongside its outputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Control {
    /// Nothing beyond output propagation.
    #[default]
    Continue,
    /// Invoke the named action as a child flow instance of the current one.
    CallAction {
        action: String,
        inputs: HashMap<String, Value>,
    },
    /// Emit a value on an output port of the component that invoked the
    /// current action flow.
    CallerOutput { output: String, value: Value },
    /// Finish the current flow instance, optionally returning a result to
    /// the caller.
    EndFlow { result: Option<Value> },
}

/// Output of a component run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Output port values to propagate.
    pub outputs: HashMap<String, Value>,

    pub control: Control,
}

impl RunOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, port: impl Into<String>, value: impl Into<Value>) -> Self {
        self.outputs.insert(port.into(), value.into());
        self
    }

    pub fn with_control(mut self, control: Control) -> Self {
        self.control = control;
        self
    }
}
