use crate::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub type FlowId = Uuid;
pub type ComponentId = Uuid;
pub type ConnectionId = Uuid;

/// Id of one running flow instance. Allocated by the runtime, never authored.
pub type FlowStateId = Uuid;

/// Component type the runtime itself recognizes: the entry point an action
/// flow runs immediately when invoked.
pub const START_COMPONENT_TYPE: &str = "flow.start";

/// Component type exposing one named call input inside an action flow.
pub const INPUT_COMPONENT_TYPE: &str = "flow.input";

/// Component type invoking an action flow by name.
pub const CALL_ACTION_COMPONENT_TYPE: &str = "flow.call_action";

/// Declared input port on a component. Readiness tracking only looks at
/// required ports that are actually wired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortDef {
    pub name: String,
    #[serde(default = "default_true")]
    pub required: bool,
}

fn default_true() -> bool {
    true
}

impl PortDef {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
        }
    }
}

/// Authoring-time graph node: named ports plus executor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub id: ComponentId,
    pub type_name: String,
    pub name: Option<String>,
    #[serde(default)]
    pub config: HashMap<String, Value>,
    #[serde(default)]
    pub inputs: Vec<PortDef>,
    #[serde(default)]
    pub outputs: Vec<String>,
    pub position: Option<Position>,
}

impl Component {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            type_name: type_name.into(),
            name: None,
            config: HashMap::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            position: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn with_input(mut self, name: impl Into<String>) -> Self {
        self.inputs.push(PortDef::required(name));
        self
    }

    pub fn with_optional_input(mut self, name: impl Into<String>) -> Self {
        self.inputs.push(PortDef::optional(name));
        self
    }

    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(name.into());
        self
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Some(Position { x, y });
        self
    }

    /// Display label: authored name, falling back to the type.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.type_name)
    }

    pub fn has_input(&self, name: &str) -> bool {
        self.inputs.iter().any(|p| p.name == name)
    }

    pub fn has_output(&self, name: &str) -> bool {
        self.outputs.iter().any(|o| o == name)
    }
}

/// Directed wire `(source component, output) -> (target component, input)`.
/// Both endpoints must live in the owning flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionLine {
    pub id: ConnectionId,
    pub source: ComponentId,
    pub output: String,
    pub target: ComponentId,
    pub input: String,
}

/// Component position in the visual editor. Ignored by the runtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowKind {
    /// Top level flow, instantiated at session start.
    Page,
    /// Sub-flow invoked by name from a calling flow.
    Action,
}

/// Variable declaration with its default value. Global declarations may be
/// marked persistent to survive stop/restart through the settings store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    #[serde(default = "null_value")]
    pub value: Value,
    #[serde(default)]
    pub persistent: bool,
}

fn null_value() -> Value {
    Value::Null
}

impl VariableDecl {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            persistent: false,
        }
    }

    pub fn persistent(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            persistent: true,
        }
    }
}

/// Static graph of components and connection lines. Immutable while running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    pub id: FlowId,
    pub name: String,
    pub kind: FlowKind,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub connections: Vec<ConnectionLine>,
    #[serde(default)]
    pub local_variables: Vec<VariableDecl>,
}

impl Flow {
    pub fn new(name: impl Into<String>, kind: FlowKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            components: Vec::new(),
            connections: Vec::new(),
            local_variables: Vec::new(),
        }
    }

    pub fn add_component(&mut self, component: Component) -> ComponentId {
        let id = component.id;
        self.components.push(component);
        id
    }

    pub fn connect(
        &mut self,
        source: ComponentId,
        output: impl Into<String>,
        target: ComponentId,
        input: impl Into<String>,
    ) -> ConnectionId {
        let id = Uuid::new_v4();
        self.connections.push(ConnectionLine {
            id,
            source,
            output: output.into(),
            target,
            input: input.into(),
        });
        id
    }

    pub fn find_component(&self, id: ComponentId) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }

    pub fn find_connection(&self, id: ConnectionId) -> Option<&ConnectionLine> {
        self.connections.iter().find(|c| c.id == id)
    }

    /// Connections leaving `(component, output)`.
    pub fn connections_from<'a>(
        &'a self,
        component: ComponentId,
        output: &'a str,
    ) -> impl Iterator<Item = &'a ConnectionLine> {
        self.connections
            .iter()
            .filter(move |c| c.source == component && c.output == output)
    }

    /// Connections arriving at any input of `component`.
    pub fn connections_into(
        &self,
        component: ComponentId,
    ) -> impl Iterator<Item = &ConnectionLine> {
        self.connections.iter().filter(move |c| c.target == component)
    }

    /// Whether `(component, input)` has at least one incoming wire.
    pub fn is_input_wired(&self, component: ComponentId, input: &str) -> bool {
        self.connections
            .iter()
            .any(|c| c.target == component && c.input == input)
    }

    /// Entry points: components with no incoming wires and no required input
    /// ports, enqueued unconditionally when the flow instance starts.
    pub fn entry_components(&self) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(|c| {
            c.inputs.iter().all(|p| !p.required)
                && self.connections_into(c.id).next().is_none()
        })
    }

    /// First component of the given type, if any.
    pub fn find_by_type(&self, type_name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.type_name == type_name)
    }
}

/// The immutable bundle a runtime session executes: page flows, invocable
/// action flows and global variable declarations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub pages: Vec<Flow>,
    #[serde(default)]
    pub actions: Vec<Flow>,
    #[serde(default)]
    pub global_variables: Vec<VariableDecl>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pages: Vec::new(),
            actions: Vec::new(),
            global_variables: Vec::new(),
        }
    }

    pub fn add_page(&mut self, flow: Flow) -> FlowId {
        let id = flow.id;
        self.pages.push(flow);
        id
    }

    pub fn add_action(&mut self, flow: Flow) -> FlowId {
        let id = flow.id;
        self.actions.push(flow);
        id
    }

    pub fn flows(&self) -> impl Iterator<Item = &Flow> {
        self.pages.iter().chain(self.actions.iter())
    }

    pub fn find_flow(&self, id: FlowId) -> Option<&Flow> {
        self.flows().find(|f| f.id == id)
    }

    pub fn find_action(&self, name: &str) -> Option<&Flow> {
        self.actions.iter().find(|f| f.name == name)
    }

    /// Resolve a component anywhere in the project, together with its flow.
    pub fn find_component(&self, id: ComponentId) -> Option<(&Flow, &Component)> {
        self.flows()
            .find_map(|f| f.find_component(id).map(|c| (f, c)))
    }

    /// Resolve a component by authored name (used by the CLI debugger).
    pub fn find_component_by_name(&self, name: &str) -> Option<(&Flow, &Component)> {
        self.flows().find_map(|f| {
            f.components
                .iter()
                .find(|c| c.name.as_deref() == Some(name))
                .map(|c| (f, c))
        })
    }
}
