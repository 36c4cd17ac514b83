use flowmodel::{
    Component, ComponentExecutor, ComponentId, DataContext, ExecutorState, FlowId, FlowStateId,
    GraphError, Value,
};
use crate::registry::ExecutorRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Execution state of one component inside one flow instance.
///
/// The executor is resolved from the registry once, when the state is first
/// created, and reused for every run of this instance.
pub struct ComponentState {
    pub component: ComponentId,
    pub is_running: bool,
    /// Most recently written value per input port.
    pub inputs: HashMap<String, Value>,
    pub executor: Arc<dyn ComponentExecutor>,
    /// Scratch state shared with in-flight runs.
    pub state: Arc<RwLock<ExecutorState>>,
}

/// One running instance of a flow. Structure is fixed at creation; only the
/// component states and the child list mutate, and only from the pump.
pub struct FlowState {
    pub id: FlowStateId,
    pub flow_id: FlowId,
    pub parent: Option<FlowStateId>,
    pub children: Vec<FlowStateId>,
    /// Set when this instance was invoked as an action: the calling flow
    /// state and the component that invoked it.
    pub caller: Option<(FlowStateId, ComponentId)>,
    /// Values the caller passed along with the invocation.
    pub call_inputs: HashMap<String, Value>,
    pub component_states: HashMap<ComponentId, ComponentState>,
    pub data: DataContext,
    pub has_error: bool,
    pub is_finished: bool,
}

impl FlowState {
    pub fn component_state(&self, component: ComponentId) -> Option<&ComponentState> {
        self.component_states.get(&component)
    }

    pub fn is_component_running(&self, component: ComponentId) -> bool {
        self.component_states
            .get(&component)
            .map(|cs| cs.is_running)
            .unwrap_or(false)
    }

    pub fn any_component_running(&self) -> bool {
        self.component_states.values().any(|cs| cs.is_running)
    }
}

/// Arena of all live flow instances, keyed by id. Top-level page instances
/// are the roots; action invocations hang off their callers.
#[derive(Default)]
pub struct FlowStateStore {
    states: HashMap<FlowStateId, FlowState>,
    roots: Vec<FlowStateId>,
}

impl FlowStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a top-level instance for a page flow.
    pub fn create_root(&mut self, flow_id: FlowId, data: DataContext) -> FlowStateId {
        let id = Uuid::new_v4();
        self.states.insert(
            id,
            FlowState {
                id,
                flow_id,
                parent: None,
                children: Vec::new(),
                caller: None,
                call_inputs: HashMap::new(),
                component_states: HashMap::new(),
                data,
                has_error: false,
                is_finished: false,
            },
        );
        self.roots.push(id);
        id
    }

    /// Create a child instance for an invoked action flow.
    pub fn create_child(
        &mut self,
        flow_id: FlowId,
        parent: FlowStateId,
        caller_component: ComponentId,
        call_inputs: HashMap<String, Value>,
        data: DataContext,
    ) -> Option<FlowStateId> {
        if !self.states.contains_key(&parent) {
            tracing::error!(%parent, "UNEXPECTED: parent flow state does not exist");
            return None;
        }
        let id = Uuid::new_v4();
        self.states.insert(
            id,
            FlowState {
                id,
                flow_id,
                parent: Some(parent),
                children: Vec::new(),
                caller: Some((parent, caller_component)),
                call_inputs,
                component_states: HashMap::new(),
                data,
                has_error: false,
                is_finished: false,
            },
        );
        if let Some(parent_state) = self.states.get_mut(&parent) {
            parent_state.children.push(id);
        }
        Some(id)
    }

    pub fn get(&self, id: FlowStateId) -> Option<&FlowState> {
        self.states.get(&id)
    }

    pub fn get_mut(&mut self, id: FlowStateId) -> Option<&mut FlowState> {
        self.states.get_mut(&id)
    }

    pub fn roots(&self) -> &[FlowStateId] {
        &self.roots
    }

    pub fn contains(&self, id: FlowStateId) -> bool {
        self.states.contains_key(&id)
    }

    /// Lazily create the component state, resolving its executor from the
    /// registry. Stable for the instance's lifetime once created.
    pub fn ensure_component_state(
        &mut self,
        flow_state: FlowStateId,
        component: &Component,
        registry: &ExecutorRegistry,
    ) -> Result<(), GraphError> {
        let state = self
            .states
            .get_mut(&flow_state)
            .ok_or_else(|| GraphError::FlowNotFound(flow_state.to_string()))?;
        if state.component_states.contains_key(&component.id) {
            return Ok(());
        }
        let executor: Arc<dyn ComponentExecutor> =
            Arc::from(registry.create(&component.type_name, &component.config)?);
        state.component_states.insert(
            component.id,
            ComponentState {
                component: component.id,
                is_running: false,
                inputs: HashMap::new(),
                executor,
                state: Arc::new(RwLock::new(ExecutorState::default())),
            },
        );
        Ok(())
    }

    pub fn is_component_running(&self, flow_state: FlowStateId, component: ComponentId) -> bool {
        self.states
            .get(&flow_state)
            .map(|fs| fs.is_component_running(component))
            .unwrap_or(false)
    }

    pub fn set_component_running(
        &mut self,
        flow_state: FlowStateId,
        component: ComponentId,
        running: bool,
    ) {
        if let Some(cs) = self
            .states
            .get_mut(&flow_state)
            .and_then(|fs| fs.component_states.get_mut(&component))
        {
            cs.is_running = running;
        }
    }

    /// Buffer an input value on the target component state.
    pub fn write_input(
        &mut self,
        flow_state: FlowStateId,
        component: ComponentId,
        input: &str,
        value: Value,
    ) {
        if let Some(cs) = self
            .states
            .get_mut(&flow_state)
            .and_then(|fs| fs.component_states.get_mut(&component))
        {
            cs.inputs.insert(input.to_string(), value);
        }
    }

    /// Mark `has_error` on the flow state and every ancestor.
    pub fn set_error(&mut self, flow_state: FlowStateId) {
        let mut current = Some(flow_state);
        while let Some(id) = current {
            match self.states.get_mut(&id) {
                Some(fs) => {
                    fs.has_error = true;
                    current = fs.parent;
                }
                None => break,
            }
        }
    }

    /// True while any flow instance still has a running component.
    pub fn any_running(&self) -> bool {
        self.states.values().any(|fs| fs.any_component_running())
    }

    /// Collect `id` and all descendants, depth-first.
    fn subtree(&self, id: FlowStateId) -> Vec<FlowStateId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(fs) = self.states.get(&current) {
                out.push(current);
                stack.extend(fs.children.iter().copied());
            }
        }
        out
    }

    /// Finish a flow instance: mark it and all descendants finished and, for
    /// sub-flows, detach from the parent and drop the subtree. Returns the
    /// finished ids so the caller can purge their queue tasks and notify.
    pub fn finish(&mut self, id: FlowStateId) -> Vec<FlowStateId> {
        let Some(fs) = self.states.get(&id) else {
            tracing::error!(%id, "UNEXPECTED: finishing unknown flow state");
            return Vec::new();
        };
        let parent = fs.parent;
        let finished = self.subtree(id);
        for fid in &finished {
            if let Some(state) = self.states.get_mut(fid) {
                state.is_finished = true;
            }
        }
        if let Some(parent_id) = parent {
            self.detach_child(parent_id, id);
            for fid in &finished {
                self.states.remove(fid);
            }
        }
        finished
    }

    /// Finish every live instance (session stop). Nothing is detached; the
    /// final snapshot still shows the tree.
    pub fn finish_all(&mut self) -> Vec<FlowStateId> {
        let mut finished = Vec::new();
        for fs in self.states.values_mut() {
            if !fs.is_finished {
                fs.is_finished = true;
                for cs in fs.component_states.values_mut() {
                    cs.is_running = false;
                }
                finished.push(fs.id);
            }
        }
        finished
    }

    fn detach_child(&mut self, parent: FlowStateId, child: FlowStateId) {
        let Some(parent_state) = self.states.get_mut(&parent) else {
            tracing::error!(%parent, "UNEXPECTED: detaching from unknown parent flow state");
            return;
        };
        match parent_state.children.iter().position(|c| *c == child) {
            Some(index) => {
                parent_state.children.remove(index);
            }
            None => {
                tracing::error!(
                    %parent, %child,
                    "UNEXPECTED: flow state missing from its parent's child list"
                );
            }
        }
    }

    /// Action instances that have gone quiescent: nothing queued for them,
    /// nothing running, no live children. They are finished as if their end
    /// component had run with no result.
    pub fn quiescent_actions(&self, has_queued: impl Fn(FlowStateId) -> bool) -> Vec<FlowStateId> {
        self.states
            .values()
            .filter(|fs| {
                fs.caller.is_some()
                    && !fs.is_finished
                    && fs.children.is_empty()
                    && !fs.any_component_running()
                    && !has_queued(fs.id)
            })
            .map(|fs| fs.id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlowState> {
        self.states.values()
    }
}
