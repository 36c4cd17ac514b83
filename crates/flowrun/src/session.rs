use crate::pump::Pump;
use crate::queue::TaskId;
use crate::registry::ExecutorRegistry;
use flowmodel::{
    ComponentId, EventBus, FlowError, FlowKind, FlowStateId, HistoryItem, Project, RuntimeAction,
    RuntimeEvent, RuntimeMode, SessionId, Value,
};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Commands a [`SessionHandle`](crate::SessionHandle) sends to the pump actor.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    Transition(RuntimeAction),
    AddBreakpoint(ComponentId),
    RemoveBreakpoint(ComponentId),
    EnableBreakpoint(ComponentId),
    DisableBreakpoint(ComponentId),
    SelectQueueTask(Option<TaskId>),
    SelectFlowState(Option<FlowStateId>),
    /// User event on an interactive component: propagate its wired `action`
    /// output, or invoke the action named in its config.
    ExecuteWidgetAction {
        flow_state: FlowStateId,
        component: ComponentId,
    },
}

/// Read-only view of the session published after every scheduling step.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DebugSnapshot {
    pub session_id: SessionId,
    pub mode: RuntimeMode,
    pub debugger_active: bool,
    pub error: Option<String>,
    /// Pending tasks in execution order.
    pub queue: Vec<QueueTaskView>,
    /// Tree of live flow instances, one entry per page.
    pub flow_states: Vec<FlowStateView>,
    pub breakpoints: Vec<BreakpointView>,
    /// Session-global variables.
    pub globals: Vec<VariableView>,
    pub selected_flow_state: Option<FlowStateId>,
    pub selected_queue_task: Option<TaskId>,
    /// Bounded tail of the history log; the full stream is on the event bus.
    pub recent_history: Vec<HistoryItem>,
}

impl DebugSnapshot {
    /// True when nothing is pending and nothing is running: the session has
    /// drained and is waiting for external triggers.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && !self.flow_states.iter().any(flow_state_running)
    }
}

fn flow_state_running(view: &FlowStateView) -> bool {
    view.components.iter().any(|c| c.is_running) || view.children.iter().any(flow_state_running)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueTaskView {
    pub id: TaskId,
    pub flow_state: FlowStateId,
    pub component: ComponentId,
    /// `source.output -> target.input` for propagated tasks, else the
    /// component label.
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowStateView {
    pub id: FlowStateId,
    pub flow: String,
    pub kind: FlowKind,
    pub has_error: bool,
    pub is_finished: bool,
    pub variables: Vec<VariableView>,
    pub components: Vec<ComponentStateView>,
    pub children: Vec<FlowStateView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentStateView {
    pub component: ComponentId,
    pub label: String,
    pub type_name: String,
    pub is_running: bool,
    pub inputs: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableView {
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakpointView {
    pub component: ComponentId,
    pub label: String,
    pub enabled: bool,
}

/// Handle to a running session: issues debugger commands and observes
/// published snapshots. Dropping every handle stops the session.
pub struct SessionHandle {
    session_id: SessionId,
    commands: mpsc::Sender<SessionCommand>,
    snapshot: watch::Receiver<DebugSnapshot>,
    join: JoinHandle<()>,
}

impl SessionHandle {
    pub(crate) fn new(
        session_id: SessionId,
        commands: mpsc::Sender<SessionCommand>,
        snapshot: watch::Receiver<DebugSnapshot>,
        join: JoinHandle<()>,
    ) -> Self {
        Self {
            session_id,
            commands,
            snapshot,
            join,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Most recently published snapshot.
    pub fn snapshot(&self) -> DebugSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Watch channel for change-driven observers.
    pub fn watch(&self) -> watch::Receiver<DebugSnapshot> {
        self.snapshot.clone()
    }

    /// Wait until a snapshot satisfies the predicate, returning it.
    pub async fn wait_until(
        &self,
        mut predicate: impl FnMut(&DebugSnapshot) -> bool,
    ) -> Result<DebugSnapshot, FlowError> {
        let mut rx = self.snapshot.clone();
        rx.wait_for(|s| predicate(s))
            .await
            .map(|s| s.clone())
            .map_err(|_| FlowError::Execution("runtime session has ended".to_string()))
    }

    pub async fn send(&self, command: SessionCommand) -> Result<(), FlowError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| FlowError::Execution("runtime session has ended".to_string()))
    }

    pub async fn transition(&self, action: RuntimeAction) -> Result<(), FlowError> {
        self.send(SessionCommand::Transition(action)).await
    }

    pub async fn run(&self) -> Result<(), FlowError> {
        self.transition(RuntimeAction::Run).await
    }

    pub async fn pause(&self) -> Result<(), FlowError> {
        self.transition(RuntimeAction::Pause).await
    }

    pub async fn resume(&self) -> Result<(), FlowError> {
        self.transition(RuntimeAction::Resume).await
    }

    pub async fn single_step(&self) -> Result<(), FlowError> {
        self.transition(RuntimeAction::SingleStep).await
    }

    pub async fn stop(&self) -> Result<(), FlowError> {
        self.transition(RuntimeAction::Stop).await
    }

    pub async fn add_breakpoint(&self, component: ComponentId) -> Result<(), FlowError> {
        self.send(SessionCommand::AddBreakpoint(component)).await
    }

    pub async fn remove_breakpoint(&self, component: ComponentId) -> Result<(), FlowError> {
        self.send(SessionCommand::RemoveBreakpoint(component)).await
    }

    pub async fn enable_breakpoint(&self, component: ComponentId) -> Result<(), FlowError> {
        self.send(SessionCommand::EnableBreakpoint(component)).await
    }

    pub async fn disable_breakpoint(&self, component: ComponentId) -> Result<(), FlowError> {
        self.send(SessionCommand::DisableBreakpoint(component)).await
    }

    pub async fn select_queue_task(&self, task: Option<TaskId>) -> Result<(), FlowError> {
        self.send(SessionCommand::SelectQueueTask(task)).await
    }

    pub async fn select_flow_state(&self, flow_state: Option<FlowStateId>) -> Result<(), FlowError> {
        self.send(SessionCommand::SelectFlowState(flow_state)).await
    }

    pub async fn execute_widget_action(
        &self,
        flow_state: FlowStateId,
        component: ComponentId,
    ) -> Result<(), FlowError> {
        self.send(SessionCommand::ExecuteWidgetAction {
            flow_state,
            component,
        })
        .await
    }

    /// Wait for the session to finish, consuming the handle.
    pub async fn join(self) -> Result<(), FlowError> {
        self.join
            .await
            .map_err(|e| FlowError::Execution(format!("session task failed: {}", e)))
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub event_buffer_size: usize,
    /// How long stop waits for in-flight component runs before forcing every
    /// flow state finished.
    pub stop_timeout: Duration,
    /// History log bound (drop-oldest).
    pub max_history: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
            stop_timeout: Duration::from_secs(3),
            max_history: 1000,
        }
    }
}

/// Per-session options.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Start in `Paused` with the next task surfaced instead of `Running`.
    pub debugger_active: bool,
    /// Settings file backing persistent global variables.
    pub settings_path: Option<PathBuf>,
}

impl SessionOptions {
    pub fn debug() -> Self {
        Self {
            debugger_active: true,
            settings_path: None,
        }
    }

    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }
}

/// Main runtime for executing flow projects. Holds the executor registry and
/// the event bus; each started session gets its own pump actor.
pub struct FlowRuntime {
    registry: Arc<ExecutorRegistry>,
    event_bus: Arc<EventBus>,
    config: RuntimeConfig,
}

impl FlowRuntime {
    /// Create a new runtime with default settings
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a new runtime with custom configuration
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_registry(Arc::new(ExecutorRegistry::new()), config)
    }

    /// Create a new runtime with a pre-configured registry
    pub fn with_registry(registry: Arc<ExecutorRegistry>, config: RuntimeConfig) -> Self {
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));
        Self {
            registry,
            event_bus,
            config,
        }
    }

    /// Get access to the registry for registering component types
    pub fn registry(&self) -> &Arc<ExecutorRegistry> {
        &self.registry
    }

    /// Subscribe to runtime events
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<RuntimeEvent> {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Start a session executing `project`. The returned handle issues the
    /// debugger commands and observes published snapshots.
    pub fn start_session(&self, project: Project, options: SessionOptions) -> SessionHandle {
        let session_id = Uuid::new_v4();
        let (command_tx, command_rx) = mpsc::channel(64);
        let (snapshot_tx, snapshot_rx) = watch::channel(DebugSnapshot::default());

        let pump = Pump::new(
            session_id,
            Arc::new(project),
            self.registry.clone(),
            self.event_bus.clone(),
            self.config.clone(),
            options,
            command_rx,
            snapshot_tx,
        );
        let join = tokio::spawn(pump.run());

        SessionHandle::new(session_id, command_tx, snapshot_rx, join)
    }
}

impl Default for FlowRuntime {
    fn default() -> Self {
        Self::new()
    }
}
