use crate::{ComponentId, ConnectionId, FlowStateId, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

pub type SessionId = Uuid;

/// Debugger state machine mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeMode {
    #[default]
    Stopped,
    Running,
    Paused,
    /// Transient: resolves back to `Paused` once one task has executed.
    SingleStepping,
}

impl std::fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RuntimeMode::Stopped => "stopped",
            RuntimeMode::Running => "running",
            RuntimeMode::Paused => "paused",
            RuntimeMode::SingleStepping => "single-stepping",
        };
        write!(f, "{}", s)
    }
}

/// The five debugger transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeAction {
    Run,
    Pause,
    Resume,
    SingleStep,
    Stop,
}

/// Events emitted over the session event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RuntimeEvent {
    SessionStarted {
        session_id: SessionId,
        project: String,
        debugger_active: bool,
        timestamp: DateTime<Utc>,
    },
    SessionStopped {
        session_id: SessionId,
        error: Option<String>,
        timestamp: DateTime<Utc>,
    },
    ModeChanged {
        session_id: SessionId,
        mode: RuntimeMode,
        timestamp: DateTime<Utc>,
    },
    FlowStateCreated {
        session_id: SessionId,
        flow_state: FlowStateId,
        flow: String,
        parent: Option<FlowStateId>,
        timestamp: DateTime<Utc>,
    },
    FlowStateFinished {
        session_id: SessionId,
        flow_state: FlowStateId,
        timestamp: DateTime<Utc>,
    },
    ComponentStarted {
        session_id: SessionId,
        flow_state: FlowStateId,
        component: ComponentId,
        component_type: String,
        timestamp: DateTime<Utc>,
    },
    ComponentCompleted {
        session_id: SessionId,
        flow_state: FlowStateId,
        component: ComponentId,
        outputs: HashMap<String, Value>,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    ComponentFailed {
        session_id: SessionId,
        flow_state: FlowStateId,
        component: ComponentId,
        error: String,
        timestamp: DateTime<Utc>,
    },
    /// Wire carried a value; debugger UIs use this for highlighting.
    ConnectionActivated {
        session_id: SessionId,
        flow_state: FlowStateId,
        connection: ConnectionId,
        timestamp: DateTime<Utc>,
    },
    ComponentEvent {
        session_id: SessionId,
        flow_state: FlowStateId,
        component: ComponentId,
        event: ComponentEvent,
        timestamp: DateTime<Utc>,
    },
    History {
        session_id: SessionId,
        item: HistoryItem,
    },
}

/// Events a component body emits mid-run through its [`EventEmitter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum ComponentEvent {
    Info { message: String },
    Warning { message: String },
    Progress { percent: f64, message: Option<String> },
    Data { port: String, value: Value },
}

/// Kinds of history entries recorded for the debugger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    SessionStarted,
    SessionStopped,
    TaskExecuted,
    ComponentError,
    ActionStarted,
    ActionFinished,
    NoStartComponent,
    WidgetActionNotFound,
    WidgetActionNotDefined,
    FlowStateFinished,
    VariablesLoaded,
    VariablesSaved,
}

/// One append-only debugger log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: HistoryKind,
    pub flow_state: Option<FlowStateId>,
    pub component: Option<ComponentId>,
    pub message: String,
}

/// Emitter handed to a component run for real-time updates.
#[derive(Clone)]
pub struct EventEmitter {
    session_id: SessionId,
    flow_state: FlowStateId,
    component: ComponentId,
    sender: broadcast::Sender<RuntimeEvent>,
}

impl EventEmitter {
    pub fn new(
        session_id: SessionId,
        flow_state: FlowStateId,
        component: ComponentId,
        sender: broadcast::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            session_id,
            flow_state,
            component,
            sender,
        }
    }

    /// Emit a component-specific event.
    pub fn emit(&self, event: ComponentEvent) {
        let _ = self.sender.send(RuntimeEvent::ComponentEvent {
            session_id: self.session_id,
            flow_state: self.flow_state,
            component: self.component,
            event,
            timestamp: Utc::now(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(ComponentEvent::Info {
            message: message.into(),
        });
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(ComponentEvent::Warning {
            message: message.into(),
        });
    }

    pub fn progress(&self, percent: f64, message: Option<String>) {
        self.emit(ComponentEvent::Progress { percent, message });
    }

    /// Emit data on a specific port (for streaming observers).
    pub fn data(&self, port: impl Into<String>, value: Value) {
        self.emit(ComponentEvent::Data {
            port: port.into(),
            value,
        });
    }
}

/// Session-wide event bus. Sends are fire-and-forget: with no subscriber
/// attached the event is simply dropped.
pub struct EventBus {
    sender: broadcast::Sender<RuntimeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: RuntimeEvent) {
        let _ = self.sender.send(event);
    }

    pub fn create_emitter(
        &self,
        session_id: SessionId,
        flow_state: FlowStateId,
        component: ComponentId,
    ) -> EventEmitter {
        EventEmitter::new(session_id, flow_state, component, self.sender.clone())
    }
}
