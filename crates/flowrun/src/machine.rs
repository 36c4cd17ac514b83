use crate::queue::TaskId;
use flowmodel::{FlowStateId, RuntimeAction, RuntimeMode};

/// The per-session debugger state machine gating the pump.
///
/// Transition table (anything else is ignored with a warning):
///   Run        Paused -> Running      (leaves debugger mode)
///   Pause      Running -> Paused      (enters debugger mode)
///   Resume     Paused -> Running      (stays in debugger mode)
///   SingleStep Paused -> SingleStepping, auto-resolving to Paused
///   Stop       any -> Stopped         (terminal)
///
/// A fresh machine sits in `Paused`; a non-debug session immediately takes
/// the `Run` transition.
#[derive(Debug)]
pub struct StateMachine {
    mode: RuntimeMode,
    debugger_active: bool,
    error: Option<String>,
    selected_flow_state: Option<FlowStateId>,
    selected_queue_task: Option<TaskId>,
}

impl StateMachine {
    pub fn new(debugger_active: bool) -> Self {
        Self {
            mode: RuntimeMode::Paused,
            debugger_active,
            error: None,
            selected_flow_state: None,
            selected_queue_task: None,
        }
    }

    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }

    pub fn debugger_active(&self) -> bool {
        self.debugger_active
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_stopped(&self) -> bool {
        self.mode == RuntimeMode::Stopped
    }

    /// Apply a debugger action. Returns true when the mode changed.
    pub fn transition(&mut self, action: RuntimeAction) -> bool {
        let next = match (action, self.mode) {
            (RuntimeAction::Run, RuntimeMode::Paused) => {
                self.debugger_active = false;
                RuntimeMode::Running
            }
            (RuntimeAction::Pause, RuntimeMode::Running) => {
                self.debugger_active = true;
                RuntimeMode::Paused
            }
            (RuntimeAction::Resume, RuntimeMode::Paused) => RuntimeMode::Running,
            (RuntimeAction::SingleStep, RuntimeMode::Paused) => RuntimeMode::SingleStepping,
            (RuntimeAction::Stop, mode) if mode != RuntimeMode::Stopped => RuntimeMode::Stopped,
            (action, mode) => {
                tracing::warn!(?action, %mode, "ignoring invalid runtime transition");
                return false;
            }
        };
        tracing::debug!(from = %self.mode, to = %next, "runtime transition");
        self.mode = next;
        true
    }

    /// Breakpoint hits and, under an active debugger, component errors pause
    /// the machine directly without going through the action table.
    pub fn force_pause(&mut self) {
        if self.mode != RuntimeMode::Stopped && self.mode != RuntimeMode::Paused {
            tracing::debug!(from = %self.mode, "runtime paused");
            self.mode = RuntimeMode::Paused;
        }
    }

    /// Resolve a single step back to `Paused` after its one task ran.
    pub fn finish_single_step(&mut self) -> bool {
        if self.mode == RuntimeMode::SingleStepping {
            self.mode = RuntimeMode::Paused;
            true
        } else {
            false
        }
    }

    /// Record a session-level error. First error wins; later ones only mark
    /// their own flow states.
    pub fn record_error(&mut self, message: &str) {
        if self.error.is_none() {
            self.error = Some(message.to_string());
        }
    }

    pub fn selected_flow_state(&self) -> Option<FlowStateId> {
        self.selected_flow_state
    }

    pub fn selected_queue_task(&self) -> Option<TaskId> {
        self.selected_queue_task
    }

    pub fn select_flow_state(&mut self, flow_state: Option<FlowStateId>) {
        self.selected_flow_state = flow_state;
    }

    pub fn select_queue_task(&mut self, task: Option<TaskId>) {
        self.selected_queue_task = task;
    }
}
