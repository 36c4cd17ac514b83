//! The pump actor: the cooperative scheduler draining the session queue.
//!
//! One tokio task exclusively owns every piece of mutable runtime state (flow
//! states, queue, state machine, breakpoints, history, settings). Control
//! commands arrive over an mpsc channel and are drained between ticks;
//! observers get watch-published snapshots and broadcast events.

use crate::breakpoints::BreakpointSet;
use crate::history::History;
use crate::machine::StateMachine;
use crate::queue::{QueueTask, RunQueue, TaskId};
use crate::registry::ExecutorRegistry;
use crate::session::{
    BreakpointView, ComponentStateView, DebugSnapshot, FlowStateView, QueueTaskView, RuntimeConfig,
    SessionCommand, SessionOptions, VariableView,
};
use crate::settings::SettingsStore;
use crate::state::{FlowState, FlowStateStore};
use chrono::Utc;
use flowmodel::{
    Component, ComponentContext, ComponentError, ComponentId, ConnectionId, Control, DataContext,
    Dispatch, EventBus, Flow, FlowStateId, HistoryKind, Project, RunOutcome, RuntimeAction,
    RuntimeEvent, RuntimeMode, SessionId, Value, START_COMPONENT_TYPE,
};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

/// Output port on the caller component an action's end pulses on completion.
const CALLER_NEXT_OUTPUT: &str = "next";
/// Output port carrying an action's result value, when it produced one.
const CALLER_RESULT_OUTPUT: &str = "result";
/// Output port a widget's wired user event propagates through.
const WIDGET_ACTION_OUTPUT: &str = "action";

/// Result of one component run, applied on the pump task.
struct Completion {
    flow_state: FlowStateId,
    component: ComponentId,
    started: Instant,
    result: Result<RunOutcome, ComponentError>,
}

enum Wake {
    Command(SessionCommand),
    /// Every handle dropped: the session stops.
    Closed,
    Completion(Result<Completion, JoinError>),
}

pub(crate) struct Pump {
    session_id: SessionId,
    project: Arc<Project>,
    registry: Arc<ExecutorRegistry>,
    events: Arc<EventBus>,
    config: RuntimeConfig,
    options: SessionOptions,

    commands: mpsc::Receiver<SessionCommand>,
    snapshot_tx: watch::Sender<DebugSnapshot>,

    store: FlowStateStore,
    queue: RunQueue,
    machine: StateMachine,
    breakpoints: BreakpointSet,
    history: History,
    settings: SettingsStore,

    /// Session-global variable scope; page flow states chain off it.
    globals: DataContext,
    /// Guard against re-breaking on the task that just halted the pump.
    last_breakpoint_task: Option<TaskId>,
    /// Spawned detached component runs awaiting completion application.
    inflight: FuturesUnordered<JoinHandle<Completion>>,
    cancellation: CancellationToken,
}

impl Pump {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        session_id: SessionId,
        project: Arc<Project>,
        registry: Arc<ExecutorRegistry>,
        events: Arc<EventBus>,
        config: RuntimeConfig,
        options: SessionOptions,
        commands: mpsc::Receiver<SessionCommand>,
        snapshot_tx: watch::Sender<DebugSnapshot>,
    ) -> Self {
        let globals = DataContext::global(&project.global_variables);
        let machine = StateMachine::new(options.debugger_active);
        let history = History::new(config.max_history);
        let settings = SettingsStore::new(options.settings_path.clone());
        Self {
            session_id,
            project,
            registry,
            events,
            config,
            options,
            commands,
            snapshot_tx,
            store: FlowStateStore::new(),
            queue: RunQueue::new(),
            machine,
            breakpoints: BreakpointSet::new(),
            history,
            settings,
            globals,
            last_breakpoint_task: None,
            inflight: FuturesUnordered::new(),
            cancellation: CancellationToken::new(),
        }
    }

    pub(crate) async fn run(mut self) {
        self.start_session();
        loop {
            if self.machine.is_stopped() {
                break;
            }
            self.publish_snapshot();

            let runnable = !self.queue.is_empty()
                && matches!(
                    self.machine.mode(),
                    RuntimeMode::Running | RuntimeMode::SingleStepping
                );
            if runnable {
                // Drain pending commands first so pause/stop take effect
                // before the next batch of tasks.
                while let Ok(command) = self.commands.try_recv() {
                    self.handle_command(command).await;
                }
                if self.machine.is_stopped() {
                    break;
                }
                let executed = self.tick().await;
                if executed == 0
                    && !self.queue.is_empty()
                    && matches!(
                        self.machine.mode(),
                        RuntimeMode::Running | RuntimeMode::SingleStepping
                    )
                {
                    // Every head task is deferred behind an in-flight run;
                    // block until a completion or a command arrives.
                    self.publish_snapshot();
                    let wake = self.next_wake().await;
                    self.handle_wake(wake).await;
                }
                tokio::task::yield_now().await;
            } else {
                let wake = self.next_wake().await;
                self.handle_wake(wake).await;
            }
        }
        self.shutdown().await;
    }

    async fn next_wake(&mut self) -> Wake {
        let commands = &mut self.commands;
        let inflight = &mut self.inflight;
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => Wake::Command(command),
                None => Wake::Closed,
            },
            Some(joined) = inflight.next() => Wake::Completion(joined),
        }
    }

    async fn handle_wake(&mut self, wake: Wake) {
        match wake {
            Wake::Command(command) => self.handle_command(command).await,
            Wake::Closed => {
                tracing::debug!(session = %self.session_id, "all session handles dropped");
                self.machine.transition(RuntimeAction::Stop);
            }
            Wake::Completion(joined) => self.apply_joined(joined).await,
        }
    }

    // ---- session lifecycle ------------------------------------------------

    fn start_session(&mut self) {
        self.settings.load();
        let persisted = self.settings.persistent_variables();
        let mut loaded = 0usize;
        for decl in &self.project.global_variables {
            if decl.persistent {
                if let Some(value) = persisted.get(&decl.name) {
                    self.globals.set(&decl.name, value.clone());
                    loaded += 1;
                }
            }
        }
        if self.options.settings_path.is_some() {
            self.push_history(
                HistoryKind::VariablesLoaded,
                None,
                None,
                format!("loaded {} persistent variable(s)", loaded),
            );
        }

        tracing::info!(
            session = %self.session_id,
            project = %self.project.name,
            debugger = self.machine.debugger_active(),
            "session started"
        );
        self.events.emit(RuntimeEvent::SessionStarted {
            session_id: self.session_id,
            project: self.project.name.clone(),
            debugger_active: self.machine.debugger_active(),
            timestamp: Utc::now(),
        });
        self.push_history(
            HistoryKind::SessionStarted,
            None,
            None,
            self.project.name.clone(),
        );

        let project = self.project.clone();
        for page in &project.pages {
            let overrides: HashMap<String, Value> = page
                .local_variables
                .iter()
                .map(|d| (d.name.clone(), d.value.clone()))
                .collect();
            let data = self.globals.create(overrides);
            let id = self.store.create_root(page.id, data);
            self.events.emit(RuntimeEvent::FlowStateCreated {
                session_id: self.session_id,
                flow_state: id,
                flow: page.name.clone(),
                parent: None,
                timestamp: Utc::now(),
            });
            self.enqueue_entry_points(id, page);
        }

        if self.machine.debugger_active() {
            // Paused at start: surface the next task for inspection.
            self.select_queue_head();
        } else if self.machine.transition(RuntimeAction::Run) {
            self.emit_mode_changed();
        }
    }

    async fn shutdown(&mut self) {
        // Cooperative, time-boxed cancellation: signal, then wait for
        // in-flight runs up to the configured bound. No hard aborts.
        self.cancellation.cancel();
        let deadline = Instant::now() + self.config.stop_timeout;
        while !self.inflight.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!(
                    session = %self.session_id,
                    pending = self.inflight.len(),
                    "stop timeout reached with component runs still in flight"
                );
                break;
            }
            match tokio::time::timeout(remaining, self.inflight.next()).await {
                Ok(Some(joined)) => self.apply_joined(joined).await,
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        session = %self.session_id,
                        pending = self.inflight.len(),
                        "stop timeout reached with component runs still in flight"
                    );
                    break;
                }
            }
        }

        for id in self.store.finish_all() {
            self.queue.purge_flow_state(id);
            self.events.emit(RuntimeEvent::FlowStateFinished {
                session_id: self.session_id,
                flow_state: id,
                timestamp: Utc::now(),
            });
        }

        if self.options.settings_path.is_some() {
            let persistent: HashMap<String, Value> = self
                .project
                .global_variables
                .iter()
                .filter(|d| d.persistent)
                .filter_map(|d| self.globals.get(&d.name).map(|v| (d.name.clone(), v)))
                .collect();
            self.settings.set_persistent_variables(&persistent);
            self.settings.save();
            self.push_history(
                HistoryKind::VariablesSaved,
                None,
                None,
                format!("saved {} persistent variable(s)", persistent.len()),
            );
        }

        let error = self.machine.error().map(|e| e.to_string());
        self.push_history(
            HistoryKind::SessionStopped,
            None,
            None,
            error.clone().unwrap_or_default(),
        );
        self.events.emit(RuntimeEvent::SessionStopped {
            session_id: self.session_id,
            error,
            timestamp: Utc::now(),
        });
        tracing::info!(session = %self.session_id, "session stopped");
        self.publish_snapshot();
    }

    // ---- command handling -------------------------------------------------

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Transition(action) => {
                if self.machine.transition(action) {
                    self.emit_mode_changed();
                    if self.machine.mode() == RuntimeMode::Paused {
                        self.select_queue_head();
                    }
                    // A step with nothing queued resolves immediately.
                    if self.machine.mode() == RuntimeMode::SingleStepping
                        && self.queue.is_empty()
                        && self.machine.finish_single_step()
                    {
                        self.emit_mode_changed();
                        self.select_queue_head();
                    }
                }
            }
            SessionCommand::AddBreakpoint(component) => self.breakpoints.add(component),
            SessionCommand::RemoveBreakpoint(component) => self.breakpoints.remove(component),
            SessionCommand::EnableBreakpoint(component) => self.breakpoints.enable(component),
            SessionCommand::DisableBreakpoint(component) => self.breakpoints.disable(component),
            SessionCommand::SelectQueueTask(task) => self.machine.select_queue_task(task),
            SessionCommand::SelectFlowState(flow_state) => {
                self.machine.select_flow_state(flow_state)
            }
            SessionCommand::ExecuteWidgetAction {
                flow_state,
                component,
            } => self.execute_widget_action(flow_state, component).await,
        }
    }

    /// User event on an interactive component: propagate its wired `action`
    /// output, or invoke the action named in its config.
    async fn execute_widget_action(&mut self, flow_state: FlowStateId, component: ComponentId) {
        let project = self.project.clone();
        let Some(fs) = self.store.get(flow_state) else {
            tracing::warn!(%flow_state, "widget action on unknown flow state");
            return;
        };
        let Some(flow) = project.find_flow(fs.flow_id) else {
            return;
        };
        let Some(widget) = flow.find_component(component) else {
            tracing::warn!(%component, "widget action on unknown component");
            return;
        };

        if flow
            .connections_from(component, WIDGET_ACTION_OUTPUT)
            .next()
            .is_some()
        {
            self.propagate_value(flow_state, component, WIDGET_ACTION_OUTPUT, Value::Null);
            return;
        }

        match widget.config.get("action").and_then(|v| v.as_str()) {
            Some(action) => {
                let action = action.to_string();
                let call_inputs = self
                    .store
                    .get(flow_state)
                    .and_then(|fs| fs.component_state(component))
                    .map(|cs| cs.inputs.clone())
                    .unwrap_or_default();
                if project.find_action(&action).is_none() {
                    self.push_history(
                        HistoryKind::WidgetActionNotFound,
                        Some(flow_state),
                        Some(component),
                        format!("action '{}' not found", action),
                    );
                    return;
                }
                self.invoke_action(flow_state, component, &action, call_inputs)
                    .await;
            }
            None => {
                self.push_history(
                    HistoryKind::WidgetActionNotDefined,
                    Some(flow_state),
                    Some(component),
                    format!("'{}' defines no action", widget.label()),
                );
            }
        }
    }

    // ---- the tick ---------------------------------------------------------

    /// One scheduling tick. Drains up to the snapshot length of the queue so
    /// a self-refilling queue cannot starve command processing. Returns the
    /// number of tasks actually executed.
    async fn tick(&mut self) -> usize {
        let single_step = self.machine.mode() == RuntimeMode::SingleStepping;
        let bound = self.queue.len();
        let mut deferred: Vec<QueueTask> = Vec::new();
        let mut executed = 0usize;

        for _ in 0..bound {
            let Some(task) = self.queue.dequeue() else {
                break;
            };
            if !self.store.contains(task.flow_state) {
                // Stale task of an already-finished flow instance.
                continue;
            }
            if self.store.is_component_running(task.flow_state, task.component) {
                // At most one in-flight run per component instance: defer,
                // keeping task identity.
                deferred.push(task);
                continue;
            }
            if !single_step
                && self.machine.debugger_active()
                && self.breakpoints.is_active(task.component)
                && self.last_breakpoint_task != Some(task.id)
            {
                // Halt before the task runs; remember it so the retry after
                // resume does not re-break on the same task.
                self.last_breakpoint_task = Some(task.id);
                self.queue.requeue_front(task);
                self.machine.force_pause();
                self.emit_mode_changed();
                self.select_queue_head();
                break;
            }
            self.last_breakpoint_task = None;
            self.execute_task(task).await;
            executed += 1;

            if single_step {
                break;
            }
            if self.machine.mode() == RuntimeMode::Paused || self.machine.is_stopped() {
                break;
            }
        }

        // Deferred tasks go back at the front, ahead of anything newly
        // enqueued: a merely-busy component keeps its place in line.
        self.queue.requeue_front_batch(deferred);

        if single_step && executed > 0 && self.machine.finish_single_step() {
            self.emit_mode_changed();
            self.select_queue_head();
        }
        executed
    }

    async fn execute_task(&mut self, task: QueueTask) {
        let project = self.project.clone();
        let Some((flow, component)) = self.resolve_task(&project, &task) else {
            return;
        };

        if self
            .store
            .ensure_component_state(task.flow_state, component, &self.registry)
            .is_err()
        {
            // Unknown component type or similar resolution failure: the task
            // is dropped as completed, never retried.
            self.push_history(
                HistoryKind::ComponentError,
                Some(task.flow_state),
                Some(task.component),
                format!("cannot instantiate '{}'", component.type_name),
            );
            return;
        }

        self.push_history(
            HistoryKind::TaskExecuted,
            Some(task.flow_state),
            Some(task.component),
            task_label(flow, component, task.connection),
        );
        if let Some(connection) = task.connection {
            self.events.emit(RuntimeEvent::ConnectionActivated {
                session_id: self.session_id,
                flow_state: task.flow_state,
                connection,
                timestamp: Utc::now(),
            });
        }

        let Some(fs) = self.store.get(task.flow_state) else {
            return;
        };
        let Some(cs) = fs.component_state(task.component) else {
            return;
        };
        let executor = cs.executor.clone();
        let ctx = ComponentContext {
            flow_state: task.flow_state,
            component: task.component,
            inputs: cs.inputs.clone(),
            config: component.config.clone(),
            call_inputs: fs.call_inputs.clone(),
            data: fs.data.clone(),
            state: cs.state.clone(),
            events: self
                .events
                .create_emitter(self.session_id, task.flow_state, task.component),
            cancellation: self.cancellation.child_token(),
        };

        self.store
            .set_component_running(task.flow_state, task.component, true);
        self.events.emit(RuntimeEvent::ComponentStarted {
            session_id: self.session_id,
            flow_state: task.flow_state,
            component: task.component,
            component_type: component.type_name.clone(),
            timestamp: Utc::now(),
        });

        let started = Instant::now();
        match executor.dispatch() {
            Dispatch::Inline => {
                let result = executor.run(ctx).await;
                self.apply_completion(Completion {
                    flow_state: task.flow_state,
                    component: task.component,
                    started,
                    result,
                })
                .await;
            }
            Dispatch::Detached => {
                let flow_state = task.flow_state;
                let component_id = task.component;
                self.inflight.push(tokio::spawn(async move {
                    let result = executor.run(ctx).await;
                    Completion {
                        flow_state,
                        component: component_id,
                        started,
                        result,
                    }
                }));
            }
        }
    }

    fn resolve_task<'a>(
        &mut self,
        project: &'a Project,
        task: &QueueTask,
    ) -> Option<(&'a Flow, &'a Component)> {
        let flow_id = self.store.get(task.flow_state)?.flow_id;
        let Some(flow) = project.find_flow(flow_id) else {
            self.push_history(
                HistoryKind::ComponentError,
                Some(task.flow_state),
                Some(task.component),
                format!("flow {} not found in project", flow_id),
            );
            return None;
        };
        let Some(component) = flow.find_component(task.component) else {
            self.push_history(
                HistoryKind::ComponentError,
                Some(task.flow_state),
                Some(task.component),
                format!("component {} not found in '{}'", task.component, flow.name),
            );
            return None;
        };
        Some((flow, component))
    }

    // ---- completions ------------------------------------------------------

    async fn apply_joined(&mut self, joined: Result<Completion, JoinError>) {
        match joined {
            Ok(completion) => self.apply_completion(completion).await,
            Err(err) => {
                // A panicking detached body loses its flow-state attribution;
                // record it at session level.
                tracing::error!(%err, "detached component run panicked");
                self.machine.record_error("component task panicked");
            }
        }
    }

    async fn apply_completion(&mut self, completion: Completion) {
        self.store
            .set_component_running(completion.flow_state, completion.component, false);
        if !self.store.contains(completion.flow_state) {
            // Flow instance finished while the run was in flight.
            return;
        }
        match completion.result {
            Ok(outcome) => {
                self.events.emit(RuntimeEvent::ComponentCompleted {
                    session_id: self.session_id,
                    flow_state: completion.flow_state,
                    component: completion.component,
                    outputs: outcome.outputs.clone(),
                    duration_ms: completion.started.elapsed().as_millis() as u64,
                    timestamp: Utc::now(),
                });
                for (port, value) in &outcome.outputs {
                    self.propagate_value(
                        completion.flow_state,
                        completion.component,
                        port,
                        value.clone(),
                    );
                }
                match outcome.control {
                    Control::Continue => {}
                    Control::CallAction { action, inputs } => {
                        if self.project.find_action(&action).is_none() {
                            self.push_history(
                                HistoryKind::ComponentError,
                                Some(completion.flow_state),
                                Some(completion.component),
                                format!("action '{}' not found", action),
                            );
                        } else {
                            self.invoke_action(
                                completion.flow_state,
                                completion.component,
                                &action,
                                inputs,
                            )
                            .await;
                        }
                    }
                    Control::CallerOutput { output, value } => {
                        let caller = self
                            .store
                            .get(completion.flow_state)
                            .and_then(|fs| fs.caller);
                        match caller {
                            Some((caller_fs, caller_component)) => {
                                self.propagate_value(caller_fs, caller_component, &output, value);
                            }
                            None => tracing::warn!(
                                flow_state = %completion.flow_state,
                                "caller output from a flow instance with no caller"
                            ),
                        }
                    }
                    Control::EndFlow { result } => {
                        self.finish_flow_state(completion.flow_state, result);
                    }
                }
            }
            Err(ComponentError::Cancelled) => {
                // Session is stopping; nothing to record.
            }
            Err(err) => self.record_component_error(
                completion.flow_state,
                completion.component,
                &err.to_string(),
            ),
        }
        self.finish_quiescent_actions();
    }

    fn record_component_error(
        &mut self,
        flow_state: FlowStateId,
        component: ComponentId,
        message: &str,
    ) {
        tracing::warn!(%flow_state, %component, %message, "component run failed");
        self.store.set_error(flow_state);
        self.machine.record_error(message);
        self.push_history(
            HistoryKind::ComponentError,
            Some(flow_state),
            Some(component),
            message.to_string(),
        );
        self.events.emit(RuntimeEvent::ComponentFailed {
            session_id: self.session_id,
            flow_state,
            component,
            error: message.to_string(),
            timestamp: Utc::now(),
        });
        // Under an active debugger an error behaves like an implicit
        // breakpoint; the session itself keeps going either way.
        if self.machine.debugger_active() && !self.machine.is_stopped() {
            self.machine.force_pause();
            self.emit_mode_changed();
            self.select_queue_head();
        }
    }

    // ---- propagation & flow instance lifecycle ----------------------------

    /// Write `value` into every component state wired to
    /// `(component, output)`, mark the lines active, and enqueue one task per
    /// satisfied downstream component.
    fn propagate_value(
        &mut self,
        flow_state: FlowStateId,
        component: ComponentId,
        output: &str,
        value: Value,
    ) {
        let project = self.project.clone();
        let Some(fs) = self.store.get(flow_state) else {
            return;
        };
        let Some(flow) = project.find_flow(fs.flow_id) else {
            return;
        };

        for connection in flow.connections_from(component, output) {
            let Some(target) = flow.find_component(connection.target) else {
                tracing::error!(
                    connection = %connection.id,
                    "UNEXPECTED: connection target missing from its flow"
                );
                continue;
            };
            if self
                .store
                .ensure_component_state(flow_state, target, &self.registry)
                .is_err()
            {
                self.push_history(
                    HistoryKind::ComponentError,
                    Some(flow_state),
                    Some(target.id),
                    format!("cannot instantiate '{}'", target.type_name),
                );
                continue;
            }
            self.store
                .write_input(flow_state, target.id, &connection.input, value.clone());
            self.events.emit(RuntimeEvent::ConnectionActivated {
                session_id: self.session_id,
                flow_state,
                connection: connection.id,
                timestamp: Utc::now(),
            });
            if self.inputs_satisfied(flow_state, flow, target) {
                self.queue
                    .enqueue(flow_state, target.id, Some(connection.id));
            }
        }
    }

    /// Satisfied = every wired required input has a buffered value.
    fn inputs_satisfied(&self, flow_state: FlowStateId, flow: &Flow, component: &Component) -> bool {
        let Some(cs) = self
            .store
            .get(flow_state)
            .and_then(|fs| fs.component_state(component.id))
        else {
            return false;
        };
        component
            .inputs
            .iter()
            .filter(|port| port.required && flow.is_input_wired(component.id, &port.name))
            .all(|port| cs.inputs.contains_key(&port.name))
    }

    /// Enqueue every entry point of a freshly started page instance.
    fn enqueue_entry_points(&mut self, flow_state: FlowStateId, flow: &Flow) {
        for entry in flow.entry_components() {
            if self
                .store
                .ensure_component_state(flow_state, entry, &self.registry)
                .is_ok()
            {
                self.queue.enqueue(flow_state, entry.id, None);
            }
        }
    }

    /// Spawn a child flow instance for an invoked action and run its start
    /// component right away, ahead of everything already queued.
    async fn invoke_action(
        &mut self,
        parent: FlowStateId,
        caller_component: ComponentId,
        action: &str,
        call_inputs: HashMap<String, Value>,
    ) {
        let project = self.project.clone();
        let Some(flow) = project.find_action(action) else {
            return;
        };
        let Some(parent_data) = self.store.get(parent).map(|fs| fs.data.clone()) else {
            return;
        };
        let overrides: HashMap<String, Value> = flow
            .local_variables
            .iter()
            .map(|d| (d.name.clone(), d.value.clone()))
            .collect();
        let data = parent_data.create(overrides);
        let Some(id) =
            self.store
                .create_child(flow.id, parent, caller_component, call_inputs, data)
        else {
            return;
        };
        self.push_history(
            HistoryKind::ActionStarted,
            Some(id),
            Some(caller_component),
            action.to_string(),
        );
        self.events.emit(RuntimeEvent::FlowStateCreated {
            session_id: self.session_id,
            flow_state: id,
            flow: flow.name.clone(),
            parent: Some(parent),
            timestamp: Utc::now(),
        });
        self.execute_start_action(id, flow).await;
    }

    /// Run an action's start component immediately, bypassing the queue; only
    /// the downstream work it produces is scheduled. Boxed because the start
    /// body can itself invoke another action.
    fn execute_start_action<'a>(
        &'a mut self,
        flow_state: FlowStateId,
        flow: &'a Flow,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let Some(start) = flow.find_by_type(START_COMPONENT_TYPE) else {
                self.push_history(
                    HistoryKind::NoStartComponent,
                    Some(flow_state),
                    None,
                    format!("action '{}' has no start component", flow.name),
                );
                self.finish_flow_state(flow_state, None);
                return;
            };
            for entry in flow.entry_components().filter(|c| c.id != start.id) {
                if self
                    .store
                    .ensure_component_state(flow_state, entry, &self.registry)
                    .is_ok()
                {
                    self.queue.enqueue(flow_state, entry.id, None);
                }
            }
            if self
                .store
                .ensure_component_state(flow_state, start, &self.registry)
                .is_ok()
            {
                let task = self.queue.immediate(flow_state, start.id, None);
                self.execute_task(task).await;
            }
        })
    }

    /// Finish a flow instance: purge its queued work, detach it, and for
    /// actions pulse the caller's outputs.
    fn finish_flow_state(&mut self, flow_state: FlowStateId, result: Option<Value>) {
        let caller = self.store.get(flow_state).and_then(|fs| fs.caller);
        let finished = self.store.finish(flow_state);
        for id in &finished {
            self.queue.purge_flow_state(*id);
            self.push_history(HistoryKind::FlowStateFinished, Some(*id), None, String::new());
            self.events.emit(RuntimeEvent::FlowStateFinished {
                session_id: self.session_id,
                flow_state: *id,
                timestamp: Utc::now(),
            });
        }
        if let Some((caller_fs, caller_component)) = caller {
            self.push_history(
                HistoryKind::ActionFinished,
                Some(flow_state),
                Some(caller_component),
                String::new(),
            );
            if let Some(result) = result {
                self.propagate_value(caller_fs, caller_component, CALLER_RESULT_OUTPUT, result);
            }
            self.propagate_value(caller_fs, caller_component, CALLER_NEXT_OUTPUT, Value::Null);
        }
    }

    /// Finish action instances that drained without reaching an end
    /// component, so they do not leak. Repeats until stable because finishing
    /// one can drain its parent.
    fn finish_quiescent_actions(&mut self) {
        loop {
            let quiescent = self
                .store
                .quiescent_actions(|id| self.queue.has_tasks_for(id));
            if quiescent.is_empty() {
                break;
            }
            for id in quiescent {
                self.finish_flow_state(id, None);
            }
        }
    }

    // ---- observation ------------------------------------------------------

    fn emit_mode_changed(&self) {
        self.events.emit(RuntimeEvent::ModeChanged {
            session_id: self.session_id,
            mode: self.machine.mode(),
            timestamp: Utc::now(),
        });
    }

    /// Show-next-task selection on entering `Paused`.
    fn select_queue_head(&mut self) {
        let head = self.queue.front().cloned();
        self.machine.select_queue_task(head.as_ref().map(|t| t.id));
        self.machine.select_flow_state(head.map(|t| t.flow_state));
    }

    fn push_history(
        &mut self,
        kind: HistoryKind,
        flow_state: Option<FlowStateId>,
        component: Option<ComponentId>,
        message: String,
    ) {
        let item = self.history.push(kind, flow_state, component, message);
        self.events.emit(RuntimeEvent::History {
            session_id: self.session_id,
            item,
        });
    }

    fn publish_snapshot(&self) {
        let snapshot = self.build_snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current != snapshot {
                *current = snapshot;
                true
            } else {
                false
            }
        });
    }

    fn build_snapshot(&self) -> DebugSnapshot {
        let queue = self
            .queue
            .iter()
            .map(|task| QueueTaskView {
                id: task.id,
                flow_state: task.flow_state,
                component: task.component,
                label: self.describe_task(task),
            })
            .collect();

        let flow_states = self
            .store
            .roots()
            .iter()
            .filter_map(|id| self.store.get(*id))
            .map(|fs| self.flow_state_view(fs))
            .collect();

        let breakpoints = self
            .breakpoints
            .iter()
            .map(|(component, enabled)| BreakpointView {
                component,
                label: self
                    .project
                    .find_component(component)
                    .map(|(_, c)| c.label().to_string())
                    .unwrap_or_else(|| component.to_string()),
                enabled,
            })
            .collect();

        let mut globals: Vec<VariableView> = self
            .globals
            .local_values()
            .into_iter()
            .map(|(name, value)| VariableView { name, value })
            .collect();
        globals.sort_by(|a, b| a.name.cmp(&b.name));

        DebugSnapshot {
            session_id: self.session_id,
            mode: self.machine.mode(),
            debugger_active: self.machine.debugger_active(),
            error: self.machine.error().map(|e| e.to_string()),
            queue,
            flow_states,
            breakpoints,
            globals,
            selected_flow_state: self.machine.selected_flow_state(),
            selected_queue_task: self.machine.selected_queue_task(),
            recent_history: self.history.recent(100),
        }
    }

    fn flow_state_view(&self, fs: &FlowState) -> FlowStateView {
        let flow = self.project.find_flow(fs.flow_id);
        let mut variables: Vec<VariableView> = fs
            .data
            .local_values()
            .into_iter()
            .map(|(name, value)| VariableView { name, value })
            .collect();
        variables.sort_by(|a, b| a.name.cmp(&b.name));

        let mut components: Vec<ComponentStateView> = fs
            .component_states
            .values()
            .map(|cs| {
                let component = flow.and_then(|f| f.find_component(cs.component));
                ComponentStateView {
                    component: cs.component,
                    label: component
                        .map(|c| c.label().to_string())
                        .unwrap_or_else(|| cs.component.to_string()),
                    type_name: component
                        .map(|c| c.type_name.clone())
                        .unwrap_or_default(),
                    is_running: cs.is_running,
                    inputs: cs.inputs.clone(),
                }
            })
            .collect();
        components.sort_by(|a, b| a.label.cmp(&b.label));

        FlowStateView {
            id: fs.id,
            flow: flow.map(|f| f.name.clone()).unwrap_or_default(),
            kind: flow
                .map(|f| f.kind)
                .unwrap_or(flowmodel::FlowKind::Page),
            has_error: fs.has_error,
            is_finished: fs.is_finished,
            variables,
            components,
            children: fs
                .children
                .iter()
                .filter_map(|id| self.store.get(*id))
                .map(|child| self.flow_state_view(child))
                .collect(),
        }
    }

    fn describe_task(&self, task: &QueueTask) -> String {
        let Some(fs) = self.store.get(task.flow_state) else {
            return task.component.to_string();
        };
        let Some(flow) = self.project.find_flow(fs.flow_id) else {
            return task.component.to_string();
        };
        let Some(component) = flow.find_component(task.component) else {
            return task.component.to_string();
        };
        match task.connection.and_then(|id| flow.find_connection(id)) {
            Some(connection) => task_label(flow, component, Some(connection.id)),
            None => component.label().to_string(),
        }
    }
}

/// `source.output -> target.input` for propagated tasks, else the component
/// label.
fn task_label(flow: &Flow, component: &Component, connection: Option<ConnectionId>) -> String {
    let Some(connection) = connection.and_then(|id| flow.find_connection(id)) else {
        return component.label().to_string();
    };
    let source = flow
        .find_component(connection.source)
        .map(|c| c.label().to_string())
        .unwrap_or_else(|| connection.source.to_string());
    let target = flow
        .find_component(connection.target)
        .map(|c| c.label().to_string())
        .unwrap_or_else(|| connection.target.to_string());
    format!(
        "{}.{} -> {}.{}",
        source, connection.output, target, connection.input
    )
}
