//! Flow runtime: the cooperative task-queue scheduler and its debugger
//! surface.
//!
//! A session is one pump actor (a tokio task) exclusively owning the run
//! queue, the flow-state tree, the runtime state machine, breakpoints,
//! history and settings. [`FlowRuntime::start_session`] spawns it and hands
//! back a [`SessionHandle`] carrying the five debugger transitions,
//! breakpoint mutation, and a `watch`-published [`DebugSnapshot`] for
//! observers.

pub mod breakpoints;
pub mod history;
pub mod loader;
pub mod machine;
mod pump;
pub mod queue;
pub mod registry;
pub mod session;
pub mod settings;
pub mod state;

pub use breakpoints::BreakpointSet;
pub use history::History;
pub use loader::{load_project, validate_project, Severity, ValidationIssue, ValidationReport};
pub use machine::StateMachine;
pub use queue::{QueueTask, RunQueue, TaskId};
pub use registry::{ExecutorFactory, ExecutorMetadata, ExecutorRegistry, InputDoc, OutputDoc};
pub use session::{
    BreakpointView, ComponentStateView, DebugSnapshot, FlowRuntime, FlowStateView, QueueTaskView,
    RuntimeConfig, SessionCommand, SessionHandle, SessionOptions, VariableView,
};
pub use settings::SettingsStore;
pub use state::{ComponentState, FlowState, FlowStateStore};
