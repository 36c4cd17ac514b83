//! Core abstractions for the flow runtime
//!
//! This crate provides the fundamental types and traits the runtime and the
//! component library depend on: the dynamic [`Value`], the authored graph
//! model ([`Project`]/[`Flow`]/[`Component`]), the component execution
//! contract ([`ComponentExecutor`]), the scoped variable store
//! ([`DataContext`]), error enums and the runtime event vocabulary.

pub mod data;
mod error;
pub mod events;
mod executor;
mod flow;
mod value;

pub use data::DataContext;
pub use error::{ComponentError, FlowError, GraphError};
pub use events::*;
pub use executor::{
    ComponentContext, ComponentExecutor, Control, Dispatch, ExecutorState, RunOutcome,
};
pub use flow::{
    Component, ComponentId, ConnectionId, ConnectionLine, Flow, FlowId, FlowKind, FlowStateId,
    PortDef, Position, Project, VariableDecl, CALL_ACTION_COMPONENT_TYPE, INPUT_COMPONENT_TYPE,
    START_COMPONENT_TYPE,
};
pub use value::Value;

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;
