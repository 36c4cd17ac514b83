//! Standard component library
//!
//! Built-in component executors for flow control, variables, arithmetic,
//! comparison, logging and delays.

mod control;
mod data;
mod debug;
mod logic;
mod math;
mod time;

pub use control::{
    CallActionComponent, EndComponent, InputComponent, OutputComponent, StartComponent,
};
pub use data::{ConstantComponent, GetVariableComponent, SetVariableComponent};
pub use debug::LogComponent;
pub use logic::{CompareComponent, CounterComponent};
pub use math::ArithmeticComponent;
pub use time::DelayComponent;

use flowrun::ExecutorRegistry;
use std::sync::Arc;

/// Register all standard components with a registry
pub fn register_all(registry: &mut ExecutorRegistry) {
    registry.register(Arc::new(control::StartComponentFactory));
    registry.register(Arc::new(control::EndComponentFactory));
    registry.register(Arc::new(control::InputComponentFactory));
    registry.register(Arc::new(control::OutputComponentFactory));
    registry.register(Arc::new(control::CallActionComponentFactory));
    registry.register(Arc::new(data::ConstantComponentFactory));
    registry.register(Arc::new(data::SetVariableComponentFactory));
    registry.register(Arc::new(data::GetVariableComponentFactory));
    registry.register(Arc::new(debug::LogComponentFactory));
    registry.register(Arc::new(logic::CompareComponentFactory));
    registry.register(Arc::new(logic::CounterComponentFactory));
    registry.register(Arc::new(math::ArithmeticComponentFactory));
    registry.register(Arc::new(time::DelayComponentFactory));
}
