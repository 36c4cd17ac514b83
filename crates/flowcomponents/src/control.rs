use async_trait::async_trait;
use flowmodel::{
    ComponentContext, ComponentError, ComponentExecutor, Control, RunOutcome, Value,
    CALL_ACTION_COMPONENT_TYPE, INPUT_COMPONENT_TYPE, START_COMPONENT_TYPE,
};
use flowrun::{ExecutorFactory, ExecutorMetadata, InputDoc, OutputDoc};
use std::collections::HashMap;

/// Entry point of a flow: pulses `next` when the instance starts.
pub struct StartComponent;

#[async_trait]
impl ComponentExecutor for StartComponent {
    fn type_name(&self) -> &str {
        START_COMPONENT_TYPE
    }

    async fn run(&self, _ctx: ComponentContext) -> Result<RunOutcome, ComponentError> {
        Ok(RunOutcome::new().with_output("next", Value::Null))
    }
}

pub struct StartComponentFactory;

impl ExecutorFactory for StartComponentFactory {
    fn create(
        &self,
        _config: &HashMap<String, Value>,
    ) -> Result<Box<dyn ComponentExecutor>, ComponentError> {
        Ok(Box::new(StartComponent))
    }

    fn type_name(&self) -> &str {
        START_COMPONENT_TYPE
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            description: "Flow entry point".to_string(),
            category: "flow".to_string(),
            inputs: vec![],
            outputs: vec![OutputDoc::new("next", "Pulsed when the flow starts")],
        }
    }
}

/// End of a flow: finishes the owning instance, optionally returning the
/// value buffered on `result` to the caller.
pub struct EndComponent;

#[async_trait]
impl ComponentExecutor for EndComponent {
    fn type_name(&self) -> &str {
        "flow.end"
    }

    async fn run(&self, ctx: ComponentContext) -> Result<RunOutcome, ComponentError> {
        Ok(RunOutcome::new().with_control(Control::EndFlow {
            result: ctx.input("result").cloned(),
        }))
    }
}

pub struct EndComponentFactory;

impl ExecutorFactory for EndComponentFactory {
    fn create(
        &self,
        _config: &HashMap<String, Value>,
    ) -> Result<Box<dyn ComponentExecutor>, ComponentError> {
        Ok(Box::new(EndComponent))
    }

    fn type_name(&self) -> &str {
        "flow.end"
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            description: "Finish the flow instance, optionally returning a result".to_string(),
            category: "flow".to_string(),
            inputs: vec![
                InputDoc::optional("trigger", "Run when anything arrives"),
                InputDoc::optional("result", "Value returned to the caller"),
            ],
            outputs: vec![],
        }
    }
}

/// Exposes one named call input inside an action flow.
pub struct InputComponent;

#[async_trait]
impl ComponentExecutor for InputComponent {
    fn type_name(&self) -> &str {
        INPUT_COMPONENT_TYPE
    }

    async fn run(&self, ctx: ComponentContext) -> Result<RunOutcome, ComponentError> {
        let name = ctx
            .require_config("name")?
            .as_str()
            .ok_or_else(|| ComponentError::Configuration("'name' must be a string".to_string()))?
            .to_string();
        let value = ctx.call_input(&name).cloned().unwrap_or(Value::Null);
        Ok(RunOutcome::new().with_output("value", value))
    }

    fn validate_config(&self, config: &HashMap<String, Value>) -> Result<(), ComponentError> {
        require_string_config(config, "name")
    }
}

pub struct InputComponentFactory;

impl ExecutorFactory for InputComponentFactory {
    fn create(
        &self,
        _config: &HashMap<String, Value>,
    ) -> Result<Box<dyn ComponentExecutor>, ComponentError> {
        Ok(Box::new(InputComponent))
    }

    fn type_name(&self) -> &str {
        INPUT_COMPONENT_TYPE
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            description: "Named parameter of an action flow".to_string(),
            category: "flow".to_string(),
            inputs: vec![],
            outputs: vec![OutputDoc::new("value", "The value the caller passed")],
        }
    }
}

/// Emits a value on a named output port of the component that invoked the
/// current action flow.
pub struct OutputComponent;

#[async_trait]
impl ComponentExecutor for OutputComponent {
    fn type_name(&self) -> &str {
        "flow.output"
    }

    async fn run(&self, ctx: ComponentContext) -> Result<RunOutcome, ComponentError> {
        let name = ctx
            .require_config("name")?
            .as_str()
            .ok_or_else(|| ComponentError::Configuration("'name' must be a string".to_string()))?
            .to_string();
        let value = ctx.input("value").cloned().unwrap_or(Value::Null);
        Ok(RunOutcome::new().with_control(Control::CallerOutput {
            output: name,
            value,
        }))
    }

    fn validate_config(&self, config: &HashMap<String, Value>) -> Result<(), ComponentError> {
        require_string_config(config, "name")
    }
}

pub struct OutputComponentFactory;

impl ExecutorFactory for OutputComponentFactory {
    fn create(
        &self,
        _config: &HashMap<String, Value>,
    ) -> Result<Box<dyn ComponentExecutor>, ComponentError> {
        Ok(Box::new(OutputComponent))
    }

    fn type_name(&self) -> &str {
        "flow.output"
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            description: "Emit a value on the calling component's output".to_string(),
            category: "flow".to_string(),
            inputs: vec![InputDoc::required("value", "Value to emit")],
            outputs: vec![],
        }
    }
}

/// Invokes an action flow by name, passing the buffered inputs along.
pub struct CallActionComponent;

#[async_trait]
impl ComponentExecutor for CallActionComponent {
    fn type_name(&self) -> &str {
        CALL_ACTION_COMPONENT_TYPE
    }

    async fn run(&self, ctx: ComponentContext) -> Result<RunOutcome, ComponentError> {
        let action = ctx
            .require_config("action")?
            .as_str()
            .ok_or_else(|| ComponentError::Configuration("'action' must be a string".to_string()))?
            .to_string();
        Ok(RunOutcome::new().with_control(Control::CallAction {
            action,
            inputs: ctx.inputs.clone(),
        }))
    }

    fn validate_config(&self, config: &HashMap<String, Value>) -> Result<(), ComponentError> {
        require_string_config(config, "action")
    }
}

pub struct CallActionComponentFactory;

impl ExecutorFactory for CallActionComponentFactory {
    fn create(
        &self,
        _config: &HashMap<String, Value>,
    ) -> Result<Box<dyn ComponentExecutor>, ComponentError> {
        Ok(Box::new(CallActionComponent))
    }

    fn type_name(&self) -> &str {
        CALL_ACTION_COMPONENT_TYPE
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            description: "Invoke an action flow as a sub-flow".to_string(),
            category: "flow".to_string(),
            inputs: vec![],
            outputs: vec![
                OutputDoc::new("next", "Pulsed when the action finishes"),
                OutputDoc::new("result", "The action's result, when it set one"),
            ],
        }
    }
}

fn require_string_config(
    config: &HashMap<String, Value>,
    key: &str,
) -> Result<(), ComponentError> {
    match config.get(key) {
        Some(Value::String(_)) => Ok(()),
        Some(_) => Err(ComponentError::Configuration(format!(
            "'{}' must be a string",
            key
        ))),
        None => Err(ComponentError::Configuration(format!(
            "Missing config: {}",
            key
        ))),
    }
}
