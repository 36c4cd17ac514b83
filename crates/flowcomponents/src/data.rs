use async_trait::async_trait;
use flowmodel::{ComponentContext, ComponentError, ComponentExecutor, RunOutcome, Value};
use flowrun::{ExecutorFactory, ExecutorMetadata, InputDoc, OutputDoc};
use std::collections::HashMap;

/// Emits its configured value.
pub struct ConstantComponent;

#[async_trait]
impl ComponentExecutor for ConstantComponent {
    fn type_name(&self) -> &str {
        "data.constant"
    }

    async fn run(&self, ctx: ComponentContext) -> Result<RunOutcome, ComponentError> {
        let value = ctx.config_or("value", Value::Null);
        Ok(RunOutcome::new().with_output("value", value))
    }
}

pub struct ConstantComponentFactory;

impl ExecutorFactory for ConstantComponentFactory {
    fn create(
        &self,
        _config: &HashMap<String, Value>,
    ) -> Result<Box<dyn ComponentExecutor>, ComponentError> {
        Ok(Box::new(ConstantComponent))
    }

    fn type_name(&self) -> &str {
        "data.constant"
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            description: "Emit a configured constant value".to_string(),
            category: "data".to_string(),
            inputs: vec![],
            outputs: vec![OutputDoc::new("value", "The configured value")],
        }
    }
}

/// Writes the incoming value into the named variable.
pub struct SetVariableComponent;

#[async_trait]
impl ComponentExecutor for SetVariableComponent {
    fn type_name(&self) -> &str {
        "data.set_variable"
    }

    async fn run(&self, ctx: ComponentContext) -> Result<RunOutcome, ComponentError> {
        let variable = ctx
            .require_config("variable")?
            .as_str()
            .ok_or_else(|| {
                ComponentError::Configuration("'variable' must be a string".to_string())
            })?
            .to_string();
        let value = ctx.require_input("value")?.clone();
        ctx.data.set(&variable, value.clone());
        Ok(RunOutcome::new().with_output("next", value))
    }

    fn validate_config(&self, config: &HashMap<String, Value>) -> Result<(), ComponentError> {
        match config.get("variable") {
            Some(Value::String(_)) => Ok(()),
            _ => Err(ComponentError::Configuration(
                "Missing config: variable".to_string(),
            )),
        }
    }
}

pub struct SetVariableComponentFactory;

impl ExecutorFactory for SetVariableComponentFactory {
    fn create(
        &self,
        _config: &HashMap<String, Value>,
    ) -> Result<Box<dyn ComponentExecutor>, ComponentError> {
        Ok(Box::new(SetVariableComponent))
    }

    fn type_name(&self) -> &str {
        "data.set_variable"
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            description: "Store the incoming value in a variable".to_string(),
            category: "data".to_string(),
            inputs: vec![InputDoc::required("value", "Value to store")],
            outputs: vec![OutputDoc::new("next", "The stored value")],
        }
    }
}

/// Reads the named variable.
pub struct GetVariableComponent;

#[async_trait]
impl ComponentExecutor for GetVariableComponent {
    fn type_name(&self) -> &str {
        "data.get_variable"
    }

    async fn run(&self, ctx: ComponentContext) -> Result<RunOutcome, ComponentError> {
        let variable = ctx
            .require_config("variable")?
            .as_str()
            .ok_or_else(|| {
                ComponentError::Configuration("'variable' must be a string".to_string())
            })?
            .to_string();
        let value = ctx.data.get(&variable).unwrap_or(Value::Null);
        Ok(RunOutcome::new().with_output("value", value))
    }

    fn validate_config(&self, config: &HashMap<String, Value>) -> Result<(), ComponentError> {
        match config.get("variable") {
            Some(Value::String(_)) => Ok(()),
            _ => Err(ComponentError::Configuration(
                "Missing config: variable".to_string(),
            )),
        }
    }
}

pub struct GetVariableComponentFactory;

impl ExecutorFactory for GetVariableComponentFactory {
    fn create(
        &self,
        _config: &HashMap<String, Value>,
    ) -> Result<Box<dyn ComponentExecutor>, ComponentError> {
        Ok(Box::new(GetVariableComponent))
    }

    fn type_name(&self) -> &str {
        "data.get_variable"
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            description: "Read a variable from the data context".to_string(),
            category: "data".to_string(),
            inputs: vec![InputDoc::optional("trigger", "Run when anything arrives")],
            outputs: vec![OutputDoc::new("value", "The variable's value")],
        }
    }
}
