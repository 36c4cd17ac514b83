use async_trait::async_trait;
use flowmodel::{ComponentContext, ComponentError, ComponentExecutor, RunOutcome, Value};
use flowrun::{ExecutorFactory, ExecutorMetadata, InputDoc, OutputDoc};
use std::collections::HashMap;

/// Compares two operands and routes the left one down the matching branch.
///
/// Emits `result` (bool) always, and re-emits operand `a` on either the
/// `true` or the `false` port so downstream work can be wired per branch.
pub struct CompareComponent;

impl CompareComponent {
    fn operand(ctx: &ComponentContext, name: &str) -> Result<Value, ComponentError> {
        ctx.input(name)
            .cloned()
            .or_else(|| ctx.config.get(name).cloned())
            .ok_or_else(|| ComponentError::MissingInput(name.to_string()))
    }

    fn numeric(value: &Value, name: &str) -> Result<f64, ComponentError> {
        value.as_f64().ok_or_else(|| ComponentError::InvalidInputType {
            field: name.to_string(),
            expected: "number".to_string(),
            actual: "other".to_string(),
        })
    }
}

#[async_trait]
impl ComponentExecutor for CompareComponent {
    fn type_name(&self) -> &str {
        "logic.compare"
    }

    async fn run(&self, ctx: ComponentContext) -> Result<RunOutcome, ComponentError> {
        let operation = ctx
            .config_or("operation", Value::String("eq".to_string()))
            .as_str()
            .unwrap_or("eq")
            .to_string();
        let a = Self::operand(&ctx, "a")?;
        let b = Self::operand(&ctx, "b")?;

        let result = match operation.as_str() {
            "eq" => a == b,
            "ne" => a != b,
            "lt" => Self::numeric(&a, "a")? < Self::numeric(&b, "b")?,
            "le" => Self::numeric(&a, "a")? <= Self::numeric(&b, "b")?,
            "gt" => Self::numeric(&a, "a")? > Self::numeric(&b, "b")?,
            "ge" => Self::numeric(&a, "a")? >= Self::numeric(&b, "b")?,
            other => {
                return Err(ComponentError::Configuration(format!(
                    "unknown operation '{}'",
                    other
                )))
            }
        };

        let branch = if result { "true" } else { "false" };
        Ok(RunOutcome::new()
            .with_output("result", result)
            .with_output(branch, a))
    }

    fn validate_config(&self, config: &HashMap<String, Value>) -> Result<(), ComponentError> {
        if let Some(operation) = config.get("operation") {
            let known = matches!(
                operation.as_str(),
                Some("eq" | "ne" | "lt" | "le" | "gt" | "ge")
            );
            if !known {
                return Err(ComponentError::Configuration(format!(
                    "unknown operation '{}'",
                    operation
                )));
            }
        }
        Ok(())
    }
}

pub struct CompareComponentFactory;

impl ExecutorFactory for CompareComponentFactory {
    fn create(
        &self,
        _config: &HashMap<String, Value>,
    ) -> Result<Box<dyn ComponentExecutor>, ComponentError> {
        Ok(Box::new(CompareComponent))
    }

    fn type_name(&self) -> &str {
        "logic.compare"
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            description: "Compare two values and branch".to_string(),
            category: "logic".to_string(),
            inputs: vec![
                InputDoc::required("a", "Left operand"),
                InputDoc::optional("b", "Right operand (or config 'b')"),
            ],
            outputs: vec![
                OutputDoc::new("result", "Comparison outcome"),
                OutputDoc::new("true", "Operand 'a' when the comparison holds"),
                OutputDoc::new("false", "Operand 'a' otherwise"),
            ],
        }
    }
}

/// Counts its own runs. The count lives in the component instance's scratch
/// state, so each flow instance counts independently.
pub struct CounterComponent;

#[async_trait]
impl ComponentExecutor for CounterComponent {
    fn type_name(&self) -> &str {
        "logic.counter"
    }

    async fn run(&self, ctx: ComponentContext) -> Result<RunOutcome, ComponentError> {
        let mut state = ctx.state.write().await;
        let count = state
            .data
            .get("count")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
            + 1.0;
        state.data.insert("count".to_string(), Value::Number(count));
        drop(state);
        Ok(RunOutcome::new().with_output("value", count))
    }
}

pub struct CounterComponentFactory;

impl ExecutorFactory for CounterComponentFactory {
    fn create(
        &self,
        _config: &HashMap<String, Value>,
    ) -> Result<Box<dyn ComponentExecutor>, ComponentError> {
        Ok(Box::new(CounterComponent))
    }

    fn type_name(&self) -> &str {
        "logic.counter"
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            description: "Count runs of this component instance".to_string(),
            category: "logic".to_string(),
            inputs: vec![InputDoc::optional("trigger", "Run when anything arrives")],
            outputs: vec![OutputDoc::new("value", "The run count so far")],
        }
    }
}
