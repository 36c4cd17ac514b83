use async_trait::async_trait;
use flowmodel::{ComponentContext, ComponentError, ComponentExecutor, RunOutcome, Value};
use flowrun::{ExecutorFactory, ExecutorMetadata, InputDoc, OutputDoc};
use std::collections::HashMap;

/// Binary arithmetic on two operands. Operands come from the `a`/`b` input
/// ports, falling back to same-named config values for fixed operands.
pub struct ArithmeticComponent;

impl ArithmeticComponent {
    fn operand(ctx: &ComponentContext, name: &str) -> Result<f64, ComponentError> {
        let value = ctx
            .input(name)
            .cloned()
            .or_else(|| ctx.config.get(name).cloned())
            .ok_or_else(|| ComponentError::MissingInput(name.to_string()))?;
        value.as_f64().ok_or_else(|| ComponentError::InvalidInputType {
            field: name.to_string(),
            expected: "number".to_string(),
            actual: "other".to_string(),
        })
    }
}

#[async_trait]
impl ComponentExecutor for ArithmeticComponent {
    fn type_name(&self) -> &str {
        "math.arithmetic"
    }

    async fn run(&self, ctx: ComponentContext) -> Result<RunOutcome, ComponentError> {
        let operation = ctx
            .config_or("operation", Value::String("add".to_string()))
            .as_str()
            .unwrap_or("add")
            .to_string();
        let a = Self::operand(&ctx, "a")?;
        let b = Self::operand(&ctx, "b")?;

        let result = match operation.as_str() {
            "add" => a + b,
            "subtract" => a - b,
            "multiply" => a * b,
            "divide" => {
                if b == 0.0 {
                    return Err(ComponentError::ExecutionFailed(
                        "division by zero".to_string(),
                    ));
                }
                a / b
            }
            "modulo" => {
                if b == 0.0 {
                    return Err(ComponentError::ExecutionFailed(
                        "division by zero".to_string(),
                    ));
                }
                a % b
            }
            other => {
                return Err(ComponentError::Configuration(format!(
                    "unknown operation '{}'",
                    other
                )))
            }
        };

        Ok(RunOutcome::new().with_output("result", result))
    }

    fn validate_config(&self, config: &HashMap<String, Value>) -> Result<(), ComponentError> {
        if let Some(operation) = config.get("operation") {
            let known = matches!(
                operation.as_str(),
                Some("add" | "subtract" | "multiply" | "divide" | "modulo")
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

pub struct ArithmeticComponentFactory;

impl ExecutorFactory for ArithmeticComponentFactory {
    fn create(
        &self,
        _config: &HashMap<String, Value>,
    ) -> Result<Box<dyn ComponentExecutor>, ComponentError> {
        Ok(Box::new(ArithmeticComponent))
    }

    fn type_name(&self) -> &str {
        "math.arithmetic"
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            description: "Binary arithmetic (add, subtract, multiply, divide, modulo)"
                .to_string(),
            category: "math".to_string(),
            inputs: vec![
                InputDoc::required("a", "Left operand"),
                InputDoc::optional("b", "Right operand (or config 'b')"),
            ],
            outputs: vec![OutputDoc::new("result", "The computed value")],
        }
    }
}
