use async_trait::async_trait;
use flowmodel::{ComponentContext, ComponentError, ComponentExecutor, RunOutcome, Value};
use flowrun::{ExecutorFactory, ExecutorMetadata, InputDoc, OutputDoc};
use std::collections::HashMap;

/// Logs the incoming value and passes it through on `next`.
pub struct LogComponent;

#[async_trait]
impl ComponentExecutor for LogComponent {
    fn type_name(&self) -> &str {
        "debug.log"
    }

    async fn run(&self, ctx: ComponentContext) -> Result<RunOutcome, ComponentError> {
        let message = ctx.input("message").cloned().unwrap_or(Value::Null);
        let prefix = ctx.config_or("prefix", Value::String(String::new()));
        let rendered = match prefix.as_str() {
            Some("") | None => message.to_string(),
            Some(prefix) => format!("{}: {}", prefix, message),
        };
        tracing::info!(component = %ctx.component, "{}", rendered);
        ctx.events.info(rendered);
        Ok(RunOutcome::new().with_output("next", message))
    }
}

pub struct LogComponentFactory;

impl ExecutorFactory for LogComponentFactory {
    fn create(
        &self,
        _config: &HashMap<String, Value>,
    ) -> Result<Box<dyn ComponentExecutor>, ComponentError> {
        Ok(Box::new(LogComponent))
    }

    fn type_name(&self) -> &str {
        "debug.log"
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            description: "Log the incoming value".to_string(),
            category: "debug".to_string(),
            inputs: vec![InputDoc::required("message", "Value to log")],
            outputs: vec![OutputDoc::new("next", "The logged value, passed through")],
        }
    }
}
