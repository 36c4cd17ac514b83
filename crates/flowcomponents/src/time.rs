use async_trait::async_trait;
use flowmodel::{
    ComponentContext, ComponentError, ComponentExecutor, Dispatch, RunOutcome, Value,
};
use flowrun::{ExecutorFactory, ExecutorMetadata, InputDoc, OutputDoc};
use std::collections::HashMap;
use tokio::time::{sleep, Duration};

/// Waits a configured duration, then passes the incoming value through.
///
/// Runs detached: the owning component state reads as running across ticks,
/// and re-deliveries to it are deferred until the delay elapses. Stopping the
/// session cancels the wait through the cancellation token.
pub struct DelayComponent;

#[async_trait]
impl ComponentExecutor for DelayComponent {
    fn type_name(&self) -> &str {
        "time.delay"
    }

    fn dispatch(&self) -> Dispatch {
        Dispatch::Detached
    }

    async fn run(&self, ctx: ComponentContext) -> Result<RunOutcome, ComponentError> {
        let delay_ms = ctx
            .config
            .get("delay_ms")
            .and_then(|v| v.as_f64())
            .unwrap_or(1000.0) as u64;

        ctx.events.info(format!("Delaying for {}ms", delay_ms));

        tokio::select! {
            _ = sleep(Duration::from_millis(delay_ms)) => {}
            _ = ctx.cancellation.cancelled() => return Err(ComponentError::Cancelled),
        }

        let value = ctx.input("value").cloned().unwrap_or(Value::Null);
        Ok(RunOutcome::new().with_output("next", value))
    }
}

pub struct DelayComponentFactory;

impl ExecutorFactory for DelayComponentFactory {
    fn create(
        &self,
        _config: &HashMap<String, Value>,
    ) -> Result<Box<dyn ComponentExecutor>, ComponentError> {
        Ok(Box::new(DelayComponent))
    }

    fn type_name(&self) -> &str {
        "time.delay"
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            description: "Delay execution for specified milliseconds".to_string(),
            category: "time".to_string(),
            inputs: vec![InputDoc::optional("value", "Value to pass through")],
            outputs: vec![OutputDoc::new("next", "The input, after the delay")],
        }
    }
}
