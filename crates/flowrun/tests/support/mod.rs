#![allow(dead_code)]

use async_trait::async_trait;
use flowmodel::{
    ComponentContext, ComponentError, ComponentExecutor, Dispatch, RunOutcome, Value,
    START_COMPONENT_TYPE,
};
use flowrun::{ExecutorFactory, ExecutorRegistry};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Duration};

/// Shared probe the test executors report into.
#[derive(Default)]
pub struct Probe {
    order: Mutex<Vec<String>>,
    values: Mutex<Vec<Value>>,
    slow_running: AtomicUsize,
    slow_overlaps: AtomicUsize,
}

impl Probe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn mark(&self, tag: &str) {
        self.order.lock().unwrap().push(tag.to_string());
    }

    /// Tags of every run, in execution order.
    pub fn order(&self) -> Vec<String> {
        self.order.lock().unwrap().clone()
    }

    pub fn runs(&self, tag: &str) -> usize {
        self.order.lock().unwrap().iter().filter(|t| *t == tag).count()
    }

    /// Values the record executors received, in arrival order.
    pub fn values(&self) -> Vec<Value> {
        self.values.lock().unwrap().clone()
    }

    pub fn overlaps(&self) -> usize {
        self.slow_overlaps.load(Ordering::SeqCst)
    }
}

fn tag(ctx: &ComponentContext, fallback: &str) -> String {
    ctx.config
        .get("tag")
        .and_then(|v| v.as_str().map(|s| s.to_string()))
        .unwrap_or_else(|| fallback.to_string())
}

/// Emits its configured value, like a constant.
struct EmitExecutor {
    probe: Arc<Probe>,
    type_name: &'static str,
    output: &'static str,
}

#[async_trait]
impl ComponentExecutor for EmitExecutor {
    fn type_name(&self) -> &str {
        self.type_name
    }

    async fn run(&self, ctx: ComponentContext) -> Result<RunOutcome, ComponentError> {
        self.probe.mark(&tag(&ctx, self.type_name));
        let value = ctx.config_or("value", Value::Null);
        Ok(RunOutcome::new().with_output(self.output, value))
    }
}

/// Adds one to input `a`, emitting `result`.
struct AddOneExecutor {
    probe: Arc<Probe>,
}

#[async_trait]
impl ComponentExecutor for AddOneExecutor {
    fn type_name(&self) -> &str {
        "test.add_one"
    }

    async fn run(&self, ctx: ComponentContext) -> Result<RunOutcome, ComponentError> {
        self.probe.mark(&tag(&ctx, "test.add_one"));
        let a = ctx
            .require_input("a")?
            .as_f64()
            .ok_or_else(|| ComponentError::InvalidInputType {
                field: "a".to_string(),
                expected: "number".to_string(),
                actual: "other".to_string(),
            })?;
        Ok(RunOutcome::new().with_output("result", a + 1.0))
    }
}

/// Records the value arriving on `in`.
struct RecordExecutor {
    probe: Arc<Probe>,
}

#[async_trait]
impl ComponentExecutor for RecordExecutor {
    fn type_name(&self) -> &str {
        "test.record"
    }

    async fn run(&self, ctx: ComponentContext) -> Result<RunOutcome, ComponentError> {
        self.probe.mark(&tag(&ctx, "test.record"));
        let value = ctx.input("in").cloned().unwrap_or(Value::Null);
        self.probe.values.lock().unwrap().push(value);
        Ok(RunOutcome::new())
    }
}

/// Detached executor sleeping `delay_ms`, flagging overlapping runs. Ignores
/// the cancellation token so stop-timeout behavior can be exercised.
struct SlowExecutor {
    probe: Arc<Probe>,
}

#[async_trait]
impl ComponentExecutor for SlowExecutor {
    fn type_name(&self) -> &str {
        "test.slow"
    }

    fn dispatch(&self) -> Dispatch {
        Dispatch::Detached
    }

    async fn run(&self, ctx: ComponentContext) -> Result<RunOutcome, ComponentError> {
        if self.probe.slow_running.fetch_add(1, Ordering::SeqCst) > 0 {
            self.probe.slow_overlaps.fetch_add(1, Ordering::SeqCst);
        }
        let delay_ms = ctx
            .config
            .get("delay_ms")
            .and_then(|v| v.as_f64())
            .unwrap_or(50.0) as u64;
        sleep(Duration::from_millis(delay_ms)).await;
        self.probe.slow_running.fetch_sub(1, Ordering::SeqCst);
        self.probe.mark(&tag(&ctx, "test.slow"));
        Ok(RunOutcome::new().with_output("next", ctx.input("value").cloned().unwrap_or(Value::Null)))
    }
}

/// Always fails.
struct FailExecutor {
    probe: Arc<Probe>,
}

#[async_trait]
impl ComponentExecutor for FailExecutor {
    fn type_name(&self) -> &str {
        "test.fail"
    }

    async fn run(&self, ctx: ComponentContext) -> Result<RunOutcome, ComponentError> {
        self.probe.mark(&tag(&ctx, "test.fail"));
        Err(ComponentError::ExecutionFailed("boom".to_string()))
    }
}

struct ProbeFactory {
    probe: Arc<Probe>,
    type_name: &'static str,
}

impl ExecutorFactory for ProbeFactory {
    fn create(
        &self,
        _config: &HashMap<String, Value>,
    ) -> Result<Box<dyn ComponentExecutor>, ComponentError> {
        let probe = self.probe.clone();
        Ok(match self.type_name {
            "test.emit" => Box::new(EmitExecutor {
                probe,
                type_name: "test.emit",
                output: "value",
            }),
            START_COMPONENT_TYPE => Box::new(EmitExecutor {
                probe,
                type_name: START_COMPONENT_TYPE,
                output: "next",
            }),
            "test.add_one" => Box::new(AddOneExecutor { probe }),
            "test.record" => Box::new(RecordExecutor { probe }),
            "test.slow" => Box::new(SlowExecutor { probe }),
            "test.fail" => Box::new(FailExecutor { probe }),
            other => {
                return Err(ComponentError::Configuration(format!(
                    "no test executor for '{}'",
                    other
                )))
            }
        })
    }

    fn type_name(&self) -> &str {
        self.type_name
    }
}

/// Registry with every probe-backed test executor registered.
pub fn test_registry(probe: &Arc<Probe>) -> Arc<ExecutorRegistry> {
    let mut registry = ExecutorRegistry::new();
    for type_name in [
        "test.emit",
        START_COMPONENT_TYPE,
        "test.add_one",
        "test.record",
        "test.slow",
        "test.fail",
    ] {
        registry.register(Arc::new(ProbeFactory {
            probe: probe.clone(),
            type_name,
        }));
    }
    Arc::new(registry)
}
