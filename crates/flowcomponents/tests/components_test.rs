use flowcomponents::register_all;
use flowmodel::{
    ComponentContext, ComponentError, ComponentExecutor, Control, DataContext, EventBus, Value,
    VariableDecl,
};
use flowrun::ExecutorRegistry;
use std::collections::HashMap;
use uuid::Uuid;

fn test_context() -> ComponentContext {
    let bus = EventBus::new(16);
    let emitter = bus.create_emitter(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    ComponentContext::new(
        Uuid::new_v4(),
        Uuid::new_v4(),
        DataContext::global(&[]),
        emitter,
    )
}

fn executor(type_name: &str) -> Box<dyn ComponentExecutor> {
    let mut registry = ExecutorRegistry::new();
    register_all(&mut registry);
    registry
        .create(type_name, &HashMap::new())
        .expect("registered component type")
}

#[tokio::test]
async fn constant_emits_its_configured_value() {
    let mut ctx = test_context();
    ctx.config.insert("value".to_string(), Value::Number(42.0));

    let outcome = executor("data.constant").run(ctx).await.unwrap();
    assert_eq!(outcome.outputs.get("value"), Some(&Value::Number(42.0)));
}

#[tokio::test]
async fn constant_defaults_to_null() {
    let outcome = executor("data.constant").run(test_context()).await.unwrap();
    assert_eq!(outcome.outputs.get("value"), Some(&Value::Null));
}

#[tokio::test]
async fn start_pulses_next() {
    let outcome = executor("flow.start").run(test_context()).await.unwrap();
    assert_eq!(outcome.outputs.get("next"), Some(&Value::Null));
}

#[tokio::test]
async fn end_returns_the_buffered_result() {
    let mut ctx = test_context();
    ctx.inputs
        .insert("result".to_string(), Value::String("done".to_string()));

    let outcome = executor("flow.end").run(ctx).await.unwrap();
    match outcome.control {
        Control::EndFlow { result } => {
            assert_eq!(result, Some(Value::String("done".to_string())))
        }
        other => panic!("expected EndFlow, got {:?}", other),
    }
}

#[tokio::test]
async fn input_reads_the_named_call_input() {
    let mut ctx = test_context();
    ctx.config
        .insert("name".to_string(), Value::String("amount".to_string()));
    ctx.call_inputs
        .insert("amount".to_string(), Value::Number(7.0));

    let outcome = executor("flow.input").run(ctx).await.unwrap();
    assert_eq!(outcome.outputs.get("value"), Some(&Value::Number(7.0)));
}

#[tokio::test]
async fn input_without_name_config_fails() {
    let err = executor("flow.input").run(test_context()).await.unwrap_err();
    assert!(matches!(err, ComponentError::Configuration(_)));
}

#[tokio::test]
async fn output_hands_the_value_to_the_caller() {
    let mut ctx = test_context();
    ctx.config
        .insert("name".to_string(), Value::String("total".to_string()));
    ctx.inputs.insert("value".to_string(), Value::Number(3.0));

    let outcome = executor("flow.output").run(ctx).await.unwrap();
    match outcome.control {
        Control::CallerOutput { output, value } => {
            assert_eq!(output, "total");
            assert_eq!(value, Value::Number(3.0));
        }
        other => panic!("expected CallerOutput, got {:?}", other),
    }
}

#[tokio::test]
async fn call_action_forwards_the_buffered_inputs() {
    let mut ctx = test_context();
    ctx.config
        .insert("action".to_string(), Value::String("greet".to_string()));
    ctx.inputs
        .insert("who".to_string(), Value::String("world".to_string()));

    let outcome = executor("flow.call_action").run(ctx).await.unwrap();
    match outcome.control {
        Control::CallAction { action, inputs } => {
            assert_eq!(action, "greet");
            assert_eq!(inputs.get("who"), Some(&Value::String("world".to_string())));
        }
        other => panic!("expected CallAction, got {:?}", other),
    }
}

#[tokio::test]
async fn arithmetic_adds_by_default() {
    let mut ctx = test_context();
    ctx.inputs.insert("a".to_string(), Value::Number(2.0));
    ctx.inputs.insert("b".to_string(), Value::Number(3.0));

    let outcome = executor("math.arithmetic").run(ctx).await.unwrap();
    assert_eq!(outcome.outputs.get("result"), Some(&Value::Number(5.0)));
}

#[tokio::test]
async fn arithmetic_falls_back_to_config_operands() {
    let mut ctx = test_context();
    ctx.inputs.insert("a".to_string(), Value::Number(10.0));
    ctx.config.insert("b".to_string(), Value::Number(4.0));
    ctx.config
        .insert("operation".to_string(), Value::String("subtract".to_string()));

    let outcome = executor("math.arithmetic").run(ctx).await.unwrap();
    assert_eq!(outcome.outputs.get("result"), Some(&Value::Number(6.0)));
}

#[tokio::test]
async fn arithmetic_rejects_division_by_zero() {
    let mut ctx = test_context();
    ctx.inputs.insert("a".to_string(), Value::Number(1.0));
    ctx.inputs.insert("b".to_string(), Value::Number(0.0));
    ctx.config
        .insert("operation".to_string(), Value::String("divide".to_string()));

    let err = executor("math.arithmetic").run(ctx).await.unwrap_err();
    assert!(matches!(err, ComponentError::ExecutionFailed(_)));
}

#[tokio::test]
async fn arithmetic_validates_the_operation() {
    let mut config = HashMap::new();
    config.insert("operation".to_string(), Value::String("pow".to_string()));
    let err = executor("math.arithmetic")
        .validate_config(&config)
        .unwrap_err();
    assert!(matches!(err, ComponentError::Configuration(_)));
}

#[tokio::test]
async fn compare_routes_the_operand_down_the_matching_branch() {
    let mut ctx = test_context();
    ctx.inputs.insert("a".to_string(), Value::Number(2.0));
    ctx.inputs.insert("b".to_string(), Value::Number(5.0));
    ctx.config
        .insert("operation".to_string(), Value::String("lt".to_string()));

    let outcome = executor("logic.compare").run(ctx).await.unwrap();
    assert_eq!(outcome.outputs.get("result"), Some(&Value::Bool(true)));
    assert_eq!(outcome.outputs.get("true"), Some(&Value::Number(2.0)));
    assert!(outcome.outputs.get("false").is_none());
}

#[tokio::test]
async fn compare_eq_works_on_non_numbers() {
    let mut ctx = test_context();
    ctx.inputs
        .insert("a".to_string(), Value::String("x".to_string()));
    ctx.inputs
        .insert("b".to_string(), Value::String("y".to_string()));

    let outcome = executor("logic.compare").run(ctx).await.unwrap();
    assert_eq!(outcome.outputs.get("result"), Some(&Value::Bool(false)));
    assert_eq!(
        outcome.outputs.get("false"),
        Some(&Value::String("x".to_string()))
    );
}

#[tokio::test]
async fn counter_keeps_its_count_in_scratch_state() {
    let counter = executor("logic.counter");
    let ctx = test_context();

    let first = counter.run(ctx.clone()).await.unwrap();
    let second = counter.run(ctx.clone()).await.unwrap();
    assert_eq!(first.outputs.get("value"), Some(&Value::Number(1.0)));
    assert_eq!(second.outputs.get("value"), Some(&Value::Number(2.0)));

    // A different instance starts from zero.
    let third = counter.run(test_context()).await.unwrap();
    assert_eq!(third.outputs.get("value"), Some(&Value::Number(1.0)));
}

#[tokio::test]
async fn set_variable_writes_the_data_context() {
    let mut ctx = test_context();
    ctx.config
        .insert("variable".to_string(), Value::String("total".to_string()));
    ctx.inputs.insert("value".to_string(), Value::Number(9.0));
    let data = ctx.data.clone();

    let outcome = executor("data.set_variable").run(ctx).await.unwrap();
    assert_eq!(outcome.outputs.get("next"), Some(&Value::Number(9.0)));
    assert_eq!(data.get("total"), Some(Value::Number(9.0)));
}

#[tokio::test]
async fn get_variable_reads_a_declared_variable() {
    let bus = EventBus::new(16);
    let emitter = bus.create_emitter(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let data = DataContext::global(&[VariableDecl::new("greeting", "hello")]);
    let mut ctx = ComponentContext::new(Uuid::new_v4(), Uuid::new_v4(), data, emitter);
    ctx.config
        .insert("variable".to_string(), Value::String("greeting".to_string()));

    let outcome = executor("data.get_variable").run(ctx).await.unwrap();
    assert_eq!(
        outcome.outputs.get("value"),
        Some(&Value::String("hello".to_string()))
    );
}

#[tokio::test]
async fn get_variable_yields_null_for_unknown_names() {
    let mut ctx = test_context();
    ctx.config
        .insert("variable".to_string(), Value::String("missing".to_string()));

    let outcome = executor("data.get_variable").run(ctx).await.unwrap();
    assert_eq!(outcome.outputs.get("value"), Some(&Value::Null));
}

#[tokio::test]
async fn log_passes_the_message_through() {
    let mut ctx = test_context();
    ctx.inputs
        .insert("message".to_string(), Value::String("hi".to_string()));
    ctx.config
        .insert("prefix".to_string(), Value::String("test".to_string()));

    let outcome = executor("debug.log").run(ctx).await.unwrap();
    assert_eq!(
        outcome.outputs.get("next"),
        Some(&Value::String("hi".to_string()))
    );
}

#[tokio::test]
async fn delay_passes_the_value_through_after_waiting() {
    let mut ctx = test_context();
    ctx.config.insert("delay_ms".to_string(), Value::Number(10.0));
    ctx.inputs.insert("value".to_string(), Value::Number(1.0));

    let outcome = executor("time.delay").run(ctx).await.unwrap();
    assert_eq!(outcome.outputs.get("next"), Some(&Value::Number(1.0)));
}

#[tokio::test]
async fn delay_aborts_when_the_session_is_cancelled() {
    let mut ctx = test_context();
    ctx.config
        .insert("delay_ms".to_string(), Value::Number(60_000.0));
    ctx.cancellation.cancel();

    let err = executor("time.delay").run(ctx).await.unwrap_err();
    assert!(matches!(err, ComponentError::Cancelled));
}

#[test]
fn register_all_covers_every_builtin_type() {
    let mut registry = ExecutorRegistry::new();
    register_all(&mut registry);
    for type_name in [
        "flow.start",
        "flow.end",
        "flow.input",
        "flow.output",
        "flow.call_action",
        "data.constant",
        "data.set_variable",
        "data.get_variable",
        "math.arithmetic",
        "logic.compare",
        "logic.counter",
        "debug.log",
        "time.delay",
    ] {
        assert!(registry.contains(type_name), "missing {}", type_name);
        assert!(registry.metadata(type_name).is_some(), "no metadata for {}", type_name);
    }
}

#[test]
fn metadata_port_schema_uses_model_port_definitions() {
    let mut registry = ExecutorRegistry::new();
    register_all(&mut registry);

    let arithmetic = registry.metadata("math.arithmetic").unwrap();
    let ports: Vec<_> = arithmetic.input_ports().collect();
    assert!(ports.iter().any(|p| p.name == "a" && p.required));
    assert!(ports.iter().any(|p| p.name == "b" && !p.required));
    assert!(arithmetic.outputs.iter().any(|o| o.name == "result"));
}
