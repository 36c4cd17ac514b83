use flowcomponents::register_all;
use flowmodel::{
    Component, ComponentId, Flow, FlowKind, Project, RuntimeMode, Value, VariableDecl,
};
use flowrun::{
    DebugSnapshot, ExecutorRegistry, FlowRuntime, RuntimeConfig, SessionHandle, SessionOptions,
};
use std::sync::Arc;
use std::time::Duration;

fn builtin_runtime() -> FlowRuntime {
    let mut registry = ExecutorRegistry::new();
    register_all(&mut registry);
    FlowRuntime::with_registry(Arc::new(registry), RuntimeConfig::default())
}

async fn drained(handle: &SessionHandle) -> DebugSnapshot {
    tokio::time::timeout(
        Duration::from_secs(5),
        handle.wait_until(|s| s.mode == RuntimeMode::Running && s.is_idle()),
    )
    .await
    .expect("session did not drain in time")
    .expect("session ended unexpectedly")
}

fn buffered_input(snapshot: &DebugSnapshot, component: ComponentId, input: &str) -> Option<Value> {
    snapshot.flow_states.iter().find_map(|f| {
        f.components
            .iter()
            .find(|c| c.component == component)
            .and_then(|c| c.inputs.get(input).cloned())
    })
}

#[tokio::test]
async fn constant_arithmetic_log_pipeline() {
    let mut page = Flow::new("main", FlowKind::Page);
    let constant = page.add_component(
        Component::new("data.constant")
            .with_name("Start")
            .with_config("value", 5.0)
            .with_output("value"),
    );
    let add = page.add_component(
        Component::new("math.arithmetic")
            .with_name("Add")
            .with_config("operation", "add")
            .with_config("b", 1.0)
            .with_input("a")
            .with_output("result"),
    );
    let display = page.add_component(
        Component::new("debug.log")
            .with_name("Display")
            .with_input("message")
            .with_output("next"),
    );
    page.connect(constant, "value", add, "a");
    page.connect(add, "result", display, "message");

    let mut project = Project::new("pipeline");
    project.add_page(page);

    let handle = builtin_runtime().start_session(project, SessionOptions::default());
    let snapshot = drained(&handle).await;
    handle.stop().await.unwrap();
    handle.join().await.unwrap();

    assert_eq!(
        buffered_input(&snapshot, add, "a"),
        Some(Value::Number(5.0))
    );
    assert_eq!(
        buffered_input(&snapshot, display, "message"),
        Some(Value::Number(6.0))
    );
    assert!(snapshot.queue.is_empty());
    assert!(!snapshot.flow_states[0].has_error);
}

#[tokio::test]
async fn call_action_receives_the_result_back() {
    // Action "double": start pulses, the named input feeds the arithmetic,
    // the end component returns the product to the caller.
    let mut action = Flow::new("double", FlowKind::Action);
    action.add_component(Component::new("flow.start").with_output("next"));
    let input = action.add_component(
        Component::new("flow.input")
            .with_config("name", "x")
            .with_output("value"),
    );
    let multiply = action.add_component(
        Component::new("math.arithmetic")
            .with_config("operation", "multiply")
            .with_config("b", 2.0)
            .with_input("a")
            .with_output("result"),
    );
    let end = action.add_component(Component::new("flow.end").with_input("result"));
    action.connect(input, "value", multiply, "a");
    action.connect(multiply, "result", end, "result");

    let mut page = Flow::new("main", FlowKind::Page);
    let constant = page.add_component(
        Component::new("data.constant")
            .with_config("value", 21.0)
            .with_output("value"),
    );
    let call = page.add_component(
        Component::new("flow.call_action")
            .with_name("Call double")
            .with_config("action", "double")
            .with_input("x")
            .with_output("result")
            .with_output("next"),
    );
    let display = page.add_component(
        Component::new("debug.log")
            .with_input("message")
            .with_output("next"),
    );
    page.connect(constant, "value", call, "x");
    page.connect(call, "result", display, "message");

    let mut project = Project::new("caller");
    project.add_page(page);
    project.add_action(action);

    let handle = builtin_runtime().start_session(project, SessionOptions::default());
    let snapshot = drained(&handle).await;
    handle.stop().await.unwrap();
    handle.join().await.unwrap();

    assert_eq!(
        buffered_input(&snapshot, display, "message"),
        Some(Value::Number(42.0))
    );
    // The finished action instance no longer hangs off the page.
    assert!(snapshot.flow_states[0].children.is_empty());
    assert!(!snapshot.flow_states[0].has_error);
}

#[tokio::test]
async fn persistent_variables_survive_across_sessions() {
    let settings_path =
        std::env::temp_dir().join(format!("flow-settings-{}.json", uuid::Uuid::new_v4()));

    let make_project = || {
        let mut page = Flow::new("main", FlowKind::Page);
        let get = page.add_component(
            Component::new("data.get_variable")
                .with_config("variable", "launch_count")
                .with_output("value"),
        );
        let add = page.add_component(
            Component::new("math.arithmetic")
                .with_config("b", 1.0)
                .with_input("a")
                .with_output("result"),
        );
        let set = page.add_component(
            Component::new("data.set_variable")
                .with_config("variable", "launch_count")
                .with_input("value")
                .with_output("next"),
        );
        page.connect(get, "value", add, "a");
        page.connect(add, "result", set, "value");

        let mut project = Project::new("persistent");
        project.add_page(page);
        project
            .global_variables
            .push(VariableDecl::persistent("launch_count", 0.0));
        project
    };

    for expected in [1.0, 2.0] {
        let options = SessionOptions::default().with_settings_path(&settings_path);
        let handle = builtin_runtime().start_session(make_project(), options);
        let snapshot = drained(&handle).await;
        let count = snapshot
            .globals
            .iter()
            .find(|v| v.name == "launch_count")
            .map(|v| v.value.clone());
        assert_eq!(count, Some(Value::Number(expected)));
        handle.stop().await.unwrap();
        handle.join().await.unwrap();
    }

    let text = std::fs::read_to_string(&settings_path).unwrap();
    let blob: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(blob["__persistentVariables"]["launch_count"], 2.0);
    let _ = std::fs::remove_file(&settings_path);
}
