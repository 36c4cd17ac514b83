mod support;

use flowmodel::{Component, Flow, FlowKind, Project, Value};
use flowrun::{validate_project, Severity};
use support::{test_registry, Probe};

fn page(components: Vec<Component>) -> Flow {
    let mut flow = Flow::new("main", FlowKind::Page);
    for component in components {
        flow.add_component(component);
    }
    flow
}

#[test]
fn unknown_component_type_is_an_error() {
    let mut project = Project::new("p");
    project.add_page(page(vec![Component::new("does.not.exist")]));

    let probe = Probe::new();
    let report = validate_project(&project, Some(&test_registry(&probe)));
    assert!(report.has_errors());
    assert!(report
        .errors()
        .any(|i| i.message.contains("does.not.exist")));
}

#[test]
fn call_action_must_name_a_known_action() {
    let mut project = Project::new("p");
    project.add_page(page(vec![Component::new("flow.call_action")
        .with_config("action", "missing")]));

    let report = validate_project(&project, None);
    assert!(report.has_errors());
    assert!(report.errors().any(|i| i.message.contains("missing")));
}

#[test]
fn dangling_connection_is_an_error() {
    let mut flow = Flow::new("main", FlowKind::Page);
    let source = flow.add_component(Component::new("test.emit").with_output("value"));
    let orphan = uuid::Uuid::new_v4();
    flow.connections.push(flowmodel::ConnectionLine {
        id: uuid::Uuid::new_v4(),
        source,
        output: "value".to_string(),
        target: orphan,
        input: "in".to_string(),
    });
    let mut project = Project::new("p");
    project.add_page(flow);

    let report = validate_project(&project, None);
    assert!(report.has_errors());
}

#[test]
fn unknown_ports_on_a_connection_are_errors() {
    let mut flow = Flow::new("main", FlowKind::Page);
    let source = flow.add_component(Component::new("test.emit").with_output("value"));
    let target = flow.add_component(Component::new("test.record").with_input("in"));
    flow.connect(source, "nope", target, "in");
    let mut project = Project::new("p");
    project.add_page(flow);

    let report = validate_project(&project, None);
    assert!(report
        .errors()
        .any(|i| i.message.contains("unknown output 'nope'")));
}

#[test]
fn unreachable_component_is_a_warning_not_an_error() {
    let mut flow = Flow::new("main", FlowKind::Page);
    flow.add_component(Component::new("test.emit").with_output("value"));
    // Required input, never wired: unreachable from any entry point.
    flow.add_component(Component::new("test.record").with_input("in"));
    let mut project = Project::new("p");
    project.add_page(flow);

    let report = validate_project(&project, None);
    assert!(!report.has_errors());
    assert!(report
        .warnings()
        .any(|i| i.severity == Severity::Warning && i.message.contains("unreachable")));
}

#[test]
fn action_without_start_component_is_flagged() {
    let mut project = Project::new("p");
    let mut action = Flow::new("greet", FlowKind::Action);
    action.add_component(Component::new("test.emit").with_output("value"));
    project.add_action(action);

    let report = validate_project(&project, None);
    assert!(report
        .warnings()
        .any(|i| i.message.contains("no start component")));
}

#[test]
fn invalid_component_config_is_an_error() {
    let mut project = Project::new("p");
    project.add_page(page(vec![Component::new("test.emit")
        .with_config("value", Value::Number(1.0))]));
    // The registry accepts test.emit, so a well-formed page is clean.
    let probe = Probe::new();
    let report = validate_project(&project, Some(&test_registry(&probe)));
    assert!(!report.has_errors());
}
