use crate::registry::ExecutorRegistry;
use flowmodel::{
    ComponentId, Flow, FlowError, FlowKind, Project, CALL_ACTION_COMPONENT_TYPE,
    START_COMPONENT_TYPE,
};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Load a project definition from a JSON file.
pub fn load_project(path: &Path) -> Result<Project, FlowError> {
    let text = std::fs::read_to_string(path)?;
    let project: Project = serde_json::from_str(&text)?;
    Ok(project)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub flow: String,
    pub component: Option<ComponentId>,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "[{}] {}: {}", severity, self.flow, self.message)
    }
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn error(&mut self, flow: &Flow, component: Option<ComponentId>, message: String) {
        self.issues.push(ValidationIssue {
            severity: Severity::Error,
            flow: flow.name.clone(),
            component,
            message,
        });
    }

    fn warning(&mut self, flow: &Flow, component: Option<ComponentId>, message: String) {
        self.issues.push(ValidationIssue {
            severity: Severity::Warning,
            flow: flow.name.clone(),
            component,
            message,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }
}

/// Validate a project against its own structure and, when a registry is
/// given, against the registered component types.
///
/// Cycles are deliberately not rejected: loops are legal in a queue-driven
/// flow graph. The graph analysis only reports components that no entry
/// point can ever reach.
pub fn validate_project(project: &Project, registry: Option<&ExecutorRegistry>) -> ValidationReport {
    let mut report = ValidationReport::default();

    let mut names = HashSet::new();
    for var in &project.global_variables {
        if !names.insert(var.name.as_str()) {
            report.issues.push(ValidationIssue {
                severity: Severity::Warning,
                flow: String::new(),
                component: None,
                message: format!("duplicate global variable '{}'", var.name),
            });
        }
    }

    for flow in project.flows() {
        validate_flow(project, flow, registry, &mut report);
    }
    report
}

fn validate_flow(
    project: &Project,
    flow: &Flow,
    registry: Option<&ExecutorRegistry>,
    report: &mut ValidationReport,
) {
    let mut seen = HashSet::new();
    for component in &flow.components {
        if !seen.insert(component.id) {
            report.error(
                flow,
                Some(component.id),
                format!("duplicate component id {}", component.id),
            );
        }

        if let Some(registry) = registry {
            match registry.create(&component.type_name, &component.config) {
                Ok(executor) => {
                    if let Err(err) = executor.validate_config(&component.config) {
                        report.error(
                            flow,
                            Some(component.id),
                            format!("'{}' configuration: {}", component.label(), err),
                        );
                    }
                }
                Err(err) => {
                    report.error(flow, Some(component.id), err.to_string());
                }
            }
        }

        if component.type_name == CALL_ACTION_COMPONENT_TYPE {
            match component.config.get("action").and_then(|v| v.as_str()) {
                Some(action) if project.find_action(action).is_none() => {
                    report.error(
                        flow,
                        Some(component.id),
                        format!("'{}' calls unknown action '{}'", component.label(), action),
                    );
                }
                Some(_) => {}
                None => {
                    report.error(
                        flow,
                        Some(component.id),
                        format!("'{}' does not name an action", component.label()),
                    );
                }
            }
        }

        for port in &component.inputs {
            if port.required && !flow.is_input_wired(component.id, &port.name) {
                report.warning(
                    flow,
                    Some(component.id),
                    format!(
                        "required input '{}' of '{}' is not wired and can never be satisfied",
                        port.name,
                        component.label()
                    ),
                );
            }
        }
    }

    for connection in &flow.connections {
        let source = flow.find_component(connection.source);
        let target = flow.find_component(connection.target);
        match (source, target) {
            (Some(source), Some(target)) => {
                if !source.has_output(&connection.output) {
                    report.error(
                        flow,
                        Some(source.id),
                        format!(
                            "connection uses unknown output '{}' of '{}'",
                            connection.output,
                            source.label()
                        ),
                    );
                }
                if !target.has_input(&connection.input) {
                    report.error(
                        flow,
                        Some(target.id),
                        format!(
                            "connection uses unknown input '{}' of '{}'",
                            connection.input,
                            target.label()
                        ),
                    );
                }
            }
            _ => {
                report.error(
                    flow,
                    None,
                    format!(
                        "connection {} does not resolve to two components in this flow",
                        connection.id
                    ),
                );
            }
        }
    }

    if flow.kind == FlowKind::Action && flow.find_by_type(START_COMPONENT_TYPE).is_none() {
        report.warning(
            flow,
            None,
            format!("action '{}' has no start component", flow.name),
        );
    }

    report_unreachable(flow, report);
}

/// Flag components no entry point can reach through the wire graph.
fn report_unreachable(flow: &Flow, report: &mut ValidationReport) {
    if flow.components.is_empty() {
        return;
    }
    let mut graph: DiGraph<ComponentId, ()> = DiGraph::new();
    let mut index: HashMap<ComponentId, NodeIndex> = HashMap::new();
    for component in &flow.components {
        index.insert(component.id, graph.add_node(component.id));
    }
    for connection in &flow.connections {
        if let (Some(source), Some(target)) =
            (index.get(&connection.source), index.get(&connection.target))
        {
            graph.add_edge(*source, *target, ());
        }
    }

    let mut reachable: HashSet<ComponentId> = HashSet::new();
    for entry in flow.entry_components() {
        let Some(start) = index.get(&entry.id) else {
            continue;
        };
        let mut dfs = Dfs::new(&graph, *start);
        while let Some(node) = dfs.next(&graph) {
            if let Some(id) = graph.node_weight(node) {
                reachable.insert(*id);
            }
        }
    }

    for component in &flow.components {
        if !reachable.contains(&component.id) {
            report.warning(
                flow,
                Some(component.id),
                format!("'{}' is unreachable from any entry point", component.label()),
            );
        }
    }
}
