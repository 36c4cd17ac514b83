use flowmodel::ComponentId;
use std::collections::HashMap;

/// Session-wide breakpoint set, keyed by the authoring-time component so a
/// breakpoint applies to every flow instance executing that component.
#[derive(Debug, Default)]
pub struct BreakpointSet {
    breakpoints: HashMap<ComponentId, bool>,
}

impl BreakpointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, component: ComponentId) {
        self.breakpoints.entry(component).or_insert(true);
    }

    pub fn remove(&mut self, component: ComponentId) {
        self.breakpoints.remove(&component);
    }

    pub fn enable(&mut self, component: ComponentId) {
        if let Some(enabled) = self.breakpoints.get_mut(&component) {
            *enabled = true;
        }
    }

    pub fn disable(&mut self, component: ComponentId) {
        if let Some(enabled) = self.breakpoints.get_mut(&component) {
            *enabled = false;
        }
    }

    /// True when the component has an enabled breakpoint.
    pub fn is_active(&self, component: ComponentId) -> bool {
        self.breakpoints.get(&component).copied().unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ComponentId, bool)> + '_ {
        self.breakpoints.iter().map(|(c, e)| (*c, *e))
    }

    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }
}
