use crate::{Value, VariableDecl};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Scoped variable store: one scope per flow instance, chained to its
/// ancestors and ultimately the session-global scope.
///
/// `get` walks the chain outwards; `set` writes to the nearest scope that
/// declares the name, falling back to the global root for undeclared names.
/// Only the scheduler task writes; observers take value snapshots.
#[derive(Clone)]
pub struct DataContext {
    scope: Arc<Scope>,
}

struct Scope {
    values: RwLock<HashMap<String, Value>>,
    parent: Option<Arc<Scope>>,
}

impl DataContext {
    /// Root context seeded from global variable declarations.
    pub fn global(declarations: &[VariableDecl]) -> Self {
        let values = declarations
            .iter()
            .map(|d| (d.name.clone(), d.value.clone()))
            .collect();
        Self {
            scope: Arc::new(Scope {
                values: RwLock::new(values),
                parent: None,
            }),
        }
    }

    /// Child context for a new flow instance. `overrides` become the child's
    /// locally declared variables, shadowing any outer declaration of the
    /// same name.
    pub fn create(&self, overrides: HashMap<String, Value>) -> DataContext {
        Self {
            scope: Arc::new(Scope {
                values: RwLock::new(overrides),
                parent: Some(self.scope.clone()),
            }),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let mut scope = Some(&self.scope);
        while let Some(s) = scope {
            let values = s.values.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(v) = values.get(name) {
                return Some(v.clone());
            }
            scope = s.parent.as_ref();
        }
        None
    }

    pub fn set(&self, name: &str, value: Value) {
        let mut scope = &self.scope;
        loop {
            {
                let mut values = scope.values.write().unwrap_or_else(PoisonError::into_inner);
                if values.contains_key(name) {
                    values.insert(name.to_string(), value);
                    return;
                }
            }
            match scope.parent.as_ref() {
                Some(parent) => scope = parent,
                None => break,
            }
        }
        // Undeclared: the global root adopts it.
        let mut values = scope.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(name.to_string(), value);
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(|v| v.as_bool())
    }

    pub fn get_number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|v| v.as_f64())
    }

    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        })
    }

    /// Snapshot of this scope's own values (not the ancestors').
    pub fn local_values(&self) -> HashMap<String, Value> {
        self.scope
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
