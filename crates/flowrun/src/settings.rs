use flowmodel::Value;
use std::collections::HashMap;
use std::path::PathBuf;

/// Settings object member holding persistent global variable values.
pub const PERSISTENT_VARIABLES_KEY: &str = "__persistentVariables";

/// JSON settings blob read at session start and written back at stop.
///
/// The runtime only touches the `__persistentVariables` member; every other
/// member round-trips untouched. All I/O failures are non-fatal: the session
/// proceeds with empty settings and a warning.
#[derive(Debug)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    values: serde_json::Map<String, serde_json::Value>,
    modified: bool,
}

impl SettingsStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            values: serde_json::Map::new(),
            modified: false,
        }
    }

    pub fn load(&mut self) {
        let Some(path) = self.path.as_ref() else {
            return;
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, starting empty");
            return;
        }
        match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(serde_json::Value::Object(map)) => {
                    self.values = map;
                }
                Ok(_) => {
                    tracing::warn!(
                        path = %path.display(),
                        "settings file is not a JSON object, ignoring it"
                    );
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "failed to parse settings");
                }
            },
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "failed to read settings");
            }
        }
    }

    /// Persistent variable values from the settings blob.
    pub fn persistent_variables(&self) -> HashMap<String, Value> {
        match self.values.get(PERSISTENT_VARIABLES_KEY) {
            Some(serde_json::Value::Object(map)) => map
                .iter()
                .map(|(k, v)| (k.clone(), Value::from_json(v.clone())))
                .collect(),
            _ => HashMap::new(),
        }
    }

    /// Replace the persistent variable member. Marks the store modified only
    /// when the stored values actually changed.
    pub fn set_persistent_variables(&mut self, variables: &HashMap<String, Value>) {
        let object: serde_json::Map<String, serde_json::Value> = variables
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        let next = serde_json::Value::Object(object);
        if self.values.get(PERSISTENT_VARIABLES_KEY) != Some(&next) {
            self.values.insert(PERSISTENT_VARIABLES_KEY.to_string(), next);
            self.modified = true;
        }
    }

    /// Write the blob back if anything changed since load.
    pub fn save(&mut self) {
        if !self.modified {
            return;
        }
        let Some(path) = self.path.as_ref() else {
            return;
        };
        let text = match serde_json::to_string_pretty(&serde_json::Value::Object(
            self.values.clone(),
        )) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(%err, "failed to serialize settings");
                return;
            }
        };
        match std::fs::write(path, text) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "settings saved");
                self.modified = false;
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "failed to write settings");
            }
        }
    }
}
