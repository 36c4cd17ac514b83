use flowmodel::Value;
use flowrun::SettingsStore;
use std::collections::HashMap;
use std::path::PathBuf;

fn scratch_file(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("flowrun-settings-{}-{}.json", name, uuid::Uuid::new_v4()))
}

#[test]
fn persistent_variables_round_trip() {
    let path = scratch_file("round-trip");

    let mut store = SettingsStore::new(Some(path.clone()));
    store.load();
    assert!(store.persistent_variables().is_empty());

    let mut variables = HashMap::new();
    variables.insert("launch_count".to_string(), Value::Number(3.0));
    store.set_persistent_variables(&variables);
    store.save();

    let mut reopened = SettingsStore::new(Some(path.clone()));
    reopened.load();
    assert_eq!(
        reopened.persistent_variables().get("launch_count"),
        Some(&Value::Number(3.0))
    );

    std::fs::remove_file(path).ok();
}

#[test]
fn unknown_members_survive_a_save() {
    let path = scratch_file("unknown-members");
    std::fs::write(&path, r#"{"editor": {"zoom": 1.5}}"#).unwrap();

    let mut store = SettingsStore::new(Some(path.clone()));
    store.load();
    let mut variables = HashMap::new();
    variables.insert("theme".to_string(), Value::String("dark".to_string()));
    store.set_persistent_variables(&variables);
    store.save();

    let text = std::fs::read_to_string(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["editor"]["zoom"], serde_json::json!(1.5));
    assert_eq!(json["__persistentVariables"]["theme"], serde_json::json!("dark"));

    std::fs::remove_file(path).ok();
}

#[test]
fn unchanged_values_do_not_rewrite_the_file() {
    let path = scratch_file("unchanged");
    std::fs::write(
        &path,
        r#"{"__persistentVariables": {"theme": "dark"}}"#,
    )
    .unwrap();

    let mut store = SettingsStore::new(Some(path.clone()));
    store.load();
    let variables = store.persistent_variables();
    store.set_persistent_variables(&variables);

    std::fs::remove_file(&path).unwrap();
    // Nothing changed, so save must not recreate the file.
    store.save();
    assert!(!path.exists());
}

#[test]
fn io_failures_are_non_fatal() {
    let mut store = SettingsStore::new(Some(PathBuf::from("/nonexistent/dir/settings.json")));
    store.load();
    assert!(store.persistent_variables().is_empty());

    let mut variables = HashMap::new();
    variables.insert("x".to_string(), Value::Number(1.0));
    store.set_persistent_variables(&variables);
    // Write failure only warns.
    store.save();
}

#[test]
fn malformed_settings_start_empty() {
    let path = scratch_file("malformed");
    std::fs::write(&path, "not json at all").unwrap();

    let mut store = SettingsStore::new(Some(path.clone()));
    store.load();
    assert!(store.persistent_variables().is_empty());

    std::fs::remove_file(path).ok();
}
