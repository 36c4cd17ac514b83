use flowmodel::Value;

#[test]
fn serializes_as_plain_json() {
    let value = Value::Object(
        [
            ("enabled".to_string(), Value::Bool(true)),
            ("count".to_string(), Value::Number(2.0)),
        ]
        .into_iter()
        .collect(),
    );
    let json = serde_json::to_value(&value).unwrap();
    assert_eq!(json["enabled"], serde_json::json!(true));
    assert_eq!(json["count"], serde_json::json!(2.0));
}

#[test]
fn deserializes_untagged_json() {
    let value: Value = serde_json::from_str(r#"{"items": [1, "two", null]}"#).unwrap();
    let Value::Object(map) = value else {
        panic!("expected an object");
    };
    let Some(Value::Array(items)) = map.get("items") else {
        panic!("expected an array member");
    };
    assert_eq!(items[0], Value::Number(1.0));
    assert_eq!(items[1], Value::String("two".to_string()));
    assert_eq!(items[2], Value::Null);
}

#[test]
fn truthiness_matches_branching_semantics() {
    assert!(!Value::Null.is_truthy());
    assert!(!Value::Bool(false).is_truthy());
    assert!(!Value::Number(0.0).is_truthy());
    assert!(!Value::String(String::new()).is_truthy());
    assert!(Value::Number(-1.0).is_truthy());
    assert!(Value::String("x".to_string()).is_truthy());
    assert!(Value::Array(vec![]).is_truthy());
}
