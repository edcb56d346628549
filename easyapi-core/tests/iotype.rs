use easyapi_core::{ConflictMode, CoreError, IoCondition, IoMeta, IoType, IoTypeRegistry, IoValue};
use serde_json::json;

// ── Number validation ────────────────────────────────────────────────────

#[test]
fn number_accepts_integers_and_floats() {
    let io = IoType::number();
    assert_eq!(io.validate("a", &json!(3)).unwrap(), IoValue::Number(3.0));
    assert_eq!(io.validate("a", &json!(2.5)).unwrap(), IoValue::Number(2.5));
}

#[test]
fn number_coerces_numeric_strings() {
    let io = IoType::number();
    assert_eq!(io.validate("a", &json!("4.5")).unwrap(), IoValue::Number(4.5));
    assert_eq!(io.validate("a", &json!(" 7 ")).unwrap(), IoValue::Number(7.0));
}

#[test]
fn number_rejects_non_numeric_and_names_the_field() {
    let io = IoType::number();
    let err = io.validate("a", &json!("not-a-number")).unwrap_err();
    match err {
        CoreError::Validation { field, .. } => assert_eq!(field, "a"),
        other => panic!("expected validation error, got {other}"),
    }
}

#[test]
fn number_min_is_inclusive() {
    let io = IoType::number().with_condition(IoCondition {
        min: Some(0.0),
        pattern: None,
    });
    assert_eq!(io.validate("x", &json!(0)).unwrap(), IoValue::Number(0.0));
    assert!(io.validate("x", &json!(-0.1)).is_err());
}

// ── String validation ────────────────────────────────────────────────────

#[test]
fn string_passes_through() {
    let io = IoType::text();
    assert_eq!(
        io.validate("s", &json!("hello")).unwrap(),
        IoValue::Text("hello".to_string())
    );
}

#[test]
fn string_rejects_non_strings() {
    let io = IoType::text();
    assert!(io.validate("s", &json!(12)).is_err());
    assert!(io.validate("s", &json!([1, 2])).is_err());
}

#[test]
fn string_pattern_condition() {
    let io = IoType::text().with_condition(IoCondition {
        min: None,
        pattern: Some("^[A-Z]{3}$".to_string()),
    });
    assert!(io.validate("code", &json!("ABC")).is_ok());
    let err = io.validate("code", &json!("abc")).unwrap_err();
    assert!(err.to_string().contains("code"));
}

// ── Number array validation ──────────────────────────────────────────────

#[test]
fn numarray_accepts_flat_arrays() {
    let io = IoType::numarray();
    assert_eq!(
        io.validate("xs", &json!([1, 2.5, "3"])).unwrap(),
        IoValue::NumArray(vec![1.0, 2.5, 3.0])
    );
}

#[test]
fn numarray_flattens_nested_arrays() {
    let io = IoType::numarray();
    assert_eq!(
        io.validate("xs", &json!([[1, 2], [3, [4]]])).unwrap(),
        IoValue::NumArray(vec![1.0, 2.0, 3.0, 4.0])
    );
}

#[test]
fn numarray_accepts_empty_and_rejects_bad_elements() {
    let io = IoType::numarray();
    assert_eq!(
        io.validate("xs", &json!([])).unwrap(),
        IoValue::NumArray(vec![])
    );
    assert!(io.validate("xs", &json!([1, "x"])).is_err());
}

// ── Registry ─────────────────────────────────────────────────────────────

#[test]
fn register_and_lookup() {
    let registry = IoTypeRegistry::new();
    registry.register(IoType::number()).unwrap();
    assert!(registry.contains("number"));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.lookup("number").unwrap().meta, IoMeta::Number);
    assert!(matches!(
        registry.lookup("missing"),
        Err(CoreError::NotFound(_))
    ));
}

#[test]
fn identical_reregistration_is_a_noop() {
    let registry = IoTypeRegistry::new();
    registry.register(IoType::number()).unwrap();
    registry.register(IoType::number()).unwrap();
    assert_eq!(registry.len(), 1);
}

#[test]
fn conflicting_reregistration_keeps_the_first() {
    let registry = IoTypeRegistry::new();
    registry.register(IoType::number()).unwrap();
    let redefined = IoType::new(IoMeta::String, "number", "not-a-float");
    registry.register(redefined).unwrap();
    assert_eq!(registry.lookup("number").unwrap().meta, IoMeta::Number);
}

#[test]
fn strict_mode_rejects_conflicts() {
    let registry = IoTypeRegistry::with_mode(ConflictMode::Strict);
    registry.register(IoType::number()).unwrap();
    // Identical definitions are still fine.
    registry.register(IoType::number()).unwrap();
    let redefined = IoType::new(IoMeta::String, "number", "not-a-float");
    assert!(matches!(
        registry.register(redefined),
        Err(CoreError::SchemaConflict(_))
    ));
}

#[test]
fn registry_validates_by_id() {
    let registry = IoTypeRegistry::new();
    registry.register(IoType::number()).unwrap();
    assert_eq!(
        registry.validate("number", "a", &json!(1)).unwrap(),
        IoValue::Number(1.0)
    );
    assert!(registry.validate("missing", "a", &json!(1)).is_err());
}

#[test]
fn listing_paginates_in_id_order() {
    let registry = IoTypeRegistry::new();
    registry.register(IoType::number()).unwrap();
    registry.register(IoType::text()).unwrap();
    registry.register(IoType::numarray()).unwrap();

    assert_eq!(registry.list_ids(0, None), vec!["numarray", "number", "string"]);
    assert_eq!(registry.list_ids(1, Some(1)), vec!["number"]);
    assert!(registry.list_ids(3, Some(10)).is_empty());

    let schemas = registry.list_schemas(0, Some(2));
    assert_eq!(schemas.len(), 2);
    assert_eq!(schemas[0].id, "numarray");
}

#[test]
fn load_str_registers_definitions() {
    let registry = IoTypeRegistry::new();
    let count = registry
        .load_str(
            r#"{
                "number": {"meta": "number", "id": "number", "name": "float", "doc": "Universal float", "version": "0.0.1"},
                "json": {"meta": "string", "id": "json", "name": "JSON", "condition": {"pattern": "^[\\[{]"}}
            }"#,
        )
        .unwrap();
    assert_eq!(count, 2);
    assert!(registry.contains("json"));
}

#[test]
fn load_str_rejects_malformed_documents() {
    let registry = IoTypeRegistry::new();
    assert!(matches!(
        registry.load_str("not json"),
        Err(CoreError::LoadFailure(_))
    ));
}
