use plinth::error::PlinthError;
use plinth::registry::{Registry, VariableType};
use plinth::schema::ViolationKind;
use plinth::token::contains_token;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_builtin_registry_defaults() {
    let registry = Registry::builtin().unwrap();

    assert_eq!(registry.get("name").as_deref(), Some("Example Plugin"));
    assert_eq!(registry.get("slug").as_deref(), Some("example-plugin"));
    assert_eq!(registry.get("slug_constant").as_deref(), Some("EXAMPLE_PLUGIN"));
    assert_eq!(registry.get("version"), None);
    assert_eq!(
        registry.definition("block_count").map(|d| d.value_type),
        Some(VariableType::Integer)
    );
}

#[test]
fn test_every_name_has_a_usable_dry_run_value() {
    let registry = Registry::builtin().unwrap();
    assert!(registry.names().count() > registry.len());

    for name in registry.names() {
        let value = registry.dry_run_value(name, None);
        assert!(!value.is_empty(), "{name} has an empty dry-run value");
        assert!(!contains_token(&value), "{name} resolves to a token");
    }
}

#[test]
fn test_dry_run_value_uses_fallback_for_unknown_names() {
    let registry = Registry::builtin().unwrap();

    assert_eq!(registry.dry_run_value("nonexistent", Some("default")), "default");
    assert_eq!(registry.dry_run_value("nonexistent", None), "dry-run-nonexistent");
    assert_eq!(registry.dry_run_value("name", Some("default")), "Example Plugin");
}

#[test]
fn test_empty_default_counts_as_absent() {
    let registry = Registry::parse(r#"{"variables": {"author": {"default": ""}}}"#).unwrap();

    assert_eq!(registry.get("author"), None);
    assert_eq!(registry.dry_run_value("author", None), "dry-run-author");
}

#[test]
fn test_name_colliding_with_transform_suffix_is_rejected() {
    let result = Registry::parse(
        r#"{"variables": {"slug": {"default": "a"}, "slug_upper": {"default": "B"}}}"#,
    );

    match result {
        Err(PlinthError::ReservedName { name, base, transform }) => {
            assert_eq!(name, "slug_upper");
            assert_eq!(base, "slug");
            assert_eq!(transform, "upper");
        }
        other => panic!("Expected ReservedName, got {other:?}"),
    }
}

#[test]
fn test_registry_document_reports_every_violation() {
    let result = Registry::parse(
        r#"{"variables": {
            "Bad-Name": {},
            "ok": {"type": "float", "required": "yes"}
        }}"#,
    );

    match result {
        Err(PlinthError::SchemaViolation(violations)) => {
            assert!(violations.len() >= 3, "{violations:?}");
            assert!(violations.iter().all(|v| v.kind == ViolationKind::Document));
            assert!(violations.iter().any(|v| v.path == "/variables/ok/type"));
            assert!(violations.iter().any(|v| v.path == "/variables/ok/required"));
        }
        other => panic!("Expected SchemaViolation, got {other:?}"),
    }
}

#[test]
fn test_default_containing_a_token_is_rejected() {
    let result = Registry::parse(r#"{"variables": {"slug": {"default": "{{name}}"}}}"#);
    assert!(matches!(result, Err(PlinthError::ConfigError(_))));
}

#[test]
fn test_invalid_pattern_is_rejected() {
    let result = Registry::parse(r#"{"variables": {"slug": {"pattern": "(unclosed"}}}"#);
    assert!(matches!(result, Err(PlinthError::ConfigError(_))));
}

#[test]
fn test_load_yaml_and_discover() {
    let temp_dir = TempDir::new().unwrap();
    assert_eq!(
        Registry::discover(temp_dir.path()).unwrap().len(),
        Registry::builtin().unwrap().len()
    );

    fs::write(
        temp_dir.path().join("plinth.yml"),
        "variables:\n  theme_name:\n    default: Twenty\n    transforms: [slug]\n",
    )
    .unwrap();

    let registry = Registry::discover(temp_dir.path()).unwrap();
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get("theme_name_slug").as_deref(), Some("twenty"));
}

#[test]
fn test_load_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.json");

    assert!(matches!(Registry::load(&missing), Err(PlinthError::SourceNotFound { path }) if path == missing));
}

#[test]
fn test_to_schema_marks_required_and_sensitive() {
    let registry = Registry::builtin().unwrap();
    let schema = registry.to_schema();

    assert!(schema.required.contains(&"name".to_string()));
    assert!(schema.required.contains(&"slug".to_string()));
    assert!(schema.properties["api_key"].sensitive);
    assert_eq!(schema.properties["license"].enum_values.as_ref().map(Vec::len), Some(3));
}
