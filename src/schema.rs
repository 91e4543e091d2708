//! Schema validation.
//!
//! Schemas are plain data: required keys, types, string patterns, enums and
//! nested properties. [`validate`] walks a JSON value against a [`Schema`] and
//! collects every violation instead of stopping at the first one. Schema
//! documents are checked the same way against [`meta_schema`], and registry
//! documents against a JSON Schema through the `jsonschema` crate; all three
//! entry points report [`Violation`]s.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{PlinthError, PlinthResult};

/// Shown instead of the actual value of a sensitive field.
pub const REDACTED: &str = "<redacted>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    Null,
}

impl SchemaType {
    pub fn name(self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Integer => "integer",
            SchemaType::Number => "number",
            SchemaType::Boolean => "boolean",
            SchemaType::Object => "object",
            SchemaType::Array => "array",
            SchemaType::Null => "null",
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        match self {
            SchemaType::String => value.is_string(),
            SchemaType::Integer => value.is_i64() || value.is_u64(),
            SchemaType::Number => value.is_number(),
            SchemaType::Boolean => value.is_boolean(),
            SchemaType::Object => value.is_object(),
            SchemaType::Array => value.is_array(),
            SchemaType::Null => value.is_null(),
        }
    }
}

/// A declarative contract for a JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    /// When `Some(false)`, keys without a property schema are violations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Values under a sensitive schema are never echoed in violations.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Schema {
    /// Parses a schema document (JSON, then YAML) after checking it against
    /// the meta-schema.
    pub fn parse(content: &str) -> PlinthResult<Self> {
        let document: Value = match serde_json::from_str(content) {
            Ok(value) => value,
            Err(_) => serde_yaml::from_str(content)?,
        };
        validate_schema_document(&document).into_result()?;
        Ok(serde_json::from_value(document)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> PlinthResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PlinthError::SourceNotFound { path: path.to_path_buf() });
        }
        Self::parse(&std::fs::read_to_string(path)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Required,
    Type,
    Pattern,
    Enum,
    MinLength,
    AdditionalProperty,
    /// The schema itself carries a pattern that does not compile.
    InvalidPattern,
    /// Reported by the registry JSON Schema.
    Document,
}

/// One mismatch between a value and its schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// JSON pointer to the offending field; empty for the root.
    pub path: String,
    pub kind: ViolationKind,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{path}: expected {}, got {}", self.expected, self.actual)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<Violation>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<Violation>) -> Self {
        Self { valid: errors.is_empty(), errors }
    }

    /// `Ok` when valid, otherwise every violation as one error.
    pub fn into_result(self) -> PlinthResult<()> {
        if self.valid {
            Ok(())
        } else {
            Err(PlinthError::SchemaViolation(self.errors))
        }
    }
}

/// Validates `instance` against `schema`, collecting every violation.
pub fn validate(instance: &Value, schema: &Schema) -> ValidationReport {
    let mut errors = Vec::new();
    check(instance, schema, "", false, &mut errors);
    ValidationReport::from_errors(errors)
}

fn check(value: &Value, schema: &Schema, path: &str, sensitive: bool, out: &mut Vec<Violation>) {
    let sensitive = sensitive || schema.sensitive;
    let violation = |kind, expected: String, actual: String| Violation {
        path: path.to_string(),
        kind,
        expected,
        actual,
    };

    if let Some(schema_type) = schema.schema_type {
        if !schema_type.matches(value) {
            out.push(violation(
                ViolationKind::Type,
                format!("type {}", schema_type.name()),
                describe(value, sensitive),
            ));
            return;
        }
    }

    if let Some(allowed) = &schema.enum_values {
        if !allowed.contains(value) {
            let choices = allowed.iter().map(Value::to_string).collect::<Vec<_>>().join(", ");
            out.push(violation(
                ViolationKind::Enum,
                format!("one of [{choices}]"),
                describe(value, sensitive),
            ));
        }
    }

    if let Value::String(s) = value {
        if let Some(min) = schema.min_length {
            if s.chars().count() < min {
                out.push(violation(
                    ViolationKind::MinLength,
                    format!("at least {min} character(s)"),
                    describe(value, sensitive),
                ));
            }
        }
        if let Some(pattern) = &schema.pattern {
            match Regex::new(pattern) {
                Ok(re) if re.is_match(s) => {}
                Ok(_) => out.push(violation(
                    ViolationKind::Pattern,
                    format!("match for /{pattern}/"),
                    describe(value, sensitive),
                )),
                Err(e) => out.push(violation(
                    ViolationKind::InvalidPattern,
                    "a valid regular expression".to_string(),
                    e.to_string(),
                )),
            }
        }
    }

    if let Value::Object(map) = value {
        for key in &schema.required {
            if !map.contains_key(key) {
                out.push(Violation {
                    path: pointer(path, key),
                    kind: ViolationKind::Required,
                    expected: "required property".to_string(),
                    actual: "missing".to_string(),
                });
            }
        }
        for (key, child) in map {
            let child_path = pointer(path, key);
            match schema.properties.get(key) {
                Some(child_schema) => check(child, child_schema, &child_path, sensitive, out),
                None if schema.additional_properties == Some(false) => out.push(Violation {
                    path: child_path,
                    kind: ViolationKind::AdditionalProperty,
                    expected: "no additional properties".to_string(),
                    actual: describe(child, sensitive),
                }),
                None => {}
            }
        }
    }

    if let (Value::Array(items), Some(item_schema)) = (value, &schema.items) {
        for (index, item) in items.iter().enumerate() {
            check(item, item_schema, &pointer(path, &index.to_string()), sensitive, out);
        }
    }
}

fn describe(value: &Value, sensitive: bool) -> String {
    if sensitive {
        REDACTED.to_string()
    } else {
        value.to_string()
    }
}

/// Appends `segment` to a JSON pointer, escaping `~` and `/`.
pub fn pointer(base: &str, segment: &str) -> String {
    format!("{base}/{}", segment.replace('~', "~0").replace('/', "~1"))
}

static META_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    serde_json::from_value(json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "type": {
                "type": "string",
                "enum": ["string", "integer", "number", "boolean", "object", "array", "null"]
            },
            "required": { "type": "array", "items": { "type": "string" } },
            "properties": { "type": "object" },
            "additionalProperties": { "type": "boolean" },
            "items": { "type": "object" },
            "pattern": { "type": "string" },
            "enum": { "type": "array" },
            "minLength": { "type": "integer" },
            "sensitive": { "type": "boolean" },
            "description": { "type": "string" }
        }
    }))
    .expect("meta-schema is a valid schema")
});

/// The schema every schema document must satisfy.
pub fn meta_schema() -> &'static Schema {
    &META_SCHEMA
}

/// Validates a raw schema document against the meta-schema, recursing into
/// nested property and item schemas.
pub fn validate_schema_document(document: &Value) -> ValidationReport {
    let mut errors = Vec::new();
    check_schema_document(document, "", &mut errors);
    ValidationReport::from_errors(errors)
}

fn check_schema_document(document: &Value, path: &str, out: &mut Vec<Violation>) {
    let before = out.len();
    check(document, &META_SCHEMA, path, false, out);
    if out.len() > before && !document.is_object() {
        return;
    }

    if let Some(Value::String(pattern)) = document.get("pattern") {
        if let Err(e) = Regex::new(pattern) {
            out.push(Violation {
                path: pointer(path, "pattern"),
                kind: ViolationKind::InvalidPattern,
                expected: "a valid regular expression".to_string(),
                actual: e.to_string(),
            });
        }
    }
    if let Some(Value::Object(properties)) = document.get("properties") {
        let base = pointer(path, "properties");
        for (key, child) in properties {
            check_schema_document(child, &pointer(&base, key), out);
        }
    }
    if let Some(items @ Value::Object(_)) = document.get("items") {
        check_schema_document(items, &pointer(path, "items"), out);
    }
}

static REGISTRY_VALIDATOR: LazyLock<jsonschema::Validator> = LazyLock::new(|| {
    let transforms: Vec<&str> =
        crate::transform::Transform::ALL.iter().map(|t| t.name()).collect();
    let schema = json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "required": ["variables"],
        "additionalProperties": false,
        "properties": {
            "variables": {
                "type": "object",
                "propertyNames": { "pattern": "^[a-z0-9_]+$" },
                "additionalProperties": {
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {
                        "type": { "enum": ["string", "boolean", "integer"] },
                        "default": { "type": ["string", "boolean", "integer"] },
                        "description": { "type": "string" },
                        "pattern": { "type": "string" },
                        "choices": { "type": "array", "items": { "type": "string" } },
                        "required": { "type": "boolean" },
                        "sensitive": { "type": "boolean" },
                        "transforms": {
                            "type": "array",
                            "uniqueItems": true,
                            "items": { "enum": transforms }
                        }
                    }
                }
            }
        }
    });
    jsonschema::validator_for(&schema).expect("registry schema is a valid JSON Schema")
});

/// Validates a registry document, collecting every violation.
pub fn validate_registry_document(document: &Value) -> ValidationReport {
    let errors = REGISTRY_VALIDATOR
        .iter_errors(document)
        .map(|error| {
            let path = error.instance_path().to_string();
            let actual = document.pointer(&path).map_or_else(String::new, Value::to_string);
            Violation {
                path,
                kind: ViolationKind::Document,
                expected: error.to_string(),
                actual,
            }
        })
        .collect();
    ValidationReport::from_errors(errors)
}
