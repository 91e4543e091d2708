//! Variable registry.
//! The authoritative mapping of variable names to their type, default value
//! and validation metadata, loaded from a JSON or YAML document.

use std::path::Path;

use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::scalar_to_string;
use crate::constants::{DRY_RUN_PREFIX, REGISTRY_FILES};
use crate::error::{PlinthError, PlinthResult};
use crate::schema::{validate_registry_document, Schema, SchemaType};
use crate::token::{contains_token, is_valid_name};
use crate::transform::Transform;

/// Registry shipped with Plinth, describing a multi-block plugin.
pub const BUILTIN_REGISTRY: &str = include_str!("../assets/registry.json");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    #[default]
    String,
    Boolean,
    Integer,
}

impl From<VariableType> for SchemaType {
    fn from(value: VariableType) -> Self {
        match value {
            VariableType::String => SchemaType::String,
            VariableType::Boolean => SchemaType::Boolean,
            VariableType::Integer => SchemaType::Integer,
        }
    }
}

/// One declared variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableDefinition {
    #[serde(skip)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub value_type: VariableType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub sensitive: bool,
    /// Derived variants exposed as `<name>_<transform>`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transforms: Vec<Transform>,
}

impl VariableDefinition {
    /// The default rendered as substitution text. Empty defaults count as absent.
    pub fn default_text(&self) -> Option<String> {
        self.default.as_ref().and_then(scalar_to_string).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct RegistryDocument {
    variables: IndexMap<String, VariableDefinition>,
}

/// Immutable set of variable definitions plus the names derived from them.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    variables: IndexMap<String, VariableDefinition>,
    derived: IndexMap<String, (String, Transform)>,
}

impl Registry {
    /// A registry with no variables; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in multi-block plugin registry.
    pub fn builtin() -> PlinthResult<Self> {
        Self::parse(BUILTIN_REGISTRY)
    }

    /// Parses a registry document, trying JSON first and YAML second.
    pub fn parse(content: &str) -> PlinthResult<Self> {
        let document: serde_json::Value = match serde_json::from_str(content) {
            Ok(value) => value,
            Err(_) => serde_yaml::from_str(content)?,
        };
        Self::from_document(&document)
    }

    /// Loads a registry document from `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> PlinthResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PlinthError::SourceNotFound { path: path.to_path_buf() });
        }
        debug!("Loading registry from {}", path.display());
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Loads the first registry file found in `dir`, or the built-in registry.
    pub fn discover<P: AsRef<Path>>(dir: P) -> PlinthResult<Self> {
        for file in REGISTRY_FILES {
            let candidate = dir.as_ref().join(file);
            if candidate.is_file() {
                return Self::load(candidate);
            }
        }
        debug!("No registry file found (tried: {}), using built-in", REGISTRY_FILES.join(", "));
        Self::builtin()
    }

    /// Builds a registry from an already parsed document.
    ///
    /// The document is first checked against the registry schema and every
    /// violation is reported together. After that the registry rejects names
    /// that collide with a derived name, defaults that contain placeholder
    /// tokens, and patterns that do not compile.
    pub fn from_document(document: &serde_json::Value) -> PlinthResult<Self> {
        let report = validate_registry_document(document);
        if !report.valid {
            return Err(PlinthError::SchemaViolation(report.errors));
        }
        let document: RegistryDocument = serde_json::from_value(document.clone())?;
        Self::from_definitions(document.variables)
    }

    /// Builds a registry from definitions keyed by name.
    pub fn from_definitions(variables: IndexMap<String, VariableDefinition>) -> PlinthResult<Self> {
        let mut registry = Registry::default();

        for (name, mut definition) in variables {
            if !is_valid_name(&name) {
                return Err(PlinthError::ConfigError(format!("invalid variable name '{name}'")));
            }
            if let Some(text) = definition.default_text() {
                if contains_token(&text) {
                    return Err(PlinthError::ConfigError(format!(
                        "default of '{name}' contains a placeholder token"
                    )));
                }
            }
            if let Some(pattern) = &definition.pattern {
                Regex::new(pattern).map_err(|e| {
                    PlinthError::ConfigError(format!("invalid pattern for '{name}': {e}"))
                })?;
            }
            definition.name = name.clone();
            registry.variables.insert(name, definition);
        }

        for (name, definition) in &registry.variables {
            for transform in Transform::ALL {
                let derived = transform.derived_name(name);
                if registry.variables.contains_key(&derived) {
                    return Err(PlinthError::ReservedName {
                        name: derived,
                        base: name.clone(),
                        transform: transform.to_string(),
                    });
                }
            }
            for transform in &definition.transforms {
                registry
                    .derived
                    .insert(transform.derived_name(name), (name.clone(), *transform));
            }
        }

        Ok(registry)
    }

    /// Default value for a declared or derived variable.
    pub fn get(&self, name: &str) -> Option<String> {
        if let Some(definition) = self.variables.get(name) {
            return definition.default_text();
        }
        let (base, transform) = self.derivation(name)?;
        self.get(base).map(|value| transform.apply(&value))
    }

    /// The base variable and transform a derived name comes from.
    pub fn derivation(&self, name: &str) -> Option<(&str, Transform)> {
        self.derived.get(name).map(|(base, transform)| (base.as_str(), *transform))
    }

    pub fn definition(&self, name: &str) -> Option<&VariableDefinition> {
        self.variables.get(name)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &VariableDefinition> {
        self.variables.values()
    }

    /// Whether `name` is declared or derived.
    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name) || self.derived.contains_key(name)
    }

    /// Every known name: declared names first, then derived ones.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().chain(self.derived.keys()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// The value used for `name` when nothing is configured: the registry
    /// default, then `fallback`, then the dry-run stand-in.
    pub fn dry_run_value(&self, name: &str, fallback: Option<&str>) -> String {
        self.get(name)
            .or_else(|| fallback.map(str::to_string))
            .unwrap_or_else(|| stand_in_value(name))
    }

    /// Derives a validation schema for configurations of this registry.
    pub fn to_schema(&self) -> Schema {
        let properties = self
            .variables
            .iter()
            .map(|(name, definition)| {
                let enum_values = (!definition.choices.is_empty()).then(|| {
                    definition.choices.iter().cloned().map(serde_json::Value::String).collect()
                });
                let schema = Schema {
                    schema_type: Some(definition.value_type.into()),
                    pattern: definition.pattern.clone(),
                    enum_values,
                    sensitive: definition.sensitive,
                    description: (!definition.description.is_empty())
                        .then(|| definition.description.clone()),
                    ..Schema::default()
                };
                (name.clone(), schema)
            })
            .collect();

        Schema {
            schema_type: Some(SchemaType::Object),
            required: self
                .variables
                .values()
                .filter(|definition| definition.required)
                .map(|definition| definition.name.clone())
                .collect(),
            properties,
            ..Schema::default()
        }
    }
}

/// Deterministic stand-in for a variable with no value: `dry-run-<name>`
/// with underscores turned into hyphens.
pub fn stand_in_value(name: &str) -> String {
    format!("{DRY_RUN_PREFIX}{}", name.replace('_', "-"))
}
