//! Configuration objects.
//! A flat, immutable mapping from variable name to concrete value, supplied
//! programmatically or loaded from a JSON or YAML file.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use log::debug;
use serde_json::Value;

use crate::error::{PlinthError, PlinthResult};
use crate::registry::Registry;
use crate::token::is_valid_name;

/// Renders a scalar JSON value as substitution text. `null` and compound
/// values have no text form.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    values: IndexMap<String, Value>,
}

/// A difference between a configuration and the registry it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// Configured but not declared in the registry.
    Unknown { name: String },
    /// Required by the registry, without a default, and not configured.
    Missing { name: String },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Unknown { name } => write!(f, "'{name}' is not declared in the registry"),
            Mismatch::Missing { name } => write!(f, "'{name}' is required but has no value"),
        }
    }
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration, rejecting invalid names and compound values.
    pub fn from_map(values: IndexMap<String, Value>) -> PlinthResult<Self> {
        for (name, value) in &values {
            if !is_valid_name(name) {
                return Err(PlinthError::ConfigError(format!("invalid variable name '{name}'")));
            }
            if matches!(value, Value::Array(_) | Value::Object(_)) {
                return Err(PlinthError::ConfigError(format!("value of '{name}' must be a scalar")));
            }
        }
        Ok(Self { values })
    }

    /// Builds a configuration from a JSON object; `null` is an empty one.
    pub fn from_value(value: Value) -> PlinthResult<Self> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Object(map) => Self::from_map(map.into_iter().collect()),
            other => Err(PlinthError::ConfigError(format!(
                "configuration must be an object, got {other}"
            ))),
        }
    }

    /// Parses configuration content, trying JSON first and YAML second.
    pub fn parse(content: &str) -> PlinthResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::new());
        }
        let value: Value = match serde_json::from_str(content) {
            Ok(value) => value,
            Err(_) => serde_yaml::from_str(content)?,
        };
        Self::from_value(value)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> PlinthResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PlinthError::SourceNotFound { path: path.to_path_buf() });
        }
        debug!("Loading configuration from {}", path.display());
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Substitution text for `name`. `null` counts as unset.
    pub fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).and_then(scalar_to_string)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.values.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    /// Reports unknown keys and required variables left without a value.
    pub fn reconcile(&self, registry: &Registry) -> Vec<Mismatch> {
        let unknown = self
            .values
            .keys()
            .filter(|name| !registry.contains(name))
            .map(|name| Mismatch::Unknown { name: name.clone() });

        let missing = registry
            .definitions()
            .filter(|definition| {
                definition.required
                    && definition.default_text().is_none()
                    && self.get(&definition.name).is_none()
            })
            .map(|definition| Mismatch::Missing { name: definition.name.clone() });

        unknown.chain(missing).collect()
    }

    /// This configuration with registry defaults filled in for unset
    /// variables, keeping their declared types. Variables without a default
    /// stay absent.
    pub fn with_defaults(&self, registry: &Registry) -> Configuration {
        let mut values = IndexMap::new();
        for definition in registry.definitions() {
            let value = match self.values.get(&definition.name) {
                Some(value) if !value.is_null() => Some(value.clone()),
                _ => definition.default.clone().filter(|_| definition.default_text().is_some()),
            };
            if let Some(value) = value {
                values.insert(definition.name.clone(), value);
            }
        }
        for (name, value) in &self.values {
            values.entry(name.clone()).or_insert_with(|| value.clone());
        }
        Configuration { values }
    }

    /// The full set of values a dry run would use for declared variables:
    /// configured values, then registry defaults, then stand-ins.
    pub fn dry_run_values(&self, registry: &Registry) -> Configuration {
        let configured = self.with_defaults(registry).values;
        let mut values = IndexMap::new();
        for definition in registry.definitions() {
            let value = configured
                .get(&definition.name)
                .filter(|value| scalar_to_string(value).is_some())
                .cloned()
                .unwrap_or_else(|| Value::String(registry.dry_run_value(&definition.name, None)));
            values.insert(definition.name.clone(), value);
        }
        for (name, value) in configured {
            values.entry(name).or_insert(value);
        }
        Configuration { values }
    }
}
