//! Interactive configuration wizard.
//! Asks for a value for every registry variable, pre-filled with the value a
//! dry run would use.

use dialoguer::{Confirm, Input, Password, Select};
use indexmap::IndexMap;
use serde_json::Value;

use crate::config::Configuration;
use crate::engine::{Mode, Substitutor};
use crate::error::{PlinthError, PlinthResult};
use crate::registry::{Registry, VariableDefinition, VariableType};

/// Source of answers for the wizard.
pub trait Prompter {
    /// Asks for `variable`, offering `default` as the pre-filled answer.
    fn ask(&self, variable: &VariableDefinition, default: &str) -> PlinthResult<Value>;
}

/// Terminal prompts backed by `dialoguer`.
#[derive(Debug, Default)]
pub struct DialoguerPrompter;

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self
    }
}

fn prompt_error(e: dialoguer::Error) -> PlinthError {
    PlinthError::ConfigError(e.to_string())
}

impl Prompter for DialoguerPrompter {
    fn ask(&self, variable: &VariableDefinition, default: &str) -> PlinthResult<Value> {
        let prompt = if variable.description.is_empty() {
            variable.name.clone()
        } else {
            format!("{} ({})", variable.description, variable.name)
        };

        match variable.value_type {
            VariableType::Boolean => {
                let answer = Confirm::new()
                    .with_prompt(prompt)
                    .default(default == "true")
                    .interact()
                    .map_err(prompt_error)?;
                Ok(Value::Bool(answer))
            }
            VariableType::Integer => {
                let mut input = Input::<i64>::new().with_prompt(prompt);
                if let Ok(n) = default.parse::<i64>() {
                    input = input.default(n);
                }
                Ok(Value::from(input.interact_text().map_err(prompt_error)?))
            }
            VariableType::String if !variable.choices.is_empty() => {
                let selected = variable.choices.iter().position(|c| c == default).unwrap_or(0);
                let index = Select::new()
                    .with_prompt(prompt)
                    .default(selected)
                    .items(&variable.choices)
                    .interact()
                    .map_err(prompt_error)?;
                Ok(Value::String(variable.choices[index].clone()))
            }
            VariableType::String if variable.sensitive => {
                let answer = Password::new()
                    .with_prompt(prompt)
                    .allow_empty_password(true)
                    .interact()
                    .map_err(prompt_error)?;
                Ok(Value::String(answer))
            }
            VariableType::String => {
                let answer: String = Input::new()
                    .with_prompt(prompt)
                    .default(default.to_string())
                    .interact_text()
                    .map_err(prompt_error)?;
                Ok(Value::String(answer))
            }
        }
    }
}

/// Builds a configuration by asking for every registry variable. Configured
/// values become the pre-filled answers; keys unknown to the registry are
/// carried over unchanged.
pub fn prompt_configuration(
    prompter: &dyn Prompter,
    registry: &Registry,
    config: &Configuration,
) -> PlinthResult<Configuration> {
    let current = Substitutor::new(registry, config, Mode::DryRun);
    let mut answers = IndexMap::new();

    for variable in registry.definitions() {
        let default = if variable.sensitive {
            config.get(&variable.name).unwrap_or_default()
        } else {
            current.dry_run_value(&variable.name, None)
        };
        answers.insert(variable.name.clone(), prompter.ask(variable, &default)?);
    }
    for (name, value) in config.iter() {
        answers.entry(name.to_string()).or_insert_with(|| value.clone());
    }

    Configuration::from_map(answers)
}
