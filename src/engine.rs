//! Substitution engine.
//! Replaces every placeholder token in a text in one left-to-right pass.

use std::fmt;
use std::path::Path;

use clap::ValueEnum;
use log::debug;

use crate::config::Configuration;
use crate::error::{Location, PlinthError, PlinthResult};
use crate::registry::{stand_in_value, Registry};
use crate::token::{find_tokens, Token};
use crate::transform::Transform;

/// What to do with a token whose variable has no value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Substitute a `dry-run-<name>` stand-in.
    #[default]
    DryRun,
    /// Fail with [`PlinthError::UnknownVariable`].
    Strict,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::DryRun => f.write_str("dry-run"),
            Mode::Strict => f.write_str("strict"),
        }
    }
}

/// Resolves tokens against a configuration, then registry defaults.
#[derive(Debug, Clone, Copy)]
pub struct Substitutor<'a> {
    registry: &'a Registry,
    config: &'a Configuration,
    mode: Mode,
}

impl<'a> Substitutor<'a> {
    pub fn new(registry: &'a Registry, config: &'a Configuration, mode: Mode) -> Self {
        Self { registry, config, mode }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The value of `name`: configured value, then the derived value of a
    /// configured or defaulted base, then the registry default.
    pub fn resolve(&self, name: &str) -> Option<String> {
        if let Some(value) = self.config.get(name) {
            return Some(value);
        }
        if let Some((base, transform)) = self.registry.derivation(name) {
            return self.resolve(base).map(|value| transform.apply(&value));
        }
        self.registry.get(name)
    }

    /// [`resolve`](Self::resolve), then `fallback`, then the stand-in.
    pub fn dry_run_value(&self, name: &str, fallback: Option<&str>) -> String {
        self.resolve(name)
            .or_else(|| fallback.map(str::to_string))
            .unwrap_or_else(|| stand_in_value(name))
    }

    /// Substitutes every token in `text`.
    ///
    /// On success the output contains no token. Any failure rejects the
    /// whole text; nothing partial is returned.
    pub fn substitute(&self, text: &str) -> PlinthResult<String> {
        self.substitute_in(text, None)
    }

    /// Like [`substitute`](Self::substitute), with errors located in `path`.
    pub fn substitute_file(&self, text: &str, path: &Path) -> PlinthResult<String> {
        self.substitute_in(text, Some(path))
    }

    fn substitute_in(&self, text: &str, path: Option<&Path>) -> PlinthResult<String> {
        let mut output = String::with_capacity(text.len());
        let mut last = 0;
        let mut replaced = 0;

        for token in find_tokens(text) {
            output.push_str(&text[last..token.span.start]);
            output.push_str(&self.replacement(&token, path)?);
            last = token.span.end;
            replaced += 1;
        }
        output.push_str(&text[last..]);

        if let Some(left) = find_tokens(&output).next() {
            return Err(PlinthError::TokenReintroduced {
                token: left.text.to_string(),
                location: locate(path, left.line),
            });
        }

        debug!("Replaced {replaced} token(s) in {} mode", self.mode);
        Ok(output)
    }

    fn replacement(&self, token: &Token<'_>, path: Option<&Path>) -> PlinthResult<String> {
        let transform = token
            .transform
            .map(|raw| {
                raw.parse::<Transform>().map_err(|_| PlinthError::UnknownTransform {
                    transform: raw.to_string(),
                    token: token.text.to_string(),
                    location: locate(path, token.line),
                })
            })
            .transpose()?;

        let value = match (self.resolve(token.name), self.mode) {
            (Some(value), _) => value,
            (None, Mode::DryRun) => {
                // The prefix is added after the transform so its hyphens survive.
                let name = transform
                    .map_or_else(|| token.name.to_string(), |t| t.apply(token.name));
                return Ok(stand_in_value(&name));
            }
            (None, Mode::Strict) => {
                return Err(PlinthError::UnknownVariable {
                    name: token.name.to_string(),
                    token: token.text.to_string(),
                    location: locate(path, token.line),
                })
            }
        };

        Ok(match transform {
            Some(transform) => transform.apply(&value),
            None => value,
        })
    }
}

fn locate(path: Option<&Path>, line: usize) -> Location {
    Location { path: path.map(Path::to_path_buf), line }
}

/// One-shot substitution of `text`.
pub fn substitute(
    text: &str,
    registry: &Registry,
    config: &Configuration,
    mode: Mode,
) -> PlinthResult<String> {
    Substitutor::new(registry, config, mode).substitute(text)
}
