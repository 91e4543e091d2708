//! Error handling for Plinth.
//! Defines the error taxonomy and the result alias used throughout the crate.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::schema::Violation;

/// Where a placeholder token was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// Source file, when the text came from one.
    pub path: Option<PathBuf>,
    /// 1-based line number.
    pub line: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}:{}", path.display(), self.line),
            None => write!(f, "line {}", self.line),
        }
    }
}

/// Custom error types for Plinth operations.
#[derive(Error, Debug)]
pub enum PlinthError {
    /// A token references a variable that has neither a configured value nor a
    /// registry default. Only raised in strict mode.
    #[error("Unknown variable '{name}' in token '{token}' at {location}.")]
    UnknownVariable { name: String, token: String, location: Location },

    /// A token requests a transform that does not exist.
    #[error("Unknown transform '{transform}' in token '{token}' at {location}.")]
    UnknownTransform { transform: String, token: String, location: Location },

    /// A resolved value would leave a placeholder token in the output.
    #[error("Substituted output still contains token '{token}' at {location}.")]
    TokenReintroduced { token: String, location: Location },

    /// One or more constraint failures, always the complete list.
    #[error("{} schema violation(s): {}", .0.len(), summarize(.0))]
    SchemaViolation(Vec<Violation>),

    /// A requested source file or directory does not exist.
    #[error("Source not found: '{path}'.")]
    SourceNotFound { path: PathBuf },

    /// A registry variable collides with a name derived by a transform.
    #[error("Variable '{name}' collides with the '{transform}' variant of '{base}'.")]
    ReservedName { name: String, base: String, transform: String },

    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    #[error("Configuration error: {0}.")]
    ConfigError(String),

    #[error("JSON error: {0}.")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}.")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Directory walk error: {0}.")]
    WalkError(#[from] walkdir::Error),

    #[error("Ignore pattern error: {0}.")]
    GlobError(#[from] globset::Error),
}

fn summarize(violations: &[Violation]) -> String {
    violations.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("; ")
}

/// Convenience type alias for Results with [`PlinthError`] as the error type.
pub type PlinthResult<T> = std::result::Result<T, PlinthError>;

/// Default error handler that prints the error and exits the program.
///
/// Prints a one-line message to stderr and exits with status code 1.
pub fn default_error_handler(err: anyhow::Error) -> ! {
    eprintln!("error: {err:#}");
    std::process::exit(1);
}
