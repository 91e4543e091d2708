//! Plinth is a placeholder substitution and dry-run validation engine for
//! multi-block plugin scaffolds. It resolves `{{name}}` and
//! `{{name|transform}}` tokens from a variable registry and a configuration,
//! finds files that still contain tokens, and validates configurations
//! against declarative schemas.

/// Command-line interface module for the Plinth application
pub mod cli;

/// Handlers for each command of the `plinth` binary
pub mod commands;

/// Configuration objects and their reconciliation against a registry
pub mod config;

/// Common constants: file names, exclusion sets, text extensions
pub mod constants;

/// Writes a fully substituted copy of a template tree
pub mod dry_run;

/// Substitution of placeholder tokens in text
pub mod engine;

/// Error types and handling for the Plinth application
pub mod error;

/// Ignore patterns for template trees
/// Processes .plinthignore files to exclude specific paths
pub mod ignore;

/// Logger initialisation for the binary
pub mod logger;

/// Interactive configuration wizard
pub mod prompt;

/// Variable registry: names, defaults and validation metadata
pub mod registry;

/// Lazy discovery of files containing placeholder tokens
pub mod scanner;

/// Declarative schemas and violation collection
pub mod schema;

/// The placeholder token grammar shared by the engine and the scanner
pub mod token;

/// Named string transforms
pub mod transform;
