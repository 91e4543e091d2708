//! Command handlers behind the `plinth` binary.
//! Each handler writes its normal output to `out` and reports failure through
//! [`Status::Failed`] or an error, never by exiting the process.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::warn;
use serde::Serialize;

use crate::cli::{Args, Command, Format};
use crate::config::Configuration;
use crate::dry_run::{write_atomic, DryRun, DryRunOptions};
use crate::engine::{Mode, Substitutor};
use crate::prompt::{prompt_configuration, DialoguerPrompter};
use crate::registry::Registry;
use crate::scanner::{read_text, Scanner};
use crate::schema::{validate, validate_schema_document, Schema, ValidationReport};

/// Outcome of a command that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Success,
    /// The command ran but found problems; the message is a one-line summary.
    Failed(String),
}

/// Registry and configuration, loaded once per invocation and never mutated.
#[derive(Debug, Clone)]
pub struct Session {
    pub registry: Registry,
    pub config: Configuration,
}

impl Session {
    pub fn new(registry: Registry, config: Configuration) -> Self {
        for mismatch in config.reconcile(&registry) {
            warn!("{mismatch}");
        }
        Self { registry, config }
    }

    /// Loads the registry (explicit path, discovered file, or built-in) and
    /// the configuration (explicit path or empty).
    pub fn load(registry: Option<&Path>, config: Option<&Path>) -> Result<Self> {
        let registry = match registry {
            Some(path) => Registry::load(path)
                .with_context(|| format!("loading registry '{}'", path.display()))?,
            None => Registry::discover(".").context("loading registry")?,
        };
        let config = match config {
            Some(path) => Configuration::load(path)
                .with_context(|| format!("loading configuration '{}'", path.display()))?,
            None => Configuration::new(),
        };
        Ok(Self::new(registry, config))
    }
}

/// One line of `list-files-with-placeholders --json` output.
#[derive(Debug, Serialize)]
struct Diagnostic<'a> {
    file: &'a Path,
    line: usize,
    token: &'a str,
}

/// Runs the command in `args`.
pub fn execute(args: &Args, out: &mut dyn Write) -> Result<Status> {
    let session = Session::load(args.registry.as_deref(), args.config.as_deref())?;
    execute_with(&session, &args.command, out)
}

/// Runs `command` against an already loaded session, flushing `out` before
/// returning.
pub fn execute_with(session: &Session, command: &Command, out: &mut dyn Write) -> Result<Status> {
    let status = dispatch(session, command, out)?;
    out.flush().context("writing output")?;
    Ok(status)
}

fn dispatch(session: &Session, command: &Command, out: &mut dyn Write) -> Result<Status> {
    match command {
        Command::EmitConfig { format, interactive } => {
            emit_config(session, *format, *interactive, out)
        }
        Command::GetValue { key, default } => {
            let substitutor = Substitutor::new(&session.registry, &session.config, Mode::DryRun);
            writeln!(out, "{}", substitutor.dry_run_value(key, default.as_deref()))?;
            Ok(Status::Success)
        }
        Command::ListFilesWithPlaceholders { patterns, root, json, check } => {
            list_files(session, root, patterns, *json, *check, out)
        }
        Command::SubstituteFile { path, mode, output } => {
            substitute_file(session, path, *mode, output.as_deref(), out)
        }
        Command::RunDryRun { files, root, output_dir, mode, clean } => {
            let options = DryRunOptions { mode: *mode, clean: *clean };
            run_dry_run(session, root, files, output_dir, options, out)
        }
        Command::Validate { schema, schema_document } => {
            validate_config(session, schema.as_deref(), *schema_document, out)
        }
    }
}

fn emit_config(
    session: &Session,
    format: Format,
    interactive: bool,
    out: &mut dyn Write,
) -> Result<Status> {
    let config = if interactive {
        prompt_configuration(&DialoguerPrompter::new(), &session.registry, &session.config)?
    } else {
        session.config.clone()
    };
    let effective = config.dry_run_values(&session.registry).to_json();
    match format {
        Format::Json => writeln!(out, "{}", serde_json::to_string_pretty(&effective)?)?,
        Format::Yaml => write!(out, "{}", serde_yaml::to_string(&effective)?)?,
    }
    Ok(Status::Success)
}

fn list_files(
    session: &Session,
    root: &Path,
    patterns: &[String],
    json: bool,
    check: bool,
    out: &mut dyn Write,
) -> Result<Status> {
    let scanner = Scanner::new(root)?.include(patterns)?;
    let mut diagnostics = Vec::new();
    let mut unknown = 0;
    let mut unreadable = 0;

    for result in scanner.scan() {
        let result = match result {
            Ok(result) => result,
            Err(error) => {
                warn!("{error}");
                if !json {
                    writeln!(out, "Failed: {error}")?;
                }
                unreadable += 1;
                continue;
            }
        };
        unknown += result.unknown_tokens(&session.registry).len();
        if json {
            diagnostics.push(result);
            continue;
        }
        for m in &result.matches {
            writeln!(out, "{}:{}: {}", result.path.display(), m.line, m.token)?;
        }
    }

    if json {
        let flat: Vec<Diagnostic<'_>> = diagnostics
            .iter()
            .flat_map(|r| {
                r.matches.iter().map(move |m| Diagnostic {
                    file: &r.path,
                    line: m.line,
                    token: &m.token,
                })
            })
            .collect();
        writeln!(out, "{}", serde_json::to_string_pretty(&flat)?)?;
    }

    if unreadable > 0 {
        return Ok(Status::Failed(format!("{unreadable} file(s) could not be scanned")));
    }
    if check && unknown > 0 {
        return Ok(Status::Failed(format!(
            "{unknown} token(s) reference variables unknown to the registry"
        )));
    }
    Ok(Status::Success)
}

fn substitute_file(
    session: &Session,
    path: &Path,
    mode: Mode,
    output: Option<&Path>,
    out: &mut dyn Write,
) -> Result<Status> {
    if !path.is_file() {
        return Err(crate::error::PlinthError::SourceNotFound { path: path.to_path_buf() }.into());
    }
    let text = read_text(path)?
        .with_context(|| format!("'{}' is not a text file", path.display()))?;
    let substitutor = Substitutor::new(&session.registry, &session.config, mode);
    let content = substitutor.substitute_file(&text, path)?;

    match output {
        Some(target) => {
            let permissions = std::fs::metadata(path)?.permissions();
            write_atomic(target, content.as_bytes(), permissions)
                .with_context(|| format!("writing '{}'", target.display()))?;
        }
        None => write!(out, "{content}")?,
    }
    Ok(Status::Success)
}

fn run_dry_run(
    session: &Session,
    root: &Path,
    files: &[PathBuf],
    output_dir: &Path,
    options: DryRunOptions,
    out: &mut dyn Write,
) -> Result<Status> {
    let dry_run = DryRun::new(root, output_dir, &session.registry, &session.config, options);
    let report = if files.is_empty() {
        dry_run.run_tree(&Scanner::new(root)?)?
    } else {
        dry_run.run(files)?
    };

    for target in &report.written {
        writeln!(out, "Writing file: '{}'", target.display())?;
    }
    for target in &report.copied {
        writeln!(out, "Copying file: '{}'", target.display())?;
    }
    for failure in &report.failures {
        writeln!(out, "Failed: '{}': {}", failure.source.display(), failure.error)?;
    }

    if !report.is_success() {
        return Ok(Status::Failed(format!(
            "{} of {} file(s) failed",
            report.failures.len(),
            report.failures.len() + report.written.len() + report.copied.len()
        )));
    }
    writeln!(out, "Dry run completed successfully in {}.", report.output_dir.display())?;
    Ok(Status::Success)
}

fn validate_config(
    session: &Session,
    schema_path: Option<&Path>,
    schema_document: bool,
    out: &mut dyn Write,
) -> Result<Status> {
    let report: ValidationReport = match (schema_path, schema_document) {
        (Some(path), true) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading schema '{}'", path.display()))?;
            let document: serde_json::Value = match serde_json::from_str(&content) {
                Ok(value) => value,
                Err(_) => serde_yaml::from_str(&content)?,
            };
            validate_schema_document(&document)
        }
        (Some(path), false) => {
            let schema = Schema::load(path)?;
            validate(&session.config.with_defaults(&session.registry).to_json(), &schema)
        }
        (None, _) => validate(
            &session.config.with_defaults(&session.registry).to_json(),
            &session.registry.to_schema(),
        ),
    };

    for violation in &report.errors {
        writeln!(out, "{violation}")?;
    }
    if report.valid {
        writeln!(out, "valid")?;
        Ok(Status::Success)
    } else {
        Ok(Status::Failed(format!("{} schema violation(s)", report.errors.len())))
    }
}
