//! Dry-run orchestration.
//! Produces a substituted copy of a template tree under an output directory,
//! one file at a time. A failing file is reported and skipped; the remaining
//! files are still processed.

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use log::{debug, warn};
use tempfile::NamedTempFile;

use crate::config::Configuration;
use crate::engine::{Mode, Substitutor};
use crate::error::{PlinthError, PlinthResult};
use crate::registry::Registry;
use crate::scanner::{is_text_file, read_text, Scanner};

/// What will be done with one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOperation {
    /// Copy the file verbatim.
    Copy { target: PathBuf },
    /// Write substituted content.
    Write { target: PathBuf, content: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DryRunOptions {
    pub mode: Mode,
    /// Remove the output directory before writing. Without it, files from
    /// earlier runs that are not part of this run are left in place.
    pub clean: bool,
}

#[derive(Debug)]
pub struct FileFailure {
    pub source: PathBuf,
    pub error: PlinthError,
}

#[derive(Debug)]
pub struct DryRunReport {
    pub output_dir: PathBuf,
    /// Targets written with substituted content.
    pub written: Vec<PathBuf>,
    /// Targets copied verbatim.
    pub copied: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

impl DryRunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct DryRun<'a> {
    template_root: PathBuf,
    output_dir: PathBuf,
    substitutor: Substitutor<'a>,
    options: DryRunOptions,
}

impl<'a> DryRun<'a> {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        template_root: P,
        output_dir: Q,
        registry: &'a Registry,
        config: &'a Configuration,
        options: DryRunOptions,
    ) -> Self {
        Self {
            template_root: template_root.as_ref().to_path_buf(),
            output_dir: output_dir.as_ref().to_path_buf(),
            substitutor: Substitutor::new(registry, config, options.mode),
            options,
        }
    }

    /// Processes the listed sources, given relative to the template root.
    pub fn run<I, P>(&self, sources: I) -> PlinthResult<DryRunReport>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.check_output()?;
        self.prepare_output()?;
        let mut report = DryRunReport {
            output_dir: self.output_dir.clone(),
            written: Vec::new(),
            copied: Vec::new(),
            failures: Vec::new(),
        };

        for source in sources {
            let source = source.as_ref();
            match self.process(source) {
                Ok(FileOperation::Write { target, .. }) => {
                    debug!("Wrote '{}'", target.display());
                    report.written.push(target);
                }
                Ok(FileOperation::Copy { target }) => {
                    debug!("Copied '{}'", target.display());
                    report.copied.push(target);
                }
                Err(error) => {
                    warn!("{}: {}", source.display(), error);
                    report.failures.push(FileFailure { source: source.to_path_buf(), error });
                }
            }
        }

        Ok(report)
    }

    /// Processes every file the scanner enumerates, output directory excluded.
    /// Entries the walk cannot read are reported as failures.
    pub fn run_tree(&self, scanner: &Scanner) -> PlinthResult<DryRunReport> {
        self.check_output()?;
        fs::create_dir_all(&self.output_dir)?;
        let output = canonical(&self.output_dir);
        let mut sources = Vec::new();
        let mut unreadable = Vec::new();
        for path in scanner.all_files() {
            let path = match path {
                Ok(path) => path,
                Err(error) => {
                    let source = walk_error_path(&error)
                        .unwrap_or_else(|| scanner.root().to_path_buf());
                    warn!("{}: {}", source.display(), error);
                    unreadable.push(FileFailure { source, error });
                    continue;
                }
            };
            if canonical(&path).starts_with(&output) {
                continue;
            }
            let relative = path.strip_prefix(scanner.root()).unwrap_or(&path).to_path_buf();
            sources.push(relative);
        }
        let mut report = self.run(sources)?;
        report.failures.extend(unreadable);
        Ok(report)
    }

    /// Rejects an output directory that is the template root or one of its
    /// ancestors.
    fn check_output(&self) -> PlinthResult<()> {
        let root = canonical(&self.template_root);
        let output = canonical(&self.output_dir);
        if root.starts_with(&output) {
            return Err(PlinthError::ConfigError(format!(
                "output directory '{}' must not contain the template root '{}'",
                self.output_dir.display(),
                self.template_root.display()
            )));
        }
        Ok(())
    }

    fn prepare_output(&self) -> PlinthResult<()> {
        if self.options.clean && self.output_dir.exists() {
            debug!("Removing {}", self.output_dir.display());
            fs::remove_dir_all(&self.output_dir)?;
        }
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// Plans and performs the operation for one source file.
    pub fn process(&self, source: &Path) -> PlinthResult<FileOperation> {
        let relative = self.relative_source(source)?;
        let source_path = self.template_root.join(&relative);
        if !source_path.is_file() {
            return Err(PlinthError::SourceNotFound { path: source_path });
        }
        let target = self.output_dir.join(&relative);

        let operation = self.plan(&source_path, target)?;
        let permissions = fs::metadata(&source_path)?.permissions();
        match &operation {
            FileOperation::Write { target, content } => {
                write_atomic(target, content.as_bytes(), permissions)?
            }
            FileOperation::Copy { target } => {
                write_atomic(target, &fs::read(&source_path)?, permissions)?
            }
        }
        Ok(operation)
    }

    fn plan(&self, source_path: &Path, target: PathBuf) -> PlinthResult<FileOperation> {
        if !is_text_file(source_path) {
            return Ok(FileOperation::Copy { target });
        }
        match read_text(source_path)? {
            Some(text) => {
                let content = self.substitutor.substitute_file(&text, source_path)?;
                Ok(FileOperation::Write { target, content })
            }
            None => Ok(FileOperation::Copy { target }),
        }
    }

    fn relative_source(&self, source: &Path) -> PlinthResult<PathBuf> {
        let relative = if source.is_absolute() {
            source.strip_prefix(&self.template_root).map_err(|_| {
                PlinthError::ConfigError(format!(
                    "'{}' is outside the template root '{}'",
                    source.display(),
                    self.template_root.display()
                ))
            })?
        } else {
            source
        };
        if relative.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(PlinthError::ConfigError(format!(
                "'{}' escapes the template root",
                source.display()
            )));
        }
        Ok(relative.to_path_buf())
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn walk_error_path(error: &PlinthError) -> Option<PathBuf> {
    match error {
        PlinthError::WalkError(e) => e.path().map(Path::to_path_buf),
        _ => None,
    }
}

/// Writes `contents` to a temporary file next to `target` and renames it into
/// place, so `target` is either the old file or the complete new one.
pub(crate) fn write_atomic(
    target: &Path,
    contents: &[u8],
    permissions: fs::Permissions,
) -> PlinthResult<()> {
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    fs::set_permissions(file.path(), permissions)?;
    file.persist(target).map_err(|e| PlinthError::IoError(e.error))?;
    Ok(())
}

/// Substitutes `sources` (relative to `template_root`) into `output_dir` in
/// dry-run mode.
pub fn run_dry_run<I, P>(
    sources: I,
    template_root: &Path,
    registry: &Registry,
    config: &Configuration,
    output_dir: &Path,
) -> PlinthResult<DryRunReport>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    DryRun::new(template_root, output_dir, registry, config, DryRunOptions::default())
        .run(sources)
}
