//! File-tree scanner.
//! Walks a template tree and reports, file by file, every placeholder token
//! still present. Results are produced lazily so callers can stop early.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use log::debug;
use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::constants::{EXCLUDED_DIRS, TEXT_EXTENSIONS, TEXT_FILE_NAMES};
use crate::error::{PlinthError, PlinthResult};
use crate::ignore::parse_ignore_file;
use crate::registry::Registry;
use crate::token::find_tokens;

/// A token found by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenMatch {
    pub line: usize,
    pub token: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
}

/// All tokens of one file, in ascending line order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub path: PathBuf,
    pub matches: Vec<TokenMatch>,
}

impl ScanResult {
    /// Matches whose variable the registry does not know.
    pub fn unknown_tokens<'s>(&'s self, registry: &Registry) -> Vec<&'s TokenMatch> {
        self.matches.iter().filter(|m| !registry.contains(&m.name)).collect()
    }
}

/// Every token in `text`, using the same grammar as the substitution engine.
pub fn scan_text(text: &str) -> Vec<TokenMatch> {
    find_tokens(text)
        .map(|token| TokenMatch {
            line: token.line,
            token: token.text.to_string(),
            name: token.name.to_string(),
            transform: token.transform.map(str::to_string),
        })
        .collect()
}

/// Whether `path` looks like a text file, judged by extension or name.
pub fn is_text_file(path: &Path) -> bool {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        if TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
            return true;
        }
    }
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| TEXT_FILE_NAMES.contains(&name))
}

/// Reads `path` as UTF-8, or `None` when the bytes are not text.
pub fn read_text(path: &Path) -> PlinthResult<Option<String>> {
    let bytes = fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(Some(text)),
        Err(_) => {
            debug!("Skipping binary file {}", path.display());
            Ok(None)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
    include: Option<GlobSet>,
    exclude_dirs: Vec<String>,
    ignore: GlobSet,
}

impl Scanner {
    /// A scanner over `root` with the default directory exclusions and the
    /// root's ignore file.
    pub fn new<P: AsRef<Path>>(root: P) -> PlinthResult<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(PlinthError::SourceNotFound { path: root.to_path_buf() });
        }
        Ok(Self {
            root: root.to_path_buf(),
            include: None,
            exclude_dirs: EXCLUDED_DIRS.iter().map(|d| d.to_string()).collect(),
            ignore: parse_ignore_file(root)?,
        })
    }

    /// Restricts results to paths, relative to the root, matching any of
    /// `patterns`. No patterns means no restriction.
    pub fn include<I, S>(mut self, patterns: I) -> PlinthResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut any = false;
        for pattern in patterns {
            builder.add(Glob::new(pattern.as_ref())?);
            any = true;
        }
        self.include = if any { Some(builder.build()?) } else { None };
        Ok(self)
    }

    /// Replaces the set of directory names that are never descended into.
    pub fn exclude_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn keep_entry(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }
        let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
        if self.ignore.is_match(relative) {
            debug!("Skipping {} from ignore patterns", relative.display());
            return false;
        }
        if entry.file_type().is_dir() {
            let name = entry.file_name().to_string_lossy();
            return !self.exclude_dirs.iter().any(|d| *d == name);
        }
        true
    }

    fn included(&self, path: &Path) -> bool {
        match &self.include {
            Some(include) => {
                include.is_match(path.strip_prefix(&self.root).unwrap_or(path))
            }
            None => true,
        }
    }

    /// Every regular file in the tree that passes the exclusions, ignore
    /// patterns and include patterns, sorted by name within each directory.
    /// Symlinks are followed; a dangling link or a link loop is an error.
    pub fn all_files(&self) -> impl Iterator<Item = PlinthResult<PathBuf>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| self.keep_entry(entry))
            .filter_map(move |entry| match entry {
                Err(e) => Some(Err(PlinthError::from(e))),
                Ok(entry) if entry.file_type().is_file() && self.included(entry.path()) => {
                    Some(Ok(entry.into_path()))
                }
                Ok(_) => None,
            })
    }

    /// Like [`all_files`](Self::all_files), restricted to text files.
    pub fn files(&self) -> impl Iterator<Item = PlinthResult<PathBuf>> + '_ {
        self.all_files().filter(|res| match res {
            Ok(path) => is_text_file(path),
            Err(_) => true,
        })
    }

    /// Lazily yields one result per text file that contains tokens.
    pub fn scan(&self) -> impl Iterator<Item = PlinthResult<ScanResult>> + '_ {
        self.files().filter_map(|res| {
            let path = match res {
                Ok(path) => path,
                Err(e) => return Some(Err(e)),
            };
            match read_text(&path) {
                Ok(Some(text)) => {
                    let matches = scan_text(&text);
                    (!matches.is_empty()).then_some(Ok(ScanResult { path, matches }))
                }
                Ok(None) => None,
                Err(e) => Some(Err(e)),
            }
        })
    }
}

/// Scans `root` with the given include patterns and excluded directory names.
pub fn scan<P, I, S>(
    root: P,
    include_patterns: I,
    exclude_dirs: &[&str],
) -> PlinthResult<Vec<ScanResult>>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let scanner = Scanner::new(root)?
        .include(include_patterns)?
        .exclude_dirs(exclude_dirs.iter().copied());
    scanner.scan().collect()
}
