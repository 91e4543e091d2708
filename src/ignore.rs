//! File and directory ignore pattern handling for template trees.
//! Reads the `.plinthignore` file at the root of a tree, similar to
//! `.gitignore`, and merges it with built-in patterns.

use crate::constants::{DEFAULT_IGNORE_PATTERNS, IGNORE_FILE};
use crate::error::PlinthResult;
use globset::{Glob, GlobSet, GlobSetBuilder};
use log::debug;
use std::{fs::read_to_string, path::Path};

/// Builds the ignore set for the tree rooted at `root`.
///
/// # Notes
/// - A missing ignore file yields only the built-in patterns
/// - Blank lines and lines starting with `#` are skipped
/// - A trailing `/` ignores the directory and everything below it
///
/// # Example
/// ```ignore
/// # Contents of .plinthignore:
/// *.map
/// fixtures/
/// ```
pub fn parse_ignore_file<P: AsRef<Path>>(root: P) -> PlinthResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in DEFAULT_IGNORE_PATTERNS {
        builder.add(Glob::new(pattern)?);
    }

    let ignore_path = root.as_ref().join(IGNORE_FILE);
    if let Ok(contents) = read_to_string(&ignore_path) {
        for line in contents.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.strip_suffix('/') {
                Some(dir) => {
                    builder.add(Glob::new(dir)?);
                    builder.add(Glob::new(&format!("{dir}/**"))?);
                }
                None => {
                    builder.add(Glob::new(line)?);
                }
            }
        }
    } else {
        debug!("{} does not exist", ignore_path.display())
    }

    Ok(builder.build()?)
}
