//! Common constants used throughout Plinth.

/// Registry documents looked up in the working directory, in order.
pub const REGISTRY_FILES: [&str; 3] = ["plinth.json", "plinth.yml", "plinth.yaml"];

/// Plinth's ignore file name, read from the root of a template tree.
pub const IGNORE_FILE: &str = ".plinthignore";

/// Prefix of every stand-in value produced in dry-run mode.
pub const DRY_RUN_PREFIX: &str = "dry-run-";

/// Default destination of `run-dry-run`.
pub const DEFAULT_OUTPUT_DIR: &str = "dry-run-output";

/// Directories never descended into while scanning a template tree:
/// build artifacts, dependency caches, version control metadata and
/// generated output.
pub const EXCLUDED_DIRS: [&str; 9] = [
    "node_modules",
    "vendor",
    "build",
    "dist",
    "target",
    ".git",
    ".svn",
    ".hg",
    DEFAULT_OUTPUT_DIR,
];

/// Extensions treated as text and therefore scanned for placeholders.
pub const TEXT_EXTENSIONS: [&str; 26] = [
    "php", "js", "jsx", "mjs", "cjs", "ts", "tsx", "json", "css", "scss", "sass", "html",
    "htm", "md", "txt", "xml", "svg", "yml", "yaml", "toml", "ini", "pot", "po", "sh",
    "dist", "neon",
];

/// Extension-less file names treated as text.
pub const TEXT_FILE_NAMES: [&str; 8] = [
    "LICENSE",
    "README",
    "CHANGELOG",
    "Makefile",
    ".gitignore",
    ".editorconfig",
    ".distignore",
    ".nvmrc",
];

/// Ignore patterns applied even when no ignore file exists.
pub const DEFAULT_IGNORE_PATTERNS: [&str; 3] = ["**/.DS_Store", "**/Thumbs.db", "**/*.swp"];
