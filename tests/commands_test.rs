use std::fs;

use plinth::cli::{Command, Format};
use plinth::commands::{execute_with, Session, Status};
use plinth::config::Configuration;
use plinth::engine::Mode;
use plinth::registry::Registry;
use serde_json::Value;
use tempfile::TempDir;

fn session(config: &str) -> Session {
    Session::new(Registry::builtin().unwrap(), Configuration::parse(config).unwrap())
}

fn run(session: &Session, command: Command) -> (Status, String) {
    let mut out = Vec::new();
    let status = execute_with(session, &command, &mut out).unwrap();
    (status, String::from_utf8(out).unwrap())
}

#[test]
fn test_get_value() {
    let session = session(r#"{"slug": "acme-blocks"}"#);

    let get = |key: &str, default: Option<&str>| Command::GetValue {
        key: key.to_string(),
        default: default.map(str::to_string),
    };

    assert_eq!(run(&session, get("slug", None)).1, "acme-blocks\n");
    assert_eq!(run(&session, get("slug_snake", None)).1, "acme_blocks\n");
    assert_eq!(run(&session, get("namespace", None)).1, "example\n");
    assert_eq!(run(&session, get("version", Some("0.1.0"))).1, "0.1.0\n");
    assert_eq!(run(&session, get("version", None)).1, "dry-run-version\n");
}

#[test]
fn test_emit_config() {
    let session = session(r#"{"version": "1.2.3"}"#);
    let (status, output) = run(&session, Command::EmitConfig { format: Format::Json, interactive: false });

    assert_eq!(status, Status::Success);
    let emitted: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(emitted["version"], "1.2.3");
    assert_eq!(emitted["slug"], "example-plugin");
    assert_eq!(emitted["block_count"], 3);
    assert_eq!(emitted["api_key"], "dry-run-api-key");
}

#[test]
fn test_list_files_check() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("plugin.php"), "<?php\n// {{name}}\n// {{unknown_thing}}\n").unwrap();
    let session = session("");

    let list = |check: bool| Command::ListFilesWithPlaceholders {
        patterns: Vec::new(),
        root: dir.path().to_path_buf(),
        json: false,
        check,
    };

    let (status, output) = run(&session, list(false));
    assert_eq!(status, Status::Success);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("plugin.php:2: {{name}}"));
    assert!(lines[1].ends_with("plugin.php:3: {{unknown_thing}}"));

    let (status, _) = run(&session, list(true));
    assert!(matches!(status, Status::Failed(_)));
}

#[test]
fn test_list_files_json() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("readme.txt"), "{{slug|upper}}\n").unwrap();

    let (_, output) = run(
        &session(""),
        Command::ListFilesWithPlaceholders {
            patterns: vec!["*.txt".to_string()],
            root: dir.path().to_path_buf(),
            json: true,
            check: true,
        },
    );

    let diagnostics: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(diagnostics[0]["line"], 1);
    assert_eq!(diagnostics[0]["token"], "{{slug|upper}}");
}

#[test]
fn test_validate() {
    let (status, output) = run(
        &session(r#"{"version": "1.0.0"}"#),
        Command::Validate { schema: None, schema_document: false },
    );
    assert_eq!(status, Status::Success);
    assert_eq!(output, "valid\n");

    let (status, output) = run(
        &session(r#"{"version": "one", "slug": "Bad Slug"}"#),
        Command::Validate { schema: None, schema_document: false },
    );
    assert_eq!(status, Status::Failed("2 schema violation(s)".to_string()));
    assert!(output.contains("/slug"));
    assert!(output.contains("/version"));
}

#[test]
fn test_substitute_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plugin.php");
    fs::write(&path, "Plugin Name: {{name}}\nVersion: {{version}}\n").unwrap();

    let (status, output) = run(
        &session(""),
        Command::SubstituteFile { path: path.clone(), mode: Mode::DryRun, output: None },
    );
    assert_eq!(status, Status::Success);
    assert_eq!(output, "Plugin Name: Example Plugin\nVersion: dry-run-version\n");

    let mut out = Vec::new();
    let strict = Command::SubstituteFile { path, mode: Mode::Strict, output: None };
    assert!(execute_with(&session(""), &strict, &mut out).is_err());

    let missing = Command::SubstituteFile {
        path: dir.path().join("missing.php"),
        mode: Mode::DryRun,
        output: None,
    };
    assert!(execute_with(&session(""), &missing, &mut out).is_err());
}

#[test]
fn test_run_dry_run_reports_failures() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("plugin.php"), "{{name}}\n").unwrap();
    let output_dir = dir.path().join("out");

    let (status, output) = run(
        &session(""),
        Command::RunDryRun {
            files: vec!["plugin.php".into(), "missing.php".into()],
            root: dir.path().to_path_buf(),
            output_dir: output_dir.clone(),
            mode: Mode::DryRun,
            clean: false,
        },
    );

    assert_eq!(status, Status::Failed("1 of 2 file(s) failed".to_string()));
    assert!(output.contains("Writing file:"));
    assert!(output.contains("Failed: 'missing.php'"));
    assert_eq!(fs::read_to_string(output_dir.join("plugin.php")).unwrap(), "Example Plugin\n");
}

#[cfg(unix)]
#[test]
fn test_list_files_continues_past_unreadable_entries() {
    let dir = TempDir::new().unwrap();
    std::os::unix::fs::symlink(dir.path().join("gone.php"), dir.path().join("a.php")).unwrap();
    fs::write(dir.path().join("b.php"), "{{slug}}\n").unwrap();

    let (status, output) = run(
        &session(""),
        Command::ListFilesWithPlaceholders {
            patterns: Vec::new(),
            root: dir.path().to_path_buf(),
            json: false,
            check: false,
        },
    );

    assert_eq!(status, Status::Failed("1 file(s) could not be scanned".to_string()));
    assert!(output.lines().next().unwrap().starts_with("Failed: "));
    assert!(output.contains("b.php:1: {{slug}}"));
}

#[test]
fn test_substitute_file_writes_output_in_place() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plugin.php");
    fs::write(&path, "{{slug|snake}}\n").unwrap();
    let target = dir.path().join("out/nested/plugin.php");

    let (status, output) = run(
        &session(""),
        Command::SubstituteFile { path, mode: Mode::DryRun, output: Some(target.clone()) },
    );

    assert_eq!(status, Status::Success);
    assert!(output.is_empty());
    assert_eq!(fs::read_to_string(&target).unwrap(), "example_plugin\n");
    let entries: Vec<_> = fs::read_dir(target.parent().unwrap()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

/// Accepts writes but fails to flush.
struct FailingFlush(Vec<u8>);

impl std::io::Write for FailingFlush {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
    }
}

#[test]
fn test_flush_failure_is_an_error() {
    let mut out = FailingFlush(Vec::new());
    let command = Command::GetValue { key: "slug".to_string(), default: None };

    assert!(execute_with(&session(""), &command, &mut out).is_err());
    assert_eq!(out.0, b"example-plugin\n");
}
