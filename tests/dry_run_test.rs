use plinth::config::Configuration;
use plinth::dry_run::{run_dry_run, DryRun, DryRunOptions, FileOperation};
use plinth::engine::Mode;
use plinth::error::PlinthError;
use plinth::registry::Registry;
use plinth::scanner::Scanner;
use plinth::token::contains_token;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const LOGO: &[u8] = b"\x89PNG\r\n\x1a\n{{slug}}";

fn write(root: &Path, relative: &str, content: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn template() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "plugin.php", b"<?php\n/**\n * Plugin Name: {{name}}\n * Version: {{version}}\n */\n");
    write(root, "src/block.json", br#"{"name": "{{namespace}}/{{slug}}", "textdomain": "{{text_domain}}"}"#);
    write(root, "assets/logo.png", LOGO);
    temp_dir
}

#[test_log::test]
fn test_mirrors_tree_with_substituted_content() {
    let template = template();
    let output = TempDir::new().unwrap();
    let expected = TempDir::new().unwrap();
    write(
        expected.path(),
        "plugin.php",
        b"<?php\n/**\n * Plugin Name: Example Plugin\n * Version: dry-run-version\n */\n",
    );
    write(
        expected.path(),
        "src/block.json",
        br#"{"name": "example/example-plugin", "textdomain": "example-plugin"}"#,
    );
    write(expected.path(), "assets/logo.png", LOGO);

    let registry = Registry::builtin().unwrap();
    let config = Configuration::new();
    let dry_run =
        DryRun::new(template.path(), output.path(), &registry, &config, DryRunOptions::default());
    let report = dry_run.run_tree(&Scanner::new(template.path()).unwrap()).unwrap();

    assert!(report.is_success());
    assert_eq!(report.written.len(), 2);
    assert_eq!(report.copied.len(), 1);
    assert!(!dir_diff::is_different(output.path(), expected.path()).unwrap());
}

#[test]
fn test_running_twice_is_deterministic() {
    let template = template();
    let output = TempDir::new().unwrap();
    let registry = Registry::builtin().unwrap();
    let config = Configuration::from_value(json!({"slug": "my-blocks"})).unwrap();

    let sources = ["plugin.php", "src/block.json"];
    run_dry_run(sources, template.path(), &registry, &config, output.path()).unwrap();
    let first = fs::read_to_string(output.path().join("src/block.json")).unwrap();
    run_dry_run(sources, template.path(), &registry, &config, output.path()).unwrap();
    let second = fs::read_to_string(output.path().join("src/block.json")).unwrap();

    assert_eq!(first, second);
    assert!(first.contains("example/my-blocks"));
    let entries: Vec<_> = fs::read_dir(output.path()).unwrap().collect();
    assert_eq!(entries.len(), 2);
}

#[test]
fn test_stale_files_are_kept_unless_clean() {
    let template = template();
    let output = TempDir::new().unwrap();
    write(output.path(), "stale.txt", b"from an earlier run");
    let registry = Registry::builtin().unwrap();
    let config = Configuration::new();

    run_dry_run(["plugin.php"], template.path(), &registry, &config, output.path()).unwrap();
    assert!(output.path().join("stale.txt").exists());

    let options = DryRunOptions { mode: Mode::DryRun, clean: true };
    DryRun::new(template.path(), output.path(), &registry, &config, options)
        .run(["plugin.php"])
        .unwrap();
    assert!(!output.path().join("stale.txt").exists());
    assert!(output.path().join("plugin.php").exists());
}

#[test]
fn test_missing_source_fails_but_others_continue() {
    let template = template();
    let output = TempDir::new().unwrap();
    let registry = Registry::builtin().unwrap();
    let config = Configuration::new();

    let report = run_dry_run(
        ["missing.php", "plugin.php"],
        template.path(),
        &registry,
        &config,
        output.path(),
    )
    .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0].error, PlinthError::SourceNotFound { .. }));
    assert_eq!(report.written, [output.path().join("plugin.php")]);
    let written = fs::read_to_string(output.path().join("plugin.php")).unwrap();
    assert!(!contains_token(&written));
}

#[test]
fn test_strict_mode_emits_no_partial_file() {
    let template = template();
    write(template.path(), "theme.css", b"/* {{name}} */\n/* {{theme_name}} */\n");
    let output = TempDir::new().unwrap();
    let registry = Registry::builtin().unwrap();
    let config = Configuration::from_value(json!({"version": "1.0.0"})).unwrap();
    let options = DryRunOptions { mode: Mode::Strict, clean: false };

    let report = DryRun::new(template.path(), output.path(), &registry, &config, options)
        .run(["theme.css", "plugin.php"])
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    match &report.failures[0].error {
        PlinthError::UnknownVariable { name, location, .. } => {
            assert_eq!(name, "theme_name");
            assert_eq!(location.line, 2);
        }
        other => panic!("Expected UnknownVariable, got {other:?}"),
    }
    assert!(!output.path().join("theme.css").exists());
    assert!(output.path().join("plugin.php").exists());
}

#[test]
fn test_sources_outside_the_root_are_rejected() {
    let template = template();
    let output = TempDir::new().unwrap();
    let registry = Registry::builtin().unwrap();
    let config = Configuration::new();
    let dry_run =
        DryRun::new(template.path(), output.path(), &registry, &config, DryRunOptions::default());

    assert!(matches!(dry_run.process(Path::new("../escape.php")), Err(PlinthError::ConfigError(_))));
    assert!(matches!(
        dry_run.process(Path::new("/elsewhere/plugin.php")),
        Err(PlinthError::ConfigError(_))
    ));
}

#[test]
fn test_process_reports_the_operation() {
    let template = template();
    let output = TempDir::new().unwrap();
    let registry = Registry::builtin().unwrap();
    let config = Configuration::new();
    let dry_run =
        DryRun::new(template.path(), output.path(), &registry, &config, DryRunOptions::default());

    assert_eq!(
        dry_run.process(Path::new("assets/logo.png")).unwrap(),
        FileOperation::Copy { target: output.path().join("assets/logo.png") }
    );
    match dry_run.process(Path::new("src/block.json")).unwrap() {
        FileOperation::Write { target, content } => {
            assert_eq!(target, output.path().join("src/block.json"));
            assert!(content.contains("example/example-plugin"));
        }
        other => panic!("Expected Write, got {other:?}"),
    }
}

#[test]
fn test_output_inside_the_template_root_is_not_reprocessed() {
    let template = template();
    let registry = Registry::builtin().unwrap();
    let config = Configuration::new();
    let output = template.path().join("preview");

    let dry_run = DryRun::new(template.path(), &output, &registry, &config, DryRunOptions::default());
    dry_run.run_tree(&Scanner::new(template.path()).unwrap()).unwrap();
    let report = dry_run.run_tree(&Scanner::new(template.path()).unwrap()).unwrap();

    assert!(report.is_success());
    assert_eq!(report.written.len() + report.copied.len(), 3);
    assert!(!output.join("preview").exists());
}

#[test]
fn test_output_containing_the_template_root_is_rejected() {
    let workspace = TempDir::new().unwrap();
    let root = workspace.path().join("template");
    write(&root, "plugin.php", b"{{name}}\n");
    let registry = Registry::builtin().unwrap();
    let config = Configuration::new();

    let same = DryRun::new(&root, &root, &registry, &config, DryRunOptions::default());
    assert!(matches!(
        same.run_tree(&Scanner::new(&root).unwrap()),
        Err(PlinthError::ConfigError(_))
    ));

    let options = DryRunOptions { mode: Mode::DryRun, clean: true };
    let parent = DryRun::new(&root, workspace.path(), &registry, &config, options);
    assert!(matches!(parent.run(["plugin.php"]), Err(PlinthError::ConfigError(_))));
    assert_eq!(fs::read_to_string(root.join("plugin.php")).unwrap(), "{{name}}\n");
}

#[cfg(unix)]
#[test]
fn test_unreadable_entries_fail_without_stopping_the_tree() {
    let template = template();
    std::os::unix::fs::symlink(
        template.path().join("missing.php"),
        template.path().join("broken.php"),
    )
    .unwrap();
    let output = TempDir::new().unwrap();
    let registry = Registry::builtin().unwrap();
    let config = Configuration::new();

    let dry_run =
        DryRun::new(template.path(), output.path(), &registry, &config, DryRunOptions::default());
    let report = dry_run.run_tree(&Scanner::new(template.path()).unwrap()).unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].source, template.path().join("broken.php"));
    assert!(matches!(report.failures[0].error, PlinthError::WalkError(_)));
    assert_eq!(report.written.len(), 2);
    assert_eq!(report.copied.len(), 1);
}
