use std::fs;
use std::path::Path;

use codeplay_core::status;
use codeplay_core::templates::DEFAULT_SOURCES;
use codeplay_core::{ConsoleKind, SourceTriple};
use codeplay_editor::cli::{ExportArgs, RunArgs, ShareArgs, SourceArgs};
use codeplay_editor::commands::{self, Workspace};
use codeplay_editor::StartupSource;
use codeplay_services::share::{load_from_url, ShareLoad};
use codeplay_services::storage::{self, FileStore};

fn workspace(dir: &Path) -> Workspace {
    Workspace::load(None, Some(&dir.join("storage.json"))).unwrap()
}

fn js_file(dir: &Path, body: &str) -> SourceArgs {
    let path = dir.join("app.js");
    fs::write(&path, body).unwrap();
    SourceArgs {
        js: Some(path),
        ..SourceArgs::default()
    }
}

#[test]
fn run_prints_console_and_writes_document() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("preview.html");
    let args = RunArgs {
        sources: js_file(dir.path(), "console.log('hello'); console.warn('careful');"),
        out: Some(out.clone()),
        ..RunArgs::default()
    };

    let report = commands::run(&workspace(dir.path()), &args).unwrap();
    assert_eq!(report.startup, StartupSource::Defaults);
    assert!(report.outcome.is_success());
    assert_eq!(report.status, status::RENDERED);
    let seen: Vec<_> = report.entries.iter().map(|e| (e.kind, e.text.as_str())).collect();
    assert_eq!(seen, vec![(ConsoleKind::Log, "hello"), (ConsoleKind::Warn, "careful")]);
    assert_eq!(report.counts.warnings, 1);

    let document = fs::read_to_string(out).unwrap();
    assert!(document.starts_with("<!DOCTYPE html>"));
    assert!(document.contains("console.warn('careful');"));
}

#[test]
fn run_without_sandbox_only_builds_the_document() {
    let dir = tempfile::tempdir().unwrap();
    let args = RunArgs {
        sources: js_file(dir.path(), "undefinedFunction();"),
        no_sandbox: true,
        ..RunArgs::default()
    };
    let report = commands::run(&workspace(dir.path()), &args).unwrap();
    assert!(report.outcome.is_success());
    assert!(report.entries.is_empty());
}

#[test]
fn run_picks_up_snapshot_and_reset_clears_it() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = workspace(dir.path());

    let mut store = FileStore::open(&workspace.storage_path).unwrap();
    storage::autosave(&mut store, &SourceTriple::new("<p>saved</p>", "", "")).unwrap();

    let report = commands::run(&workspace, &RunArgs { no_sandbox: true, ..RunArgs::default() }).unwrap();
    assert_eq!(report.startup, StartupSource::Snapshot);

    commands::reset(&workspace).unwrap();
    let report = commands::run(&workspace, &RunArgs { no_sandbox: true, ..RunArgs::default() }).unwrap();
    assert_eq!(report.startup, StartupSource::Defaults);
}

#[test]
fn share_builds_a_loadable_link() {
    let dir = tempfile::tempdir().unwrap();
    let args = ShareArgs {
        sources: js_file(dir.path(), "alert('hi');"),
        base: Some("https://codeplay.example/play?old=1".to_string()),
    };

    let url = commands::share(&workspace(dir.path()), &args).unwrap();
    assert_eq!(url.path(), "/play");
    match load_from_url(&url) {
        ShareLoad::Loaded(sources) => {
            assert_eq!(sources.js, "alert('hi');");
            assert_eq!(sources.html, DEFAULT_SOURCES.html);
        }
        other => panic!("link did not load: {other:?}"),
    }
}

#[test]
fn export_writes_archive() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("project.zip");
    let args = ExportArgs {
        sources: js_file(dir.path(), "// exported"),
        url: None,
        out: out.clone(),
    };

    assert_eq!(commands::export(&workspace(dir.path()), &args).unwrap(), out);
    let archive = zip::ZipArchive::new(fs::File::open(&out).unwrap()).unwrap();
    assert_eq!(archive.len(), 3);
}

#[test]
fn missing_source_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let args = RunArgs {
        sources: SourceArgs {
            css: Some(dir.path().join("missing.css")),
            ..SourceArgs::default()
        },
        no_sandbox: true,
        ..RunArgs::default()
    };
    let err = commands::run(&workspace(dir.path()), &args).unwrap_err();
    assert!(err.to_string().contains("missing.css"));
}

#[test]
fn invalid_share_url_status_survives_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let args = RunArgs {
        url: Some("https://codeplay.example/?code=@@@".to_string()),
        no_sandbox: true,
        ..RunArgs::default()
    };
    let report = commands::run(&workspace(dir.path()), &args).unwrap();
    assert_eq!(report.startup, StartupSource::Defaults);
    assert_eq!(report.startup_status, status::INVALID_SHARE);
    assert_eq!(report.status, status::RENDERED);
    assert!(commands::ensure_rendered(&report).is_ok());
}

#[test]
fn runaway_script_fails_the_run_after_its_output() {
    let dir = tempfile::tempdir().unwrap();
    let mut workspace = workspace(dir.path());
    workspace.settings.sandbox.time_budget_ms = 50;
    let args = RunArgs {
        sources: js_file(dir.path(), "console.log('before'); while (true) {}"),
        ..RunArgs::default()
    };

    let report = commands::run(&workspace, &args).unwrap();
    assert!(!report.outcome.is_success());
    assert_eq!(report.startup_status, status::READY);
    let texts: Vec<_> = report.entries.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[0], "before");
    assert!(texts[1].starts_with("Failed to render: "));
    assert!(report.render_ms >= 0.0);

    let err = commands::ensure_rendered(&report).unwrap_err();
    assert!(err.to_string().contains("time budget"));
}
