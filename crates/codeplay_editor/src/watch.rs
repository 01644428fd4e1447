//! Watch mode
//!
//! Polls `index.html`, `style.css` and `script.js` in one directory and feeds
//! every change into the session as an edit, so the debounced render and
//! autosave run exactly as they do while typing. Console entries are printed
//! as they arrive.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use codeplay_core::{ConsoleEntry, Language};

use crate::cli::WatchArgs;
use crate::commands::{CliApp, Workspace};

/// Files seeded or reloaded in the watched directory.
pub fn source_path(dir: &Path, language: Language) -> PathBuf {
    dir.join(language.file_name())
}

/// Writes every missing source file from the current session.
pub fn seed_directory(app: &CliApp, dir: &Path) -> Result<usize> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let mut written = 0;
    for (language, text) in app.sources().iter() {
        let path = source_path(dir, language);
        if path.exists() {
            continue;
        }
        fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
        written += 1;
    }
    Ok(written)
}

/// Applies the current file contents as edits. Returns how many changed.
pub fn sync_from_directory(app: &mut CliApp, dir: &Path) -> usize {
    let mut changed = 0;
    for language in Language::ALL {
        let path = source_path(dir, language);
        match fs::read_to_string(&path) {
            Ok(text) => {
                if app.edit(language, text) {
                    debug!(path = %path.display(), "source changed");
                    changed += 1;
                }
            }
            // Editors often replace files by delete + create.
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(%err, path = %path.display(), "failed to read source"),
        }
    }
    changed
}

fn print_entries(entries: &[ConsoleEntry]) {
    for entry in entries {
        println!("{entry}");
    }
}

pub fn run(workspace: &Workspace, args: &WatchArgs) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    runtime.block_on(watch(workspace, args))
}

async fn watch(workspace: &Workspace, args: &WatchArgs) -> Result<()> {
    let (mut app, startup) = workspace.open_app(None, !args.no_sandbox)?;
    let seeded = seed_directory(&app, &args.dir)?;
    sync_from_directory(&mut app, &args.dir);
    info!(?startup, seeded, dir = %args.dir.display(), "watching");

    let mut interval = tokio::time::interval(Duration::from_millis(args.poll_ms.max(10)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut printed = 0;
    let mut status = String::new();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                sync_from_directory(&mut app, &args.dir);
                let report = app.tick();

                if report.rendered.is_some() {
                    printed = 0;
                    println!("--- render {} ---", app.pipeline().cycle());
                }
                let entries = app.console().entries();
                if entries.len() > printed {
                    print_entries(&entries[printed..]);
                    printed = entries.len();
                }

                let line = format!("{} | {}", app.status_text(), app.save_status_text());
                if line != status {
                    info!("{line}");
                    status = line;
                }
            }
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
        }
    }

    if app.has_unsaved_changes() {
        warn!("unsaved changes, writing snapshot before exit");
        app.autosave().context("failed to save snapshot")?;
    }
    let timings = app.pipeline().timings();
    info!(
        counters = %app.counters().summary(),
        renders = timings.samples(),
        avg_render_ms = timings.average_ms(),
        slowest_render_ms = timings.slowest_ms(),
        "watch finished"
    );
    Ok(())
}
