//! One-shot commands
//!
//! Each command opens a session the way the page does on load, applies the
//! source files given on the command line as edits and then does its one
//! thing.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;
use url::Url;

use codeplay_core::{
    ConsoleCounts, ConsoleEntry, Language, MemorySurface, PreviewSurface, RenderOutcome,
    SystemClock,
};
use codeplay_script::{QuickJsSurface, SandboxLimits};
use codeplay_services::settings::{SandboxSettings, Settings};
use codeplay_services::storage::{self, FileStore};

use crate::app::{App, StartupSource};
use crate::cli::{ExportArgs, RunArgs, ShareArgs, SourceArgs};

pub type CliApp = App<Box<dyn PreviewSurface>, FileStore, SystemClock>;

/// Settings plus the storage file they resolve to.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub settings: Settings,
    pub storage_path: PathBuf,
}

impl Workspace {
    pub fn load(config: Option<&Path>, storage: Option<&Path>) -> Result<Self> {
        let settings = Settings::load_or_default(config).context("failed to load settings")?;
        let storage_path = storage
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(&settings.storage.path));
        Ok(Self {
            settings,
            storage_path,
        })
    }

    pub fn open_store(&self) -> Result<FileStore> {
        FileStore::open(&self.storage_path)
            .with_context(|| format!("failed to open storage {}", self.storage_path.display()))
    }

    /// A started session; the initial render is still pending.
    pub fn open_app(&self, page_url: Option<&str>, sandbox: bool) -> Result<(CliApp, StartupSource)> {
        let page_url = page_url
            .map(|raw| Url::parse(raw).with_context(|| format!("invalid page URL {raw}")))
            .transpose()?;
        let surface: Box<dyn PreviewSurface> = if sandbox {
            Box::new(QuickJsSurface::new(sandbox_limits(&self.settings.sandbox)))
        } else {
            Box::new(MemorySurface::new())
        };

        let mut app = App::new(
            surface,
            self.open_store()?,
            SystemClock::new(),
            self.settings.clone(),
        );
        let source = app.start(page_url);
        Ok((app, source))
    }
}

pub fn sandbox_limits(settings: &SandboxSettings) -> SandboxLimits {
    SandboxLimits {
        memory_limit_bytes: settings.memory_limit_bytes,
        max_stack_bytes: settings.max_stack_bytes,
        time_budget: settings.time_budget(),
    }
}

/// Reads every source file given and applies it as an edit.
pub fn apply_source_files(app: &mut CliApp, files: &SourceArgs) -> Result<usize> {
    let mut applied = 0;
    for (language, path) in [
        (Language::Html, &files.html),
        (Language::Css, &files.css),
        (Language::Js, &files.js),
    ] {
        let Some(path) = path else { continue };
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {} source {}", language, path.display()))?;
        if app.edit(language, text) {
            applied += 1;
        }
    }
    Ok(applied)
}

#[derive(Debug)]
pub struct RunReport {
    pub startup: StartupSource,
    pub outcome: RenderOutcome,
    pub entries: Vec<ConsoleEntry>,
    pub counts: ConsoleCounts,
    /// Status right after startup, before the render replaced it.
    pub startup_status: String,
    pub status: String,
    /// Mean surface load time in milliseconds.
    pub render_ms: f64,
}

/// Turns a failed render into an error for the process exit status.
pub fn ensure_rendered(report: &RunReport) -> Result<()> {
    if let RenderOutcome::Failed { cycle, reason } = &report.outcome {
        bail!("render {cycle} failed: {reason}");
    }
    Ok(())
}

pub fn run(workspace: &Workspace, args: &RunArgs) -> Result<RunReport> {
    let (mut app, startup) = workspace.open_app(args.url.as_deref(), !args.no_sandbox)?;
    let startup_status = app.status_text().to_string();
    apply_source_files(&mut app, &args.sources)?;

    let outcome = app.run();
    app.pump_console();

    if let Some(out) = &args.out {
        let document = app.pipeline().last_document().unwrap_or_default();
        fs::write(out, document)
            .with_context(|| format!("failed to write preview document {}", out.display()))?;
        info!(path = %out.display(), "preview document written");
    }

    Ok(RunReport {
        startup,
        outcome,
        entries: app.console().entries().to_vec(),
        counts: app.console().counts(),
        startup_status,
        status: app.status_text().to_string(),
        render_ms: app.pipeline().timings().average_ms(),
    })
}

pub fn share(workspace: &Workspace, args: &ShareArgs) -> Result<Url> {
    let (mut app, _) = workspace.open_app(args.base.as_deref(), false)?;
    apply_source_files(&mut app, &args.sources)?;
    app.share_url().context("failed to build share link")
}

pub fn export(workspace: &Workspace, args: &ExportArgs) -> Result<PathBuf> {
    let (mut app, _) = workspace.open_app(args.url.as_deref(), false)?;
    apply_source_files(&mut app, &args.sources)?;

    let file = fs::File::create(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    app.export_to(file)
        .with_context(|| format!("failed to export to {}", args.out.display()))?;
    info!(path = %args.out.display(), "project exported");
    Ok(args.out.clone())
}

/// Drops the autosave snapshot so the next session starts from defaults.
pub fn reset(workspace: &Workspace) -> Result<()> {
    let mut store = workspace.open_store()?;
    storage::clear_autosave(&mut store, &workspace.settings.storage.autosave_key)
        .context("failed to clear snapshot")?;
    info!(path = %workspace.storage_path.display(), "snapshot cleared");
    Ok(())
}
