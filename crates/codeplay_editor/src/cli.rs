//! Command-line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// CodePlay live editor
#[derive(Parser, Debug)]
#[command(name = "codeplay", version)]
#[command(about = "Live HTML/CSS/JS preview with console capture, share links and ZIP export", long_about = None)]
pub struct Cli {
    /// JSON settings file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Storage file holding the autosave snapshot (overrides the settings)
    #[arg(long, global = true)]
    pub storage: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render the project once and print its console
    Run(RunArgs),

    /// Print a link that reopens the project
    Share(ShareArgs),

    /// Write the project as a ZIP archive
    Export(ExportArgs),

    /// Re-render whenever the files in a directory change
    Watch(WatchArgs),

    /// Forget the autosave snapshot
    Reset,
}

/// Source files; anything not given comes from the shared link, the
/// snapshot or the defaults.
#[derive(Args, Debug, Default, Clone)]
pub struct SourceArgs {
    /// HTML source file
    #[arg(long)]
    pub html: Option<PathBuf>,

    /// CSS source file
    #[arg(long)]
    pub css: Option<PathBuf>,

    /// JavaScript source file
    #[arg(long)]
    pub js: Option<PathBuf>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Page URL, possibly carrying a shared project in `?code=`
    #[arg(long)]
    pub url: Option<String>,

    /// Write the composite preview document here
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Build the document without executing its scripts
    #[arg(long)]
    pub no_sandbox: bool,
}

#[derive(Args, Debug, Default, Clone)]
pub struct ShareArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Page URL the link points at
    #[arg(long)]
    pub base: Option<String>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Page URL, possibly carrying a shared project in `?code=`
    #[arg(long)]
    pub url: Option<String>,

    /// Archive path
    #[arg(long, default_value = codeplay_services::EXPORT_FILE_NAME)]
    pub out: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// Directory with index.html, style.css and script.js
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 200)]
    pub poll_ms: u64,

    /// Build documents without executing their scripts
    #[arg(long)]
    pub no_sandbox: bool,
}
