//! CodePlay command-line editor

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use codeplay_core::status;
use codeplay_editor::cli::{Cli, Command};
use codeplay_editor::commands::{self, Workspace};
use codeplay_editor::watch;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    tracing::info!("CodePlay Editor v{}", codeplay_core::VERSION);

    let workspace = Workspace::load(cli.config.as_deref(), cli.storage.as_deref())?;

    match &cli.command {
        Command::Run(args) => {
            let report = commands::run(&workspace, args)?;
            if report.startup_status != status::READY {
                tracing::info!("{}", report.startup_status);
            }
            for entry in &report.entries {
                println!("{entry}");
            }
            let counts = report.counts;
            tracing::info!(
                startup = ?report.startup,
                cycle = %report.outcome.cycle(),
                errors = counts.errors,
                warnings = counts.warnings,
                render_ms = report.render_ms,
                "{}",
                report.status
            );
            commands::ensure_rendered(&report)?;
        }
        Command::Share(args) => {
            let url = commands::share(&workspace, args)?;
            println!("{url}");
        }
        Command::Export(args) => {
            let path = commands::export(&workspace, args)?;
            println!("{}", path.display());
        }
        Command::Watch(args) => watch::run(&workspace, args)?,
        Command::Reset => commands::reset(&workspace)?,
    }

    Ok(())
}
