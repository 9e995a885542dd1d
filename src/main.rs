//! Bakindex CLI - export a backup content index as CSV reports

use anyhow::Context;
use bakindex::config::{self, ExportConfig};
use bakindex::export::export_database;
use bakindex::ui::{self, Icons};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "bakindex")]
#[command(version)]
#[command(about = "Export the content index of a backup as CSV reports")]
#[command(long_about = r#"
Reads an index database and writes two CSV reports (path,size per line):
  • diff.txt  - indexed files that have chunk records
  • index.txt - every indexed file

Example usage:
  bakindex index.db
  bakindex --out-dir reports/ index.db
"#)]
struct Cli {
    /// Path to the index database file
    database: Option<PathBuf>,

    /// Directory the reports are written to (defaults to the current directory)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Config file (defaults to bakindex.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Don't print the summary
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let Some(database) = cli.database.as_deref() else {
        println!("Usage: {} <index.db>", program_name());
        return ExitCode::from(1);
    };

    match run(&cli, database) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::error(&format!("{:#}", e));
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli, database: &Path) -> anyhow::Result<()> {
    let config = resolve_config(cli)?;
    if !config.out_dir.is_dir() {
        anyhow::bail!("output directory {} does not exist", config.out_dir.display());
    }

    tracing::info!("Exporting {} into {}", database.display(), config.out_dir.display());
    let summary = export_database(database, &config)
        .with_context(|| format!("failed to export {}", database.display()))?;

    if cli.quiet || bakindex::output::is_quiet() {
        return Ok(());
    }

    ui::header("Export complete");
    ui::info(&format!("{} Database", Icons::DATABASE), &database.display().to_string());
    println!("{}", ui::report_table(&summary));
    if summary.diff.rows == 0 {
        ui::warn("No indexed file has chunk records");
    }
    ui::success(&format!("{} Reports written", Icons::FILE));
    Ok(())
}

fn resolve_config(cli: &Cli) -> anyhow::Result<ExportConfig> {
    if let Some(path) = &cli.config {
        if !path.exists() {
            anyhow::bail!("config file {} not found", path.display());
        }
    }

    let mut config = config::load_config(cli.config.as_deref())
        .context("failed to load config")?
        .unwrap_or_default();
    if let Some(out_dir) = &cli.out_dir {
        config.out_dir = out_dir.clone();
    }
    tracing::debug!("Using config {:?}", config);
    Ok(config)
}

fn program_name() -> String {
    std::env::args_os()
        .next()
        .map(|arg| arg.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bakindex".to_string())
}
