//! Main binary entry point for the sinktrace analyzer.

use anyhow::Result;
use clap::Parser;
use sinktrace::cli::Cli;
use sinktrace::commands::run_scan;
use tracing_subscriber::EnvFilter;

/// Main entry point of the application.
fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut stdout = std::io::stdout();
    let code = run_scan(&cli, &mut stdout)?;
    std::process::exit(code);
}
