//! Command-line interface arguments.

use clap::Parser;
use std::path::PathBuf;

/// Type-based taint analysis for JavaScript/TypeScript source trees.
#[derive(Parser, Debug)]
#[command(name = "sinktrace", version, about)]
pub struct Cli {
    /// Files or project roots to analyze. Defaults to the current
    /// directory.
    pub paths: Vec<PathBuf>,

    /// Emit machine-readable JSON instead of the console report.
    #[arg(long)]
    pub json: bool,

    /// Attach a Checker-Framework-style JAIF export to each result.
    #[arg(long)]
    pub jaif: bool,

    /// Analyze test files too.
    #[arg(long)]
    pub include_tests: bool,

    /// Benchmark mode: only skip binary/auxiliary files.
    #[arg(long)]
    pub benchmark: bool,

    /// Disable the line-level pattern matcher.
    #[arg(long)]
    pub no_patterns: bool,

    /// Disable the solver and annotation inference.
    #[arg(long)]
    pub no_inference: bool,

    /// Additional folder names to exclude.
    #[arg(long, value_name = "FOLDER")]
    pub exclude: Vec<String>,

    /// Verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}
