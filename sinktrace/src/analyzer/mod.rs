//! Sinktrace analyzer module.
//!
//! This module contains the main analysis engine, broken down into:
//! - `types`: result types (`AnalysisResult`, `ProjectAnalysisResult`)
//! - `single_file`: the per-file pipeline
//! - `project`: directory discovery, parallel processing and aggregation
//! - the core `Sinktrace` struct and its builder methods

mod builder;
mod project;
mod single_file;

/// Result types and analysis summaries.
pub mod types;

pub use types::{AnalysisResult, AnalysisStatistics, CoverageStats, ProjectAnalysisResult};

use crate::config::Config;

/// The main analyzer struct.
///
/// Carries configuration only; all per-file analysis state lives in
/// per-invocation context objects, so one instance can serve many files.
#[allow(clippy::struct_excessive_bools)]
pub struct Sinktrace {
    /// Whether to run the line-level pattern matcher.
    pub enable_patterns: bool,
    /// Whether to run the data-flow tracer.
    pub enable_flow: bool,
    /// Whether to run the solver and annotation inferrer.
    pub enable_inference: bool,
    /// Whether to analyze test files.
    pub include_tests: bool,
    /// Benchmark mode: relax test/sample skip rules.
    pub benchmark_mode: bool,
    /// Whether to attach a JAIF export to each result.
    pub emit_jaif: bool,
    /// Folders to exclude from project analysis.
    pub exclude_folders: Vec<String>,
    /// Folders to force-include (overrides default exclusions).
    pub include_folders: Vec<String>,
    /// Configuration object.
    pub config: Config,
    /// Progress bar for project analysis (thread-safe).
    pub progress_bar: Option<std::sync::Arc<indicatif::ProgressBar>>,
    /// Whether to enable verbose logging.
    pub verbose: bool,
    /// Analysis root for relative path resolution.
    pub analysis_root: std::path::PathBuf,
}

impl Default for Sinktrace {
    fn default() -> Self {
        Self {
            enable_patterns: true,
            enable_flow: true,
            enable_inference: true,
            include_tests: false,
            benchmark_mode: false,
            emit_jaif: false,
            exclude_folders: Vec::new(),
            include_folders: Vec::new(),
            config: Config::default(),
            progress_bar: None,
            verbose: false,
            analysis_root: std::path::PathBuf::from("."),
        }
    }
}
