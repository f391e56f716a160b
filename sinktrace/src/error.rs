//! Error types for the analysis pipeline.
//!
//! Internal failures are converted to `analysis-error` issues at component
//! boundaries; nothing below the project level propagates as an error.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the analyzer.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A source file could not be read.
    #[error("failed to read {path}: {message}")]
    Io {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O error message.
        message: String,
    },
    /// The tree-sitter grammar could not be loaded.
    #[error("failed to initialize parser: {0}")]
    ParserInit(String),
    /// File discovery failed at the project level.
    #[error("file discovery failed under {root}: {message}")]
    Discovery {
        /// Root directory that was being scanned.
        root: PathBuf,
        /// Human-readable cause.
        message: String,
    },
}
