//! Core library for the sinktrace static analyzer.
//!
//! Detects injection-class vulnerabilities in JavaScript/TypeScript source
//! trees by type-based taint analysis: source/sink detection over the AST,
//! constraint extraction, data-flow tracing, a taint-lattice constraint
//! solver, and annotation inference, plus a line-level pattern matcher for
//! categories that have no source→sink shape.

// Allow common complexity warnings - these are intentional design choices
#![allow(
    clippy::type_complexity,
    clippy::too_many_arguments,
    clippy::similar_names,
    clippy::items_after_statements
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

/// Module containing the core analyzer logic.
/// This includes the `Sinktrace` struct and the per-file and per-project
/// pipelines.
pub mod analyzer;

/// Module containing the AST facade over the tree-sitter grammars.
pub mod ast;

/// Module defining the command-line interface arguments.
pub mod cli;

/// Module for handling CLI commands and their execution logic.
pub mod commands;

/// Module for loading configuration.
pub mod config;

/// Module containing shared constants and regex tables.
pub mod constants;

/// Module defining the analyzer error types.
pub mod error;

/// Module for rich CLI output formatting.
pub mod output;

/// Module containing the line-level pattern detectors.
pub mod patterns;

/// Module for taint analysis (data flow from sources to sinks).
pub mod taint;

/// Module containing utility functions.
pub mod utils;
