//! Taint Analysis Module
//!
//! Type-based taint analysis over the classified AST events. Tracks
//! untrusted data from sources to dangerous sinks through extracted type
//! constraints.
//!
//! # Pipeline
//! - **Detection**: sources and sinks from the recognition tables
//! - **Extraction**: type constraints and per-variable taint records
//! - **Tracing**: concrete source→sink data-flow paths with risk scoring
//! - **Solving**: fixpoint propagation of the four-valued lattice
//! - **Inference**: per-variable annotations and suggestions

/// Constraint extraction from classified events.
pub mod constraints;
/// Data-flow tracing and risk scoring.
pub mod flow;
/// Annotation inference on top of the solver.
pub mod inference;
/// JAIF export of inferred qualifiers.
pub mod jaif;
/// Dangerous sink detection.
pub mod sinks;
/// Constraint solving over the taint lattice.
pub mod solver;
/// Taint source detection.
pub mod sources;
/// Common types used throughout taint analysis.
pub mod types;

pub use solver::{ConstraintSolver, Solution};
pub use types::{
    DataFlowPath, Issue, IssueType, Location, RiskLevel, Severity, SinkKind, SourceCategory,
    TaintSink, TaintSource, TaintStatus, TypeConstraint,
};
