//! Annotation inference on top of the constraint solver.
//!
//! Every variable the solver decides gets an inferred annotation with a
//! confidence, a JSDoc form and a structural form, plus an add/modify
//! suggestion. Quality metrics summarize how much of the file the
//! inference covered.

use super::constraints::ExtractionResult;
use super::solver::{ConstraintSolver, Solution};
use super::types::{TaintSource, TaintStatus};
use serde::Serialize;

/// An annotation the inferrer derived for one variable.
#[derive(Debug, Clone, Serialize)]
pub struct InferredAnnotation {
    /// Variable name.
    pub variable: String,
    /// Inferred lattice value.
    pub status: TaintStatus,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// JSDoc rendering (`@tainted`).
    pub jsdoc_form: String,
    /// Structural TypeScript-style rendering (`Tainted<T>`).
    pub type_form: String,
    /// Human-readable reasoning lines.
    pub reasoning: Vec<String>,
}

/// Whether a suggestion introduces or corrects an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    /// The variable had no annotation.
    Add,
    /// The solver disagrees with the existing annotation.
    Modify,
}

/// Suggestion priority buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionPriority {
    /// Confidence above 0.85.
    High,
    /// Confidence in (0.7, 0.85].
    Medium,
    /// Confidence at or below 0.7.
    Low,
}

/// A proposed annotation change.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotationSuggestion {
    /// Variable to annotate.
    pub variable: String,
    /// Add or modify.
    pub kind: SuggestionKind,
    /// Proposed lattice value.
    pub status: TaintStatus,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Priority bucket.
    pub priority: SuggestionPriority,
    /// Whether the suggestion can be applied without review.
    pub auto_applicable: bool,
    /// Why the suggestion was made.
    pub rationale: String,
}

/// Aggregate quality of an inference run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct QualityMetrics {
    /// Mean annotation confidence.
    pub average_confidence: f64,
    /// Inferred variables over total tracked variables.
    pub coverage: f64,
    /// Auto-applicable suggestions over all suggestions.
    pub acceptance_rate: f64,
}

/// Full inference output for one file.
#[derive(Debug, Default)]
pub struct InferenceReport {
    /// Per-variable annotations.
    pub annotations: Vec<InferredAnnotation>,
    /// Add/modify suggestions.
    pub suggestions: Vec<AnnotationSuggestion>,
    /// Aggregate quality.
    pub metrics: QualityMetrics,
    /// The underlying solver output.
    pub solution: Solution,
}

/// Runs the solver and derives annotations and suggestions.
#[must_use]
pub fn infer_annotations(
    extraction: &ExtractionResult,
    sources: &[TaintSource],
) -> InferenceReport {
    let solution = ConstraintSolver::from_extraction(extraction, sources).solve();

    let mut annotations = Vec::new();
    let mut suggestions = Vec::new();

    let mut names: Vec<&String> = solution.values.keys().collect();
    names.sort();

    for name in names {
        let status = solution.values[name];
        if status == TaintStatus::Unknown || !is_plain_variable(name) {
            continue;
        }

        let info = extraction.taint_info.get(name);

        let mut confidence = info
            .and_then(|i| i.source_index)
            .and_then(|i| sources.get(i))
            .map_or(0.7, |s| s.confidence);
        let existing = info.and_then(|i| i.annotation).and_then(|a| a.status());
        if existing == Some(status) {
            confidence += 0.1;
        }
        let support = solution
            .steps
            .iter()
            .filter(|s| s.variable == *name)
            .count();
        confidence += (0.02 * support as f64).min(0.1);
        if status == TaintStatus::Tainted {
            confidence += 0.02;
        }
        let confidence = confidence.min(1.0);

        let mut reasoning: Vec<String> = solution
            .steps
            .iter()
            .filter(|s| s.variable == *name)
            .map(|s| s.reasoning.clone())
            .collect();
        reasoning.push(category_explanation(status).to_owned());

        annotations.push(InferredAnnotation {
            variable: name.clone(),
            status,
            confidence,
            jsdoc_form: jsdoc_form(status).to_owned(),
            type_form: type_form(status),
            reasoning,
        });

        let (kind, rationale) = match existing {
            None => (
                SuggestionKind::Add,
                format!("{name} has no annotation; solver decided {status}"),
            ),
            Some(prior) if prior == status => (
                SuggestionKind::Add,
                format!("existing {} annotation on {name} agrees with the solver", jsdoc_form(status)),
            ),
            Some(prior) => (
                SuggestionKind::Modify,
                format!("existing annotation says {prior} but the solver decided {status}"),
            ),
        };
        let auto_applicable = kind == SuggestionKind::Add && confidence > 0.85;
        suggestions.push(AnnotationSuggestion {
            variable: name.clone(),
            kind,
            status,
            confidence,
            priority: priority_bucket(confidence),
            auto_applicable,
            rationale,
        });
    }

    let total_tracked = extraction
        .taint_info
        .keys()
        .filter(|k| is_plain_variable(k))
        .count();
    let inferred = annotations
        .iter()
        .filter(|a| extraction.taint_info.contains_key(&a.variable))
        .count();
    let average_confidence = if annotations.is_empty() {
        0.0
    } else {
        annotations.iter().map(|a| a.confidence).sum::<f64>() / annotations.len() as f64
    };
    let acceptance_rate = if suggestions.is_empty() {
        0.0
    } else {
        suggestions.iter().filter(|s| s.auto_applicable).count() as f64 / suggestions.len() as f64
    };

    InferenceReport {
        annotations,
        suggestions,
        metrics: QualityMetrics {
            average_confidence,
            coverage: if total_tracked == 0 {
                0.0
            } else {
                inferred as f64 / total_tracked as f64
            },
            acceptance_rate,
        },
        solution,
    }
}

/// Plain identifiers only: synthesized `F[paramN]` targets and dotted
/// property names are solver-internal.
fn is_plain_variable(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn jsdoc_form(status: TaintStatus) -> &'static str {
    match status {
        TaintStatus::Tainted => "@tainted",
        TaintStatus::Untainted => "@untainted",
        TaintStatus::Sanitized => "@sanitized",
        TaintStatus::Unknown => "@unknown",
    }
}

fn type_form(status: TaintStatus) -> String {
    match status {
        TaintStatus::Tainted => "Tainted<T>".to_owned(),
        TaintStatus::Untainted => "Untainted<T>".to_owned(),
        TaintStatus::Sanitized => "Sanitized<T>".to_owned(),
        TaintStatus::Unknown => "T".to_owned(),
    }
}

fn category_explanation(status: TaintStatus) -> &'static str {
    match status {
        TaintStatus::Tainted => "the value originates from an untrusted input",
        TaintStatus::Untainted => "the value never receives untrusted data",
        TaintStatus::Sanitized => "the value passed through a recognized sanitizer",
        TaintStatus::Unknown => "the analysis could not decide this value",
    }
}

fn priority_bucket(confidence: f64) -> SuggestionPriority {
    if confidence > 0.85 {
        SuggestionPriority::High
    } else if confidence > 0.7 {
        SuggestionPriority::Medium
    } else {
        SuggestionPriority::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{collect_events, parse_source};
    use crate::taint::constraints::extract_constraints;
    use crate::taint::sources::detect_sources;
    use std::path::PathBuf;

    fn infer(source: &str) -> InferenceReport {
        let path = PathBuf::from("test.js");
        let parsed = parse_source(source, &path).unwrap();
        let events = collect_events(&parsed);
        let mut extraction = extract_constraints(&path, &events);
        let sources = detect_sources(&path, &events, &[]);
        extraction.link_sources(&sources);
        infer_annotations(&extraction, &sources)
    }

    #[test]
    fn test_source_variable_annotated_tainted() {
        let report = infer("const id = req.query.id;\n");
        let annotation = report
            .annotations
            .iter()
            .find(|a| a.variable == "id")
            .expect("annotation expected");
        assert_eq!(annotation.status, TaintStatus::Tainted);
        assert_eq!(annotation.jsdoc_form, "@tainted");
        assert!(annotation.confidence >= 0.85);
    }

    #[test]
    fn test_agreement_raises_confidence_and_auto_applies() {
        let report = infer("/** @tainted */\nconst userId = req.params.id;\n");
        let suggestion = report
            .suggestions
            .iter()
            .find(|s| s.variable == "userId")
            .expect("suggestion expected");
        assert_eq!(suggestion.kind, SuggestionKind::Add);
        assert!(suggestion.auto_applicable);
        assert!(suggestion.confidence >= 0.85);
    }

    #[test]
    fn test_disagreement_is_modify_never_auto() {
        let report = infer("const raw = req.query.q;\n/** @untainted */\nconst copy = raw;\n");
        // The annotation pins copy to untainted; the tainted assignment is
        // a violation, and no modify suggestion may auto-apply.
        for s in &report.suggestions {
            if s.kind == SuggestionKind::Modify {
                assert!(!s.auto_applicable);
            }
        }
        assert!(!report.solution.violations.is_empty());
    }

    #[test]
    fn test_metrics_bounds() {
        let report = infer("const a = req.body.x;\nconst b = a;\nconst safe = 'ok';\n");
        assert!(report.metrics.coverage <= 1.0);
        assert!(report.metrics.average_confidence <= 1.0);
        assert!(report.metrics.acceptance_rate <= 1.0);
    }

    #[test]
    fn test_reasoning_present() {
        let report = infer("const a = req.body.x;\n");
        let annotation = report
            .annotations
            .iter()
            .find(|a| a.variable == "a")
            .expect("annotation expected");
        assert!(!annotation.reasoning.is_empty());
    }
}
