//! Single file analysis logic.
//!
//! Phase order: parse → source/sink detection and pattern scan →
//! constraint extraction → flow tracing → pattern merge → solver and
//! annotation inference → one deduplication pass. Every internal failure
//! is contained in this file's result as an `analysis-error` issue.

use super::types::{AnalysisResult, AnalysisStatistics, CoverageStats};
use super::Sinktrace;
use crate::ast::{collect_events, parse_source};
use crate::patterns::scan_patterns;
use crate::taint::constraints::extract_constraints;
use crate::taint::flow::{path_suggestion, trace_all, FlowContext};
use crate::taint::inference::infer_annotations;
use crate::taint::jaif::export_jaif;
use crate::taint::sinks::detect_sinks;
use crate::taint::sources::{detect_sources, filter_sink_collisions};
use crate::taint::types::{Issue, IssueType, Location, Severity};
use crate::utils::{get_ignored_lines, is_test_path};
use rustc_hash::FxHashMap;
use std::path::Path;
use std::time::Instant;

impl Sinktrace {
    /// Analyzes a single source string, producing a result object even on
    /// failure.
    #[must_use]
    pub fn analyze_source(&self, source: &str, file_path: &Path) -> AnalysisResult {
        let start = Instant::now();
        let mut result = AnalysisResult {
            statistics: AnalysisStatistics {
                files_analyzed: 1,
                ..AnalysisStatistics::default()
            },
            ..AnalysisResult::default()
        };

        // Test and sample files produce no findings outside benchmark mode.
        let path_str = file_path.to_string_lossy();
        if !self.include_tests && !self.benchmark_mode && is_test_path(&path_str) {
            result.statistics.analysis_time_ms = start.elapsed().as_millis();
            return result;
        }

        let mut issues: Vec<Issue> = Vec::new();

        let parsed = match parse_source(source, file_path) {
            Ok(parsed) => parsed,
            Err(e) => {
                issues.push(analysis_error(file_path, 1, &e.to_string()));
                result.issues = issues;
                result.statistics.issues_found = result.issues.len();
                result.statistics.analysis_time_ms = start.elapsed().as_millis();
                return result;
            }
        };

        for diagnostic in &parsed.diagnostics {
            issues.push(analysis_error(
                file_path,
                diagnostic.line,
                &diagnostic.message,
            ));
        }

        let events = collect_events(&parsed);

        let custom = &self.config.sinktrace;
        let sinks = detect_sinks(file_path, &events, &custom.custom_sinks);
        let sources = filter_sink_collisions(
            detect_sources(file_path, &events, &custom.custom_sources),
            &sinks,
        );

        let mut extraction = extract_constraints(file_path, &events);
        extraction.link_sources(&sources);

        // Phase 1: data-flow tracing. A file with no sinks yields no flow
        // findings no matter how many sources it has.
        if self.enable_flow && !sinks.is_empty() {
            let ctx = FlowContext {
                source_text: source,
                extraction: &extraction,
                custom_sanitizers: &custom.custom_sanitizers,
            };
            for path in trace_all(&ctx, &sources, &sinks) {
                issues.push(Issue {
                    issue_type: IssueType::from_sink(path.sink.kind),
                    severity: Severity::from_risk(path.risk_level),
                    message: format!(
                        "{} value from {} reaches {}",
                        path.source.category,
                        path.source.api_call.function_name,
                        path.sink.function.function_name
                    ),
                    location: path.sink.location.clone(),
                    suggestion: Some(path_suggestion(&path)),
                    function_name: Some(path.sink.function.function_name.clone()),
                    risk: Some(path.risk_level),
                    confidence: path.confidence,
                });
            }
        }

        // Phase 2: line-level patterns; an AST finding on the same line of
        // the same type wins.
        if self.enable_patterns {
            let pattern_issues = scan_patterns(file_path, source, self.benchmark_mode);
            for issue in pattern_issues {
                let duplicate = issues.iter().any(|existing| {
                    existing.location.line == issue.location.line
                        && existing.issue_type == issue.issue_type
                });
                if !duplicate {
                    issues.push(issue);
                }
            }
        }

        // Phase 3: solver and annotation inference.
        if self.enable_inference {
            let report = infer_annotations(&extraction, &sources);

            for annotation in &report.annotations {
                result
                    .annotations
                    .insert(annotation.variable.clone(), annotation.jsdoc_form.clone());
            }
            result.statistics.annotations_inferred = report.annotations.len();

            result.coverage = CoverageStats {
                annotated: extraction
                    .taint_info
                    .values()
                    .filter(|i| i.annotation.is_some())
                    .count(),
                inferred: report.annotations.len(),
                total: extraction.taint_info.len(),
            };

            // Annotation findings only matter where tainted data can land.
            if !sinks.is_empty() {
                for violation in &report.solution.violations {
                    issues.push(Issue {
                        issue_type: IssueType::IncompatibleTypes,
                        severity: violation.severity,
                        message: violation.message.clone(),
                        location: Location::new(file_path.to_path_buf(), 1, 1, 0),
                        suggestion: None,
                        function_name: Some(violation.variable.clone()),
                        risk: None,
                        confidence: 0.8,
                    });
                }
                for suggestion in report
                    .suggestions
                    .iter()
                    .filter(|s| s.auto_applicable && !s.status.is_clean())
                {
                    issues.push(Issue {
                        issue_type: IssueType::MissingAnnotation,
                        severity: Severity::Info,
                        message: format!(
                            "{} should be annotated {}",
                            suggestion.variable,
                            suggestion.status
                        ),
                        location: Location::new(file_path.to_path_buf(), 1, 1, 0),
                        suggestion: Some(suggestion.rationale.clone()),
                        function_name: Some(suggestion.variable.clone()),
                        risk: None,
                        confidence: suggestion.confidence,
                    });
                }
            }

            if self.emit_jaif {
                result.jaif_output = Some(export_jaif(&path_str, &report.annotations));
            }
        }

        // Inline suppression, then the single deduplication pass.
        let ignored = get_ignored_lines(source);
        issues.retain(|issue| !ignored.contains(&issue.location.line));

        result.issues = dedup_issues(issues);
        result.statistics.issues_found = result.issues.len();
        result.statistics.analysis_time_ms = start.elapsed().as_millis();
        result
    }
}

fn analysis_error(file: &Path, line: usize, message: &str) -> Issue {
    Issue {
        issue_type: IssueType::AnalysisError,
        severity: Severity::Warning,
        message: message.to_owned(),
        location: Location::new(file.to_path_buf(), line, 1, 0),
        suggestion: None,
        function_name: None,
        risk: None,
        confidence: 1.0,
    }
}

/// One deduplication pass keyed `(line, column, type, function_name)`.
/// On collision the higher risk wins, then the higher confidence; full
/// ties keep the first observed finding.
fn dedup_issues(issues: Vec<Issue>) -> Vec<Issue> {
    let mut kept: Vec<Issue> = Vec::new();
    let mut index: FxHashMap<(usize, usize, IssueType, String), usize> = FxHashMap::default();

    for issue in issues {
        let key = issue.dedup_key();
        match index.get(&key) {
            None => {
                index.insert(key, kept.len());
                kept.push(issue);
            }
            Some(&at) => {
                let existing = &kept[at];
                let better = issue.risk > existing.risk
                    || (issue.risk == existing.risk && issue.confidence > existing.confidence);
                if better {
                    kept[at] = issue;
                }
            }
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue_at(line: usize, issue_type: IssueType, confidence: f64) -> Issue {
        Issue {
            issue_type,
            severity: Severity::Error,
            message: "m".to_owned(),
            location: Location::new("a.js".into(), line, 1, 0),
            suggestion: None,
            function_name: Some("query".to_owned()),
            risk: None,
            confidence,
        }
    }

    #[test]
    fn test_dedup_keeps_higher_confidence() {
        let issues = vec![
            issue_at(3, IssueType::SqlInjection, 0.6),
            issue_at(3, IssueType::SqlInjection, 0.9),
        ];
        let deduped = dedup_issues(issues);
        assert_eq!(deduped.len(), 1);
        assert!((deduped[0].confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_dedup_distinct_types_kept() {
        let issues = vec![
            issue_at(3, IssueType::SqlInjection, 0.6),
            issue_at(3, IssueType::Xss, 0.6),
        ];
        assert_eq!(dedup_issues(issues).len(), 2);
    }

    #[test]
    fn test_dedup_tie_keeps_first() {
        let mut a = issue_at(3, IssueType::SqlInjection, 0.6);
        a.message = "first".to_owned();
        let mut b = issue_at(3, IssueType::SqlInjection, 0.6);
        b.message = "second".to_owned();
        let deduped = dedup_issues(vec![a, b]);
        assert_eq!(deduped[0].message, "first");
    }
}
