//! Type definitions for analysis results.

use crate::taint::types::{Issue, IssueType, RiskLevel};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Per-file counters.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AnalysisStatistics {
    /// Files analyzed (1 for a single-file result).
    pub files_analyzed: usize,
    /// Issues reported after deduplication.
    pub issues_found: usize,
    /// Annotations the inferrer produced.
    pub annotations_inferred: usize,
    /// Wall-clock analysis time in milliseconds.
    pub analysis_time_ms: u128,
}

/// Annotation coverage counters.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CoverageStats {
    /// Variables with an explicit annotation.
    pub annotated: usize,
    /// Variables the inferrer decided.
    pub inferred: usize,
    /// All tracked variables.
    pub total: usize,
}

/// Holds the results of analyzing one file.
/// This struct is serialized to JSON if requested.
#[derive(Debug, Default, Serialize)]
pub struct AnalysisResult {
    /// Deduplicated findings.
    pub issues: Vec<Issue>,
    /// Inferred variable → taint qualifier map.
    pub annotations: BTreeMap<String, String>,
    /// Counters for this analysis.
    pub statistics: AnalysisStatistics,
    /// Annotation coverage for this file.
    pub coverage: CoverageStats,
    /// Optional Checker-Framework-style export.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jaif_output: Option<String>,
}

impl AnalysisResult {
    /// Whether any finding carries critical risk.
    #[must_use]
    pub fn has_critical(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.risk == Some(RiskLevel::Critical))
    }
}

/// Aggregated per-type taint summary for a project.
#[derive(Debug, Clone, Serialize)]
pub struct TaintSummary {
    /// Issue type summarized.
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    /// Occurrences across the project.
    pub count: usize,
    /// Aggregated severity bucket.
    pub severity: RiskLevel,
    /// Human-readable description.
    pub description: String,
}

/// Holds the results of analyzing a project tree.
#[derive(Debug, Default, Serialize)]
pub struct ProjectAnalysisResult {
    /// Files discovered.
    pub total_files: usize,
    /// Files successfully analyzed.
    pub analyzed_files: usize,
    /// Issues across all files.
    pub total_issues: usize,
    /// Histogram of issues by type.
    pub issues_by_type: BTreeMap<String, usize>,
    /// Files with at least one critical-risk finding.
    pub critical_files: Vec<PathBuf>,
    /// Annotation coverage across the project.
    pub coverage: CoverageStats,
    /// Wall-clock analysis time in milliseconds.
    pub analysis_time_ms: u128,
    /// Per-type taint summaries, most severe first.
    pub detected_taints: Vec<TaintSummary>,
}

impl ProjectAnalysisResult {
    /// Whether the project has critical findings.
    #[must_use]
    pub fn has_critical(&self) -> bool {
        !self.critical_files.is_empty()
    }

    /// Whether any file failed to analyze.
    #[must_use]
    pub fn has_analysis_errors(&self) -> bool {
        self.issues_by_type
            .get("analysis-error")
            .copied()
            .unwrap_or(0)
            > 0
    }
}

/// Base severity weight of an issue type for the taint summary.
#[must_use]
pub fn base_severity(issue_type: IssueType) -> f64 {
    match issue_type {
        IssueType::SqlInjection
        | IssueType::CommandInjection
        | IssueType::PathTraversal
        | IssueType::CodeInjection => 4.0,
        IssueType::Xss
        | IssueType::DataIntegrityFailure
        | IssueType::SsrfVulnerability
        | IssueType::AccessControlFailure
        | IssueType::CryptographicFailure
        | IssueType::AuthenticationFailure => 3.0,
        IssueType::UnvalidatedInput
        | IssueType::InsecureDesign
        | IssueType::VulnerableDependency
        | IssueType::SecurityMisconfiguration
        | IssueType::IncompatibleTypes
        | IssueType::TaintFlow => 2.0,
        IssueType::LoggingFailure
        | IssueType::MissingAnnotation
        | IssueType::AnalysisError
        | IssueType::MultiStepAttack => 1.0,
    }
}

/// Builds the per-type taint summaries from the project histogram.
#[must_use]
pub fn build_taint_summaries(
    counts: &BTreeMap<IssueType, usize>,
    total_issues: usize,
) -> Vec<TaintSummary> {
    let mut summaries: Vec<TaintSummary> = counts
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(issue_type, count)| {
            let share = if total_issues == 0 {
                0.0
            } else {
                *count as f64 / total_issues as f64
            };
            let multiplier = if share > 0.5 {
                1.5
            } else if share > 0.2 {
                1.2
            } else {
                1.0
            };
            let score = base_severity(*issue_type) * multiplier;
            let severity = if score >= 4.5 {
                RiskLevel::Critical
            } else if score >= 3.0 {
                RiskLevel::High
            } else if score >= 1.5 {
                RiskLevel::Medium
            } else {
                RiskLevel::Low
            };
            TaintSummary {
                issue_type: *issue_type,
                count: *count,
                severity,
                description: format!("{count} {issue_type} finding(s) across the project"),
            }
        })
        .collect();
    summaries.sort_by(|a, b| b.severity.cmp(&a.severity).then(b.count.cmp(&a.count)));
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_frequency_multiplier() {
        let mut counts = BTreeMap::new();
        counts.insert(IssueType::SqlInjection, 6);
        counts.insert(IssueType::LoggingFailure, 2);
        let summaries = build_taint_summaries(&counts, 8);
        let sql = summaries
            .iter()
            .find(|s| s.issue_type == IssueType::SqlInjection)
            .unwrap();
        // 4.0 * 1.5 (majority share) buckets critical.
        assert_eq!(sql.severity, RiskLevel::Critical);
        let log = summaries
            .iter()
            .find(|s| s.issue_type == IssueType::LoggingFailure)
            .unwrap();
        assert_eq!(log.severity, RiskLevel::Low);
    }

    #[test]
    fn test_summaries_sorted_by_severity() {
        let mut counts = BTreeMap::new();
        counts.insert(IssueType::LoggingFailure, 10);
        counts.insert(IssueType::CommandInjection, 1);
        let summaries = build_taint_summaries(&counts, 11);
        assert_eq!(summaries[0].issue_type, IssueType::CommandInjection);
    }
}
