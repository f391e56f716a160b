//! Line-level pattern detectors.
//!
//! Categories that are not expressible as a pure source→sink flow run as
//! per-line regex scans after the AST analysis: cryptographic failures,
//! vulnerable dependencies, insecure design, logging failures, access
//! control, misconfiguration, authentication, data integrity and SSRF.

/// Access-control and authentication failures.
pub mod access;
/// Cryptographic failures.
pub mod crypto;
/// Known-vulnerable dependencies.
pub mod dependencies;
/// Insecure design and logging failures.
pub mod design;
/// File and line skip filters.
pub mod filters;
/// Security misconfiguration and data integrity failures.
pub mod misconfig;
/// Server-side request forgery context checks.
pub mod ssrf;

use crate::taint::types::{Issue, IssueType, Location, Severity};
use filters::PatternContext;
use std::path::Path;

/// Runs every pattern category over a file.
///
/// In benchmark mode only binary/auxiliary files are skipped; otherwise
/// test, sample and documentation files produce no pattern findings.
#[must_use]
pub fn scan_patterns(file: &Path, source: &str, benchmark: bool) -> Vec<Issue> {
    if filters::should_skip_file(file, source, benchmark) {
        return Vec::new();
    }

    let ctx = PatternContext::new(file, source);
    let mut issues = Vec::new();
    issues.extend(crypto::scan(&ctx));
    issues.extend(dependencies::scan(&ctx));
    issues.extend(design::scan(&ctx));
    issues.extend(access::scan(&ctx));
    issues.extend(misconfig::scan(&ctx));
    issues.extend(ssrf::scan(&ctx));
    issues
}

/// Builds a pattern finding anchored at a whole line.
pub(crate) fn make_issue(
    file: &Path,
    line_number: usize,
    line: &str,
    issue_type: IssueType,
    severity: Severity,
    confidence: f64,
    message: &str,
    suggestion: &str,
) -> Issue {
    Issue {
        issue_type,
        severity,
        message: message.to_owned(),
        location: Location::new(file.to_path_buf(), line_number, 1, line.len()),
        suggestion: Some(suggestion.to_owned()),
        function_name: None,
        risk: None,
        confidence,
    }
}
