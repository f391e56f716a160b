//! Server-side request forgery context patterns.

use super::filters::PatternContext;
use super::make_issue;
use crate::taint::types::{Issue, IssueType, Severity};
use regex::Regex;
use std::sync::OnceLock;

const VALIDATION_WINDOW: usize = 2;

fn internal_ip_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(
            r#"['"](?:https?://)?(?:127\.0\.0\.1|192\.168\.\d+|10\.\d+\.\d+|169\.254\.\d+|localhost)"#,
        )
        .expect("Invalid internal IP regex")
    })
}

fn dangerous_scheme_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"file://|gopher://|dict://").expect("Invalid scheme regex")
    })
}

fn request_fetch_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"(?:fetch|axios\.\w+|https?\.get)\s*\(.*\breq\.(?:query|params|body)")
            .expect("Invalid request fetch regex")
    })
}

fn url_validation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"validateUrl|isAllowedDomain|urlWhitelist|trusted\w*[Dd]omain")
            .expect("Invalid URL validation regex")
    })
}

/// Scans for SSRF-prone request construction.
#[must_use]
pub fn scan(ctx: &PatternContext<'_>) -> Vec<Issue> {
    let mut issues = Vec::new();

    for (i, line) in ctx.lines.iter().enumerate() {
        if ctx.is_skipped(i) {
            continue;
        }

        if internal_ip_re().is_match(line) {
            issues.push(make_issue(
                ctx.file,
                i + 1,
                line,
                IssueType::SsrfVulnerability,
                Severity::Info,
                0.65,
                "Internal address literal in request construction",
                "Avoid hardcoding internal hosts reachable through user requests",
            ));
        }
        if dangerous_scheme_re().is_match(line) {
            issues.push(make_issue(
                ctx.file,
                i + 1,
                line,
                IssueType::SsrfVulnerability,
                Severity::Warning,
                0.8,
                "Non-HTTP scheme in outbound request",
                "Restrict outbound requests to http(s) URLs",
            ));
        }
        if request_fetch_re().is_match(line)
            && !ctx.window_matches(i, VALIDATION_WINDOW, url_validation_re())
        {
            issues.push(make_issue(
                ctx.file,
                i + 1,
                line,
                IssueType::SsrfVulnerability,
                Severity::Error,
                0.85,
                "Outbound request built from request data without URL validation",
                "Validate the target against an allowlist before fetching",
            ));
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scan_source(source: &str) -> Vec<Issue> {
        let path = PathBuf::from("app.js");
        let ctx = PatternContext::new(&path, source);
        scan(&ctx)
    }

    #[test]
    fn test_request_derived_fetch() {
        let issues = scan_source("const r = await fetch(req.query.url);\n");
        assert!(issues
            .iter()
            .any(|i| i.issue_type == IssueType::SsrfVulnerability
                && i.severity == Severity::Error));
    }

    #[test]
    fn test_validated_fetch_clean() {
        let issues = scan_source(
            "if (!validateUrl(req.query.url)) return;\nconst r = await fetch(req.query.url);\n",
        );
        assert!(issues.iter().all(|i| i.severity != Severity::Error));
    }

    #[test]
    fn test_dangerous_scheme() {
        let issues = scan_source("const target = 'gopher://internal:70/_stats';\n");
        assert!(!issues.is_empty());
    }
}
