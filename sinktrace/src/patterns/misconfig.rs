//! Security misconfiguration and data integrity patterns.

use super::filters::PatternContext;
use super::make_issue;
use crate::taint::types::{Issue, IssueType, Severity};
use regex::Regex;
use std::sync::OnceLock;

fn cors_wildcard_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r#"Access-Control-Allow-Origin['"]?\s*[,:]\s*['"]\*"#)
            .expect("Invalid CORS regex")
    })
}

fn hardcoded_admin_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r#"(?i)const\s+\w*(?:admin_?password|secret)\w*\s*=\s*['"][^'"]+['"]"#)
            .expect("Invalid hardcoded admin regex")
    })
}

fn error_echo_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"res\.(?:send|json)\(\s*(?:err\b|error\b|\{\s*error:\s*err)")
            .expect("Invalid error echo regex")
    })
}

fn http_listen_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"http\.createServer|\.listen\(\s*80\b").expect("Invalid listen regex")
    })
}

fn unsafe_parse_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"JSON\.parse\(\s*(?:raw|req)\w*").expect("Invalid parse regex")
    })
}

fn unsafe_yaml_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"yaml\.load\(|\.unsafeLoad\(|deserialize\(\s*req")
            .expect("Invalid yaml regex")
    })
}

fn signature_disabled_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:verify|signature|rejectUnauthorized)\s*[:=]\s*false")
            .expect("Invalid signature regex")
    })
}

/// Scans for misconfiguration and integrity failures.
#[must_use]
pub fn scan(ctx: &PatternContext<'_>) -> Vec<Issue> {
    let mut issues = Vec::new();

    for (i, line) in ctx.lines.iter().enumerate() {
        if ctx.is_skipped(i) {
            continue;
        }

        if cors_wildcard_re().is_match(line) {
            issues.push(make_issue(
                ctx.file,
                i + 1,
                line,
                IssueType::SecurityMisconfiguration,
                Severity::Warning,
                0.85,
                "CORS allows any origin",
                "List the origins that actually need access",
            ));
        }
        if hardcoded_admin_re().is_match(line) {
            issues.push(make_issue(
                ctx.file,
                i + 1,
                line,
                IssueType::SecurityMisconfiguration,
                Severity::Error,
                0.85,
                "Hardcoded credential constant",
                "Move credentials into the environment",
            ));
        }
        if error_echo_re().is_match(line) {
            issues.push(make_issue(
                ctx.file,
                i + 1,
                line,
                IssueType::SecurityMisconfiguration,
                Severity::Info,
                0.7,
                "Raw error object echoed in the response",
                "Return a generic message and log the detail server-side",
            ));
        }
        if http_listen_re().is_match(line) {
            issues.push(make_issue(
                ctx.file,
                i + 1,
                line,
                IssueType::SecurityMisconfiguration,
                Severity::Info,
                0.6,
                "Server listening over plain HTTP",
                "Terminate TLS in front of the service",
            ));
        }

        if unsafe_parse_re().is_match(line) {
            issues.push(make_issue(
                ctx.file,
                i + 1,
                line,
                IssueType::DataIntegrityFailure,
                Severity::Warning,
                0.75,
                "Unvalidated data parsed as JSON",
                "Validate a schema after parsing untrusted input",
            ));
        }
        if unsafe_yaml_re().is_match(line) {
            issues.push(make_issue(
                ctx.file,
                i + 1,
                line,
                IssueType::DataIntegrityFailure,
                Severity::Error,
                0.85,
                "Unsafe deserialization of untrusted data",
                "Use a safe loader for untrusted documents",
            ));
        }
        if signature_disabled_re().is_match(line) {
            issues.push(make_issue(
                ctx.file,
                i + 1,
                line,
                IssueType::DataIntegrityFailure,
                Severity::Error,
                0.85,
                "Signature or certificate verification disabled",
                "Keep verification enabled outside local development",
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
    fn test_cors_wildcard() {
        let issues = scan_source("res.setHeader('Access-Control-Allow-Origin', '*');\n");
        assert!(issues
            .iter()
            .any(|i| i.issue_type == IssueType::SecurityMisconfiguration));
    }

    #[test]
    fn test_signature_disabled() {
        let issues = scan_source("const agent = new https.Agent({ rejectUnauthorized: false });\n");
        assert!(issues
            .iter()
            .any(|i| i.issue_type == IssueType::DataIntegrityFailure));
    }

    #[test]
    fn test_unsafe_json_parse() {
        let issues = scan_source("const data = JSON.parse(rawData);\n");
        assert!(issues
            .iter()
            .any(|i| i.issue_type == IssueType::DataIntegrityFailure));
    }
}
