//! Insecure design and logging failure patterns.

use super::filters::PatternContext;
use super::make_issue;
use crate::taint::types::{Issue, IssueType, Severity};
use regex::Regex;
use std::sync::OnceLock;

fn sensitive_route_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r#"app\.(?:get|post|put|delete)\(\s*['"][^'"]*(?:login|auth|password|reset)"#)
            .expect("Invalid route regex")
    })
}

fn rate_limit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"(?i)rate.?limit|slowdown|throttle").expect("Invalid rate limit regex")
    })
}

fn sql_from_request_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:select|insert|update|delete)\b.*\$\{\s*req\.(?:params|query|body)")
            .expect("Invalid SQL-from-request regex")
    })
}

fn admin_flag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"(?i)is_?admin\s*=\s*(?:req\.|true)").expect("Invalid admin flag regex")
    })
}

fn log_request_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"(?:console|logger|log|winston|pino)\s*\.\s*\w+\s*\(.*\breq\.")
            .expect("Invalid request log regex")
    })
}

fn log_secret_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:console|logger|log|winston|pino)\s*\.\s*\w+\s*\(.*(?:password|secret|token|api_?key)",
        )
        .expect("Invalid secret log regex")
    })
}

fn log_newline_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"(?:console|logger|log)\s*\.\s*\w+\s*\(.*\\n.*\+")
            .expect("Invalid newline log regex")
    })
}

/// Scans for insecure design and unsafe logging.
#[must_use]
pub fn scan(ctx: &PatternContext<'_>) -> Vec<Issue> {
    let mut issues = Vec::new();

    for (i, line) in ctx.lines.iter().enumerate() {
        // Insecure design rules use the full skip set.
        if !ctx.is_skipped(i) {
            if sensitive_route_re().is_match(line) && !ctx.window_matches(i, 3, rate_limit_re()) {
                issues.push(make_issue(
                    ctx.file,
                    i + 1,
                    line,
                    IssueType::InsecureDesign,
                    Severity::Warning,
                    0.7,
                    "Authentication route without rate limiting",
                    "Apply a rate limiter to credential endpoints",
                ));
            }
            if sql_from_request_re().is_match(line) {
                issues.push(make_issue(
                    ctx.file,
                    i + 1,
                    line,
                    IssueType::InsecureDesign,
                    Severity::Error,
                    0.85,
                    "Request field interpolated directly into SQL",
                    "Bind request values as query parameters",
                ));
            }
            if admin_flag_re().is_match(line) {
                issues.push(make_issue(
                    ctx.file,
                    i + 1,
                    line,
                    IssueType::InsecureDesign,
                    Severity::Warning,
                    0.75,
                    "Admin flag set without a server-side check",
                    "Derive privilege from the session, never the request",
                ));
            }
        }

        // Logging rules must see logger calls, so they use the weaker skip.
        if !ctx.is_skipped_for_logging(i) {
            if log_secret_re().is_match(line) {
                issues.push(make_issue(
                    ctx.file,
                    i + 1,
                    line,
                    IssueType::LoggingFailure,
                    Severity::Warning,
                    0.8,
                    "Secret material written to the log",
                    "Redact credentials before logging",
                ));
            } else if log_request_re().is_match(line) {
                issues.push(make_issue(
                    ctx.file,
                    i + 1,
                    line,
                    IssueType::LoggingFailure,
                    Severity::Info,
                    0.7,
                    "Raw request data written to the log",
                    "Log validated fields, not raw request objects",
                ));
            } else if log_newline_re().is_match(line) {
                issues.push(make_issue(
                    ctx.file,
                    i + 1,
                    line,
                    IssueType::LoggingFailure,
                    Severity::Info,
                    0.65,
                    "Unescaped newline concatenated into a log message",
                    "Strip newlines from interpolated values to prevent log forging",
                ));
            }
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
    fn test_login_route_without_rate_limit() {
        let issues = scan_source("app.post('/login', (req, res) => {});\n");
        assert!(issues
            .iter()
            .any(|i| i.issue_type == IssueType::InsecureDesign));
    }

    #[test]
    fn test_rate_limited_route_clean() {
        let issues =
            scan_source("const limiter = rateLimit({});\napp.post('/login', limiter, h);\n");
        assert!(issues
            .iter()
            .all(|i| i.issue_type != IssueType::InsecureDesign));
    }

    #[test]
    fn test_secret_in_log() {
        let issues = scan_source("logger.info('user password: ' + password);\n");
        assert!(issues
            .iter()
            .any(|i| i.issue_type == IssueType::LoggingFailure));
    }

    #[test]
    fn test_request_in_log() {
        let issues = scan_source("console.log(req.body);\n");
        assert!(issues
            .iter()
            .any(|i| i.issue_type == IssueType::LoggingFailure));
    }
}
