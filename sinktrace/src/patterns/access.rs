//! Access-control and authentication failure patterns.

use super::filters::PatternContext;
use super::make_issue;
use crate::taint::types::{Issue, IssueType, Severity};
use regex::Regex;
use std::sync::OnceLock;

const AUTH_WINDOW: usize = 2;

fn auth_check_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"isAuthenticated|requireAuth|authorize|verified|protected")
            .expect("Invalid auth check regex")
    })
}

fn file_from_request_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"(?:sendFile|readFile\w*|writeFile\w*)\s*\(.*\breq\b")
            .expect("Invalid file-from-request regex")
    })
}

fn admin_route_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r#"app\.\w+\(\s*['"][^'"]*admin"#).expect("Invalid admin route regex")
    })
}

fn role_from_request_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"(?i)\brole\s*=\s*req\.").expect("Invalid role regex")
    })
}

fn session_from_request_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"(?i)session_?id\s*=\s*req\.").expect("Invalid session regex")
    })
}

fn weak_password_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r#"(?i)password\s*===?\s*['"][^'"]{1,7}['"]"#).expect("Invalid password regex")
    })
}

fn short_password_check_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"password\.length\s*[<>]=?\s*[1-7]\b").expect("Invalid length regex")
    })
}

fn random_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"Math\.random\(\)\.toString\(").expect("Invalid token regex")
    })
}

fn env_bypass_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"(?i)if\s*\(\s*process\.env\.\w*(?:skip|bypass|noauth|debug)\w*")
            .expect("Invalid bypass regex")
    })
}

/// Scans for missing access control and weak authentication.
#[must_use]
pub fn scan(ctx: &PatternContext<'_>) -> Vec<Issue> {
    let mut issues = Vec::new();

    for (i, line) in ctx.lines.iter().enumerate() {
        if ctx.is_skipped(i) {
            continue;
        }

        // Access-control findings are suppressed when an auth check sits
        // within two lines.
        let guarded = ctx.window_matches(i, AUTH_WINDOW, auth_check_re());
        if !guarded {
            if file_from_request_re().is_match(line) {
                issues.push(make_issue(
                    ctx.file,
                    i + 1,
                    line,
                    IssueType::AccessControlFailure,
                    Severity::Error,
                    0.8,
                    "File operation driven by request data without an auth check",
                    "Verify the caller's permission before touching the filesystem",
                ));
            }
            if admin_route_re().is_match(line) {
                issues.push(make_issue(
                    ctx.file,
                    i + 1,
                    line,
                    IssueType::AccessControlFailure,
                    Severity::Warning,
                    0.75,
                    "Admin route without a visible auth check",
                    "Gate admin routes behind authentication middleware",
                ));
            }
            if role_from_request_re().is_match(line) || session_from_request_re().is_match(line) {
                issues.push(make_issue(
                    ctx.file,
                    i + 1,
                    line,
                    IssueType::AccessControlFailure,
                    Severity::Error,
                    0.8,
                    "Privilege or session identity taken from the request",
                    "Resolve roles and sessions server-side",
                ));
            }
        }

        if weak_password_re().is_match(line) || short_password_check_re().is_match(line) {
            issues.push(make_issue(
                ctx.file,
                i + 1,
                line,
                IssueType::AuthenticationFailure,
                Severity::Warning,
                0.8,
                "Weak password policy",
                "Require at least 8 characters and compare against hashes",
            ));
        }
        if random_token_re().is_match(line) {
            issues.push(make_issue(
                ctx.file,
                i + 1,
                line,
                IssueType::AuthenticationFailure,
                Severity::Error,
                0.85,
                "Math.random() used to mint a token",
                "Use crypto.randomBytes() for session tokens",
            ));
        }
        if env_bypass_re().is_match(line) {
            issues.push(make_issue(
                ctx.file,
                i + 1,
                line,
                IssueType::AuthenticationFailure,
                Severity::Warning,
                0.75,
                "Environment variable bypasses authentication",
                "Remove auth bypass switches from production code",
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
    fn test_sendfile_from_request() {
        let issues = scan_source("res.sendFile(req.params.name);\n");
        assert!(issues
            .iter()
            .any(|i| i.issue_type == IssueType::AccessControlFailure));
    }

    #[test]
    fn test_guarded_sendfile_clean() {
        let issues =
            scan_source("if (!req.isAuthenticated()) return;\nres.sendFile(req.params.name);\n");
        assert!(issues
            .iter()
            .all(|i| i.issue_type != IssueType::AccessControlFailure));
    }

    #[test]
    fn test_weak_password_literal() {
        let issues = scan_source("if (password === 'admin') {}\n");
        assert!(issues
            .iter()
            .any(|i| i.issue_type == IssueType::AuthenticationFailure));
    }

    #[test]
    fn test_random_token() {
        let issues = scan_source("const token = Math.random().toString(36).slice(2);\n");
        assert!(issues
            .iter()
            .any(|i| i.issue_type == IssueType::AuthenticationFailure));
    }
}
