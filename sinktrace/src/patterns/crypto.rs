//! Cryptographic failure patterns.

use super::filters::PatternContext;
use super::make_issue;
use crate::taint::types::{Issue, IssueType, Severity};
use regex::Regex;
use std::sync::OnceLock;

struct CryptoPattern {
    regex: Regex,
    message: &'static str,
    suggestion: &'static str,
    severity: Severity,
    confidence: f64,
}

fn patterns() -> &'static Vec<CryptoPattern> {
    static PATTERNS: OnceLock<Vec<CryptoPattern>> = OnceLock::new();
    #[allow(clippy::unwrap_used)]
    PATTERNS.get_or_init(|| {
        vec![
            CryptoPattern {
                regex: Regex::new(r#"createHash\(\s*['"](?:md5|sha1)['"]"#).unwrap(),
                message: "Weak hash algorithm (MD5/SHA-1)",
                suggestion: "Use SHA-256 or stronger",
                severity: Severity::Error,
                confidence: 0.9,
            },
            CryptoPattern {
                regex: Regex::new(r#"createCipheriv?\(\s*['"](?:des|rc4|[\w-]*ecb)[^'"]*['"]"#)
                    .unwrap(),
                message: "Weak cipher algorithm (DES/RC4/ECB)",
                suggestion: "Use AES-256-GCM",
                severity: Severity::Error,
                confidence: 0.9,
            },
            CryptoPattern {
                regex: Regex::new(
                    r"(?i)(?:key|token|secret|password|session|nonce)\w*\s*=.*Math\.random",
                )
                .unwrap(),
                message: "Math.random() used in a security-sensitive context",
                suggestion: "Use crypto.randomBytes() for keys and tokens",
                severity: Severity::Error,
                confidence: 0.85,
            },
            CryptoPattern {
                regex: Regex::new(
                    r#"(?i)(?:password|secret|private_?key)\w*\s*[:=]\s*['"][A-Za-z0-9+/=]{24,}['"]"#,
                )
                .unwrap(),
                message: "Hardcoded secret material",
                suggestion: "Load secrets from the environment or a vault",
                severity: Severity::Error,
                confidence: 0.8,
            },
            CryptoPattern {
                regex: Regex::new(r"http://[^\s'\x22]*(?:token|key|secret|password)=").unwrap(),
                message: "Secret transmitted over plain HTTP",
                suggestion: "Use HTTPS for any URL carrying credentials",
                severity: Severity::Error,
                confidence: 0.85,
            },
        ]
    })
}

/// Scans for cryptographic failures.
#[must_use]
pub fn scan(ctx: &PatternContext<'_>) -> Vec<Issue> {
    let mut issues = Vec::new();
    for (i, line) in ctx.lines.iter().enumerate() {
        if ctx.is_skipped(i) {
            continue;
        }
        for pattern in patterns() {
            if pattern.regex.is_match(line) {
                issues.push(make_issue(
                    ctx.file,
                    i + 1,
                    line,
                    IssueType::CryptographicFailure,
                    pattern.severity,
                    pattern.confidence,
                    pattern.message,
                    pattern.suggestion,
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
    fn test_md5_detected() {
        let issues = scan_source("const h = crypto.createHash('md5');\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::CryptographicFailure);
    }

    #[test]
    fn test_math_random_token() {
        let issues = scan_source("const sessionToken = Math.random().toString(36);\n");
        assert!(!issues.is_empty());
    }

    #[test]
    fn test_sha256_clean() {
        let issues = scan_source("const h = crypto.createHash('sha256');\n");
        assert!(issues.is_empty());
    }
}
