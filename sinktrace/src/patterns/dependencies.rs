//! Known-vulnerable dependency patterns.

use super::filters::PatternContext;
use super::make_issue;
use crate::taint::types::{Issue, IssueType, Severity};
use regex::Regex;
use std::sync::OnceLock;

struct DependencyPattern {
    regex: Regex,
    message: &'static str,
}

fn patterns() -> &'static Vec<DependencyPattern> {
    static PATTERNS: OnceLock<Vec<DependencyPattern>> = OnceLock::new();
    #[allow(clippy::unwrap_used)]
    PATTERNS.get_or_init(|| {
        vec![
            DependencyPattern {
                regex: Regex::new(r#"require\(\s*['"]lodash@4\.17\.[0-4]['"]"#).unwrap(),
                message: "lodash 4.17.0-4.17.4 has known prototype pollution issues",
            },
            DependencyPattern {
                regex: Regex::new(r#"require\(\s*['"]express@[23]\."#).unwrap(),
                message: "express 2.x/3.x is end-of-life and unpatched",
            },
            DependencyPattern {
                regex: Regex::new(r#"require\(\s*['"]minimist@0\.0\.[0-8]['"]"#).unwrap(),
                message: "minimist 0.0.0-0.0.8 has known prototype pollution issues",
            },
            DependencyPattern {
                regex: Regex::new(r"process\.version\s*[.<=!]*\s*.*['\x22]v?[04]\.").unwrap(),
                message: "Runtime check pins an end-of-life Node.js version",
            },
        ]
    })
}

/// Scans for pinned vulnerable dependency versions.
#[must_use]
pub fn scan(ctx: &PatternContext<'_>) -> Vec<Issue> {
    let mut issues = Vec::new();
    for (i, line) in ctx.lines.iter().enumerate() {
        // Requires double as import lines; this category must still see
        // them, so only blank/comment skips apply.
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") || trimmed.starts_with('*') {
            continue;
        }
        for pattern in patterns() {
            if pattern.regex.is_match(line) {
                issues.push(make_issue(
                    ctx.file,
                    i + 1,
                    line,
                    IssueType::VulnerableDependency,
                    Severity::Warning,
                    0.85,
                    pattern.message,
                    "Upgrade to a patched release",
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

    #[test]
    fn test_old_lodash() {
        let path = PathBuf::from("app.js");
        let ctx = PatternContext::new(&path, "const _ = require('lodash@4.17.3');\n");
        let issues = scan(&ctx);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::VulnerableDependency);
    }

    #[test]
    fn test_current_lodash_clean() {
        let path = PathBuf::from("app.js");
        let ctx = PatternContext::new(&path, "const _ = require('lodash');\n");
        assert!(scan(&ctx).is_empty());
    }
}
