use regex::Regex;
use rustc_hash::FxHashSet;
use std::sync::OnceLock;

/// File extensions accepted by the analyzer.
pub const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];

/// Maximum depth of the breadth-first search over constraints.
pub const MAX_FLOW_DEPTH: usize = 8;

/// Iteration cap for the constraint solver fixpoint loop.
pub const MAX_SOLVER_ITERATIONS: usize = 100;

/// Maximum byte gap between a JSDoc block and the declaration it annotates.
pub const JSDOC_ATTACH_WINDOW: usize = 300;

/// Regex for identifying test files by path.
///
/// # Panics
///
/// Panics if the regex pattern is invalid.
pub fn test_file_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(
            r"(?:^|[/\\])(?:tests?|__tests__|__mocks__)[/\\]|\.(?:test|spec)\.[jt]sx?$|[/\\](?:sample|demo|fixture|example)s?[/\\]",
        )
        .expect("Invalid test file regex pattern")
    })
}

/// Regex for identifying test-framework calls inside a source body.
///
/// # Panics
///
/// Panics if the regex pattern is invalid.
pub fn test_framework_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"\b(?:describe|it|test|beforeEach|afterEach|expect)\s*\(|\bjest\.|require\(['\x22]mocha['\x22]\)")
            .expect("Invalid test framework regex pattern")
    })
}

/// Set of folders to exclude by default.
pub fn default_exclude_folders() -> &'static FxHashSet<&'static str> {
    static SET: OnceLock<FxHashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        let mut s = FxHashSet::default();
        s.insert("node_modules");
        s.insert("dist");
        s.insert("build");
        s.insert(".git");
        s.insert("coverage");
        s.insert(".next");
        s.insert("out");
        s
    })
}

/// Function names recognized as sanitizers.
///
/// A call through one of these names converts a tainted value into a
/// sanitized one for both the flow tracer and the solver.
pub fn sanitizer_names() -> &'static FxHashSet<&'static str> {
    static SET: OnceLock<FxHashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        let mut s = FxHashSet::default();
        s.insert("sanitize");
        s.insert("sanitizeInput");
        s.insert("clean");
        s.insert("escape");
        s.insert("validate");
        s.insert("filter");
        s.insert("purify");
        s
    })
}

/// Returns true when a dotted call name ends in a recognized sanitizer.
#[must_use]
pub fn is_sanitizer_name(name: &str) -> bool {
    let last = name.rsplit('.').next().unwrap_or(name);
    sanitizer_names().contains(last)
        || last.to_lowercase().starts_with("sanitize")
        || last.to_lowercase().starts_with("escape")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitizer_names() {
        assert!(is_sanitizer_name("sanitize"));
        assert!(is_sanitizer_name("validator.escape"));
        assert!(is_sanitizer_name("sanitizeHtml"));
        assert!(!is_sanitizer_name("query"));
    }
}
