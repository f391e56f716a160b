//! Skip filters for the pattern matcher.
//!
//! Whole files are skipped when they are tests, samples or documentation
//! (relaxed to binary/auxiliary-only in benchmark mode). Individual lines
//! are skipped when they cannot meaningfully trigger a pattern: blanks,
//! comments, imports, type declarations, logger calls, string literals
//! naming a category, and lines inside a test-framework window.

use crate::constants::test_framework_re;
use crate::utils::is_test_path;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

const TEST_WINDOW: usize = 3;

fn import_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:import\b|export\s+\{|const\s+\w+\s*=\s*require\()")
            .expect("Invalid import regex")
    })
}

fn type_decl_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:type\s+\w+\s*=|interface\s+\w+|declare\s+)")
            .expect("Invalid type declaration regex")
    })
}

fn logger_call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:console|logger|log|winston|pino)\s*\.\s*\w+\s*\(")
            .expect("Invalid logger regex")
    })
}

fn category_literal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r#"(?i)['"][^'"]*(?:injection|xss|traversal|vulnerab|ssrf)[^'"]*['"]"#)
            .expect("Invalid category literal regex")
    })
}

/// Whole-file skip decision.
#[must_use]
pub fn should_skip_file(path: &Path, source: &str, benchmark: bool) -> bool {
    let path_str = path.to_string_lossy();
    if is_aux_file(&path_str) {
        return true;
    }
    if benchmark {
        return false;
    }
    if is_test_path(&path_str) {
        return true;
    }
    // A body that opens with test framework scaffolding is a test file
    // regardless of its name.
    let head: String = source.lines().take(40).collect::<Vec<_>>().join("\n");
    test_framework_re().find_iter(&head).count() >= 2
}

/// Minified bundles, type declaration files and source maps carry no
/// reviewable lines.
#[must_use]
pub fn is_aux_file(path: &str) -> bool {
    path.ends_with(".min.js")
        || path.ends_with(".d.ts")
        || path.ends_with(".map")
        || path.ends_with(".bundle.js")
}

/// Precomputed per-line skip decisions for one file.
pub struct PatternContext<'a> {
    /// File being scanned.
    pub file: &'a Path,
    /// All lines of the file.
    pub lines: Vec<&'a str>,
    skip: Vec<bool>,
    skip_keep_loggers: Vec<bool>,
}

impl<'a> PatternContext<'a> {
    /// Builds the context and computes skip flags.
    #[must_use]
    pub fn new(file: &'a Path, source: &'a str) -> Self {
        let lines: Vec<&str> = source.lines().collect();

        let near_test: Vec<bool> = {
            let hits: Vec<bool> = lines
                .iter()
                .map(|l| test_framework_re().is_match(l))
                .collect();
            (0..lines.len())
                .map(|i| {
                    let lo = i.saturating_sub(TEST_WINDOW);
                    let hi = (i + TEST_WINDOW).min(lines.len().saturating_sub(1));
                    hits[lo..=hi].iter().any(|h| *h)
                })
                .collect()
        };

        let mut skip = Vec::with_capacity(lines.len());
        let mut skip_keep_loggers = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            let base = trimmed.is_empty()
                || trimmed.starts_with("//")
                || trimmed.starts_with("/*")
                || trimmed.starts_with('*')
                || import_line_re().is_match(line)
                || type_decl_re().is_match(line)
                || category_literal_re().is_match(line)
                || near_test[i];
            skip_keep_loggers.push(base);
            skip.push(base || logger_call_re().is_match(line));
        }

        Self {
            file,
            lines,
            skip,
            skip_keep_loggers,
        }
    }

    /// Whether the zero-based line is skipped for general categories.
    #[must_use]
    pub fn is_skipped(&self, index: usize) -> bool {
        self.skip.get(index).copied().unwrap_or(true)
    }

    /// Whether the zero-based line is skipped for the logging category,
    /// which must still see logger calls.
    #[must_use]
    pub fn is_skipped_for_logging(&self, index: usize) -> bool {
        self.skip_keep_loggers.get(index).copied().unwrap_or(true)
    }

    /// Whether any line within `radius` of the zero-based index matches.
    #[must_use]
    pub fn window_matches(&self, index: usize, radius: usize, re: &Regex) -> bool {
        let lo = index.saturating_sub(radius);
        let hi = (index + radius).min(self.lines.len().saturating_sub(1));
        self.lines[lo..=hi].iter().any(|l| re.is_match(l))
    }
}
