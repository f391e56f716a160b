use crate::constants::{default_exclude_folders, test_file_re};
use rustc_hash::FxHashSet;

/// A utility struct to convert byte offsets to line and column numbers.
///
/// Tree-sitter reports byte offsets and zero-based points; findings are
/// reported with 1-based line/column which are more human-readable.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Stores the byte index of the start of each line.
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Creates a new `LineIndex` by scanning the source code for newlines.
    /// Uses byte iteration since '\n' is always a single byte in UTF-8.
    #[must_use]
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, byte) in source.as_bytes().iter().enumerate() {
            if *byte == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Converts a byte offset to a 1-indexed line number.
    #[must_use]
    pub fn line(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line + 1,
            Err(line) => line,
        }
    }

    /// Converts a byte offset to a 1-indexed `(line, column)` pair.
    #[must_use]
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = self.line(offset);
        let start = self.line_starts.get(line - 1).copied().unwrap_or(0);
        (line, offset.saturating_sub(start) + 1)
    }
}

/// Detects lines with a `sinktrace: ignore` comment.
///
/// Returns a set of line numbers (1-indexed) whose findings should be
/// suppressed. This allows users to silence false positives inline.
#[must_use]
pub fn get_ignored_lines(source: &str) -> FxHashSet<usize> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| line.contains("sinktrace: ignore"))
        .map(|(i, _)| i + 1)
        .collect()
}

/// Checks if a path looks like a test file.
#[must_use]
pub fn is_test_path(p: &str) -> bool {
    test_file_re().is_match(p)
}

/// Checks if a name matches any exclusion pattern.
/// Supports exact matching and wildcard patterns starting with `*.`.
#[must_use]
pub fn is_excluded(name: &str, excludes: &[String]) -> bool {
    for exclude in excludes {
        if exclude.starts_with("*.") {
            if name.ends_with(&exclude[1..]) {
                return true;
            }
        } else if name == exclude {
            return true;
        }
    }
    false
}

/// Parses exclude folders, combining defaults with user inputs.
#[must_use]
pub fn parse_exclude_folders(
    user_exclude_folders: &[String],
    use_defaults: bool,
    include_folders: &[String],
) -> Vec<String> {
    let mut exclude_folders: FxHashSet<String> = FxHashSet::default();

    if use_defaults {
        for folder in default_exclude_folders() {
            exclude_folders.insert((*folder).to_owned());
        }
    }

    exclude_folders.extend(user_exclude_folders.iter().cloned());

    for folder in include_folders {
        exclude_folders.remove(folder);
    }

    let mut out: Vec<String> = exclude_folders.into_iter().collect();
    out.sort();
    out
}

/// Normalizes a path for CLI display.
///
/// - Converts backslashes to forward slashes (for cross-platform consistency)
/// - Strips leading "./" or ".\" prefix (for cleaner output)
#[must_use]
pub fn normalize_display_path(path: &std::path::Path) -> String {
    let s = path.to_string_lossy();
    let clean = s.trim_start_matches(r"\\?\");
    let normalized = clean.replace('\\', "/");
    normalized
        .strip_prefix("./")
        .unwrap_or(&normalized)
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index_basic() {
        let index = LineIndex::new("ab\ncd\nef");
        assert_eq!(index.line_col(0), (1, 1));
        assert_eq!(index.line_col(3), (2, 1));
        assert_eq!(index.line_col(7), (3, 2));
    }

    #[test]
    fn test_ignored_lines() {
        let source = "const a = 1;\nconst b = eval(x); // sinktrace: ignore\n";
        let ignored = get_ignored_lines(source);
        assert!(ignored.contains(&2));
        assert!(!ignored.contains(&1));
    }

    #[test]
    fn test_test_path_detection() {
        assert!(is_test_path("src/handlers/user.test.ts"));
        assert!(is_test_path("tests/integration.js"));
        assert!(is_test_path("__tests__/app.spec.tsx"));
        assert!(!is_test_path("src/server.ts"));
    }

    #[test]
    fn test_excluded_wildcards() {
        let excludes = vec!["node_modules".to_owned(), "*.min.js".to_owned()];
        assert!(is_excluded("node_modules", &excludes));
        assert!(is_excluded("vendor.min.js", &excludes));
        assert!(!is_excluded("src", &excludes));
    }
}
