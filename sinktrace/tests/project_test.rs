//! Project-level analysis tests over temporary directory trees.

use sinktrace::analyzer::Sinktrace;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const VULNERABLE: &str = r"function h(req) {
  const id = req.params.id;
  mysql.query(`SELECT * FROM users WHERE id = ${id}`);
}
";

const SAFE: &str = r"function add(a, b) {
  return a + b;
}
";

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

#[test]
fn test_project_aggregation() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/app.js", VULNERABLE);
    write(dir.path(), "src/util.js", SAFE);

    let result = Sinktrace::default().analyze_project(dir.path()).unwrap();
    assert_eq!(result.total_files, 2);
    assert_eq!(result.analyzed_files, 2);
    assert!(result.issues_by_type.contains_key("sql-injection"));
    assert_eq!(result.critical_files.len(), 1);
    assert!(result.critical_files[0].ends_with("src/app.js"));
    assert!(!result.detected_taints.is_empty());
}

#[test]
fn test_excluded_directories_skipped() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/app.js", SAFE);
    write(dir.path(), "node_modules/dep/index.js", VULNERABLE);
    write(dir.path(), "dist/bundle.js", VULNERABLE);
    write(dir.path(), "build/out.js", VULNERABLE);

    let result = Sinktrace::default().analyze_project(dir.path()).unwrap();
    assert_eq!(result.total_files, 1, "only src/app.js may be discovered");
    assert!(result.critical_files.is_empty());
}

#[test]
fn test_test_files_counted_but_clean() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/app.test.js", VULNERABLE);

    let result = Sinktrace::default().analyze_project(dir.path()).unwrap();
    assert_eq!(result.total_files, 1);
    assert_eq!(result.total_issues, 0);
}

#[test]
fn test_include_tests_flag() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/app.test.js", VULNERABLE);

    let analyzer = Sinktrace::default().with_tests(true);
    let result = analyzer.analyze_project(dir.path()).unwrap();
    assert!(result.total_issues > 0);
}

#[test]
fn test_broken_file_contained() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/broken.js", "function ( {{{\n");
    write(dir.path(), "src/app.js", VULNERABLE);

    let result = Sinktrace::default().analyze_project(dir.path()).unwrap();
    // The broken file is reported, not fatal, and the good file still
    // produces its finding.
    assert!(result.issues_by_type.contains_key("analysis-error"));
    assert!(result.issues_by_type.contains_key("sql-injection"));
}

#[test]
fn test_missing_root_is_discovery_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    let err = Sinktrace::default().analyze_project(&missing).unwrap_err();
    assert!(err.to_string().contains("discovery"));
}

#[test]
fn test_deterministic_histogram() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/a.js", VULNERABLE);
    write(dir.path(), "src/b.js", VULNERABLE);

    let first = Sinktrace::default().analyze_project(dir.path()).unwrap();
    let second = Sinktrace::default().analyze_project(dir.path()).unwrap();
    assert_eq!(first.issues_by_type, second.issues_by_type);
    assert_eq!(first.critical_files, second.critical_files);
}

#[test]
fn test_extension_filter() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/app.ts", VULNERABLE);
    write(dir.path(), "src/view.tsx", SAFE);
    write(dir.path(), "src/readme.md", "# notes\n");
    write(dir.path(), "src/data.json", "{}\n");

    let result = Sinktrace::default().analyze_project(dir.path()).unwrap();
    assert_eq!(result.total_files, 2);
}

#[test]
fn test_count_files_matches_discovery() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/a.js", SAFE);
    write(dir.path(), "src/b.jsx", SAFE);
    let analyzer = Sinktrace::default();
    assert_eq!(analyzer.count_files(dir.path()), 2);
}
