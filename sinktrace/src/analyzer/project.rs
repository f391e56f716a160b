//! Project-level analysis: discovery, parallel processing, aggregation.

use super::types::{build_taint_summaries, CoverageStats, ProjectAnalysisResult};
use super::{AnalysisResult, Sinktrace};
use crate::constants::SOURCE_EXTENSIONS;
use crate::error::AnalysisError;
use crate::taint::types::{Issue, IssueType, Location, RiskLevel, Severity};
use crate::utils::{is_excluded, parse_exclude_folders};
use ignore::WalkBuilder;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

/// Number of files to process per chunk in parallel processing.
/// Bounds concurrent memory usage on very large trees.
const CHUNK_SIZE: usize = 500;

impl Sinktrace {
    /// Analyzes every source file under a project root.
    ///
    /// Per-file failures are contained in that file's issues; only a
    /// failed discovery makes this return an error.
    ///
    /// # Errors
    /// Returns [`AnalysisError::Discovery`] when the root cannot be
    /// walked.
    pub fn analyze_project(&self, root: &Path) -> Result<ProjectAnalysisResult, AnalysisError> {
        self.analyze_project_detailed(root).map(|(summary, _)| summary)
    }

    /// Analyzes every file and also returns the per-file results, for
    /// callers that render individual findings.
    ///
    /// # Errors
    /// Returns [`AnalysisError::Discovery`] when the root cannot be
    /// walked.
    pub fn analyze_project_detailed(
        &self,
        root: &Path,
    ) -> Result<(ProjectAnalysisResult, Vec<(PathBuf, AnalysisResult)>), AnalysisError> {
        let start = Instant::now();

        if !root.exists() {
            return Err(AnalysisError::Discovery {
                root: root.to_path_buf(),
                message: "path does not exist".to_owned(),
            });
        }

        let files = self.collect_source_files(root);
        let total_files = files.len();

        let mut file_results: Vec<(PathBuf, AnalysisResult)> = Vec::with_capacity(total_files);
        for chunk in files.chunks(CHUNK_SIZE) {
            let chunk_results: Vec<(PathBuf, AnalysisResult)> = chunk
                .par_iter()
                .map(|path| (path.clone(), self.process_file(path)))
                .collect();
            file_results.extend(chunk_results);
        }

        let mut issues_by_type: BTreeMap<IssueType, usize> = BTreeMap::new();
        let mut by_type_display: BTreeMap<String, usize> = BTreeMap::new();
        let mut critical_files: Vec<PathBuf> = Vec::new();
        let mut coverage = CoverageStats::default();
        let mut total_issues = 0;
        let mut analyzed_files = 0;

        for (path, result) in &file_results {
            let failed = result
                .issues
                .iter()
                .any(|i| i.issue_type == IssueType::AnalysisError);
            if !failed {
                analyzed_files += 1;
            }
            total_issues += result.issues.len();
            for issue in &result.issues {
                *issues_by_type.entry(issue.issue_type).or_insert(0) += 1;
                *by_type_display
                    .entry(issue.issue_type.to_string())
                    .or_insert(0) += 1;
            }
            if result
                .issues
                .iter()
                .any(|i| i.risk == Some(RiskLevel::Critical))
            {
                critical_files.push(path.clone());
            }
            coverage.annotated += result.coverage.annotated;
            coverage.inferred += result.coverage.inferred;
            coverage.total += result.coverage.total;
        }

        let detected_taints = build_taint_summaries(&issues_by_type, total_issues);

        let summary = ProjectAnalysisResult {
            total_files,
            analyzed_files,
            total_issues,
            issues_by_type: by_type_display,
            critical_files,
            coverage,
            analysis_time_ms: start.elapsed().as_millis(),
            detected_taints,
        };
        Ok((summary, file_results))
    }

    fn process_file(&self, path: &Path) -> AnalysisResult {
        let result = match std::fs::read_to_string(path) {
            Ok(source) => self.analyze_source(&source, path),
            Err(e) => {
                debug!(file = %path.display(), error = %e, "failed to read source file");
                let mut result = AnalysisResult::default();
                result.issues.push(Issue {
                    issue_type: IssueType::AnalysisError,
                    severity: Severity::Warning,
                    message: format!("failed to read file: {e}"),
                    location: Location::new(path.to_path_buf(), 1, 1, 0),
                    suggestion: None,
                    function_name: None,
                    risk: None,
                    confidence: 1.0,
                });
                result.statistics.issues_found = 1;
                result
            }
        };
        if let Some(ref pb) = self.progress_bar {
            pb.inc(1);
        }
        result
    }

    /// Collects the project's source files in deterministic
    /// directory-traversal order, honoring gitignore files plus the
    /// configured exclusions.
    pub(crate) fn collect_source_files(&self, root: &Path) -> Vec<PathBuf> {
        let excludes = parse_exclude_folders(&self.exclude_folders, true, &self.include_folders);
        let extensions: FxHashSet<&str> = SOURCE_EXTENSIONS.iter().copied().collect();

        let walker = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .filter_entry(move |entry| {
                let name = entry.file_name().to_string_lossy();
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                !(is_dir && is_excluded(&name, &excludes))
            })
            .build();

        let mut files: Vec<PathBuf> = walker
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
            .map(|entry| entry.path().to_path_buf())
            .filter(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| extensions.contains(e))
            })
            .collect();

        files.sort();
        files
    }
}
