//! CLI command execution.

use crate::analyzer::Sinktrace;
use crate::cli::Cli;
use crate::config::Config;
use crate::output::{write_file_report, write_issue, write_project_report};
use anyhow::Result;
use std::io::Write;
use std::path::Path;

/// Runs a scan over the CLI paths and returns the process exit code:
/// 0 for a clean run, 1 when critical findings exist, 2 on analysis
/// errors.
///
/// # Errors
/// Returns an error when output writing fails or a project root cannot
/// be walked.
pub fn run_scan(cli: &Cli, out: &mut impl Write) -> Result<i32> {
    let first_root = cli
        .paths
        .first()
        .cloned()
        .unwrap_or_else(|| Path::new(".").to_path_buf());
    let config = Config::load_from_path(&first_root);
    let fail_on_critical = config.sinktrace.fail_on_critical.unwrap_or(true);

    let analyzer = Sinktrace::from_config(config)
        .with_tests(cli.include_tests)
        .with_benchmark(cli.benchmark)
        .with_jaif(cli.jaif)
        .with_patterns(!cli.no_patterns)
        .with_inference(!cli.no_inference)
        .with_verbose(cli.verbose)
        .with_root(first_root.clone());
    let analyzer = if cli.exclude.is_empty() {
        analyzer
    } else {
        let mut folders = analyzer.exclude_folders.clone();
        folders.extend(cli.exclude.iter().cloned());
        analyzer.with_excludes(folders)
    };

    let mut critical = false;
    let mut errored = false;

    let paths = if cli.paths.is_empty() {
        vec![first_root]
    } else {
        cli.paths.clone()
    };

    for path in &paths {
        if path.is_file() {
            let source = std::fs::read_to_string(path)?;
            let result = analyzer.analyze_source(&source, path);
            critical |= result.has_critical();
            errored |= result
                .issues
                .iter()
                .any(|i| i.issue_type == crate::taint::IssueType::AnalysisError);
            if cli.json {
                writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?;
            } else {
                write_file_report(out, &result)?;
            }
        } else {
            let (summary, details) = analyzer.analyze_project_detailed(path)?;
            critical |= summary.has_critical();
            errored |= summary.has_analysis_errors();
            if cli.json {
                writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
            } else {
                for (_, result) in &details {
                    for issue in &result.issues {
                        write_issue(out, issue)?;
                    }
                }
                write_project_report(out, &summary)?;
            }
        }
    }

    if errored {
        Ok(2)
    } else if critical && fail_on_critical {
        Ok(1)
    } else {
        Ok(0)
    }
}
