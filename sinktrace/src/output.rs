//! Rich CLI output formatting with colored text and summary tables.

use crate::analyzer::{AnalysisResult, ProjectAnalysisResult};
use crate::taint::types::{Issue, Severity};
use crate::utils::normalize_display_path;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use std::io::Write;

fn severity_label(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::Error => "error".red().bold(),
        Severity::Warning => "warning".yellow().bold(),
        Severity::Info => "info".cyan(),
    }
}

/// Writes one issue as a single diagnostic line.
///
/// # Errors
/// Returns any I/O error from the writer.
pub fn write_issue(out: &mut impl Write, issue: &Issue) -> std::io::Result<()> {
    let path = normalize_display_path(&issue.location.file);
    writeln!(
        out,
        "{}:{}:{} {} [{}] {}",
        path.bold(),
        issue.location.line,
        issue.location.column,
        severity_label(issue.severity),
        issue.issue_type,
        issue.message,
    )?;
    if let Some(suggestion) = &issue.suggestion {
        writeln!(out, "    {} {}", "hint:".dimmed(), suggestion.dimmed())?;
    }
    Ok(())
}

/// Writes a per-file analysis report.
///
/// # Errors
/// Returns any I/O error from the writer.
pub fn write_file_report(out: &mut impl Write, result: &AnalysisResult) -> std::io::Result<()> {
    for issue in &result.issues {
        write_issue(out, issue)?;
    }
    writeln!(
        out,
        "\n{} issue(s), {} annotation(s) inferred in {} ms",
        result.statistics.issues_found,
        result.statistics.annotations_inferred,
        result.statistics.analysis_time_ms,
    )?;
    if !result.annotations.is_empty() {
        writeln!(out, "\n{}", "Inferred annotations:".bold())?;
        for (variable, qualifier) in &result.annotations {
            writeln!(out, "  {variable}: {qualifier}")?;
        }
    }
    Ok(())
}

/// Writes the project summary with the per-type taint table.
///
/// # Errors
/// Returns any I/O error from the writer.
pub fn write_project_report(
    out: &mut impl Write,
    result: &ProjectAnalysisResult,
) -> std::io::Result<()> {
    writeln!(
        out,
        "{} {} of {} file(s) analyzed, {} issue(s), {} ms",
        "sinktrace:".bold(),
        result.analyzed_files,
        result.total_files,
        result.total_issues,
        result.analysis_time_ms,
    )?;

    if !result.detected_taints.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["severity", "type", "count", "description"]);
        for summary in &result.detected_taints {
            table.add_row(vec![
                Cell::new(summary.severity.to_string()),
                Cell::new(summary.issue_type.to_string()),
                Cell::new(summary.count.to_string()),
                Cell::new(summary.description.clone()),
            ]);
        }
        writeln!(out, "{table}")?;
    }

    if !result.critical_files.is_empty() {
        writeln!(out, "\n{}", "Critical files:".red().bold())?;
        for file in &result.critical_files {
            writeln!(out, "  {}", normalize_display_path(file))?;
        }
    }

    if result.coverage.total > 0 {
        writeln!(
            out,
            "\nAnnotation coverage: {}/{} inferred, {} explicit",
            result.coverage.inferred, result.coverage.total, result.coverage.annotated,
        )?;
    }

    Ok(())
}
