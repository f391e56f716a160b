//! Dangerous sink detection.
//!
//! Identifies call and `new` expressions where tainted data causes a
//! vulnerability: query execution, command execution, dynamic code, file
//! I/O, response writes and DOM writes.

use super::types::{DangerousFunction, Location, RiskLevel, SinkKind, TaintSink};
use crate::ast::{CallExpr, Event};
use rustc_hash::FxHashSet;
use std::path::Path;

/// List of sink name fragments for quick lookup.
pub static SINK_PATTERNS: &[&str] = &[
    "query",
    "execute",
    "exec",
    "execSync",
    "spawn",
    "spawnSync",
    "eval",
    "Function",
    "readFile",
    "readFileSync",
    "writeFile",
    "writeFileSync",
    "appendFile",
    "send",
    "write",
    "writeln",
    "end",
];

/// Detects every dangerous sink in a file's events.
#[must_use]
pub fn detect_sinks(file: &Path, events: &[Event], custom_sinks: &[String]) -> Vec<TaintSink> {
    let mut sinks = Vec::new();
    let mut seen: FxHashSet<(usize, usize, String)> = FxHashSet::default();

    for event in events {
        let Event::Call(call) = event else {
            continue;
        };
        let Some((kind, category, risk, confidence, danger_index)) =
            classify_sink(call, custom_sinks)
        else {
            continue;
        };
        let key = (call.span.line, call.span.column, call.function.clone());
        if !seen.insert(key) {
            continue;
        }
        sinks.push(TaintSink {
            kind,
            category: category.to_owned(),
            location: Location::new(
                file.to_path_buf(),
                call.span.line,
                call.span.column,
                call.span.length(),
            ),
            function: DangerousFunction {
                function_name: call.function.clone(),
                object_name: call.object.clone(),
                arguments: call.args.iter().map(|a| a.text.clone()).collect(),
                dangerous_parameter_index: danger_index,
            },
            risk_level: risk,
            confidence,
        });
    }

    sinks
}

#[allow(clippy::type_complexity)]
fn classify_sink(
    call: &CallExpr,
    custom_sinks: &[String],
) -> Option<(SinkKind, &'static str, RiskLevel, f64, usize)> {
    let function = call.function.as_str();

    // `new Function(...)` compiles its last argument as code.
    if call.is_new {
        if function == "Function" {
            let last = call.args.len().saturating_sub(1);
            return Some((
                SinkKind::CodeInjection,
                "dynamic-code",
                RiskLevel::Critical,
                0.95,
                last,
            ));
        }
        return None;
    }

    match call.object.as_deref() {
        None => match function {
            "query" | "execute" => {
                Some((SinkKind::SqlInjection, "sql", RiskLevel::Critical, 0.9, 0))
            }
            "readFile" | "readFileSync" => Some((
                SinkKind::PathTraversal,
                "filesystem",
                RiskLevel::High,
                0.85,
                0,
            )),
            "writeFile" | "writeFileSync" => {
                Some((SinkKind::FileWrite, "filesystem", RiskLevel::High, 0.85, 0))
            }
            "exec" | "execSync" | "spawn" | "spawnSync" => Some((
                SinkKind::CommandInjection,
                "command",
                RiskLevel::Critical,
                0.95,
                0,
            )),
            "eval" | "Function" => Some((
                SinkKind::CodeInjection,
                "dynamic-code",
                RiskLevel::Critical,
                0.95,
                0,
            )),
            _ => classify_custom(call, custom_sinks),
        },
        Some(object) => match (object, function) {
            // Query execution on any receiver; db/connection/pool are the
            // documented common cases.
            (_, "query" | "execute") => {
                Some((SinkKind::SqlInjection, "sql", RiskLevel::Critical, 0.9, 0))
            }
            ("fs", "readFile" | "readFileSync" | "createReadStream") => Some((
                SinkKind::PathTraversal,
                "filesystem",
                RiskLevel::High,
                0.85,
                0,
            )),
            ("fs", "writeFile" | "writeFileSync" | "appendFile" | "appendFileSync") => {
                Some((SinkKind::FileWrite, "filesystem", RiskLevel::High, 0.85, 0))
            }
            ("res" | "response", "send" | "write" | "end") => Some((
                SinkKind::Xss,
                "http-response",
                RiskLevel::High,
                0.85,
                0,
            )),
            ("document", "write" | "writeln") => {
                Some((SinkKind::Xss, "dom-write", RiskLevel::High, 0.9, 0))
            }
            ("child_process" | "cp", "exec" | "execSync" | "spawn" | "spawnSync") => Some((
                SinkKind::CommandInjection,
                "command",
                RiskLevel::Critical,
                0.95,
                0,
            )),
            _ => classify_custom(call, custom_sinks),
        },
    }
}

fn classify_custom(
    call: &CallExpr,
    custom_sinks: &[String],
) -> Option<(SinkKind, &'static str, RiskLevel, f64, usize)> {
    let dotted = call.dotted_name();
    if custom_sinks
        .iter()
        .any(|p| *p == dotted || *p == call.function)
    {
        return Some((SinkKind::CodeInjection, "custom", RiskLevel::High, 0.8, 0));
    }
    None
}

/// Suggested remediation for a sink kind.
#[must_use]
pub fn remediation(kind: SinkKind) -> &'static str {
    match kind {
        SinkKind::SqlInjection => {
            "Use parameterized queries: db.query('... WHERE id = ?', [value])"
        }
        SinkKind::PathTraversal => {
            "Validate and normalize file paths; reject '..' segments and absolute paths"
        }
        SinkKind::CommandInjection => {
            "Avoid shell interpolation; pass arguments as an array to spawn()"
        }
        SinkKind::Xss => "Escape user input before writing it into a response or the DOM",
        SinkKind::CodeInjection => "Never evaluate user-controlled strings as code",
        SinkKind::FileWrite => "Validate target paths and written content before file writes",
    }
}
