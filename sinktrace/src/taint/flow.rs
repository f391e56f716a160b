//! Data-flow tracing from sources to sinks.
//!
//! For every (source, sink) pair the tracer attempts, in order: a direct
//! use check, a bounded breadth-first search over the extracted
//! constraints, parameter- and property-restricted searches, and a textual
//! line-scan fallback that recovers chains the constraint graph missed.
//! Each discovered path is scored for risk and confidence.

use super::constraints::ExtractionResult;
use super::sinks::remediation;
use super::types::{
    ConstraintKind, DataFlowPath, DataFlowStep, Location, RiskLevel, SinkKind, SourceCategory,
    StepKind, TaintSink, TaintSource, TaintStatus, TypeConstraint,
};
use crate::constants::{is_sanitizer_name, MAX_FLOW_DEPTH};
use regex::Regex;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::sync::OnceLock;

/// Everything the tracer needs about one file.
pub struct FlowContext<'a> {
    /// Raw source text, for the textual fallback and sanitization scan.
    pub source_text: &'a str,
    /// Extracted constraints and taint records.
    pub extraction: &'a ExtractionResult,
    /// Extra sanitizer names from configuration.
    pub custom_sanitizers: &'a [String],
}

/// Traces every (source, sink) pair and returns the discovered paths.
#[must_use]
pub fn trace_all(
    ctx: &FlowContext<'_>,
    sources: &[TaintSource],
    sinks: &[TaintSink],
) -> Vec<DataFlowPath> {
    let mut paths = Vec::new();
    for source in sources {
        for sink in sinks {
            if let Some(path) = trace_pair(ctx, source, sink) {
                paths.push(path);
            }
        }
    }
    paths
}

/// Attempts to connect one source to one sink.
#[must_use]
pub fn trace_pair(
    ctx: &FlowContext<'_>,
    source: &TaintSource,
    sink: &TaintSink,
) -> Option<DataFlowPath> {
    // Reported paths run forward in textual order.
    if sink.location.line < source.location.line {
        return None;
    }

    let start = source.variable_name.as_str();

    // 1. Direct use of the source variable at the sink.
    if uses_in_sink(start, sink) {
        let steps = vec![intro_step(source)];
        return Some(build_path(ctx, source, sink, steps));
    }

    let constraints = &ctx.extraction.constraints;

    // 2. General search over all constraints.
    let found = bfs(constraints, start, sink, |_| true)
        // 3. Parameter constraints feeding the sink's function.
        .or_else(|| {
            bfs(constraints, start, sink, |c| {
                c.kind == ConstraintKind::Parameter
                    && c.target.contains(sink.function.function_name.as_str())
            })
        })
        // 4. Property accesses that surface in the sink's arguments.
        .or_else(|| {
            bfs(constraints, start, sink, |c| {
                c.kind == ConstraintKind::PropertyAccess
                    && sink
                        .function
                        .arguments
                        .iter()
                        .any(|a| contains_identifier(a, &c.target) || a == &c.target)
            })
        });

    if let Some(indices) = found {
        let mut steps = vec![intro_step(source)];
        for &i in &indices {
            let c = &constraints[i];
            steps.push(DataFlowStep {
                kind: step_kind(c.kind),
                location: c.location.clone(),
                variable_name: c.target.clone(),
                description: c.description.clone(),
            });
        }
        // Steps past the sink would break textual ordering.
        steps.retain(|s| s.location.line <= sink.location.line);
        return Some(build_path(ctx, source, sink, steps));
    }

    // 5. Textual fallback over the lines between source and sink.
    let steps = textual_fallback(ctx, source, sink)?;
    Some(build_path(ctx, source, sink, steps))
}

fn intro_step(source: &TaintSource) -> DataFlowStep {
    DataFlowStep {
        kind: StepKind::Assignment,
        location: source.location.clone(),
        variable_name: source.variable_name.clone(),
        description: format!(
            "untrusted {} value enters via {}",
            source.category, source.api_call.function_name
        ),
    }
}

fn step_kind(kind: ConstraintKind) -> StepKind {
    match kind {
        ConstraintKind::Assignment => StepKind::Assignment,
        ConstraintKind::Parameter => StepKind::ParameterPassing,
        ConstraintKind::Return => StepKind::ReturnValue,
        ConstraintKind::PropertyAccess => StepKind::PropertyAccess,
        ConstraintKind::MethodCall => StepKind::MethodCall,
    }
}

/// Breadth-first search over constraints, bounded by [`MAX_FLOW_DEPTH`].
/// Returns the constraint indices of the shortest path whose final target
/// is used by the sink.
fn bfs(
    constraints: &[TypeConstraint],
    start: &str,
    sink: &TaintSink,
    filter: impl Fn(&TypeConstraint) -> bool,
) -> Option<Vec<usize>> {
    let mut visited: FxHashSet<String> = FxHashSet::default();
    visited.insert(start.to_owned());
    let mut queue: VecDeque<(String, Vec<usize>)> = VecDeque::new();
    queue.push_back((start.to_owned(), Vec::new()));

    while let Some((current, path)) = queue.pop_front() {
        if path.len() >= MAX_FLOW_DEPTH {
            continue;
        }
        for (i, c) in constraints.iter().enumerate() {
            if !filter(c) || !related(&current, &c.source) || visited.contains(&c.target) {
                continue;
            }
            let mut next = path.clone();
            next.push(i);
            if uses_in_sink(&c.target, sink) {
                return Some(next);
            }
            visited.insert(c.target.clone());
            queue.push_back((c.target.clone(), next));
        }
    }
    None
}

/// Whether a constraint source relates to the current variable: exact
/// match, dotted prefix either way, shared base object, or an identifier
/// occurrence inside a larger expression.
fn related(current: &str, candidate: &str) -> bool {
    if candidate == current {
        return true;
    }
    if candidate.strip_prefix(current).is_some_and(|r| r.starts_with('.'))
        || current.strip_prefix(candidate).is_some_and(|r| r.starts_with('.'))
    {
        return true;
    }
    if let (Some(b1), Some(b2)) = (base_object(current), base_object(candidate)) {
        if b1 == b2 {
            return true;
        }
    }
    contains_identifier(candidate, current)
}

fn base_object(name: &str) -> Option<&str> {
    if name.contains('.') {
        name.split('.').next()
    } else {
        None
    }
}

/// Finds `ident` inside `haystack` with identifier boundaries on both
/// sides, so `id` never matches inside `valid`.
fn contains_identifier(haystack: &str, ident: &str) -> bool {
    if ident.is_empty() {
        return false;
    }
    let bytes = haystack.as_bytes();
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(ident) {
        let begin = from + pos;
        let end = begin + ident.len();
        let left_ok = begin == 0 || !is_ident_byte(bytes[begin - 1]);
        let right_ok = end >= bytes.len() || !is_ident_byte(bytes[end]);
        if left_ok && right_ok {
            return true;
        }
        from = begin + 1;
    }
    false
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Whether a variable reaches the sink: as a full argument, a property
/// chain prefix, an interpolated substring, or the called function itself.
fn uses_in_sink(var: &str, sink: &TaintSink) -> bool {
    if sink.function.function_name == var {
        return true;
    }
    let args = &sink.function.arguments;
    // The argument at the dangerous position is checked like any other;
    // taint anywhere in the call is reported.
    args.iter().any(|arg| {
        arg == var
            || arg.strip_prefix(var).is_some_and(|r| r.starts_with('.'))
            || contains_identifier(arg, var)
    })
}

// ---------------------------------------------------------------------------
// Textual fallback
// ---------------------------------------------------------------------------

fn decl_call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*[A-Za-z_$][\w.$]*\s*\(")
            .expect("Invalid declaration-call regex")
    })
}

fn decl_alias_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*([A-Za-z_$][\w.$]*)\s*;?\s*$")
            .expect("Invalid alias regex")
    })
}

fn decl_template_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*`").expect("Invalid template regex")
    })
}

fn call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"[A-Za-z_$][\w.$]*\s*\(").expect("Invalid call regex")
    })
}

/// Scans the lines between source and sink for aliasing, function chaining
/// and interpolation, advancing the tracked variable until it reaches the
/// sink. This recovers chains like `userInput → temp1 → temp2 → sink`.
fn textual_fallback(
    ctx: &FlowContext<'_>,
    source: &TaintSource,
    sink: &TaintSink,
) -> Option<Vec<DataFlowStep>> {
    let lines: Vec<&str> = ctx.source_text.lines().collect();
    let lo = source.location.line;
    let hi = sink.location.line.min(lines.len());
    if hi < lo {
        return None;
    }

    let file = &source.location.file;
    let mut current = source.variable_name.clone();
    let mut steps = vec![intro_step(source)];

    for (number, line) in lines
        .iter()
        .enumerate()
        .map(|(i, l)| (i + 1, *l))
        .take(hi.saturating_sub(1))
        .skip(lo)
    {
        if !contains_identifier(line, &current) {
            continue;
        }
        // const next = fn(current): advance through the chain.
        if let Some(caps) = decl_call_re().captures(line) {
            let next = caps[1].to_owned();
            steps.push(DataFlowStep {
                kind: StepKind::ReturnValue,
                location: Location::new(file.clone(), number, 1, line.len()),
                variable_name: next.clone(),
                description: format!("{current} flows through a call into {next}"),
            });
            current = next;
            continue;
        }
        // const next = current: simple alias.
        if let Some(caps) = decl_alias_re().captures(line) {
            if &caps[2] == current.as_str()
                || caps[2].strip_prefix(current.as_str()).is_some_and(|r| r.starts_with('.'))
            {
                let next = caps[1].to_owned();
                steps.push(DataFlowStep {
                    kind: StepKind::Assignment,
                    location: Location::new(file.clone(), number, 1, line.len()),
                    variable_name: next.clone(),
                    description: format!("{current} aliased to {next}"),
                });
                current = next;
                continue;
            }
        }
        // const next = `...${current}...`: template interpolation.
        if let Some(caps) = decl_template_re().captures(line) {
            if line.contains(&format!("${{{current}}}")) {
                let next = caps[1].to_owned();
                steps.push(DataFlowStep {
                    kind: StepKind::Assignment,
                    location: Location::new(file.clone(), number, 1, line.len()),
                    variable_name: next.clone(),
                    description: format!("{current} interpolated into {next}"),
                });
                current = next;
                continue;
            }
        }
        // A call carrying the current variable.
        if call_re().is_match(line) {
            steps.push(DataFlowStep {
                kind: StepKind::ParameterPassing,
                location: Location::new(file.clone(), number, 1, line.len()),
                variable_name: current.clone(),
                description: format!("{current} passed onward"),
            });
        }
    }

    let sink_line = lines.get(sink.location.line.saturating_sub(1)).copied()?;
    if uses_in_sink(&current, sink) || contains_identifier(sink_line, &current) {
        Some(steps)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

fn sanitizer_call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"validator\s*\.\s*\w+|\bisNumeric\s*\(|\bescape\w*\s*\(|\bsanitize\w*\s*\(")
            .expect("Invalid sanitizer regex")
    })
}

fn type_coercion_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"\bparseInt\s*\(|\bparseFloat\s*\(|\bNumber\s*\(|\.toString\s*\(")
            .expect("Invalid coercion regex")
    })
}

fn param_query_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new("\\?['\"`]\\s*,\\s*\\[|\\.prepare\\s*\\(").expect("Invalid prepared regex")
    })
}

fn early_return_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"return\s+res\s*\.\s*status\s*\(|throw\s+new\s+\w*Error")
            .expect("Invalid early-return regex")
    })
}

fn regex_validation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"/\^[^/]*\$/|\.test\s*\(|\.match\s*\(").expect("Invalid validation regex")
    })
}

/// Score contribution of a source category.
#[must_use]
pub fn source_score(category: SourceCategory) -> i32 {
    match category {
        SourceCategory::UserInput => 4,
        SourceCategory::NetworkInput => 3,
        SourceCategory::FileInput | SourceCategory::Environment => 2,
        SourceCategory::Database => 1,
    }
}

/// Score contribution of a sink kind.
#[must_use]
pub fn sink_score(kind: SinkKind) -> i32 {
    match kind {
        SinkKind::SqlInjection | SinkKind::CommandInjection | SinkKind::CodeInjection => 4,
        SinkKind::PathTraversal | SinkKind::Xss => 3,
        SinkKind::FileWrite => 2,
    }
}

/// Sanitization credit found between source and sink, capped at 6.
#[must_use]
pub fn sanitization_penalty(
    source_text: &str,
    custom_sanitizers: &[String],
    from_line: usize,
    to_line: usize,
) -> i32 {
    let lines: Vec<&str> = source_text.lines().collect();
    let lo = from_line.saturating_sub(1).min(lines.len());
    let hi = to_line.min(lines.len());
    if hi <= lo {
        return 0;
    }
    let window = lines[lo..hi].join("\n");

    let mut penalty = 0;
    if sanitizer_call_re().is_match(&window)
        || custom_sanitizers.iter().any(|s| window.contains(s.as_str()))
    {
        penalty += 2;
    }
    if type_coercion_re().is_match(&window) {
        penalty += 2;
    }
    if param_query_re().is_match(&window) {
        penalty += 2;
    }
    if early_return_re().is_match(&window) {
        penalty += 1;
    }
    if regex_validation_re().is_match(&window) {
        penalty += 1;
    }
    penalty.min(6)
}

/// Buckets a raw score into a risk level.
#[must_use]
pub fn risk_from_score(score: i32) -> RiskLevel {
    let score = score.max(1);
    if score >= 8 {
        RiskLevel::Critical
    } else if score >= 6 {
        RiskLevel::High
    } else if score >= 4 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn build_path(
    ctx: &FlowContext<'_>,
    source: &TaintSource,
    sink: &TaintSink,
    steps: Vec<DataFlowStep>,
) -> DataFlowPath {
    let penalty = sanitization_penalty(
        ctx.source_text,
        ctx.custom_sanitizers,
        source.location.line,
        sink.location.line,
    );
    let score = source_score(source.category) + sink_score(sink.kind) - penalty;
    let risk_level = risk_from_score(score);

    let base = (source.confidence + sink.confidence) / 2.0 - 0.05 * steps.len() as f64;
    let base = base.max(0.1);
    let annotated = steps
        .iter()
        .filter(|s| {
            ctx.extraction
                .taint_info
                .get(&s.variable_name)
                .is_some_and(|i| i.annotation.is_some())
        })
        .count();
    let fraction = annotated as f64 / steps.len().max(1) as f64;
    let confidence = (base + 0.1 * fraction).min(1.0);

    let type_safe = validate_types(ctx, &steps);

    DataFlowPath {
        source: source.clone(),
        sink: sink.clone(),
        steps,
        confidence,
        risk_level,
        type_safe,
    }
}

/// A path is type-safe unless it moves a tainted value into an untainted
/// variable without passing through a recognized sanitizer.
fn validate_types(ctx: &FlowContext<'_>, steps: &[DataFlowStep]) -> bool {
    let info = &ctx.extraction.taint_info;
    let mut previous: Option<TaintStatus> = None;
    for step in steps {
        let status = info
            .get(&step.variable_name)
            .map(|i| i.status)
            .unwrap_or(TaintStatus::Unknown);
        if matches!(step.kind, StepKind::Assignment | StepKind::PropertyAccess) {
            if let Some(prev) = previous {
                if prev == TaintStatus::Tainted
                    && status.is_clean()
                    && !is_sanitizer_name(&step.description)
                    && !step.description.split_whitespace().any(is_sanitizer_name)
                {
                    return false;
                }
            }
        }
        previous = Some(status);
    }
    true
}

/// Suggestion text attached to a path's reported issue.
#[must_use]
pub fn path_suggestion(path: &DataFlowPath) -> String {
    format!(
        "{} Flow: {}",
        remediation(path.sink.kind),
        path.flow_summary()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_identifier_boundaries() {
        assert!(contains_identifier("`SELECT ${userId}`", "userId"));
        assert!(!contains_identifier("SELECT * FROM users", "use"));
        assert!(!contains_identifier("valid", "id"));
        assert!(contains_identifier("f(id)", "id"));
    }

    #[test]
    fn test_related_prefixes() {
        assert!(related("data", "data.filename"));
        assert!(related("data.filename", "data"));
        assert!(related("a", "a"));
        assert!(!related("a", "b"));
    }

    #[test]
    fn test_risk_buckets() {
        assert_eq!(risk_from_score(8), RiskLevel::Critical);
        assert_eq!(risk_from_score(7), RiskLevel::High);
        assert_eq!(risk_from_score(4), RiskLevel::Medium);
        assert_eq!(risk_from_score(0), RiskLevel::Low);
    }

    #[test]
    fn test_risk_monotone_in_scores() {
        // For a fixed penalty, a higher raw score never lowers the bucket.
        let mut last = RiskLevel::Low;
        for score in 1..=10 {
            let risk = risk_from_score(score);
            assert!(risk >= last, "risk must be monotone in the score");
            last = risk;
        }
    }

    #[test]
    fn test_sanitization_penalty_capped() {
        let text = "if (!validator.isNumeric(id)) return res.status(400).end();\n\
                    const n = parseInt(id, 10);\n\
                    db.query('SELECT 1 WHERE id = ?', [n]);\n";
        let penalty = sanitization_penalty(text, &[], 1, 3);
        assert_eq!(penalty, 6);
    }

    #[test]
    fn test_penalty_empty_window() {
        assert_eq!(sanitization_penalty("a\nb\n", &[], 2, 1), 0);
    }
}
