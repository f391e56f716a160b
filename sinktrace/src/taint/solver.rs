//! Constraint solver for the taint lattice.
//!
//! Builds constraint variables from every name the extractor observed,
//! generates rules from the constraints, then runs a bounded fixpoint:
//! rules fire in priority order, every propagation is recorded as an
//! inference step, and predicate failures become violations rather than
//! errors. A variable once set is never lowered, which keeps cyclic
//! assignment graphs terminating.

use super::constraints::ExtractionResult;
use super::types::{ConstraintKind, Severity, TaintSource, TaintStatus};
use crate::constants::{is_sanitizer_name, MAX_SOLVER_ITERATIONS};
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::sync::OnceLock;

/// A solver variable with its allowed domain and current value.
#[derive(Debug, Clone)]
pub struct ConstraintVariable {
    /// Variable name.
    pub name: String,
    /// Allowed lattice values.
    pub domain: Vec<TaintStatus>,
    /// Current assignment, if decided.
    pub value: Option<TaintStatus>,
    /// Higher priority variables are seeded earlier.
    pub priority: u8,
}

/// Tagged rule kinds; each knows how to check and how to infer.
#[derive(Debug, Clone)]
pub enum RuleKind {
    /// The variable is a taint source.
    Source {
        /// Source variable name.
        variable: String,
    },
    /// The variable carries an explicit annotation.
    Annotation {
        /// Annotated variable name.
        variable: String,
        /// Pinned lattice value.
        status: TaintStatus,
    },
    /// The target received a sanitizer's return value.
    Sanitization {
        /// Sanitized variable name.
        target: String,
    },
    /// Assignment-style propagation (`target = source`).
    Assignment {
        /// Right-hand name.
        source: String,
        /// Left-hand name.
        target: String,
    },
    /// Parameter-style propagation (taint flows forward only).
    Parameter {
        /// Passed name.
        source: String,
        /// Receiving name.
        target: String,
    },
}

/// A generated rule with its identity and priority.
#[derive(Debug, Clone)]
pub struct ConstraintRule {
    /// Stable rule id (e.g. `assignment-3`).
    pub id: String,
    /// Behavior of the rule.
    pub kind: RuleKind,
    /// Evaluation priority, highest first.
    pub priority: u8,
}

/// One recorded propagation.
#[derive(Debug, Clone, Serialize)]
pub struct InferenceStep {
    /// Sequence number, starting at 1.
    pub step: usize,
    /// Rule that fired.
    pub rule_id: String,
    /// Variable that changed.
    pub variable: String,
    /// Previous value.
    pub old: Option<TaintStatus>,
    /// New value.
    pub new: TaintStatus,
    /// Human-readable reasoning.
    pub reasoning: String,
}

/// A rule predicate that failed on fully-valued variables.
#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    /// Rule that failed.
    pub rule_id: String,
    /// Explanation of the failure.
    pub message: String,
    /// Variable at fault.
    pub variable: String,
    /// Severity of the violation.
    pub severity: Severity,
}

/// Counts over the final assignment.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SolutionSummary {
    /// Total constraint variables.
    pub total: usize,
    /// Variables with a decided value.
    pub solved: usize,
    /// Variables decided tainted.
    pub tainted: usize,
    /// Variables decided untainted or sanitized.
    pub untainted: usize,
    /// Variables left undecided.
    pub unknown: usize,
}

/// The solver's output.
#[derive(Debug, Clone, Default)]
pub struct Solution {
    /// Final variable assignment.
    pub values: FxHashMap<String, TaintStatus>,
    /// Every propagation, in firing order.
    pub steps: Vec<InferenceStep>,
    /// Predicate failures.
    pub violations: Vec<Violation>,
    /// Whether solving succeeded.
    pub success: bool,
    /// Assignment counts.
    pub summary: SolutionSummary,
}

/// Fixpoint solver over the four-valued lattice.
pub struct ConstraintSolver {
    variables: FxHashMap<String, ConstraintVariable>,
    rules: Vec<ConstraintRule>,
}

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| Regex::new(r"[A-Za-z_$][A-Za-z0-9_$]*").expect("Invalid identifier regex"))
}

fn is_symbol_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '$' | '[' | ']'))
}

fn ensure_variable(
    variables: &mut FxHashMap<String, ConstraintVariable>,
    name: &str,
    full_domain: &[TaintStatus],
) {
    if !variables.contains_key(name) {
        variables.insert(
            name.to_owned(),
            ConstraintVariable {
                name: name.to_owned(),
                domain: full_domain.to_vec(),
                value: None,
                priority: 5,
            },
        );
    }
}

fn propagation_rule(
    constraint: &super::types::TypeConstraint,
    index: usize,
    source_name: String,
) -> ConstraintRule {
    match constraint.kind {
        ConstraintKind::Assignment | ConstraintKind::PropertyAccess | ConstraintKind::MethodCall => {
            ConstraintRule {
                id: format!("assignment-{index}"),
                kind: RuleKind::Assignment {
                    source: source_name,
                    target: constraint.target.clone(),
                },
                priority: 8,
            }
        }
        ConstraintKind::Parameter | ConstraintKind::Return => ConstraintRule {
            id: format!("parameter-{index}"),
            kind: RuleKind::Parameter {
                source: source_name,
                target: constraint.target.clone(),
            },
            priority: 7,
        },
    }
}

impl ConstraintSolver {
    /// Builds variables and rules from an extraction and the detected
    /// sources.
    #[must_use]
    pub fn from_extraction(extraction: &ExtractionResult, sources: &[TaintSource]) -> Self {
        let full_domain = vec![
            TaintStatus::Tainted,
            TaintStatus::Untainted,
            TaintStatus::Sanitized,
            TaintStatus::Unknown,
        ];

        // Known symbol names guide the decomposition of expression-valued
        // constraint sources into per-identifier rules.
        let mut known: FxHashSet<String> = FxHashSet::default();
        for info in extraction.taint_info.keys() {
            known.insert(info.clone());
        }
        for source in sources {
            known.insert(source.variable_name.clone());
        }
        for constraint in &extraction.constraints {
            for name in [&constraint.source, &constraint.target] {
                if is_symbol_name(name) {
                    known.insert(name.clone());
                }
            }
        }

        let mut variables: FxHashMap<String, ConstraintVariable> = FxHashMap::default();
        let mut rules = Vec::new();

        // Source rules pin their variable to tainted.
        for (i, source) in sources.iter().enumerate() {
            ensure_variable(&mut variables, &source.variable_name, &full_domain);
            if let Some(var) = variables.get_mut(&source.variable_name) {
                var.domain = vec![TaintStatus::Tainted];
                var.priority = 10;
            }
            rules.push(ConstraintRule {
                id: format!("source-{i}"),
                kind: RuleKind::Source {
                    variable: source.variable_name.clone(),
                },
                priority: 10,
            });
        }

        // Annotation rules restrict the domain to the annotated singleton.
        for (name, info) in &extraction.taint_info {
            ensure_variable(&mut variables, name, &full_domain);
            if let Some(status) = info.annotation.and_then(|a| a.status()) {
                if let Some(var) = variables.get_mut(name) {
                    var.domain = vec![status];
                    var.priority = 10;
                }
                rules.push(ConstraintRule {
                    id: format!("annotation-{name}"),
                    kind: RuleKind::Annotation {
                        variable: name.clone(),
                        status,
                    },
                    priority: 10,
                });
            }
        }

        // Propagation rules from the extracted constraints.
        for (i, constraint) in extraction.constraints.iter().enumerate() {
            if !is_symbol_name(&constraint.target) {
                continue;
            }
            ensure_variable(&mut variables, &constraint.target, &full_domain);

            // A return constraint from a sanitizer marks the target clean.
            if constraint.kind == ConstraintKind::Return && is_sanitizer_name(&constraint.source) {
                rules.push(ConstraintRule {
                    id: format!("sanitization-{i}"),
                    kind: RuleKind::Sanitization {
                        target: constraint.target.clone(),
                    },
                    priority: 9,
                });
                continue;
            }

            if is_symbol_name(&constraint.source) {
                ensure_variable(&mut variables, &constraint.source, &full_domain);
                rules.push(propagation_rule(constraint, i, constraint.source.clone()));
            } else {
                // Expression sources decompose into rules per mentioned
                // known identifier (templates, concatenations).
                let mut emitted: FxHashSet<String> = FxHashSet::default();
                for m in identifier_re().find_iter(&constraint.source) {
                    let token = m.as_str();
                    if known.contains(token) && emitted.insert(token.to_owned()) {
                        ensure_variable(&mut variables, token, &full_domain);
                        rules.push(propagation_rule(constraint, i, token.to_owned()));
                    }
                }
            }
        }

        rules.sort_by(|a, b| b.priority.cmp(&a.priority));

        Self { variables, rules }
    }

    /// Number of constraint variables.
    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Runs the fixpoint loop and returns the solution.
    #[must_use]
    pub fn solve(&mut self) -> Solution {
        let mut steps: Vec<InferenceStep> = Vec::new();
        let mut violations: Vec<Violation> = Vec::new();
        let mut violated: FxHashSet<String> = FxHashSet::default();

        for _ in 0..MAX_SOLVER_ITERATIONS {
            let mut changed = false;

            for rule in &self.rules {
                match &rule.kind {
                    RuleKind::Source { variable } => {
                        changed |= Self::set_value(
                            &mut self.variables,
                            &mut steps,
                            rule,
                            variable,
                            TaintStatus::Tainted,
                            "taint source variable",
                        );
                    }
                    RuleKind::Annotation { variable, status } => {
                        changed |= Self::set_value(
                            &mut self.variables,
                            &mut steps,
                            rule,
                            variable,
                            *status,
                            "explicit annotation",
                        );
                    }
                    RuleKind::Sanitization { target } => {
                        changed |= Self::set_value(
                            &mut self.variables,
                            &mut steps,
                            rule,
                            target,
                            TaintStatus::Sanitized,
                            "sanitizer return value",
                        );
                    }
                    RuleKind::Assignment { source, target } => {
                        let source_value = self.variables.get(source).and_then(|v| v.value);
                        let target_value = self.variables.get(target).and_then(|v| v.value);
                        match (source_value, target_value) {
                            (Some(TaintStatus::Tainted), Some(t))
                                if t.is_clean() && violated.insert(rule.id.clone()) =>
                            {
                                violations.push(Violation {
                                    rule_id: rule.id.clone(),
                                    message: format!(
                                        "tainted {source} assigned to {t} {target}"
                                    ),
                                    variable: target.clone(),
                                    severity: Severity::Warning,
                                });
                            }
                            (Some(value), None) if value != TaintStatus::Unknown => {
                                changed |= Self::set_value(
                                    &mut self.variables,
                                    &mut steps,
                                    rule,
                                    target,
                                    value,
                                    &format!("assigned from {source}"),
                                );
                            }
                            _ => {}
                        }
                    }
                    RuleKind::Parameter { source, target } => {
                        let source_value = self.variables.get(source).and_then(|v| v.value);
                        let target_value = self.variables.get(target).and_then(|v| v.value);
                        match (source_value, target_value) {
                            (Some(TaintStatus::Tainted), Some(t))
                                if t.is_clean() && violated.insert(rule.id.clone()) =>
                            {
                                violations.push(Violation {
                                    rule_id: rule.id.clone(),
                                    message: format!(
                                        "tainted {source} passed into {t} {target}"
                                    ),
                                    variable: target.clone(),
                                    severity: Severity::Warning,
                                });
                            }
                            (Some(TaintStatus::Tainted), None) => {
                                changed |= Self::set_value(
                                    &mut self.variables,
                                    &mut steps,
                                    rule,
                                    target,
                                    TaintStatus::Tainted,
                                    &format!("tainted value passed from {source}"),
                                );
                            }
                            _ => {}
                        }
                    }
                }
            }

            if !changed {
                break;
            }
        }

        let values: FxHashMap<String, TaintStatus> = self
            .variables
            .values()
            .filter_map(|v| v.value.map(|value| (v.name.clone(), value)))
            .collect();

        let total = self.variables.len();
        let solved = values.len();
        let tainted = values
            .values()
            .filter(|v| **v == TaintStatus::Tainted)
            .count();
        let untainted = values.values().filter(|v| v.is_clean()).count();

        let success = violations.iter().all(|v| v.severity != Severity::Error)
            && (!values.is_empty() || self.rules.is_empty() || !steps.is_empty() || total > 0);

        Solution {
            values,
            steps,
            violations,
            success,
            summary: SolutionSummary {
                total,
                solved,
                tainted,
                untainted,
                unknown: total - solved,
            },
        }
    }

    /// Sets a variable's value if it is unset and the value is in its
    /// domain. A variable once set is never changed.
    fn set_value(
        variables: &mut FxHashMap<String, ConstraintVariable>,
        steps: &mut Vec<InferenceStep>,
        rule: &ConstraintRule,
        name: &str,
        value: TaintStatus,
        reason: &str,
    ) -> bool {
        let Some(var) = variables.get_mut(name) else {
            return false;
        };
        if var.value.is_some() || !var.domain.contains(&value) {
            return false;
        }
        var.value = Some(value);
        steps.push(InferenceStep {
            step: steps.len() + 1,
            rule_id: rule.id.clone(),
            variable: name.to_owned(),
            old: None,
            new: value,
            reasoning: format!("{name} is {value}: {reason}"),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{collect_events, parse_source};
    use crate::taint::constraints::extract_constraints;
    use crate::taint::sources::detect_sources;
    use std::path::PathBuf;

    fn solve(source: &str) -> Solution {
        let path = PathBuf::from("test.js");
        let parsed = parse_source(source, &path).unwrap();
        let events = collect_events(&parsed);
        let extraction = extract_constraints(&path, &events);
        let sources = detect_sources(&path, &events, &[]);
        ConstraintSolver::from_extraction(&extraction, &sources).solve()
    }

    #[test]
    fn test_source_variable_tainted() {
        let solution = solve("const id = req.query.id;\n");
        assert_eq!(solution.values.get("id"), Some(&TaintStatus::Tainted));
        assert!(solution.success);
    }

    #[test]
    fn test_assignment_chain_propagates() {
        let solution = solve("const a = req.body.x;\nconst b = a;\nconst c = b;\n");
        assert_eq!(solution.values.get("c"), Some(&TaintStatus::Tainted));
        assert!(!solution.steps.is_empty());
    }

    #[test]
    fn test_template_chain_propagates() {
        let solution = solve(
            "const userId = req.params.id;\nconst query = `SELECT * FROM users WHERE id = ${userId}`;\n",
        );
        assert_eq!(solution.values.get("query"), Some(&TaintStatus::Tainted));
    }

    #[test]
    fn test_cycle_terminates() {
        let solution = solve("let v1 = v2;\nv2 = v1;\nconst s = req.body.q;\n");
        assert!(solution.success);
    }

    #[test]
    fn test_sanitizer_breaks_chain() {
        let solution = solve("const raw = req.query.q;\nconst safe = sanitize(raw);\n");
        assert_eq!(solution.values.get("safe"), Some(&TaintStatus::Sanitized));
    }

    #[test]
    fn test_annotation_pins_value() {
        let solution = solve("/** @untainted */\nconst limit = config.limit;\n");
        assert_eq!(solution.values.get("limit"), Some(&TaintStatus::Untainted));
    }

    #[test]
    fn test_violation_on_tainted_into_untainted() {
        let solution = solve(
            "const raw = req.query.q;\n/** @untainted */\nconst shown = raw;\n",
        );
        assert!(!solution.violations.is_empty());
        // Violations are recorded, not raised.
        assert!(solution.success);
    }

    #[test]
    fn test_empty_file_succeeds() {
        let solution = solve("");
        assert!(solution.success);
        assert_eq!(solution.summary.total, 0);
    }

    #[test]
    fn test_summary_counts() {
        let solution = solve("const a = req.body.x;\nconst b = a;\n");
        assert!(solution.summary.tainted >= 2);
        assert_eq!(
            solution.summary.total,
            solution.summary.solved + solution.summary.unknown
        );
    }
}
