//! Type constraint extraction.
//!
//! One walk over the classified events produces the data-flow
//! relationships (assignment, parameter, return, property access, method
//! call) and the per-variable taint records. The extractor records
//! relationships only; propagation belongs to the solver.

use super::types::{
    ConstraintKind, Location, TaintAnnotation, TaintSource, TaintStatus, TypeConstraint,
    TypeTaintInfo,
};
use crate::ast::{Event, ExprKind, Span};
use crate::constants::is_sanitizer_name;
use rustc_hash::FxHashMap;
use std::path::Path;

/// Output of the extraction walk.
#[derive(Debug, Default)]
pub struct ExtractionResult {
    /// All observed constraints, in pre-order.
    pub constraints: Vec<TypeConstraint>,
    /// Per-variable taint records, keyed by variable name.
    pub taint_info: FxHashMap<String, TypeTaintInfo>,
}

impl ExtractionResult {
    /// Connects detected sources to their variable records by index.
    /// Source-derived variables start tainted unless an annotation pins
    /// them otherwise.
    pub fn link_sources(&mut self, sources: &[TaintSource]) {
        for (index, source) in sources.iter().enumerate() {
            let info = self
                .taint_info
                .entry(source.variable_name.clone())
                .or_insert_with(|| TypeTaintInfo::new(&source.variable_name));
            if info.source_index.is_none() {
                info.source_index = Some(index);
            }
            if info.annotation.is_none() {
                info.status = TaintStatus::Tainted;
            }
        }
    }
}

/// Builds the synthesized parameter target name `F[paramN]`.
#[must_use]
pub fn param_target(function: &str, index: usize) -> String {
    format!("{function}[param{index}]")
}

/// Walks the events and extracts constraints plus taint records.
#[must_use]
pub fn extract_constraints(file: &Path, events: &[Event]) -> ExtractionResult {
    let mut result = ExtractionResult::default();

    for event in events {
        match event {
            Event::VarDecl(decl) => {
                let annotation = annotation_from_tags(
                    decl.tainted_tag,
                    decl.untainted_tag,
                    decl.sanitized_tag,
                );
                record_variable(&mut result, &decl.name, annotation);

                let Some(init) = &decl.init else {
                    continue;
                };
                if let Some(call) = &init.call {
                    // Function chaining: the declared variable receives the
                    // call's return value, and each identifier argument
                    // feeds the variable through the callee. Sanitizer
                    // calls return clean values, so their arguments do not
                    // chain.
                    push(
                        &mut result,
                        ConstraintKind::Return,
                        &call.dotted_name(),
                        &decl.name,
                        file,
                        decl.span,
                        format!("return value of {} flows to {}", call.dotted_name(), decl.name),
                    );
                    if !is_sanitizer_name(&call.function) {
                        for arg in call.args.iter().filter(|a| a.is_identifier) {
                            push(
                                &mut result,
                                ConstraintKind::Parameter,
                                &arg.text,
                                &decl.name,
                                file,
                                decl.span,
                                format!(
                                    "{} flows through {} into {}",
                                    arg.text, call.function, decl.name
                                ),
                            );
                        }
                    }
                } else if !init.is_literal() || init.kind == ExprKind::Template {
                    push(
                        &mut result,
                        ConstraintKind::Assignment,
                        &init.text,
                        &decl.name,
                        file,
                        decl.span,
                        format!("assignment of {} to {}", init.text, decl.name),
                    );
                }
            }
            Event::Assign(assign) if assign.target_is_identifier => {
                record_variable(&mut result, &assign.target, None);
                if let Some(call) = &assign.value.call {
                    push(
                        &mut result,
                        ConstraintKind::Return,
                        &call.dotted_name(),
                        &assign.target,
                        file,
                        assign.span,
                        format!(
                            "return value of {} flows to {}",
                            call.dotted_name(),
                            assign.target
                        ),
                    );
                    if !is_sanitizer_name(&call.function) {
                        for arg in call.args.iter().filter(|a| a.is_identifier) {
                            push(
                                &mut result,
                                ConstraintKind::Parameter,
                                &arg.text,
                                &assign.target,
                                file,
                                assign.span,
                                format!(
                                    "{} flows through {} into {}",
                                    arg.text, call.function, assign.target
                                ),
                            );
                        }
                    }
                } else if !assign.value.is_literal() {
                    push(
                        &mut result,
                        ConstraintKind::Assignment,
                        &assign.value.text,
                        &assign.target,
                        file,
                        assign.span,
                        format!("assignment of {} to {}", assign.value.text, assign.target),
                    );
                }
            }
            Event::Call(call) => {
                for (i, arg) in call.args.iter().enumerate() {
                    if arg.is_literal {
                        continue;
                    }
                    push(
                        &mut result,
                        ConstraintKind::Parameter,
                        &arg.text,
                        &param_target(&call.function, i),
                        file,
                        call.span,
                        format!("{} passed to parameter {} of {}", arg.text, i, call.function),
                    );
                    if arg.is_identifier {
                        push(
                            &mut result,
                            ConstraintKind::Parameter,
                            &arg.text,
                            &call.function,
                            file,
                            call.span,
                            format!("{} passed to {}", arg.text, call.function),
                        );
                    }
                }
                if let Some(object) = &call.object {
                    push(
                        &mut result,
                        ConstraintKind::MethodCall,
                        object,
                        &call.callee_text,
                        file,
                        call.span,
                        format!("method {} invoked on {}", call.function, object),
                    );
                }
            }
            Event::Property(access) => {
                push(
                    &mut result,
                    ConstraintKind::PropertyAccess,
                    &access.object,
                    &access.full,
                    file,
                    access.span,
                    format!("property {} read from {}", access.property, access.object),
                );
            }
            Event::Function(func) => {
                for param in &func.params {
                    let annotation =
                        annotation_from_tags(param.tainted, param.untainted, param.sanitized);
                    record_variable(&mut result, &param.name, annotation);
                    push(
                        &mut result,
                        ConstraintKind::Parameter,
                        &param_target(&func.name, param.index),
                        &param.name,
                        file,
                        param.span,
                        format!(
                            "parameter {} of {} binds to {}",
                            param.index, func.name, param.name
                        ),
                    );
                }
            }
            _ => {}
        }
    }

    result
}

fn annotation_from_tags(tainted: bool, untainted: bool, sanitized: bool) -> Option<TaintAnnotation> {
    if tainted || untainted || sanitized {
        Some(TaintAnnotation {
            is_tainted: tainted,
            is_untainted: untainted,
            is_sanitized: sanitized,
        })
    } else {
        None
    }
}

fn record_variable(
    result: &mut ExtractionResult,
    name: &str,
    annotation: Option<TaintAnnotation>,
) {
    let info = result
        .taint_info
        .entry(name.to_owned())
        .or_insert_with(|| TypeTaintInfo::new(name));
    if let Some(annotation) = annotation {
        info.annotation = Some(annotation);
        if let Some(status) = annotation.status() {
            info.status = status;
        }
    }
}

fn push(
    result: &mut ExtractionResult,
    kind: ConstraintKind,
    source: &str,
    target: &str,
    file: &Path,
    span: Span,
    description: String,
) {
    let index = result.constraints.len();
    result.constraints.push(TypeConstraint {
        kind,
        source: source.to_owned(),
        target: target.to_owned(),
        location: Location::new(file.to_path_buf(), span.line, span.column, span.length()),
        description,
    });
    for name in [source, target] {
        if let Some(info) = result.taint_info.get_mut(name) {
            info.constraint_indices.push(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{collect_events, parse_source};
    use std::path::PathBuf;

    fn extract(source: &str) -> ExtractionResult {
        let path = PathBuf::from("test.js");
        let parsed = parse_source(source, &path).unwrap();
        let events = collect_events(&parsed);
        extract_constraints(&path, &events)
    }

    #[test]
    fn test_assignment_constraint() {
        let result = extract("const copy = original;\n");
        assert!(result.constraints.iter().any(|c| {
            c.kind == ConstraintKind::Assignment && c.source == "original" && c.target == "copy"
        }));
    }

    #[test]
    fn test_function_chaining_constraints() {
        let result = extract("const t = processData(userInput);\n");
        assert!(result
            .constraints
            .iter()
            .any(|c| c.kind == ConstraintKind::Return && c.target == "t"));
        assert!(result.constraints.iter().any(|c| {
            c.kind == ConstraintKind::Parameter && c.source == "userInput" && c.target == "t"
        }));
    }

    #[test]
    fn test_param_targets_synthesized() {
        let result = extract("handle(a, b);\n");
        assert!(result
            .constraints
            .iter()
            .any(|c| c.target == "handle[param0]" && c.source == "a"));
        assert!(result
            .constraints
            .iter()
            .any(|c| c.target == "handle[param1]" && c.source == "b"));
    }

    #[test]
    fn test_property_access_constraint() {
        let result = extract("const name = data.filename;\n");
        assert!(result.constraints.iter().any(|c| {
            c.kind == ConstraintKind::PropertyAccess
                && c.source == "data"
                && c.target == "data.filename"
        }));
    }

    #[test]
    fn test_parameter_binding() {
        let result = extract("function run(cmd) { exec(cmd); }\n");
        assert!(result
            .constraints
            .iter()
            .any(|c| c.source == "run[param0]" && c.target == "cmd"));
    }

    #[test]
    fn test_annotated_declaration() {
        let result = extract("/** @tainted */\nconst userId = value;\n");
        let info = result.taint_info.get("userId").expect("record expected");
        assert_eq!(info.status, TaintStatus::Tainted);
        assert!(info.annotation.unwrap().is_tainted);
    }

    #[test]
    fn test_literal_initializer_skipped() {
        let result = extract("const n = 42;\n");
        assert!(result
            .constraints
            .iter()
            .all(|c| c.target != "n" || c.kind != ConstraintKind::Assignment));
    }

    #[test]
    fn test_constraint_indices_tracked() {
        let result = extract("const a = b;\nconst c = a;\n");
        let info = result.taint_info.get("a").expect("record expected");
        assert!(!info.constraint_indices.is_empty());
    }
}
