//! Classified AST events for security analysis.
//!
//! The full grammar stays behind the facade; detectors consume the narrow
//! tagged-variant subset below (calls, property accesses, declarations,
//! assignments, templates, functions), produced in pre-order.

use super::jsdoc::{self, JsDocComment};
use super::parser::ParsedFile;
use tree_sitter::Node;

/// Byte/line span of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// 1-indexed line.
    pub line: usize,
    /// 1-indexed column.
    pub column: usize,
    /// Byte offset of the start (inclusive).
    pub start_byte: usize,
    /// Byte offset of the end (exclusive).
    pub end_byte: usize,
}

impl Span {
    fn of(node: Node<'_>) -> Self {
        let point = node.start_position();
        Self {
            line: point.row + 1,
            column: point.column + 1,
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
        }
    }

    /// Length of the span in bytes.
    #[must_use]
    pub fn length(&self) -> usize {
        self.end_byte - self.start_byte
    }
}

/// Coarse classification of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprKind {
    /// A bare identifier.
    Identifier,
    /// Dotted property access.
    Member,
    /// Bracketed element access.
    Element,
    /// A call expression.
    Call,
    /// A `new` expression.
    New,
    /// A template literal.
    Template,
    /// String literal.
    StringLit,
    /// Numeric literal.
    Number,
    /// Any other expression.
    Other,
}

/// An expression summary used by declarations and assignments.
#[derive(Debug, Clone)]
pub struct ExprInfo {
    /// Raw text of the expression.
    pub text: String,
    /// Classification.
    pub kind: ExprKind,
    /// Identifiers mentioned anywhere inside, in order, deduplicated.
    pub identifiers: Vec<String>,
    /// Call payload when `kind` is `Call` or `New`.
    pub call: Option<CallExpr>,
    /// Property payload when `kind` is `Member` or a reduced `Element`.
    pub member: Option<PropertyAccess>,
}

impl ExprInfo {
    /// Whether this expression is a constant literal.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(self.kind, ExprKind::StringLit | ExprKind::Number)
    }
}

/// One argument of a call.
#[derive(Debug, Clone)]
pub struct ArgInfo {
    /// Raw text of the argument.
    pub text: String,
    /// Argument is a bare identifier.
    pub is_identifier: bool,
    /// Argument is a template literal.
    pub is_template: bool,
    /// Argument is a constant literal (string/number/bool/null).
    pub is_literal: bool,
    /// Identifiers mentioned anywhere inside.
    pub identifiers: Vec<String>,
}

/// A call or `new` expression.
#[derive(Debug, Clone)]
pub struct CallExpr {
    /// Receiver text for method calls (`db`, `child_process`, `req.query`).
    pub object: Option<String>,
    /// Called function or method name.
    pub function: String,
    /// Full callee text.
    pub callee_text: String,
    /// Arguments in order.
    pub args: Vec<ArgInfo>,
    /// True for `new` expressions.
    pub is_new: bool,
    /// Location.
    pub span: Span,
}

impl CallExpr {
    /// Dotted name of the call (`object.function` or `function`).
    #[must_use]
    pub fn dotted_name(&self) -> String {
        match &self.object {
            Some(obj) => format!("{obj}.{}", self.function),
            None => self.function.clone(),
        }
    }
}

/// A property access (`obj.prop`), possibly reduced from `obj['prop']`.
#[derive(Debug, Clone)]
pub struct PropertyAccess {
    /// Receiver text (may itself be dotted).
    pub object: String,
    /// Accessed property name.
    pub property: String,
    /// Full dotted text.
    pub full: String,
    /// True when reduced from a bracketed element access.
    pub computed: bool,
    /// Location.
    pub span: Span,
}

/// A template literal with its interpolated expressions.
#[derive(Debug, Clone)]
pub struct TemplateExpr {
    /// Raw text including backticks.
    pub text: String,
    /// Text of each `${...}` interpolation.
    pub interpolations: Vec<String>,
    /// Location.
    pub span: Span,
}

/// A variable declaration `const/let/var name = init`.
#[derive(Debug, Clone)]
pub struct VariableDecl {
    /// Declared name.
    pub name: String,
    /// Initializer, when present.
    pub init: Option<ExprInfo>,
    /// Location.
    pub span: Span,
    /// `@tainted` JSDoc tag on the declaration.
    pub tainted_tag: bool,
    /// `@untainted` JSDoc tag on the declaration.
    pub untainted_tag: bool,
    /// `@sanitized` JSDoc tag on the declaration.
    pub sanitized_tag: bool,
}

/// An assignment `target = value` outside a declaration.
#[derive(Debug, Clone)]
pub struct Assignment {
    /// Assigned name or property text.
    pub target: String,
    /// True when the target is a bare identifier.
    pub target_is_identifier: bool,
    /// Assigned expression.
    pub value: ExprInfo,
    /// Location.
    pub span: Span,
}

/// One declared function parameter.
#[derive(Debug, Clone)]
pub struct ParamInfo {
    /// Parameter name.
    pub name: String,
    /// Zero-based position.
    pub index: usize,
    /// Marked `@tainted` in the function's JSDoc.
    pub tainted: bool,
    /// Marked `@untainted` in the function's JSDoc.
    pub untainted: bool,
    /// Marked `@sanitized` in the function's JSDoc.
    pub sanitized: bool,
    /// Location.
    pub span: Span,
}

/// A named function (declaration, method, or function-valued binding).
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    /// Function name.
    pub name: String,
    /// Parameters in order.
    pub params: Vec<ParamInfo>,
    /// Location.
    pub span: Span,
}

/// A classified AST event.
#[derive(Debug, Clone)]
pub enum Event {
    /// A call or `new` expression.
    Call(CallExpr),
    /// A property or reduced element access.
    Property(PropertyAccess),
    /// A template literal.
    Template(TemplateExpr),
    /// A variable declaration.
    VarDecl(VariableDecl),
    /// An assignment expression.
    Assign(Assignment),
    /// A function with its parameters.
    Function(FunctionDecl),
}

/// Walks the parsed tree and produces classified events in pre-order.
#[must_use]
pub fn collect_events(parsed: &ParsedFile) -> Vec<Event> {
    let comments = jsdoc::collect_comments(parsed.tree.root_node(), &parsed.source);
    let mut events = Vec::new();
    walk(parsed.tree.root_node(), parsed, &comments, &mut events);
    events
}

fn walk(node: Node<'_>, parsed: &ParsedFile, comments: &[JsDocComment], out: &mut Vec<Event>) {
    match node.kind() {
        "lexical_declaration" | "variable_declaration" => {
            let doc = jsdoc::find_attached(comments, &parsed.source, node.start_byte());
            for i in 0..node.named_child_count() {
                let Some(declarator) = node.named_child(i) else {
                    continue;
                };
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                handle_declarator(declarator, parsed, comments, doc, out);
            }
        }
        "assignment_expression" => {
            if let (Some(left), Some(right)) = (
                node.child_by_field_name("left"),
                node.child_by_field_name("right"),
            ) {
                out.push(Event::Assign(Assignment {
                    target: parsed.text(left).to_owned(),
                    target_is_identifier: left.kind() == "identifier",
                    value: expr_info(right, parsed),
                    span: Span::of(node),
                }));
                walk(left, parsed, comments, out);
                walk(right, parsed, comments, out);
            }
        }
        "call_expression" => {
            out.push(Event::Call(build_call(node, parsed, false)));
            walk_children(node, parsed, comments, out);
        }
        "new_expression" => {
            out.push(Event::Call(build_call(node, parsed, true)));
            walk_children(node, parsed, comments, out);
        }
        "member_expression" => {
            if let Some(access) = build_member(node, parsed) {
                out.push(Event::Property(access));
            }
            if let Some(object) = node.child_by_field_name("object") {
                walk(object, parsed, comments, out);
            }
        }
        "subscript_expression" => {
            if let Some(access) = reduce_subscript(node, parsed) {
                out.push(Event::Property(access));
            }
            walk_children(node, parsed, comments, out);
        }
        "template_string" => {
            out.push(Event::Template(build_template(node, parsed)));
            walk_children(node, parsed, comments, out);
        }
        "function_declaration" | "generator_function_declaration" | "method_definition" => {
            if let Some(name) = node.child_by_field_name("name") {
                let doc = jsdoc::find_attached(comments, &parsed.source, node.start_byte());
                out.push(Event::Function(build_function(
                    parsed.text(name).to_owned(),
                    node,
                    parsed,
                    doc,
                )));
            }
            if let Some(body) = node.child_by_field_name("body") {
                walk(body, parsed, comments, out);
            }
        }
        _ => walk_children(node, parsed, comments, out),
    }
}

fn walk_children(
    node: Node<'_>,
    parsed: &ParsedFile,
    comments: &[JsDocComment],
    out: &mut Vec<Event>,
) {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            walk(child, parsed, comments, out);
        }
    }
}

fn handle_declarator(
    declarator: Node<'_>,
    parsed: &ParsedFile,
    comments: &[JsDocComment],
    doc: Option<&JsDocComment>,
    out: &mut Vec<Event>,
) {
    let Some(name_node) = declarator.child_by_field_name("name") else {
        return;
    };
    if name_node.kind() != "identifier" {
        // Destructuring patterns are outside the tracked subset.
        if let Some(value) = declarator.child_by_field_name("value") {
            walk(value, parsed, comments, out);
        }
        return;
    }
    let name = parsed.text(name_node).to_owned();
    let value = declarator.child_by_field_name("value");
    let init = value.map(|v| expr_info(v, parsed));

    out.push(Event::VarDecl(VariableDecl {
        name: name.clone(),
        init,
        span: Span::of(declarator),
        tainted_tag: doc.is_some_and(|d| d.has_tag_for("tainted", &name)),
        untainted_tag: doc.is_some_and(|d| d.has_tag_for("untainted", &name)),
        sanitized_tag: doc.is_some_and(|d| d.has_tag_for("sanitized", &name)),
    }));

    if let Some(value) = value {
        // Function-valued bindings count as named functions.
        if matches!(
            value.kind(),
            "arrow_function" | "function_expression" | "function"
        ) {
            out.push(Event::Function(build_function(name, value, parsed, doc)));
            if let Some(body) = value.child_by_field_name("body") {
                walk(body, parsed, comments, out);
            }
            return;
        }
        walk(value, parsed, comments, out);
    }
}

fn build_call(node: Node<'_>, parsed: &ParsedFile, is_new: bool) -> CallExpr {
    let field = if is_new { "constructor" } else { "function" };
    let callee = node.child_by_field_name(field);

    let (object, function, callee_text) = match callee {
        Some(c) => match c.kind() {
            "identifier" => {
                let text = parsed.text(c).to_owned();
                (None, text.clone(), text)
            }
            "member_expression" => {
                let object = c
                    .child_by_field_name("object")
                    .map(|o| parsed.text(o).to_owned());
                let property = c
                    .child_by_field_name("property")
                    .map(|p| parsed.text(p).to_owned())
                    .unwrap_or_default();
                (object, property, parsed.text(c).to_owned())
            }
            _ => {
                let text = parsed.text(c).to_owned();
                (None, text.clone(), text)
            }
        },
        None => (None, String::new(), String::new()),
    };

    let mut args = Vec::new();
    if let Some(arguments) = node.child_by_field_name("arguments") {
        for i in 0..arguments.named_child_count() {
            let Some(arg) = arguments.named_child(i) else {
                continue;
            };
            if arg.kind() == "comment" {
                continue;
            }
            args.push(ArgInfo {
                text: parsed.text(arg).to_owned(),
                is_identifier: arg.kind() == "identifier",
                is_template: arg.kind() == "template_string",
                is_literal: is_literal_kind(arg.kind()),
                identifiers: collect_identifiers(arg, parsed),
            });
        }
    }

    CallExpr {
        object,
        function,
        callee_text,
        args,
        is_new,
        span: Span::of(node),
    }
}

fn build_member(node: Node<'_>, parsed: &ParsedFile) -> Option<PropertyAccess> {
    let object = node.child_by_field_name("object")?;
    let property = node.child_by_field_name("property")?;
    Some(PropertyAccess {
        object: parsed.text(object).to_owned(),
        property: parsed.text(property).to_owned(),
        full: parsed.text(node).to_owned(),
        computed: false,
        span: Span::of(node),
    })
}

/// Reduces `obj['prop']` to a dotted access when the index is a string
/// literal.
fn reduce_subscript(node: Node<'_>, parsed: &ParsedFile) -> Option<PropertyAccess> {
    let object = node.child_by_field_name("object")?;
    let index = node.child_by_field_name("index")?;
    if index.kind() != "string" {
        return None;
    }
    let object_text = parsed.text(object).to_owned();
    let property = parsed
        .text(index)
        .trim_matches(|c| c == '\'' || c == '"' || c == '`')
        .to_owned();
    let full = format!("{object_text}.{property}");
    Some(PropertyAccess {
        object: object_text,
        property,
        full,
        computed: true,
        span: Span::of(node),
    })
}

fn build_template(node: Node<'_>, parsed: &ParsedFile) -> TemplateExpr {
    let mut interpolations = Vec::new();
    for i in 0..node.named_child_count() {
        let Some(child) = node.named_child(i) else {
            continue;
        };
        if child.kind() == "template_substitution" {
            if let Some(expr) = child.named_child(0) {
                interpolations.push(parsed.text(expr).to_owned());
            }
        }
    }
    TemplateExpr {
        text: parsed.text(node).to_owned(),
        interpolations,
        span: Span::of(node),
    }
}

fn build_function(
    name: String,
    node: Node<'_>,
    parsed: &ParsedFile,
    doc: Option<&JsDocComment>,
) -> FunctionDecl {
    let mut params = Vec::new();
    let parameters = node
        .child_by_field_name("parameters")
        .or_else(|| node.child_by_field_name("parameter"));
    if let Some(parameters) = parameters {
        if parameters.kind() == "identifier" {
            // Single-parameter arrow function without parentheses.
            push_param(&mut params, parameters, parsed, doc, 0);
        } else {
            let mut index = 0;
            for i in 0..parameters.named_child_count() {
                let Some(param) = parameters.named_child(i) else {
                    continue;
                };
                let ident = match param.kind() {
                    "identifier" => Some(param),
                    // TypeScript wraps parameters with their annotations.
                    "required_parameter" | "optional_parameter" => param
                        .child_by_field_name("pattern")
                        .filter(|p| p.kind() == "identifier"),
                    _ => None,
                };
                if let Some(ident) = ident {
                    push_param(&mut params, ident, parsed, doc, index);
                    index += 1;
                }
            }
        }
    }
    FunctionDecl {
        name,
        params,
        span: Span::of(node),
    }
}

fn push_param(
    params: &mut Vec<ParamInfo>,
    ident: Node<'_>,
    parsed: &ParsedFile,
    doc: Option<&JsDocComment>,
    index: usize,
) {
    let name = parsed.text(ident).to_owned();
    params.push(ParamInfo {
        tainted: doc.is_some_and(|d| d.has_tag_for("tainted", &name)),
        untainted: doc.is_some_and(|d| d.has_tag_for("untainted", &name)),
        sanitized: doc.is_some_and(|d| d.has_tag_for("sanitized", &name)),
        name,
        index,
        span: Span::of(ident),
    });
}

fn expr_info(node: Node<'_>, parsed: &ParsedFile) -> ExprInfo {
    // `await f(x)` and `(expr)` classify as their inner expression.
    let node = if matches!(node.kind(), "await_expression" | "parenthesized_expression") {
        node.named_child(0).unwrap_or(node)
    } else {
        node
    };
    let kind = match node.kind() {
        "identifier" => ExprKind::Identifier,
        "member_expression" => ExprKind::Member,
        "subscript_expression" => ExprKind::Element,
        "call_expression" => ExprKind::Call,
        "new_expression" => ExprKind::New,
        "template_string" => ExprKind::Template,
        "string" => ExprKind::StringLit,
        "number" => ExprKind::Number,
        _ => ExprKind::Other,
    };
    let call = match kind {
        ExprKind::Call => Some(build_call(node, parsed, false)),
        ExprKind::New => Some(build_call(node, parsed, true)),
        _ => None,
    };
    let member = match kind {
        ExprKind::Member => build_member(node, parsed),
        ExprKind::Element => reduce_subscript(node, parsed),
        _ => None,
    };
    ExprInfo {
        text: parsed.text(node).to_owned(),
        kind,
        identifiers: collect_identifiers(node, parsed),
        call,
        member,
    }
}

fn is_literal_kind(kind: &str) -> bool {
    matches!(
        kind,
        "string" | "number" | "true" | "false" | "null" | "undefined" | "regex"
    )
}

fn collect_identifiers(node: Node<'_>, parsed: &ParsedFile) -> Vec<String> {
    let mut out = Vec::new();
    collect_identifiers_recursive(node, parsed, &mut out);
    out
}

fn collect_identifiers_recursive(node: Node<'_>, parsed: &ParsedFile, out: &mut Vec<String>) {
    if node.kind() == "identifier" {
        let text = parsed.text(node).to_owned();
        if !out.contains(&text) {
            out.push(text);
        }
        return;
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_identifiers_recursive(child, parsed, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parser::parse_source;
    use std::path::Path;

    fn events_of(source: &str) -> Vec<Event> {
        let parsed = parse_source(source, Path::new("test.js")).unwrap();
        collect_events(&parsed)
    }

    #[test]
    fn test_variable_decl_event() {
        let events = events_of("const userId = req.params.id;\n");
        let decl = events.iter().find_map(|e| match e {
            Event::VarDecl(d) => Some(d),
            _ => None,
        });
        let decl = decl.expect("expected a declaration event");
        assert_eq!(decl.name, "userId");
        assert_eq!(decl.init.as_ref().unwrap().kind, ExprKind::Member);
    }

    #[test]
    fn test_property_chain_prefixes() {
        let events = events_of("const x = req.query.id;\n");
        let accesses: Vec<&PropertyAccess> = events
            .iter()
            .filter_map(|e| match e {
                Event::Property(p) => Some(p),
                _ => None,
            })
            .collect();
        // Both req.query.id and the req.query prefix must be visible.
        assert!(accesses.iter().any(|p| p.full == "req.query.id"));
        assert!(accesses.iter().any(|p| p.full == "req.query"));
    }

    #[test]
    fn test_call_event_method() {
        let events = events_of("db.query(sql, params);\n");
        let call = events.iter().find_map(|e| match e {
            Event::Call(c) => Some(c),
            _ => None,
        });
        let call = call.expect("expected a call event");
        assert_eq!(call.object.as_deref(), Some("db"));
        assert_eq!(call.function, "query");
        assert_eq!(call.args.len(), 2);
        assert!(call.args[0].is_identifier);
    }

    #[test]
    fn test_new_expression() {
        let events = events_of("const f = new Function('x', body);\n");
        let call = events.iter().find_map(|e| match e {
            Event::Call(c) => Some(c),
            _ => None,
        });
        let call = call.expect("expected a call event");
        assert!(call.is_new);
        assert_eq!(call.function, "Function");
    }

    #[test]
    fn test_element_access_reduction() {
        let events = events_of("const p = process.env['PATH'];\n");
        let access = events.iter().find_map(|e| match e {
            Event::Property(p) if p.computed => Some(p),
            _ => None,
        });
        let access = access.expect("expected a reduced element access");
        assert_eq!(access.object, "process.env");
        assert_eq!(access.property, "PATH");
    }

    #[test]
    fn test_template_interpolations() {
        let events = events_of("const q = `SELECT * FROM t WHERE id = ${userId}`;\n");
        let template = events.iter().find_map(|e| match e {
            Event::Template(t) => Some(t),
            _ => None,
        });
        let template = template.expect("expected a template event");
        assert_eq!(template.interpolations, vec!["userId"]);
    }

    #[test]
    fn test_function_params_with_jsdoc() {
        let source = "/** @tainted data */\nfunction handler(data, count) { return data; }\n";
        let events = events_of(source);
        let func = events.iter().find_map(|e| match e {
            Event::Function(f) => Some(f),
            _ => None,
        });
        let func = func.expect("expected a function event");
        assert_eq!(func.name, "handler");
        assert_eq!(func.params.len(), 2);
        assert!(func.params[0].tainted);
        assert!(!func.params[1].tainted);
    }

    #[test]
    fn test_arrow_function_binding() {
        let events = events_of("const run = (cmd) => exec(cmd);\n");
        let func = events.iter().find_map(|e| match e {
            Event::Function(f) => Some(f),
            _ => None,
        });
        let func = func.expect("expected a function event");
        assert_eq!(func.name, "run");
        assert_eq!(func.params[0].name, "cmd");
    }
}
