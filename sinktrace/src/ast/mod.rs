//! AST facade over the tree-sitter JS/TS grammars.
//!
//! Parsing never fails: syntactically invalid input yields a best-effort
//! tree plus a non-fatal diagnostic list. The rest of the analyzer never
//! sees grammar node kinds; it consumes the classified events produced by
//! [`nodes::collect_events`].

/// JSDoc comment collection and tag parsing.
pub mod jsdoc;
/// Classified event extraction (calls, property accesses, declarations).
pub mod nodes;
/// Source parsing and dialect selection.
pub mod parser;

pub use nodes::{
    collect_events, ArgInfo, Assignment, CallExpr, Event, ExprInfo, ExprKind, FunctionDecl,
    ParamInfo, PropertyAccess, Span, TemplateExpr, VariableDecl,
};
pub use jsdoc::{JsDocComment, JsDocTag};
pub use parser::{parse_source, Dialect, ParseDiagnostic, ParsedFile, SourceParser};
