//! Tree-sitter based parsing for the JS/TS dialect family.
//!
//! JavaScript files are accepted with the relaxed grammar; TypeScript files
//! use the stricter typed grammar. A parse always produces a tree; `ERROR`
//! and missing nodes are reported as non-fatal diagnostics.

use crate::error::AnalysisError;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser, Tree};

/// Language dialect selected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Plain JavaScript (`.js`), relaxed checking.
    JavaScript,
    /// JavaScript with JSX (`.jsx`), relaxed checking.
    Jsx,
    /// TypeScript (`.ts`), strict checking.
    TypeScript,
    /// TypeScript with JSX (`.tsx`), strict checking.
    Tsx,
}

impl Dialect {
    /// Picks the dialect for a file path, defaulting to JavaScript.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("ts") => Self::TypeScript,
            Some("tsx") => Self::Tsx,
            Some("jsx") => Self::Jsx,
            _ => Self::JavaScript,
        }
    }

    /// Whether this dialect carries static type annotations.
    #[must_use]
    pub fn is_typescript(self) -> bool {
        matches!(self, Self::TypeScript | Self::Tsx)
    }

    fn language(self) -> tree_sitter::Language {
        match self {
            Self::JavaScript | Self::Jsx => tree_sitter_javascript::LANGUAGE.into(),
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

/// A non-fatal syntax problem found while parsing.
#[derive(Debug, Clone)]
pub struct ParseDiagnostic {
    /// Human-readable description.
    pub message: String,
    /// 1-indexed line of the problem.
    pub line: usize,
    /// 1-indexed column of the problem.
    pub column: usize,
}

/// A parsed source file with its tree and diagnostics.
pub struct ParsedFile {
    /// Path of the file (as given by the caller).
    pub path: PathBuf,
    /// The full source text.
    pub source: String,
    /// Dialect used for parsing.
    pub dialect: Dialect,
    /// The tree-sitter syntax tree (best-effort on invalid input).
    pub tree: Tree,
    /// Syntax problems; never fatal.
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl ParsedFile {
    /// Returns the text of a node.
    #[must_use]
    pub fn text(&self, node: Node<'_>) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or_default()
    }
}

/// Tree-sitter based source parser.
pub struct SourceParser {
    parser: Parser,
    dialect: Dialect,
}

impl SourceParser {
    /// Creates a parser for the given dialect.
    ///
    /// # Errors
    /// Returns an error if the grammar fails to load.
    pub fn new(dialect: Dialect) -> Result<Self, AnalysisError> {
        let mut parser = Parser::new();
        parser
            .set_language(&dialect.language())
            .map_err(|e| AnalysisError::ParserInit(e.to_string()))?;
        Ok(Self { parser, dialect })
    }

    /// Parses source text into a [`ParsedFile`].
    ///
    /// # Errors
    /// Returns an error only when tree-sitter yields no tree at all, which
    /// indicates a parser misconfiguration rather than bad input.
    pub fn parse(&mut self, source: &str, path: &Path) -> Result<ParsedFile, AnalysisError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| AnalysisError::ParserInit("parser produced no tree".to_owned()))?;

        let mut diagnostics = Vec::new();
        collect_diagnostics(tree.root_node(), &mut diagnostics);

        Ok(ParsedFile {
            path: path.to_path_buf(),
            source: source.to_owned(),
            dialect: self.dialect,
            tree,
            diagnostics,
        })
    }
}

/// Parses a file's source, picking the dialect from its extension.
///
/// # Errors
/// Returns an error if the grammar fails to load.
pub fn parse_source(source: &str, path: &Path) -> Result<ParsedFile, AnalysisError> {
    let mut parser = SourceParser::new(Dialect::from_path(path))?;
    parser.parse(source, path)
}

fn collect_diagnostics(node: Node<'_>, out: &mut Vec<ParseDiagnostic>) {
    if node.is_error() || node.is_missing() {
        let point = node.start_position();
        let what = if node.is_missing() {
            format!("missing {}", node.kind())
        } else {
            "syntax error".to_owned()
        };
        out.push(ParseDiagnostic {
            message: what,
            line: point.row + 1,
            column: point.column + 1,
        });
        // An ERROR subtree is reported once, not per descendant.
        if node.is_error() {
            return;
        }
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.has_error() || child.is_missing() {
                collect_diagnostics(child, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_function() {
        let source = "function foo(a) { return a; }\n";
        let parsed = parse_source(source, Path::new("app.js")).unwrap();
        assert_eq!(parsed.tree.root_node().kind(), "program");
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn test_invalid_input_still_parses() {
        let source = "function ( {{{ \n";
        let parsed = parse_source(source, Path::new("broken.js")).unwrap();
        assert!(!parsed.diagnostics.is_empty());
    }

    #[test]
    fn test_dialect_selection() {
        assert_eq!(
            Dialect::from_path(Path::new("a.ts")),
            Dialect::TypeScript
        );
        assert_eq!(Dialect::from_path(Path::new("a.jsx")), Dialect::Jsx);
        assert!(Dialect::from_path(Path::new("a.tsx")).is_typescript());
    }

    #[test]
    fn test_typescript_parse() {
        let source = "const n: number = 1;\nfunction f(x: string): void {}\n";
        let parsed = parse_source(source, Path::new("a.ts")).unwrap();
        assert!(parsed.diagnostics.is_empty());
    }
}
