//! JSDoc comment collection and taint tag parsing.
//!
//! A `/** ... */` block annotates the declaration that starts within
//! [`crate::constants::JSDOC_ATTACH_WINDOW`] bytes after it ends. Tags of
//! interest are `@tainted`, `@untainted` and `@sanitized`, optionally
//! followed by a parameter name.

use crate::constants::JSDOC_ATTACH_WINDOW;
use tree_sitter::Node;

/// A single parsed JSDoc tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsDocTag {
    /// Tag name without the leading `@` (e.g. `tainted`).
    pub name: String,
    /// Optional first word following the tag (a parameter name).
    pub argument: Option<String>,
}

/// A JSDoc block comment with its byte range and parsed tags.
#[derive(Debug, Clone)]
pub struct JsDocComment {
    /// Byte offset of `/**`.
    pub start_byte: usize,
    /// Byte offset one past `*/`.
    pub end_byte: usize,
    /// Parsed tags, in order of appearance.
    pub tags: Vec<JsDocTag>,
}

impl JsDocComment {
    /// Returns the first tag with the given name, if present.
    #[must_use]
    pub fn tag(&self, name: &str) -> Option<&JsDocTag> {
        self.tags.iter().find(|t| t.name == name)
    }

    /// Returns true when the block carries the tag for the given
    /// parameter: either `@tag param` or a bare `@tag`.
    #[must_use]
    pub fn has_tag_for(&self, name: &str, param: &str) -> bool {
        self.tags.iter().any(|t| {
            t.name == name && t.argument.as_deref().is_none_or(|arg| arg == param)
        })
    }
}

/// Parses the tags out of a comment body.
#[must_use]
pub fn parse_tags(comment: &str) -> Vec<JsDocTag> {
    let mut tags = Vec::new();
    for line in comment.lines() {
        let line = line.trim().trim_start_matches('*').trim();
        let mut words = line.split_whitespace();
        while let Some(word) = words.next() {
            if let Some(name) = word.strip_prefix('@') {
                if name.is_empty() {
                    continue;
                }
                let argument = words
                    .clone()
                    .next()
                    .filter(|w| !w.starts_with('@') && !w.starts_with('{'))
                    .map(str::to_owned);
                tags.push(JsDocTag {
                    name: name.to_owned(),
                    argument,
                });
            }
        }
    }
    tags
}

/// Collects every JSDoc block comment in the tree.
#[must_use]
pub fn collect_comments(root: Node<'_>, source: &str) -> Vec<JsDocComment> {
    let mut out = Vec::new();
    collect_recursive(root, source, &mut out);
    out
}

fn collect_recursive(node: Node<'_>, source: &str, out: &mut Vec<JsDocComment>) {
    if node.kind() == "comment" {
        let text = node.utf8_text(source.as_bytes()).unwrap_or_default();
        if text.starts_with("/**") {
            out.push(JsDocComment {
                start_byte: node.start_byte(),
                end_byte: node.end_byte(),
                tags: parse_tags(text),
            });
        }
        return;
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_recursive(child, source, out);
        }
    }
}

/// Finds the JSDoc block attached to a declaration starting at `start_byte`.
///
/// A block attaches only to the declaration that immediately follows it:
/// the gap must be whitespace and at most [`JSDOC_ATTACH_WINDOW`] bytes.
#[must_use]
pub fn find_attached<'a>(
    comments: &'a [JsDocComment],
    source: &str,
    start_byte: usize,
) -> Option<&'a JsDocComment> {
    comments
        .iter()
        .filter(|c| {
            c.end_byte <= start_byte
                && start_byte - c.end_byte <= JSDOC_ATTACH_WINDOW
                && source
                    .get(c.end_byte..start_byte)
                    .is_some_and(|gap| gap.chars().all(char::is_whitespace))
        })
        .max_by_key(|c| c.end_byte)
}
