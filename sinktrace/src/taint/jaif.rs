//! Checker-Framework-style JAIF export.
//!
//! Serializes the inferred variable → qualifier map as a single text
//! document. One document per analysis.

use super::inference::InferredAnnotation;
use super::types::TaintStatus;

/// Renders the annotations as a JAIF document.
#[must_use]
pub fn export_jaif(file_name: &str, annotations: &[InferredAnnotation]) -> String {
    let mut out = String::new();
    out.push_str("package sinktrace.qual:\n");
    out.push_str("annotation @Tainted:\n");
    out.push_str("annotation @Untainted:\n");
    out.push_str("annotation @Sanitized:\n\n");

    out.push_str("package :\n");
    out.push_str(&format!("class {file_name}:\n"));

    let mut sorted: Vec<&InferredAnnotation> = annotations.iter().collect();
    sorted.sort_by(|a, b| a.variable.cmp(&b.variable));

    for annotation in sorted {
        let qualifier = match annotation.status {
            TaintStatus::Tainted => "@sinktrace.qual.Tainted",
            TaintStatus::Untainted => "@sinktrace.qual.Untainted",
            TaintStatus::Sanitized => "@sinktrace.qual.Sanitized",
            TaintStatus::Unknown => continue,
        };
        out.push_str(&format!("    field {}:\n", annotation.variable));
        out.push_str(&format!("        type: {qualifier}\n"));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(variable: &str, status: TaintStatus) -> InferredAnnotation {
        InferredAnnotation {
            variable: variable.to_owned(),
            status,
            confidence: 0.9,
            jsdoc_form: "@tainted".to_owned(),
            type_form: "Tainted<T>".to_owned(),
            reasoning: Vec::new(),
        }
    }

    #[test]
    fn test_jaif_contains_qualifiers() {
        let annotations = vec![
            annotation("userId", TaintStatus::Tainted),
            annotation("limit", TaintStatus::Untainted),
        ];
        let jaif = export_jaif("handler.js", &annotations);
        assert!(jaif.contains("field userId:"));
        assert!(jaif.contains("@sinktrace.qual.Tainted"));
        assert!(jaif.contains("field limit:"));
        assert!(jaif.starts_with("package sinktrace.qual:"));
    }

    #[test]
    fn test_jaif_sorted_and_stable() {
        let annotations = vec![
            annotation("zeta", TaintStatus::Tainted),
            annotation("alpha", TaintStatus::Tainted),
        ];
        let jaif = export_jaif("a.js", &annotations);
        let alpha = jaif.find("field alpha").unwrap();
        let zeta = jaif.find("field zeta").unwrap();
        assert!(alpha < zeta);
    }
}
