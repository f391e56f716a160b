//! Taint source detection.
//!
//! Identifies where untrusted data enters the program: HTTP request
//! objects, filesystem reads, network clients, environment variables,
//! browser globals and `@tainted` parameters.

use super::types::{ApiCall, Location, SourceCategory, TaintSink, TaintSource};
use crate::ast::{CallExpr, Event, ExprInfo, ExprKind, PropertyAccess, Span};
use rustc_hash::FxHashSet;
use std::path::Path;

/// Classification template produced by the recognition tables.
struct SourceMatch {
    category: SourceCategory,
    subcategory: &'static str,
    confidence: f64,
    function_name: String,
    object_name: Option<String>,
    arguments: Vec<String>,
}

/// Detects every taint source in a file's events.
///
/// Declarations and assignments are examined first so the receiving
/// identifier wins the deduplication key over the bare expression; property
/// chains are examined prefix pair by prefix pair.
#[must_use]
pub fn detect_sources(
    file: &Path,
    events: &[Event],
    custom_sources: &[String],
) -> Vec<TaintSource> {
    let mut sources = Vec::new();
    let mut seen: FxHashSet<(usize, usize, String, String)> = FxHashSet::default();

    // Pass 1: declarations and assignments, which name the receiving
    // identifier.
    for event in events {
        match event {
            Event::VarDecl(decl) => {
                if let Some(init) = &decl.init {
                    if let Some(m) = classify_expr(init, custom_sources) {
                        push_source(&mut sources, &mut seen, file, m, &decl.name, init_span(init, decl.span));
                    }
                }
            }
            Event::Assign(assign) if assign.target_is_identifier => {
                if let Some(m) = classify_expr(&assign.value, custom_sources) {
                    push_source(
                        &mut sources,
                        &mut seen,
                        file,
                        m,
                        &assign.target,
                        init_span(&assign.value, assign.span),
                    );
                }
            }
            _ => {}
        }
    }

    // Pass 2: standalone property accesses and calls; the dedup key drops
    // anything already claimed by a declaration.
    for event in events {
        match event {
            Event::Property(access) => {
                if let Some(m) = classify_property(access) {
                    push_source(&mut sources, &mut seen, file, m, &access.full, access.span);
                }
            }
            Event::Call(call) => {
                if let Some(m) = classify_call(call, custom_sources) {
                    let receiver = call.dotted_name();
                    push_source(&mut sources, &mut seen, file, m, &receiver, call.span);
                }
            }
            Event::Function(func) => {
                for param in &func.params {
                    if param.tainted {
                        let m = SourceMatch {
                            category: SourceCategory::UserInput,
                            subcategory: "tainted-parameter",
                            confidence: 0.9,
                            function_name: func.name.clone(),
                            object_name: None,
                            arguments: Vec::new(),
                        };
                        push_source(&mut sources, &mut seen, file, m, &param.name, param.span);
                    }
                }
            }
            _ => {}
        }
    }

    sources
}

/// Removes source candidates whose position and function coincide with a
/// recognized sink. Executions that are sinks are never sources.
#[must_use]
pub fn filter_sink_collisions(sources: Vec<TaintSource>, sinks: &[TaintSink]) -> Vec<TaintSource> {
    sources
        .into_iter()
        .filter(|source| {
            !sinks.iter().any(|sink| {
                sink.location.line == source.location.line
                    && sink.location.column == source.location.column
                    && sink.function.function_name == source.api_call.function_name
            })
        })
        .collect()
}

fn init_span(init: &ExprInfo, fallback: Span) -> Span {
    match (&init.call, &init.member) {
        (Some(call), _) => call.span,
        (_, Some(member)) => member.span,
        _ => fallback,
    }
}

fn push_source(
    sources: &mut Vec<TaintSource>,
    seen: &mut FxHashSet<(usize, usize, String, String)>,
    file: &Path,
    m: SourceMatch,
    variable_name: &str,
    span: Span,
) {
    let key = (
        span.line,
        span.column,
        m.function_name.clone(),
        m.object_name.clone().unwrap_or_default(),
    );
    if !seen.insert(key) {
        return;
    }
    sources.push(TaintSource {
        category: m.category,
        subcategory: m.subcategory.to_owned(),
        location: Location::new(file.to_path_buf(), span.line, span.column, span.length()),
        variable_name: variable_name.to_owned(),
        api_call: ApiCall {
            function_name: m.function_name,
            object_name: m.object_name,
            arguments: m.arguments,
        },
        confidence: m.confidence,
    });
}

fn classify_expr(init: &ExprInfo, custom_sources: &[String]) -> Option<SourceMatch> {
    if let Some(call) = &init.call {
        return classify_call(call, custom_sources);
    }
    if let Some(member) = &init.member {
        return classify_property(member);
    }
    if init.kind == ExprKind::Identifier && init.text == "location" {
        return Some(SourceMatch {
            category: SourceCategory::UserInput,
            subcategory: "browser-location",
            confidence: 0.85,
            function_name: "location".to_owned(),
            object_name: None,
            arguments: Vec::new(),
        });
    }
    None
}

fn is_request_object(name: &str) -> bool {
    matches!(name, "req" | "request")
}

/// Classifies a property access by examining every prefix pair of the
/// chain, so `req.query.id` resolves to the `(req, query)` pair and deeper
/// accesses never re-report the bare object.
///
/// The returned match is normalized to the pair that fired, which makes the
/// deduplication key identical for a chain and its standalone prefix.
fn classify_property(access: &PropertyAccess) -> Option<SourceMatch> {
    if let Some(m) = classify_pair(&access.object, &access.property) {
        return Some(m);
    }
    let segments: Vec<&str> = access.object.split('.').collect();
    for pair in segments.windows(2) {
        if let Some(m) = classify_pair(pair[0], pair[1]) {
            return Some(m);
        }
    }
    None
}

fn classify_pair(object: &str, property: &str) -> Option<SourceMatch> {
    let matched: Option<(SourceCategory, &'static str, f64)> = if is_request_object(object) {
        match property {
            "query" | "params" | "body" => Some((SourceCategory::UserInput, "http-request", 0.9)),
            "headers" => Some((SourceCategory::UserInput, "http-headers", 0.85)),
            "cookies" => Some((SourceCategory::UserInput, "http-cookies", 0.9)),
            _ => None,
        }
    } else {
        match (object, property) {
            ("process", "env") => Some((SourceCategory::Environment, "env-variables", 0.75)),
            ("window", "location") => Some((SourceCategory::UserInput, "browser-location", 0.9)),
            ("document", "URL") => Some((SourceCategory::UserInput, "browser-url", 0.85)),
            ("document", "referrer") => {
                Some((SourceCategory::UserInput, "browser-referrer", 0.85))
            }
            _ => None,
        }
    };
    matched.map(|(category, subcategory, confidence)| SourceMatch {
        category,
        subcategory,
        confidence,
        function_name: property.to_owned(),
        object_name: Some(object.to_owned()),
        arguments: Vec::new(),
    })
}

fn classify_call(call: &CallExpr, custom_sources: &[String]) -> Option<SourceMatch> {
    let object = call.object.as_deref();
    let function = call.function.as_str();
    let arguments: Vec<String> = call.args.iter().map(|a| a.text.clone()).collect();

    let matched: Option<(SourceCategory, &'static str, f64)> = match (object, function) {
        (Some("fs"), "readFile" | "readFileSync" | "readdir" | "readdirSync"
            | "createReadStream") => Some((SourceCategory::FileInput, "filesystem", 0.8)),
        (None, "readFile" | "readFileSync") => {
            Some((SourceCategory::FileInput, "filesystem", 0.75))
        }
        (None, "fetch") => Some((SourceCategory::NetworkInput, "http-client", 0.85)),
        (Some("axios"), "get" | "post" | "put" | "delete" | "patch" | "request") => {
            Some((SourceCategory::NetworkInput, "http-client", 0.85))
        }
        (None, "request") => Some((SourceCategory::NetworkInput, "http-client", 0.85)),
        (_, "getenv") => Some((SourceCategory::Environment, "env-variables", 0.75)),
        _ => None,
    };

    if let Some((category, subcategory, confidence)) = matched {
        return Some(SourceMatch {
            category,
            subcategory,
            confidence,
            function_name: function.to_owned(),
            object_name: object.map(str::to_owned),
            arguments,
        });
    }

    // Custom source names from configuration.
    let dotted = call.dotted_name();
    if custom_sources.iter().any(|p| *p == dotted || *p == function) {
        return Some(SourceMatch {
            category: SourceCategory::UserInput,
            subcategory: "custom",
            confidence: 0.8,
            function_name: function.to_owned(),
            object_name: object.map(str::to_owned),
            arguments,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{collect_events, parse_source};
    use std::path::PathBuf;

    fn sources_of(source: &str) -> Vec<TaintSource> {
        let path = PathBuf::from("test.js");
        let parsed = parse_source(source, &path).unwrap();
        let events = collect_events(&parsed);
        detect_sources(&path, &events, &[])
    }

    #[test]
    fn test_request_query_source() {
        let sources = sources_of("const id = req.query.id;\n");
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].variable_name, "id");
        assert_eq!(sources[0].subcategory, "http-request");
        assert!(sources[0].confidence >= 0.85);
    }

    #[test]
    fn test_request_not_reported_standalone() {
        // req.query is the source; req alone must not be re-reported.
        let sources = sources_of("const q = req.query;\n");
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].category, SourceCategory::UserInput);
    }

    #[test]
    fn test_headers_subcategory() {
        let sources = sources_of("const ua = request.headers['user-agent'];\n");
        assert!(sources
            .iter()
            .any(|s| s.subcategory == "http-headers"));
    }

    #[test]
    fn test_env_source() {
        let sources = sources_of("const home = process.env.HOME;\n");
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].category, SourceCategory::Environment);
        assert_eq!(sources[0].variable_name, "home");
    }

    #[test]
    fn test_fetch_source() {
        let sources = sources_of("const data = fetch(url);\n");
        assert_eq!(sources[0].category, SourceCategory::NetworkInput);
        assert_eq!(sources[0].subcategory, "http-client");
    }

    #[test]
    fn test_browser_location() {
        let sources = sources_of("const here = window.location;\n");
        assert_eq!(sources[0].subcategory, "browser-location");
        assert!(sources[0].confidence >= 0.9);
    }

    #[test]
    fn test_jsdoc_tainted_param() {
        let sources =
            sources_of("/** @tainted input */\nfunction handle(input) { return input; }\n");
        assert!(sources
            .iter()
            .any(|s| s.subcategory == "tainted-parameter" && s.variable_name == "input"));
    }

    #[test]
    fn test_no_sources_in_safe_code() {
        let sources = sources_of("const x = 42;\nconst y = 'literal';\n");
        assert!(sources.is_empty());
    }

    #[test]
    fn test_dedup_same_position() {
        let sources = sources_of("const a = req.body;\n");
        let positions: Vec<(usize, usize)> = sources
            .iter()
            .map(|s| (s.location.line, s.location.column))
            .collect();
        let mut unique = positions.clone();
        unique.dedup();
        assert_eq!(positions.len(), unique.len());
    }
}
