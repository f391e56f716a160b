//! Core types for taint analysis.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A position in a source file. Lines and columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File the location belongs to.
    pub file: PathBuf,
    /// 1-indexed line.
    pub line: usize,
    /// 1-indexed column.
    pub column: usize,
    /// Length of the region in bytes.
    pub length: usize,
}

impl Location {
    /// Creates a location.
    #[must_use]
    pub fn new(file: PathBuf, line: usize, column: usize, length: usize) -> Self {
        Self {
            file,
            line,
            column,
            length,
        }
    }
}

/// Category of a taint-introducing program point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceCategory {
    /// Data controlled directly by an end user (HTTP params, browser state).
    UserInput,
    /// Data arriving over the network from another service.
    NetworkInput,
    /// Data read from the filesystem.
    FileInput,
    /// Process environment variables.
    Environment,
    /// Data loaded from a database.
    Database,
}

impl std::fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceCategory::UserInput => write!(f, "user-input"),
            SourceCategory::NetworkInput => write!(f, "network-input"),
            SourceCategory::FileInput => write!(f, "file-input"),
            SourceCategory::Environment => write!(f, "environment"),
            SourceCategory::Database => write!(f, "database"),
        }
    }
}

/// The API call that introduced or consumed a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCall {
    /// Function or property name.
    pub function_name: String,
    /// Receiver, when the access was a method call or property chain.
    pub object_name: Option<String>,
    /// Argument texts.
    pub arguments: Vec<String>,
}

/// A program point where untrusted data enters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaintSource {
    /// Broad category of the source.
    pub category: SourceCategory,
    /// Finer classification (e.g. `http-request`, `browser-location`).
    pub subcategory: String,
    /// Where the source occurs.
    pub location: Location,
    /// Identifier that will hold the untrusted value. For property chains
    /// this is the nearest receiving identifier.
    pub variable_name: String,
    /// The introducing API call or property access.
    pub api_call: ApiCall,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Kind of vulnerability a sink can cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SinkKind {
    /// SQL injection via query execution.
    SqlInjection,
    /// Path traversal via file reads.
    PathTraversal,
    /// OS command injection.
    CommandInjection,
    /// Cross-site scripting via response or DOM writes.
    Xss,
    /// Dynamic code evaluation.
    CodeInjection,
    /// File content writes with attacker-controlled data.
    FileWrite,
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkKind::SqlInjection => write!(f, "sql-injection"),
            SinkKind::PathTraversal => write!(f, "path-traversal"),
            SinkKind::CommandInjection => write!(f, "command-injection"),
            SinkKind::Xss => write!(f, "xss"),
            SinkKind::CodeInjection => write!(f, "code-injection"),
            SinkKind::FileWrite => write!(f, "file-write"),
        }
    }
}

/// Risk buckets for findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Minor security concern.
    Low,
    /// Potential security risk.
    Medium,
    /// Significant security risk.
    High,
    /// Immediate exploitation risk.
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Critical => write!(f, "CRITICAL"),
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::Low => write!(f, "LOW"),
        }
    }
}

/// The dangerous call at a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DangerousFunction {
    /// Called function name.
    pub function_name: String,
    /// Receiver, for method sinks.
    pub object_name: Option<String>,
    /// Argument texts.
    pub arguments: Vec<String>,
    /// Position of the argument whose taint matters.
    pub dangerous_parameter_index: usize,
}

/// A program point where tainted data becomes a vulnerability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaintSink {
    /// Kind of vulnerability.
    pub kind: SinkKind,
    /// Finer classification string (e.g. `sql`, `dom-write`).
    pub category: String,
    /// Where the sink occurs.
    pub location: Location,
    /// The dangerous call.
    pub function: DangerousFunction,
    /// Inherent risk of the sink.
    pub risk_level: RiskLevel,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Four-valued taint lattice.
///
/// `tainted` dominates under propagation defaults; the solver applies
/// explicit rules rather than a total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaintStatus {
    /// Possibly attacker-controlled.
    Tainted,
    /// Known clean.
    Untainted,
    /// Cleaned by a recognized sanitizer.
    Sanitized,
    /// Not yet determined.
    Unknown,
}

impl TaintStatus {
    /// `untainted` and `sanitized` are interchangeable for rule purposes.
    #[must_use]
    pub fn is_clean(self) -> bool {
        matches!(self, TaintStatus::Untainted | TaintStatus::Sanitized)
    }
}

impl std::fmt::Display for TaintStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaintStatus::Tainted => write!(f, "tainted"),
            TaintStatus::Untainted => write!(f, "untainted"),
            TaintStatus::Sanitized => write!(f, "sanitized"),
            TaintStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Kind of a recorded data-flow relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstraintKind {
    /// `target = source`.
    Assignment,
    /// Source passed as an argument.
    Parameter,
    /// Target receives a call's return value.
    Return,
    /// Target is a property read off the source object.
    PropertyAccess,
    /// Method invocation on the source.
    MethodCall,
}

/// A data-flow relationship between two program names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeConstraint {
    /// Relationship kind.
    pub kind: ConstraintKind,
    /// Symbol-normalized source name or expression text.
    pub source: String,
    /// Symbol-normalized target name. Parameter constraints may use the
    /// synthesized `F[paramN]` form.
    pub target: String,
    /// Where the relationship was observed.
    pub location: Location,
    /// Human-readable description.
    pub description: String,
}

/// Explicit taint annotation on a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaintAnnotation {
    /// `@tainted` is present.
    pub is_tainted: bool,
    /// `@untainted` is present.
    pub is_untainted: bool,
    /// `@sanitized` is present.
    pub is_sanitized: bool,
}

impl TaintAnnotation {
    /// The lattice value an annotation pins, if any.
    #[must_use]
    pub fn status(self) -> Option<TaintStatus> {
        if self.is_tainted {
            Some(TaintStatus::Tainted)
        } else if self.is_sanitized {
            Some(TaintStatus::Sanitized)
        } else if self.is_untainted {
            Some(TaintStatus::Untainted)
        } else {
            None
        }
    }
}

/// Per-variable taint record built by the constraint extractor.
///
/// Created when the extractor first observes the variable, mutated only by
/// the solver, and dropped together with the file result.
#[derive(Debug, Clone)]
pub struct TypeTaintInfo {
    /// Variable name.
    pub variable: String,
    /// Current lattice value.
    pub status: TaintStatus,
    /// Index into the detected-sources vec, when source-derived.
    pub source_index: Option<usize>,
    /// Explicit annotation, when present.
    pub annotation: Option<TaintAnnotation>,
    /// Indices of constraints mentioning this variable.
    pub constraint_indices: Vec<usize>,
}

impl TypeTaintInfo {
    /// Creates a fresh record with `unknown` status.
    #[must_use]
    pub fn new(variable: &str) -> Self {
        Self {
            variable: variable.to_owned(),
            status: TaintStatus::Unknown,
            source_index: None,
            annotation: None,
            constraint_indices: Vec::new(),
        }
    }
}

/// Kind of one hop in a reported data-flow path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    /// Value copied via assignment.
    Assignment,
    /// Value passed as an argument.
    ParameterPassing,
    /// Value returned from a call.
    ReturnValue,
    /// Value read off a property.
    PropertyAccess,
    /// Value flowed through a method call.
    MethodCall,
}

/// One hop of a source-to-sink path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFlowStep {
    /// Hop kind.
    pub kind: StepKind,
    /// Where the hop occurs.
    pub location: Location,
    /// Variable holding the value at this point.
    pub variable_name: String,
    /// Human-readable description.
    pub description: String,
}

/// A concrete flow from a source to a sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFlowPath {
    /// Origin of the tainted value.
    pub source: TaintSource,
    /// Dangerous destination.
    pub sink: TaintSink,
    /// Ordered hops from source toward sink.
    pub steps: Vec<DataFlowStep>,
    /// Path confidence in `[0.1, 1.0]`.
    pub confidence: f64,
    /// Risk bucket after sanitization credit.
    pub risk_level: RiskLevel,
    /// False when the path moves a tainted value into an untainted one
    /// without passing a sanitizer.
    pub type_safe: bool,
}

impl DataFlowPath {
    /// Formats the hop chain for display.
    #[must_use]
    pub fn flow_summary(&self) -> String {
        let vars: Vec<&str> = self
            .steps
            .iter()
            .map(|s| s.variable_name.as_str())
            .collect();
        format!(
            "{} → {} → {}",
            self.source.variable_name,
            vars.join(" → "),
            self.sink.function.function_name
        )
    }
}

/// Closed set of reportable issue types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueType {
    /// SQL injection.
    SqlInjection,
    /// Path traversal.
    PathTraversal,
    /// Command injection.
    CommandInjection,
    /// Cross-site scripting.
    Xss,
    /// Dynamic code injection.
    CodeInjection,
    /// Weak or misused cryptography.
    CryptographicFailure,
    /// Known-vulnerable dependency.
    VulnerableDependency,
    /// Insecure design pattern.
    InsecureDesign,
    /// Unsafe logging.
    LoggingFailure,
    /// Missing access control.
    AccessControlFailure,
    /// Security misconfiguration.
    SecurityMisconfiguration,
    /// Weak authentication.
    AuthenticationFailure,
    /// Data integrity failure (unsafe deserialization and kin).
    DataIntegrityFailure,
    /// Server-side request forgery.
    SsrfVulnerability,
    /// Input used without validation.
    UnvalidatedInput,
    /// Generic taint flow.
    TaintFlow,
    /// A variable should carry a taint annotation.
    MissingAnnotation,
    /// Annotation disagrees with inferred taint.
    IncompatibleTypes,
    /// The analysis itself failed for this file.
    AnalysisError,
    /// Chained attack steps (excluded from default findings).
    MultiStepAttack,
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IssueType::SqlInjection => "sql-injection",
            IssueType::PathTraversal => "path-traversal",
            IssueType::CommandInjection => "command-injection",
            IssueType::Xss => "xss",
            IssueType::CodeInjection => "code-injection",
            IssueType::CryptographicFailure => "cryptographic-failure",
            IssueType::VulnerableDependency => "vulnerable-dependency",
            IssueType::InsecureDesign => "insecure-design",
            IssueType::LoggingFailure => "logging-failure",
            IssueType::AccessControlFailure => "access-control-failure",
            IssueType::SecurityMisconfiguration => "security-misconfiguration",
            IssueType::AuthenticationFailure => "authentication-failure",
            IssueType::DataIntegrityFailure => "data-integrity-failure",
            IssueType::SsrfVulnerability => "ssrf-vulnerability",
            IssueType::UnvalidatedInput => "unvalidated-input",
            IssueType::TaintFlow => "taint-flow",
            IssueType::MissingAnnotation => "missing-annotation",
            IssueType::IncompatibleTypes => "incompatible-types",
            IssueType::AnalysisError => "analysis-error",
            IssueType::MultiStepAttack => "multi-step-attack",
        };
        write!(f, "{s}")
    }
}

impl IssueType {
    /// Maps a sink kind onto its reported issue type.
    ///
    /// `file-write` sinks report as path traversal; the closed issue set
    /// has no separate member for them.
    #[must_use]
    pub fn from_sink(kind: SinkKind) -> Self {
        match kind {
            SinkKind::SqlInjection => IssueType::SqlInjection,
            SinkKind::PathTraversal | SinkKind::FileWrite => IssueType::PathTraversal,
            SinkKind::CommandInjection => IssueType::CommandInjection,
            SinkKind::Xss => IssueType::Xss,
            SinkKind::CodeInjection => IssueType::CodeInjection,
        }
    }

    /// True for the injection-class types produced by flow tracing.
    #[must_use]
    pub fn is_flow_issue(self) -> bool {
        matches!(
            self,
            IssueType::SqlInjection
                | IssueType::PathTraversal
                | IssueType::CommandInjection
                | IssueType::Xss
                | IssueType::CodeInjection
                | IssueType::TaintFlow
                | IssueType::UnvalidatedInput
        )
    }
}

/// Issue severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational.
    Info,
    /// Should be reviewed.
    Warning,
    /// Must be fixed.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

impl Severity {
    /// Maps a risk bucket onto a reporting severity.
    #[must_use]
    pub fn from_risk(risk: RiskLevel) -> Self {
        match risk {
            RiskLevel::Critical | RiskLevel::High => Severity::Error,
            RiskLevel::Medium => Severity::Warning,
            RiskLevel::Low => Severity::Info,
        }
    }
}

/// A reported finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Issue classification.
    pub issue_type: IssueType,
    /// Reporting severity.
    pub severity: Severity,
    /// Description of the problem.
    pub message: String,
    /// Where the problem is (the sink position for flow issues).
    pub location: Location,
    /// Suggested remediation, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Sink function name, part of the uniqueness key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    /// Risk bucket for flow issues.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskLevel>,
    /// Finding confidence in `[0, 1]`.
    pub confidence: f64,
}

impl Issue {
    /// The uniqueness key `(line, column, type, function_name)` within a
    /// file result.
    #[must_use]
    pub fn dedup_key(&self) -> (usize, usize, IssueType, String) {
        (
            self.location.line,
            self.location.column,
            self.issue_type,
            self.function_name.clone().unwrap_or_default(),
        )
    }
}
