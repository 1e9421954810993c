//! Structured diagnostics reported by every stage of a generator pass

use crate::core::injection::Injection;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Aborts the affected root
    Error,
    /// Generation proceeds
    Warning,
    /// Generation proceeds; shown only in verbose mode
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DiagnosticId {
    AmbiguousBinding,
    NoSuitableConstructor,
    UnableToResolve,
    CircularDependency,
    LifetimeMismatch,
    ConstraintViolation,
    DuplicateRoot,
    BindingShadowed,
}

impl DiagnosticId {
    /// Stable code printed next to the message
    pub fn code(self) -> &'static str {
        match self {
            DiagnosticId::AmbiguousBinding => "STI001",
            DiagnosticId::NoSuitableConstructor => "STI002",
            DiagnosticId::UnableToResolve => "STI003",
            DiagnosticId::CircularDependency => "STI004",
            DiagnosticId::LifetimeMismatch => "STI005",
            DiagnosticId::ConstraintViolation => "STI006",
            DiagnosticId::DuplicateRoot => "STI007",
            DiagnosticId::BindingShadowed => "STI008",
        }
    }
}

/// Position of a declaration in the front end's source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub id: DiagnosticId,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    /// Injection chain from the root down to the failure point
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<Injection>,
    /// Composition root the diagnostic belongs to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

impl Diagnostic {
    pub fn new(id: DiagnosticId, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            id,
            severity,
            message: message.into(),
            location: None,
            chain: Vec::new(),
            root: None,
        }
    }

    pub fn error(id: DiagnosticId, message: impl Into<String>) -> Self {
        Self::new(id, Severity::Error, message)
    }

    pub fn warning(id: DiagnosticId, message: impl Into<String>) -> Self {
        Self::new(id, Severity::Warning, message)
    }

    pub fn info(id: DiagnosticId, message: impl Into<String>) -> Self {
        Self::new(id, Severity::Info, message)
    }

    pub fn with_location(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }

    pub fn with_chain(mut self, chain: Vec<Injection>) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// The chain rendered as `A -> B -> C`
    pub fn chain_text(&self) -> String {
        self.chain
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.id.code(), self.message)?;
        if let Some(location) = &self.location {
            write!(f, " ({})", location)?;
        }
        Ok(())
    }
}

/// Receiver of diagnostics. Implemented by whatever collects or renders them.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Sink that keeps every diagnostic in report order
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    diagnostics: Vec<Diagnostic>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// All diagnostics with the given id
    pub fn with_id(&self, id: DiagnosticId) -> Vec<&Diagnostic> {
        self.diagnostics.iter().filter(|d| d.id == id).collect()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
