//! Diagnostic messages emitted while processing a document.

use derive_more::Display;

/// A diagnostic message (error, warning, or info) with an optional source location.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[salsa::accumulator]
pub struct Diagnostic {
    pub message: String,
    pub location: Option<Location>,
    pub severity: DiagnosticSeverity,
    pub phase: CompilationPhase,
}

impl Diagnostic {
    pub fn error(phase: CompilationPhase, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            severity: DiagnosticSeverity::Error,
            phase,
        }
    }

    pub fn warning(phase: CompilationPhase, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            severity: DiagnosticSeverity::Warning,
            phase,
        }
    }

    pub fn info(phase: CompilationPhase, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            severity: DiagnosticSeverity::Info,
            phase,
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.severity, self.phase)?;
        if let Some(location) = &self.location {
            write!(f, " {location}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// 1-based line and column in the source text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[display("{line}:{column}")]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
}

/// Phase where a diagnostic was emitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum CompilationPhase {
    #[display("parse")]
    Parsing,
    #[display("lower")]
    Lowering,
    #[display("expand")]
    Expansion,
    #[display("negate")]
    Negation,
    #[display("eval")]
    Evaluation,
}

impl std::fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticSeverity::Error => write!(f, "ERROR"),
            DiagnosticSeverity::Warning => write!(f, "WARNING"),
            DiagnosticSeverity::Info => write!(f, "INFO"),
        }
    }
}
