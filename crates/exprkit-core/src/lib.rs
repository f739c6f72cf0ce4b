//! Shared compiler-style utilities for exprkit.
pub mod diagnostic;

pub use diagnostic::{CompilationPhase, Diagnostic, DiagnosticSeverity, Location};
