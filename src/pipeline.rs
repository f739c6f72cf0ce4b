//! Processing pipeline for exprkit documents.
//!
//! Every stage is a Salsa tracked function over a [`SourceFile`] and reads
//! the stage before it, so each document is parsed, lowered and expanded
//! once, and editing it only re-runs the stages that depend on the edit.
//!
//! ```text
//! SourceFile
//!     │
//!     ▼
//! parsed_document ─► Document (JSON structure)
//!     │
//!     ▼
//! lowered_document ─► LoweredDocument (names resolved)
//!     │
//!     ▼
//! expanded_predicate ─► ExpandedPredicate
//!     │
//!     ├─► expanded_source ─► Rendered (predicate before/after expansion)
//!     ├─► negated_source ─► Rendered (expanded predicate and its inverse)
//!     ├─► checked_source ─► runs every stage that applies to the document
//!     └─► evaluated_source ─► rendered value of the predicate for one argument
//! ```
//!
//! ## Diagnostics
//!
//! Stages report problems via `Diagnostic { ... }.accumulate(db)`; callers
//! collect them with [`source_diagnostics`] or [`eval_diagnostics`]. Salsa
//! gathers diagnostics across the whole chain of stages a query read, each
//! stage counted once.

use exprkit_ast::{Document, DocumentError, Lambda, LoweredDocument};
use exprkit_core::{CompilationPhase, Diagnostic, Location};
use exprkit_rewrite::{Expander, Predicate, StaticRegistry, ValueResolver};
use salsa::Accumulator;
use tracing::debug;

use crate::database::{EvalRequest, SourceFile};
use crate::eval::Evaluator;

/// A predicate rendered before and after a rewrite.
#[derive(Clone, Debug, PartialEq, Eq, Hash, salsa::Update)]
pub struct Rendered {
    pub before: String,
    pub after: String,
}

/// The document's predicate with every expandable call inlined.
#[derive(Clone, Debug, PartialEq, Eq, Hash, salsa::Update)]
pub struct ExpandedPredicate {
    pub original: Lambda,
    pub expanded: Lambda,
}

impl ExpandedPredicate {
    /// Whether expansion left the predicate as it was.
    pub fn is_unchanged(&self) -> bool {
        self.expanded.body().ptr_eq(self.original.body())
    }

    /// Whether the expanded predicate can be negated: one parameter and a
    /// boolean body. Projections are not.
    pub fn is_predicate(&self) -> bool {
        self.expanded.params().len() == 1 && self.expanded.body().is_bool()
    }
}

/// Which query's diagnostics to collect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Expand,
    Negate,
    /// Every stage that applies to the document.
    Check,
}

/// Static members of a lowered document, ready for resolution.
pub fn statics(document: &LoweredDocument) -> StaticRegistry {
    document
        .statics
        .iter()
        .map(|(declaring_type, members)| (declaring_type.clone(), members.clone()))
        .collect()
}

/// Stage 1: parse the document's JSON structure.
#[salsa::tracked]
pub fn parsed_document(db: &dyn salsa::Database, file: SourceFile) -> Option<Document> {
    match Document::from_json(file.text(db)) {
        Ok(document) => Some(document),
        Err(err) => {
            let diagnostic = match &err {
                DocumentError::Json(json) => {
                    Diagnostic::error(CompilationPhase::Parsing, err.to_string()).at(Location {
                        line: json.line(),
                        column: json.column(),
                    })
                }
                _ => Diagnostic::error(CompilationPhase::Parsing, err.to_string()),
            };
            diagnostic.accumulate(db);
            None
        }
    }
}

/// Stage 2: resolve parameter names, constants and statics.
#[salsa::tracked]
pub fn lowered_document(db: &dyn salsa::Database, file: SourceFile) -> Option<LoweredDocument> {
    let document = parsed_document(db, file)?;
    match document.lower() {
        Ok(lowered) => Some(lowered),
        Err(err) => {
            Diagnostic::error(CompilationPhase::Lowering, err.to_string()).accumulate(db);
            None
        }
    }
}

/// Stage 3: inline every expandable call in the predicate.
#[salsa::tracked]
pub fn expanded_predicate(
    db: &dyn salsa::Database,
    file: SourceFile,
) -> Option<ExpandedPredicate> {
    let lowered = lowered_document(db, file)?;
    let resolver = ValueResolver::new(statics(&lowered));
    match Expander::new(&resolver).expand_lambda(&lowered.predicate) {
        Ok(expanded) => {
            debug!("expanded {}", file.path(db).display());
            Some(ExpandedPredicate {
                original: lowered.predicate,
                expanded,
            })
        }
        Err(err) => {
            Diagnostic::error(CompilationPhase::Expansion, err.to_string()).accumulate(db);
            None
        }
    }
}

/// The predicate before and after expansion.
#[salsa::tracked]
pub fn expanded_source(db: &dyn salsa::Database, file: SourceFile) -> Option<Rendered> {
    let predicate = expanded_predicate(db, file)?;
    if predicate.is_unchanged() {
        Diagnostic::info(CompilationPhase::Expansion, "no expandable calls").accumulate(db);
    }
    Some(Rendered {
        before: predicate.original.to_string(),
        after: predicate.expanded.to_string(),
    })
}

/// The expanded predicate and its inverse.
#[salsa::tracked]
pub fn negated_source(db: &dyn salsa::Database, file: SourceFile) -> Option<Rendered> {
    let predicate = match Predicate::new(expanded_predicate(db, file)?.expanded) {
        Ok(predicate) => predicate,
        Err(err) => {
            Diagnostic::error(CompilationPhase::Negation, err.to_string()).accumulate(db);
            return None;
        }
    };
    debug!("negated {}", file.path(db).display());
    Some(Rendered {
        before: predicate.to_string(),
        after: predicate.inverse().to_string(),
    })
}

/// Run every stage that applies to the document: expansion always,
/// negation only for single-parameter boolean lambdas.
///
/// Returns whether every stage that ran succeeded.
#[salsa::tracked]
pub fn checked_source(db: &dyn salsa::Database, file: SourceFile) -> bool {
    if expanded_source(db, file).is_none() {
        return false;
    }
    match expanded_predicate(db, file) {
        Some(predicate) if predicate.is_predicate() => negated_source(db, file).is_some(),
        Some(_) => true,
        None => false,
    }
}

/// Evaluate the document's predicate, expanded first, on the request's argument.
#[salsa::tracked]
pub fn evaluated_source(db: &dyn salsa::Database, request: EvalRequest) -> Option<String> {
    let file = request.file(db);
    let predicate = expanded_predicate(db, file)?;
    let document = parsed_document(db, file)?;
    let lowered = lowered_document(db, file)?;

    let arg = match document.parse_value(request.arg(db)) {
        Ok(arg) => arg,
        Err(err) => {
            Diagnostic::error(
                CompilationPhase::Evaluation,
                format!("invalid argument: {err}"),
            )
            .accumulate(db);
            return None;
        }
    };
    let evaluator = Evaluator::new(statics(&lowered));
    match evaluator.apply(&predicate.expanded, std::slice::from_ref(&arg)) {
        Ok(value) => Some(value.to_string()),
        Err(err) => {
            Diagnostic::error(CompilationPhase::Evaluation, err.to_string()).accumulate(db);
            None
        }
    }
}

/// Diagnostics reported while computing `stage` for `file`.
pub fn source_diagnostics(
    db: &dyn salsa::Database,
    file: SourceFile,
    stage: Stage,
) -> Vec<Diagnostic> {
    let diagnostics = match stage {
        Stage::Expand => expanded_source::accumulated::<Diagnostic>(db, file),
        Stage::Negate => negated_source::accumulated::<Diagnostic>(db, file),
        Stage::Check => checked_source::accumulated::<Diagnostic>(db, file),
    };
    diagnostics.into_iter().cloned().collect()
}

/// Diagnostics reported while evaluating `request`.
pub fn eval_diagnostics(db: &dyn salsa::Database, request: EvalRequest) -> Vec<Diagnostic> {
    evaluated_source::accumulated::<Diagnostic>(db, request)
        .into_iter()
        .cloned()
        .collect()
}
