//! exprkit: inlining and negation rewrites for predicate trees.
//!
//! The node model lives in [`exprkit_ast`] and the rewrite passes in
//! [`exprkit_rewrite`]. This crate adds the incremental document pipeline,
//! a reference evaluator, and query-source integration.

pub mod database;
pub mod eval;
pub mod pipeline;
pub mod query;

pub use database::{EvalRequest, ExprkitDatabaseImpl, SourceFile};
pub use eval::{Environment, EvalError, EvalResult, Evaluator};
pub use pipeline::{
    ExpandedPredicate, Rendered, Stage, checked_source, eval_diagnostics, evaluated_source,
    expanded_predicate, expanded_source, lowered_document, negated_source, parsed_document,
    source_diagnostics,
};
pub use query::{ExpandedQuery, MemorySource, QueryError, QuerySource};
