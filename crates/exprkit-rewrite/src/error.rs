use derive_more::{Display, Error};
use exprkit_ast::{Expr, Lambda, Type};

use crate::resolve::ResolveError;

pub type RewriteResult<T> = Result<T, RewriteError>;

/// Errors raised by the rewrite passes.
#[derive(Debug, Display, Error)]
pub enum RewriteError {
    /// A link of an expandable call's member chain is neither a member
    /// access nor a constant.
    #[display("unsupported node in member chain: {subtree}")]
    MalformedMemberChain {
        #[error(not(source))]
        subtree: Expr,
    },

    #[display("cannot resolve `{chain}`: {source}")]
    Resolution { chain: String, source: ResolveError },

    #[display("`{method}` expects {expected} arguments, found {found}")]
    ArityMismatch {
        method: String,
        expected: usize,
        found: usize,
    },

    #[display("expansion nested deeper than {limit} levels")]
    DepthLimitExceeded { limit: usize },

    #[display("`{lambda}` is not a single-parameter boolean lambda")]
    NotAPredicate {
        #[error(not(source))]
        lambda: Lambda,
    },

    #[display("cannot combine predicates over `{left}` and `{right}`")]
    ParameterTypeMismatch {
        #[error(not(source))]
        left: Type,
        #[error(not(source))]
        right: Type,
    },
}
