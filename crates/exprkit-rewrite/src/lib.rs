//! Rewrite passes over exprkit expression trees.
//!
//! - [`expand`]: inline calls to expandable methods.
//! - [`negate`]: push a logical negation down to the leaves.
//! - [`replace`] / [`substitute`]: swap subtrees or bound variables.
//! - [`Predicate`] and its combinators: join predicates over one variable.

pub mod combinators;
pub mod error;
pub mod expand;
pub mod negate;
pub mod replace;
pub mod resolve;

pub use combinators::{Predicate, all, always_false, always_true, and, any, inverse, or};
pub use error::{RewriteError, RewriteResult};
pub use expand::{ExpandOptions, Expander, expand, expand_lambda, is_expandable};
pub use negate::{complement, negate};
pub use replace::{Substitution, replace, substitute};
pub use resolve::{
    ChainRoot, HostResolver, MemberChain, ResolveError, StaticRegistry, ValueResolver, read_member,
};
