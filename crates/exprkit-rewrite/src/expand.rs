//! Inlining of expandable calls.
//!
//! A call whose method carries [`Marker::Expandable`] names a stored lambda
//! with its first argument and passes the lambda's arguments after it:
//!
//! ```text
//! exprkit::expand(Rules::is_adult, p)      where Rules::is_adult = |x| x.age >= 18
//! ```
//!
//! Expansion replaces the call with the lambda's body, with each formal
//! parameter replaced by the corresponding (already expanded) argument:
//!
//! ```text
//! (p.age >= 18)
//! ```
//!
//! Bodies are expanded in turn, so expandable calls inside them are inlined
//! as well. Each inlined body is rewritten in a fresh scope that only
//! knows the parameters of that body; the caller's bindings never leak into
//! it.
//!
//! Inlining does not terminate when stored lambdas expand into each other
//! in a cycle. Set [`ExpandOptions::max_depth`] to turn that into an error.

use exprkit_ast::fold::{Fold, fold_children};
use exprkit_ast::{Expr, ExprKind, Lambda, Marker, Method};
use tracing::{debug, trace};

use crate::error::{RewriteError, RewriteResult};
use crate::replace::Substitution;
use crate::resolve::{ChainRoot, HostResolver, MemberChain};

/// Whether calls to `method` are inlined.
pub fn is_expandable(method: &Method) -> bool {
    method.has_marker(Marker::Expandable)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Maximum nesting of inlined bodies. `None` means unbounded.
    pub max_depth: Option<usize>,
}

/// Expands trees against one resolver.
pub struct Expander<'r> {
    resolver: &'r dyn HostResolver,
    options: ExpandOptions,
}

impl<'r> Expander<'r> {
    pub fn new(resolver: &'r dyn HostResolver) -> Self {
        Self {
            resolver,
            options: ExpandOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExpandOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> ExpandOptions {
        self.options
    }

    /// Inline every expandable call in `tree`, recursively.
    pub fn expand(&self, tree: &Expr) -> RewriteResult<Expr> {
        Expansion {
            expander: self,
            mapping: Substitution::new(),
            depth: 0,
        }
        .fold(tree)
    }

    /// Expand the body of `lambda`, keeping its parameters.
    pub fn expand_lambda(&self, lambda: &Lambda) -> RewriteResult<Lambda> {
        let body = self.expand(lambda.body())?;
        if body.ptr_eq(lambda.body()) {
            return Ok(lambda.clone());
        }
        Ok(lambda.with_body(body))
    }
}

pub fn expand(tree: &Expr, resolver: &dyn HostResolver) -> RewriteResult<Expr> {
    Expander::new(resolver).expand(tree)
}

pub fn expand_lambda(lambda: &Lambda, resolver: &dyn HostResolver) -> RewriteResult<Lambda> {
    Expander::new(resolver).expand_lambda(lambda)
}

/// One inlining scope: the bindings of a single inlined body.
struct Expansion<'e, 'r> {
    expander: &'e Expander<'r>,
    mapping: Substitution,
    depth: usize,
}

impl Fold for Expansion<'_, '_> {
    type Error = RewriteError;

    fn fold(&mut self, expr: &Expr) -> RewriteResult<Expr> {
        match expr.kind() {
            // Bound arguments were expanded by the caller already.
            ExprKind::Parameter(param) => Ok(self
                .mapping
                .get(param)
                .cloned()
                .unwrap_or_else(|| expr.clone())),
            ExprKind::Call { method, args, .. } if is_expandable(method) => {
                self.expand_call(expr, method, args)
            }
            _ => fold_children(self, expr),
        }
    }
}

impl Expansion<'_, '_> {
    fn expand_call(&mut self, call: &Expr, method: &Method, args: &[Expr]) -> RewriteResult<Expr> {
        let Some((lambda_ref, call_args)) = args.split_first() else {
            debug!("{}::{} has no lambda argument, left as is", method.declaring_type, method.name);
            return fold_children(self, call);
        };
        let Some(chain) = member_chain(lambda_ref)? else {
            debug!("expandable call target `{lambda_ref}` is not a member access, left as is");
            return fold_children(self, call);
        };
        let lambda = self
            .expander
            .resolver
            .resolve(&chain)
            .map_err(|source| RewriteError::Resolution {
                chain: chain.to_string(),
                source,
            })?;
        let Some(lambda) = lambda else {
            debug!("`{chain}` does not hold a lambda, left as is");
            return fold_children(self, call);
        };

        if lambda.params().len() != call_args.len() {
            return Err(RewriteError::ArityMismatch {
                method: chain.to_string(),
                expected: lambda.params().len(),
                found: call_args.len(),
            });
        }
        if let Some(limit) = self.expander.options.max_depth {
            if self.depth >= limit {
                return Err(RewriteError::DepthLimitExceeded { limit });
            }
        }

        trace!("inlining `{chain}` at depth {}", self.depth);
        let mut mapping = Substitution::new();
        for (param, arg) in lambda.params().iter().zip(call_args) {
            mapping.insert(param.clone(), self.fold(arg)?);
        }
        Expansion {
            expander: self.expander,
            mapping,
            depth: self.depth + 1,
        }
        .fold(lambda.body())
    }
}

/// Read the member chain named by `expr`, innermost link first.
///
/// Returns `None` when `expr` is not a member access at all. A chain that
/// runs into anything other than a member access or a constant is an error.
fn member_chain(expr: &Expr) -> RewriteResult<Option<MemberChain>> {
    if !matches!(expr.kind(), ExprKind::Member { .. }) {
        return Ok(None);
    }

    let mut members = Vec::new();
    let mut current = expr;
    let root = loop {
        match current.kind() {
            ExprKind::Member {
                target: Some(target),
                member,
            } => {
                members.push(member.name.clone());
                current = target;
            }
            ExprKind::Member {
                target: None,
                member,
            } => {
                members.push(member.name.clone());
                break ChainRoot::Static(member.declaring_type.clone());
            }
            ExprKind::Constant(value) => break ChainRoot::Constant(value.clone()),
            _ => {
                return Err(RewriteError::MalformedMemberChain {
                    subtree: current.clone(),
                });
            }
        }
    };
    members.reverse();
    Ok(Some(MemberChain { root, members }))
}
