//! Subtree and bound-variable substitution.

use std::collections::HashMap;
use std::convert::Infallible;

use exprkit_ast::fold::{Fold, fold_children};
use exprkit_ast::{Expr, ExprKind, Param};

/// A mapping from bound variables to the subtrees that replace them.
#[derive(Clone, Debug, Default)]
pub struct Substitution {
    map: HashMap<Param, Expr>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single-entry mapping that renames `from` to `to`.
    pub fn rename(from: Param, to: &Param) -> Self {
        let mut substitution = Self::new();
        substitution.insert(from, to.to_expr());
        substitution
    }

    /// Bind `param`. A later binding for the same parameter wins.
    pub fn insert(&mut self, param: Param, replacement: Expr) {
        self.map.insert(param, replacement);
    }

    pub fn get(&self, param: &Param) -> Option<&Expr> {
        self.map.get(param)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl FromIterator<(Param, Expr)> for Substitution {
    fn from_iter<T: IntoIterator<Item = (Param, Expr)>>(iter: T) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

/// Replace every occurrence of the node `target` (by identity) with
/// `replacement`. Matched subtrees are not searched further.
pub fn replace(tree: &Expr, target: &Expr, replacement: &Expr) -> Expr {
    infallible(
        Replace {
            target,
            replacement,
        }
        .fold(tree),
    )
}

/// Replace every reference to a parameter bound in `substitution`.
pub fn substitute(tree: &Expr, substitution: &Substitution) -> Expr {
    if substitution.is_empty() {
        return tree.clone();
    }
    infallible(Substitute { substitution }.fold(tree))
}

struct Replace<'a> {
    target: &'a Expr,
    replacement: &'a Expr,
}

impl Fold for Replace<'_> {
    type Error = Infallible;

    fn fold(&mut self, expr: &Expr) -> Result<Expr, Infallible> {
        if expr.ptr_eq(self.target) {
            return Ok(self.replacement.clone());
        }
        fold_children(self, expr)
    }
}

struct Substitute<'a> {
    substitution: &'a Substitution,
}

impl Fold for Substitute<'_> {
    type Error = Infallible;

    fn fold(&mut self, expr: &Expr) -> Result<Expr, Infallible> {
        match expr.kind() {
            ExprKind::Parameter(param) => Ok(self
                .substitution
                .get(param)
                .cloned()
                .unwrap_or_else(|| expr.clone())),
            _ => fold_children(self, expr),
        }
    }
}

fn infallible(result: Result<Expr, Infallible>) -> Expr {
    match result {
        Ok(expr) => expr,
        Err(never) => match never {},
    }
}
