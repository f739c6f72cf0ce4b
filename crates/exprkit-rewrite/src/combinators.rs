//! Building predicates out of predicates.
//!
//! Joining two predicates needs a single bound variable: the second
//! predicate's parameter is renamed to the first's before the bodies are
//! combined.

use std::fmt;

use exprkit_ast::{BinaryOp, Expr, Lambda, Param, Type};

use crate::error::{RewriteError, RewriteResult};
use crate::negate::negate;
use crate::replace::{Substitution, substitute};

/// A lambda with exactly one parameter and a boolean body.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Predicate(Lambda);

impl Predicate {
    pub fn new(lambda: Lambda) -> RewriteResult<Self> {
        if lambda.params().len() != 1 || !lambda.body().is_bool() {
            return Err(RewriteError::NotAPredicate { lambda });
        }
        Ok(Self(lambda))
    }

    pub fn from_body(param: Param, body: Expr) -> RewriteResult<Self> {
        Self::new(Lambda::new(vec![param], body))
    }

    pub fn param(&self) -> &Param {
        &self.0.params()[0]
    }

    /// Type of the value the predicate tests.
    pub fn subject_type(&self) -> &Type {
        self.param().ty()
    }

    pub fn body(&self) -> &Expr {
        self.0.body()
    }

    pub fn lambda(&self) -> &Lambda {
        &self.0
    }

    pub fn into_lambda(self) -> Lambda {
        self.0
    }

    pub fn and(&self, other: &Predicate) -> RewriteResult<Predicate> {
        join(BinaryOp::And, self, other)
    }

    pub fn or(&self, other: &Predicate) -> RewriteResult<Predicate> {
        join(BinaryOp::Or, self, other)
    }

    pub fn inverse(&self) -> Predicate {
        Self(self.0.with_body(negate(self.body())))
    }
}

impl TryFrom<Lambda> for Predicate {
    type Error = RewriteError;

    fn try_from(lambda: Lambda) -> RewriteResult<Self> {
        Self::new(lambda)
    }
}

impl From<Predicate> for Lambda {
    fn from(predicate: Predicate) -> Self {
        predicate.0
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// `|x| p(x) && q(x)`
pub fn and(p: &Predicate, q: &Predicate) -> RewriteResult<Predicate> {
    p.and(q)
}

/// `|x| p(x) || q(x)`
pub fn or(p: &Predicate, q: &Predicate) -> RewriteResult<Predicate> {
    p.or(q)
}

/// `|x| !p(x)`, with the negation pushed into the body.
pub fn inverse(p: &Predicate) -> Predicate {
    p.inverse()
}

/// `|x: ty| true`
pub fn always_true(ty: Type) -> Predicate {
    constant(ty, true)
}

/// `|x: ty| false`
pub fn always_false(ty: Type) -> Predicate {
    constant(ty, false)
}

/// Conjunction of every predicate, starting from [`always_true`].
pub fn all(ty: Type, predicates: impl IntoIterator<Item = Predicate>) -> RewriteResult<Predicate> {
    predicates
        .into_iter()
        .try_fold(always_true(ty), |acc, p| acc.and(&p))
}

/// Disjunction of every predicate, starting from [`always_false`].
pub fn any(ty: Type, predicates: impl IntoIterator<Item = Predicate>) -> RewriteResult<Predicate> {
    predicates
        .into_iter()
        .try_fold(always_false(ty), |acc, p| acc.or(&p))
}

fn constant(ty: Type, value: bool) -> Predicate {
    let x = Param::new("x", ty);
    Predicate(Lambda::new(vec![x], Expr::bool(value)))
}

fn join(op: BinaryOp, p: &Predicate, q: &Predicate) -> RewriteResult<Predicate> {
    if p.subject_type() != q.subject_type() {
        return Err(RewriteError::ParameterTypeMismatch {
            left: p.subject_type().clone(),
            right: q.subject_type().clone(),
        });
    }
    let rhs = substitute(q.body(), &Substitution::rename(q.param().clone(), p.param()));
    Ok(Predicate(Lambda::new(
        vec![p.param().clone()],
        Expr::binary(op, p.body().clone(), rhs),
    )))
}
