//! Handing expanded trees to a query backend.
//!
//! A [`QuerySource`] is anything that accepts filter predicates and
//! projections as trees. Backends usually cannot run host code, so
//! [`ExpandedQuery`] expands the tree before delegating.

use derive_more::{Display, Error, From};
use exprkit_ast::fold::{Fold, fold_children};
use exprkit_ast::{Expr, ExprKind, Lambda, Value};
use exprkit_rewrite::{
    HostResolver, Predicate, RewriteError, StaticRegistry, expand_lambda, is_expandable,
};

use crate::eval::{EvalError, Evaluator};

/// A backend that can filter and project.
pub trait QuerySource: Sized {
    type Error: From<RewriteError>;

    /// Resolver used to expand trees before they reach this source.
    fn resolver(&self) -> &dyn HostResolver;

    fn filter(self, predicate: &Predicate) -> Result<Self, Self::Error>;

    fn select(self, projection: &Lambda) -> Result<Self, Self::Error>;
}

/// Filtering and projection with expandable calls inlined first.
pub trait ExpandedQuery: QuerySource {
    fn expanded_where(self, predicate: &Predicate) -> Result<Self, Self::Error> {
        let expanded = expand_lambda(predicate.lambda(), self.resolver())?;
        let expanded = Predicate::new(expanded)?;
        self.filter(&expanded)
    }

    fn expanded_select(self, projection: &Lambda) -> Result<Self, Self::Error> {
        let expanded = expand_lambda(projection, self.resolver())?;
        self.select(&expanded)
    }
}

impl<T: QuerySource> ExpandedQuery for T {}

#[derive(Debug, Display, Error, From)]
pub enum QueryError {
    #[display("{_0}")]
    Rewrite(#[error(source)] RewriteError),

    #[display("{_0}")]
    Eval(#[error(source)] EvalError),

    /// The source only accepts expanded trees.
    #[from(ignore)]
    #[display("cannot translate `{call}`")]
    Untranslatable {
        #[error(not(source))]
        call: Expr,
    },
}

/// An in-memory source over host values, evaluated with [`Evaluator`].
#[derive(Clone)]
pub struct MemorySource {
    items: Vec<Value>,
    evaluator: Evaluator,
    strict: bool,
}

impl MemorySource {
    pub fn new(items: impl IntoIterator<Item = Value>, statics: StaticRegistry) -> Self {
        Self {
            items: items.into_iter().collect(),
            evaluator: Evaluator::new(statics),
            strict: false,
        }
    }

    /// Reject trees that still contain expandable calls, like a backend
    /// that translates trees instead of running them.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Value> {
        self.items
    }

    fn check(&self, lambda: &Lambda) -> Result<(), QueryError> {
        if !self.strict {
            return Ok(());
        }
        match FindExpandable.fold(lambda.body()) {
            Ok(_) => Ok(()),
            Err(call) => Err(QueryError::Untranslatable { call }),
        }
    }
}

impl QuerySource for MemorySource {
    type Error = QueryError;

    fn resolver(&self) -> &dyn HostResolver {
        self.evaluator.resolver()
    }

    fn filter(mut self, predicate: &Predicate) -> Result<Self, QueryError> {
        self.check(predicate.lambda())?;
        let mut kept = Vec::with_capacity(self.items.len());
        for item in self.items {
            if self.evaluator.test(predicate.lambda(), &item)? {
                kept.push(item);
            }
        }
        self.items = kept;
        Ok(self)
    }

    fn select(mut self, projection: &Lambda) -> Result<Self, QueryError> {
        self.check(projection)?;
        self.items = self
            .items
            .iter()
            .map(|item| self.evaluator.apply(projection, std::slice::from_ref(item)))
            .collect::<Result<_, _>>()?;
        Ok(self)
    }
}

/// Stops at the first expandable call.
struct FindExpandable;

impl Fold for FindExpandable {
    type Error = Expr;

    fn fold(&mut self, expr: &Expr) -> Result<Expr, Expr> {
        match expr.kind() {
            ExprKind::Call { method, .. } if is_expandable(method) => Err(expr.clone()),
            _ => fold_children(self, expr),
        }
    }
}
