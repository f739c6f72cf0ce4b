//! Structural rewriting of trees.
//!
//! A pass implements [`Fold`] and overrides [`Fold::fold`] for the node
//! kinds it cares about, handing every other node to [`fold_children`].
//! `fold_children` rebuilds a node from its folded children and returns the
//! original node when no child changed, so unchanged subtrees stay shared.
//!
//! # Example
//!
//! ```
//! use std::convert::Infallible;
//! use exprkit_ast::fold::{Fold, fold_children};
//! use exprkit_ast::{Expr, ExprKind, Value};
//!
//! /// Replaces every integer constant with zero.
//! struct Zero;
//!
//! impl Fold for Zero {
//!     type Error = Infallible;
//!
//!     fn fold(&mut self, expr: &Expr) -> Result<Expr, Infallible> {
//!         match expr.kind() {
//!             ExprKind::Constant(Value::Int(_)) => Ok(Expr::int(0)),
//!             _ => fold_children(self, expr),
//!         }
//!     }
//! }
//!
//! let tree = Expr::and(Expr::bool(true), Expr::bool(false));
//! let folded = Zero.fold(&tree).unwrap();
//! assert!(folded.ptr_eq(&tree));
//! ```

use crate::ast::{Expr, ExprKind};

/// A tree-to-tree pass.
pub trait Fold {
    type Error;

    /// Rewrite one node. The default recurses structurally.
    fn fold(&mut self, expr: &Expr) -> Result<Expr, Self::Error> {
        fold_children(self, expr)
    }
}

/// Fold every child of `expr` and rebuild it.
///
/// Children are folded left to right before the parent is rebuilt. Returns
/// `expr` itself when every folded child is the same node as before.
pub fn fold_children<F>(folder: &mut F, expr: &Expr) -> Result<Expr, F::Error>
where
    F: Fold + ?Sized,
{
    let kind = match expr.kind() {
        ExprKind::Binary { op, lhs, rhs } => {
            let new_lhs = folder.fold(lhs)?;
            let new_rhs = folder.fold(rhs)?;
            if new_lhs.ptr_eq(lhs) && new_rhs.ptr_eq(rhs) {
                return Ok(expr.clone());
            }
            ExprKind::Binary {
                op: *op,
                lhs: new_lhs,
                rhs: new_rhs,
            }
        }
        ExprKind::Unary { op, operand } => {
            let new_operand = folder.fold(operand)?;
            if new_operand.ptr_eq(operand) {
                return Ok(expr.clone());
            }
            ExprKind::Unary {
                op: *op,
                operand: new_operand,
            }
        }
        ExprKind::Member { target, member } => {
            let Some(new_target) = fold_optional(folder, target.as_ref())? else {
                return Ok(expr.clone());
            };
            ExprKind::Member {
                target: Some(new_target),
                member: member.clone(),
            }
        }
        ExprKind::Call {
            target,
            method,
            args,
        } => {
            let new_target = fold_optional(folder, target.as_ref())?;
            let new_args = fold_list(folder, args)?;
            if new_target.is_none() && new_args.is_none() {
                return Ok(expr.clone());
            }
            ExprKind::Call {
                target: new_target.or_else(|| target.clone()),
                method: method.clone(),
                args: new_args.unwrap_or_else(|| args.clone()),
            }
        }
        ExprKind::Conditional {
            test,
            if_true,
            if_false,
        } => {
            let new_test = folder.fold(test)?;
            let new_true = folder.fold(if_true)?;
            let new_false = folder.fold(if_false)?;
            if new_test.ptr_eq(test) && new_true.ptr_eq(if_true) && new_false.ptr_eq(if_false) {
                return Ok(expr.clone());
            }
            ExprKind::Conditional {
                test: new_test,
                if_true: new_true,
                if_false: new_false,
            }
        }
        ExprKind::Dynamic { binder, args } => {
            let Some(new_args) = fold_list(folder, args)? else {
                return Ok(expr.clone());
            };
            ExprKind::Dynamic {
                binder: binder.clone(),
                args: new_args,
            }
        }
        ExprKind::Lambda(lambda) => {
            let new_body = folder.fold(lambda.body())?;
            if new_body.ptr_eq(lambda.body()) {
                return Ok(expr.clone());
            }
            ExprKind::Lambda(lambda.with_body(new_body))
        }
        ExprKind::Constant(_) | ExprKind::Parameter(_) | ExprKind::Default => {
            return Ok(expr.clone());
        }
    };
    Ok(expr.with_kind(kind))
}

/// Fold an optional child. `Ok(None)` means "absent or unchanged".
fn fold_optional<F>(folder: &mut F, expr: Option<&Expr>) -> Result<Option<Expr>, F::Error>
where
    F: Fold + ?Sized,
{
    let Some(expr) = expr else {
        return Ok(None);
    };
    let folded = folder.fold(expr)?;
    Ok((!folded.ptr_eq(expr)).then_some(folded))
}

/// Fold a child list. `Ok(None)` means no element changed.
fn fold_list<F>(folder: &mut F, exprs: &[Expr]) -> Result<Option<Vec<Expr>>, F::Error>
where
    F: Fold + ?Sized,
{
    let mut folded = Vec::with_capacity(exprs.len());
    let mut changed = false;
    for expr in exprs {
        let new_expr = folder.fold(expr)?;
        changed |= !new_expr.ptr_eq(expr);
        folded.push(new_expr);
    }
    Ok(changed.then_some(folded))
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;
    use crate::ast::{BinaryOp, Lambda, Method, Param, Type};
    use crate::value::Value;

    /// Bumps every integer constant and counts visited nodes.
    #[derive(Default)]
    struct Bump {
        visited: usize,
    }

    impl Fold for Bump {
        type Error = Infallible;

        fn fold(&mut self, expr: &Expr) -> Result<Expr, Infallible> {
            self.visited += 1;
            match expr.kind() {
                ExprKind::Constant(Value::Int(n)) => Ok(Expr::int(n + 1)),
                _ => fold_children(self, expr),
            }
        }
    }

    /// Fails on the first parameter it sees.
    struct RejectParams;

    impl Fold for RejectParams {
        type Error = String;

        fn fold(&mut self, expr: &Expr) -> Result<Expr, String> {
            match expr.kind() {
                ExprKind::Parameter(p) => Err(format!("unexpected parameter {p}")),
                _ => fold_children(self, expr),
            }
        }
    }

    #[test]
    fn test_unchanged_tree_is_shared() {
        let x = Param::new("x", Type::Bool);
        let tree = Expr::and(x.to_expr(), Expr::bool(true));
        let mut bump = Bump::default();
        let folded = bump.fold(&tree).unwrap();
        assert!(folded.ptr_eq(&tree));
        assert_eq!(bump.visited, 3);
    }

    #[test]
    fn test_changed_child_rebuilds_parent_only_on_path() {
        let x = Param::new("x", Type::Int);
        let unchanged = Expr::member(x.to_expr(), "flag", Type::Bool);
        let changed = Expr::binary(BinaryOp::Gt, x.to_expr(), Expr::int(1));
        let tree = Expr::or(unchanged.clone(), changed);
        let folded = Bump::default().fold(&tree).unwrap();

        assert!(!folded.ptr_eq(&tree));
        let ExprKind::Binary { lhs, rhs, .. } = folded.kind() else {
            panic!("expected binary");
        };
        assert!(lhs.ptr_eq(&unchanged));
        assert_eq!(rhs.to_string(), "(x > 2)");
    }

    #[test]
    fn test_call_target_and_args_are_folded() {
        let call = Expr::call(
            Some(Expr::int(1)),
            Method::new("int", "max"),
            vec![Expr::int(2), Expr::bool(false)],
            Type::Int,
        );
        let folded = Bump::default().fold(&call).unwrap();
        assert_eq!(folded.to_string(), "2.max(3, false)");
        assert_eq!(folded.ty(), &Type::Int);
    }

    #[test]
    fn test_nested_lambda_body_is_folded() {
        let y = Param::new("y", Type::Int);
        let inner = Lambda::new(
            vec![y.clone()],
            Expr::binary(BinaryOp::Add, y.to_expr(), Expr::int(1)),
        );
        let tree = Expr::dynamic("map", vec![Expr::lambda(inner)], Type::named("List"));
        let folded = Bump::default().fold(&tree).unwrap();
        assert_eq!(folded.to_string(), "dynamic map((|y: int| (y + 2)))");
    }

    #[test]
    fn test_errors_propagate() {
        let x = Param::new("x", Type::Bool);
        let tree = Expr::conditional(Expr::bool(true), x.to_expr(), Expr::bool(false));
        assert_eq!(
            RejectParams.fold(&tree),
            Err("unexpected parameter x".to_owned())
        );
    }
}
