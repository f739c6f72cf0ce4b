//! Logical negation pushed down to the leaves of a boolean tree.
//!
//! `negate(t)` builds a tree equivalent to `!t` without wrapping `t` in a
//! `Not` node: conjunctions become disjunctions of negated operands,
//! comparisons flip, and anything the rules cannot see into is compared
//! with `false`.

use exprkit_ast::{BinaryOp, Expr, ExprKind, UnaryOp, Value};

/// Negate a boolean tree.
///
/// Only `&&` and `||` recurse; every other node is rewritten on its own.
/// Trees whose type is not `bool` are returned unchanged.
pub fn negate(tree: &Expr) -> Expr {
    match tree.kind() {
        ExprKind::Binary { op, lhs, rhs } => match complement(*op) {
            Some(flipped) => Expr::binary(flipped, lhs.clone(), rhs.clone()),
            None => match op {
                BinaryOp::And => Expr::or(negate(lhs), negate(rhs)),
                BinaryOp::Or => Expr::and(negate(lhs), negate(rhs)),
                _ => tree.clone(),
            },
        },
        ExprKind::Unary { op, operand } => match op {
            UnaryOp::IsTrue => is_false(operand),
            UnaryOp::IsFalse | UnaryOp::Not => operand.clone(),
            UnaryOp::Neg => tree.clone(),
        },
        // Exact when the branches complement each other, as in `c ? false : true`.
        ExprKind::Conditional {
            test,
            if_true,
            if_false,
        } if tree.is_bool() => tree.with_kind(ExprKind::Conditional {
            test: test.clone(),
            if_true: if_false.clone(),
            if_false: if_true.clone(),
        }),
        ExprKind::Constant(Value::Bool(value)) => {
            tree.with_kind(ExprKind::Constant(Value::Bool(!value)))
        }
        ExprKind::Default if tree.is_bool() => Expr::bool(true),
        ExprKind::Constant(_)
        | ExprKind::Member { .. }
        | ExprKind::Call { .. }
        | ExprKind::Dynamic { .. }
        | ExprKind::Parameter(_)
            if tree.is_bool() =>
        {
            is_false(tree)
        }
        _ => tree.clone(),
    }
}

/// The comparison that holds exactly when `op` does not.
pub fn complement(op: BinaryOp) -> Option<BinaryOp> {
    Some(match op {
        BinaryOp::Eq => BinaryOp::Ne,
        BinaryOp::Ne => BinaryOp::Eq,
        BinaryOp::Lt => BinaryOp::Ge,
        BinaryOp::Le => BinaryOp::Gt,
        BinaryOp::Gt => BinaryOp::Le,
        BinaryOp::Ge => BinaryOp::Lt,
        _ => return None,
    })
}

/// `operand == false`
fn is_false(operand: &Expr) -> Expr {
    Expr::binary(BinaryOp::Eq, operand.clone(), Expr::bool(false))
}

#[cfg(test)]
mod tests {
    use exprkit_ast::{Method, Param, Type};
    use insta::assert_snapshot;

    use super::*;

    fn person() -> Param {
        Param::new("p", Type::named("Person"))
    }

    #[test]
    fn test_de_morgan() {
        let p = person();
        let tree = Expr::and(
            Expr::binary(
                BinaryOp::Ge,
                Expr::member(p.to_expr(), "age", Type::Int),
                Expr::int(18),
            ),
            Expr::or(
                Expr::member(p.to_expr(), "active", Type::Bool),
                Expr::unary(UnaryOp::Not, Expr::member(p.to_expr(), "banned", Type::Bool)),
            ),
        );
        assert_snapshot!(
            negate(&tree).to_string(),
            @"((p.age < 18) || ((p.active == false) && p.banned))"
        );
    }

    #[test]
    fn test_comparisons_flip() {
        let x = Param::new("x", Type::Int);
        let cases = [
            (BinaryOp::Eq, BinaryOp::Ne),
            (BinaryOp::Ne, BinaryOp::Eq),
            (BinaryOp::Lt, BinaryOp::Ge),
            (BinaryOp::Le, BinaryOp::Gt),
            (BinaryOp::Gt, BinaryOp::Le),
            (BinaryOp::Ge, BinaryOp::Lt),
        ];
        for (op, expected) in cases {
            let tree = Expr::binary(op, x.to_expr(), Expr::int(3));
            let ExprKind::Binary { op: flipped, .. } = negate(&tree).kind().clone() else {
                panic!("expected binary");
            };
            assert_eq!(flipped, expected, "negating {op:?}");
        }
    }

    #[test]
    fn test_unary_rules() {
        let p = person();
        let flag = Expr::member(p.to_expr(), "flag", Type::Bool);
        assert_snapshot!(
            negate(&Expr::unary(UnaryOp::IsTrue, flag.clone())).to_string(),
            @"(p.flag == false)"
        );
        assert!(negate(&Expr::unary(UnaryOp::IsFalse, flag.clone())).ptr_eq(&flag));
        assert!(negate(&Expr::unary(UnaryOp::Not, flag.clone())).ptr_eq(&flag));
    }

    #[test]
    fn test_constants_and_defaults() {
        assert_eq!(negate(&Expr::bool(true)), Expr::bool(false));
        assert_eq!(negate(&Expr::bool(false)), Expr::bool(true));
        assert_eq!(negate(&Expr::default_of(Type::Bool)), Expr::bool(true));
    }

    #[test]
    fn test_conditional_swaps_branches() {
        let p = person();
        let test = Expr::member(p.to_expr(), "vip", Type::Bool);
        let tree = Expr::conditional(test.clone(), Expr::bool(false), Expr::bool(true));
        let negated = negate(&tree);
        assert_snapshot!(negated.to_string(), @"(p.vip ? true : false)");
        let ExprKind::Conditional { test: kept, .. } = negated.kind() else {
            panic!("expected conditional");
        };
        assert!(kept.ptr_eq(&test));
    }

    #[test]
    fn test_opaque_leaves() {
        let p = person();
        let call = Expr::call(
            Some(Expr::member(p.to_expr(), "name", Type::String)),
            Method::new("string", "is_empty"),
            vec![],
            Type::Bool,
        );
        assert_snapshot!(negate(&call).to_string(), @"(p.name.is_empty() == false)");

        let dynamic = Expr::dynamic("has_role", vec![p.to_expr()], Type::Bool);
        assert_snapshot!(negate(&dynamic).to_string(), @"(dynamic has_role(p) == false)");

        let b = Param::new("b", Type::Bool);
        assert_snapshot!(negate(&b.to_expr()).to_string(), @"(b == false)");
    }

    #[test]
    fn test_non_boolean_trees_are_unchanged() {
        let x = Param::new("x", Type::Int);
        let sum = Expr::binary(BinaryOp::Add, x.to_expr(), Expr::int(1));
        assert!(negate(&sum).ptr_eq(&sum));
        let age = Expr::member(person().to_expr(), "age", Type::Int);
        assert!(negate(&age).ptr_eq(&age));
        let zero = Expr::default_of(Type::Int);
        assert!(negate(&zero).ptr_eq(&zero));
    }

    #[test]
    fn test_double_negation_of_relational_tree() {
        let x = Param::new("x", Type::Int);
        let tree = Expr::or(
            Expr::binary(BinaryOp::Lt, x.to_expr(), Expr::int(0)),
            Expr::binary(BinaryOp::Eq, x.to_expr(), Expr::int(10)),
        );
        assert_eq!(negate(&negate(&tree)), tree);
    }

    #[test]
    fn test_untyped_bool_constant_is_opaque() {
        let unknown = Expr::typed_constant(Value::Null, Type::Bool);
        assert_snapshot!(negate(&unknown).to_string(), @"(null == false)");
    }
}
