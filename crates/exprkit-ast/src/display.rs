//! Pretty-printing for trees.
//!
//! Binary nodes are always parenthesized so the printed form shows the tree
//! shape exactly.

use std::fmt::{self, Display, Formatter};

use crate::ast::{Expr, ExprKind, Lambda, Param, Type, UnaryOp};
use crate::value::Value;

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::Int => f.write_str("int"),
            Type::Float => f.write_str("float"),
            Type::String => f.write_str("string"),
            Type::Named(name) => f.write_str(name),
            Type::Func { params, result } => {
                f.write_str("fn(")?;
                write_list(f, params)?;
                write!(f, ") -> {result}")
            }
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(bits) => write!(f, "{:?}", bits.value()),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Object(object) => write!(f, "value({})", object.class()),
            Value::Lambda(lambda) => write!(f, "{lambda}"),
        }
    }
}

impl Display for Param {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Display for Lambda {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("|")?;
        for (i, param) in self.params().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", param.name(), param.ty())?;
        }
        write!(f, "| {}", self.body())
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ExprKind::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Not => write!(f, "!{operand}"),
                UnaryOp::Neg => write!(f, "-{operand}"),
                UnaryOp::IsTrue => write!(f, "is_true({operand})"),
                UnaryOp::IsFalse => write!(f, "is_false({operand})"),
            },
            ExprKind::Member { target, member } => match target {
                Some(target) => write!(f, "{target}.{}", member.name),
                None => write!(f, "{}::{}", member.declaring_type, member.name),
            },
            ExprKind::Call {
                target,
                method,
                args,
            } => {
                match target {
                    Some(target) => write!(f, "{target}.{}(", method.name)?,
                    None => write!(f, "{}::{}(", method.declaring_type, method.name)?,
                }
                write_list(f, args)?;
                f.write_str(")")
            }
            ExprKind::Constant(value) => write!(f, "{value}"),
            ExprKind::Parameter(param) => write!(f, "{param}"),
            ExprKind::Conditional {
                test,
                if_true,
                if_false,
            } => write!(f, "({test} ? {if_true} : {if_false})"),
            ExprKind::Default => write!(f, "default({})", self.ty()),
            ExprKind::Dynamic { binder, args } => {
                write!(f, "dynamic {binder}(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
            ExprKind::Lambda(lambda) => write!(f, "({lambda})"),
        }
    }
}

fn write_list<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use crate::ast::{BinaryOp, Method};
    use crate::value::Object;

    use super::*;

    #[test]
    fn test_display_predicate() {
        let p = Param::new("p", Type::named("Person"));
        let age = Expr::member(p.to_expr(), "age", Type::Int);
        let active = Expr::member(p.to_expr(), "active", Type::Bool);
        let body = Expr::and(
            Expr::binary(BinaryOp::Ge, age, Expr::int(18)),
            Expr::unary(UnaryOp::Not, active),
        );
        let lambda = Lambda::new(vec![p], body);
        assert_snapshot!(lambda.to_string(), @"|p: Person| ((p.age >= 18) && !p.active)");
    }

    #[test]
    fn test_display_calls_and_statics() {
        let p = Param::new("p", Type::named("Person"));
        let rule = Expr::static_member("Rules", "is_adult", Type::named("Rule"));
        let expand = Expr::expand(rule, vec![p.to_expr()], Type::Bool);
        let name = Expr::member(p.to_expr(), "name", Type::String);
        let starts = Expr::call(
            Some(name),
            Method::new("string", "starts_with"),
            vec![Expr::constant(Value::str("A"))],
            Type::Bool,
        );
        let tree = Expr::conditional(expand, starts, Expr::default_of(Type::Bool));
        assert_snapshot!(
            tree.to_string(),
            @r#"(exprkit::expand(Rules::is_adult, p) ? p.name.starts_with("A") : default(bool))"#
        );
    }

    #[test]
    fn test_display_values() {
        let holder = Expr::constant(Value::object(Object::new("RuleSet")));
        let member = Expr::member(holder, "active", Type::named("Rule"));
        assert_snapshot!(member.to_string(), @"value(RuleSet).active");
        assert_eq!(Expr::constant(Value::float(2.0)).to_string(), "2.0");
        assert_eq!(Expr::typed_constant(Value::Null, Type::named("Person")).to_string(), "null");
    }

    #[test]
    fn test_display_types() {
        let ty = Type::func(vec![Type::named("Person"), Type::Int], Type::Bool);
        assert_eq!(ty.to_string(), "fn(Person, int) -> bool");
    }

    #[test]
    fn test_display_dynamic_and_nested_lambda() {
        let x = Param::new("x", Type::named("Order"));
        let line = Param::new("line", Type::named("Line"));
        let nested = Lambda::new(
            vec![line.clone()],
            Expr::member(line.to_expr(), "shipped", Type::Bool),
        );
        let any = Expr::dynamic(
            "any",
            vec![
                Expr::member(x.to_expr(), "lines", Type::named("List")),
                Expr::lambda(nested),
            ],
            Type::Bool,
        );
        assert_snapshot!(any.to_string(), @"dynamic any(x.lines, (|line: Line| line.shipped))");
    }
}
