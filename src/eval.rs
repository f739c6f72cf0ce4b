//! Reference interpreter for expression trees.
//!
//! Evaluation is used to check rewrites against concrete inputs and by the
//! in-memory query source. Expandable calls are evaluated directly by
//! applying the lambda they name, so a tree means the same thing before and
//! after expansion.

use std::collections::HashMap;
use std::sync::Arc;

use derive_more::{Display, Error, From};
use exprkit_ast::{BinaryOp, Expr, ExprKind, Lambda, Param, Type, UnaryOp, Value};
use exprkit_rewrite::{ResolveError, StaticRegistry, Substitution, ValueResolver, substitute};
use exprkit_rewrite::{is_expandable, read_member};

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Debug, Display, Error, From)]
pub enum EvalError {
    #[from(ignore)]
    #[display("unbound parameter `{name}`")]
    UnboundParameter { name: String },

    #[from(ignore)]
    #[display("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[from(ignore)]
    #[display("unknown method `{declaring_type}::{name}`")]
    UnknownMethod { declaring_type: String, name: String },

    #[from(ignore)]
    #[display("unknown dynamic binder `{binder}`")]
    UnknownBinder { binder: String },

    #[from(ignore)]
    #[display("division by zero")]
    DivisionByZero,

    #[from(ignore)]
    #[display("lambda expects {expected} arguments, found {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[display("{_0}")]
    Member(#[error(source)] ResolveError),

    #[from(ignore)]
    #[display("{message}")]
    Host { message: String },
}

impl EvalError {
    /// An error raised by a host method or binder.
    pub fn host(message: impl Into<String>) -> Self {
        EvalError::Host {
            message: message.into(),
        }
    }
}

/// A host method or dynamic binder. Methods receive their target first.
pub type HostFn = Arc<dyn Fn(&Evaluator, &[Value]) -> EvalResult<Value> + Send + Sync>;

/// Parameter bindings, chained to the bindings of enclosing calls.
pub struct Environment<'parent> {
    parent: Option<&'parent Self>,
    bindings: HashMap<Param, Value>,
}

impl Environment<'_> {
    pub fn toplevel() -> Self {
        Environment {
            parent: None,
            bindings: HashMap::new(),
        }
    }

    fn lookup(&self, param: &Param) -> EvalResult<&Value> {
        if let Some(value) = self.bindings.get(param) {
            return Ok(value);
        }
        match &self.parent {
            Some(parent) => parent.lookup(param),
            None => Err(EvalError::UnboundParameter {
                name: param.name().to_owned(),
            }),
        }
    }

    pub fn bind(&mut self, param: Param, value: Value) {
        self.bindings.insert(param, value);
    }

    fn child(&self, bindings: impl IntoIterator<Item = (Param, Value)>) -> Environment<'_> {
        Environment {
            parent: Some(self),
            bindings: bindings.into_iter().collect(),
        }
    }

    /// Every visible binding as a substitution to constants.
    fn visible(&self) -> Substitution {
        let mut substitution = Substitution::new();
        let mut scope = Some(self);
        let mut scopes = Vec::new();
        while let Some(current) = scope {
            scopes.push(current);
            scope = current.parent;
        }
        for current in scopes.into_iter().rev() {
            for (param, value) in &current.bindings {
                substitution.insert(
                    param.clone(),
                    Expr::typed_constant(value.clone(), param.ty().clone()),
                );
            }
        }
        substitution
    }
}

/// Evaluates trees against host statics, methods and binders.
#[derive(Clone)]
pub struct Evaluator {
    resolver: ValueResolver,
    methods: HashMap<(String, String), HostFn>,
    binders: HashMap<String, HostFn>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(StaticRegistry::new())
    }
}

impl Evaluator {
    /// An evaluator with the built-in methods.
    pub fn new(statics: StaticRegistry) -> Self {
        let methods = builtins::METHODS
            .iter()
            .map(|&(declaring_type, name, f)| {
                let f: HostFn = Arc::new(f);
                ((declaring_type.to_owned(), name.to_owned()), f)
            })
            .collect();
        Self {
            resolver: ValueResolver::new(statics),
            methods,
            binders: HashMap::new(),
        }
    }

    pub fn resolver(&self) -> &ValueResolver {
        &self.resolver
    }

    pub fn statics(&self) -> &StaticRegistry {
        self.resolver.statics()
    }

    pub fn with_method(
        mut self,
        declaring_type: impl Into<String>,
        name: impl Into<String>,
        f: impl Fn(&Evaluator, &[Value]) -> EvalResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.methods
            .insert((declaring_type.into(), name.into()), Arc::new(f));
        self
    }

    pub fn with_binder(
        mut self,
        binder: impl Into<String>,
        f: impl Fn(&Evaluator, &[Value]) -> EvalResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.binders.insert(binder.into(), Arc::new(f));
        self
    }

    /// Call `lambda` with `args`.
    pub fn apply(&self, lambda: &Lambda, args: &[Value]) -> EvalResult<Value> {
        if lambda.params().len() != args.len() {
            return Err(EvalError::ArityMismatch {
                expected: lambda.params().len(),
                found: args.len(),
            });
        }
        let env = Environment::toplevel();
        let env = env.child(lambda.params().iter().cloned().zip(args.iter().cloned()));
        self.eval(&env, lambda.body())
    }

    /// Call a predicate and require a boolean result.
    pub fn test(&self, lambda: &Lambda, arg: &Value) -> EvalResult<bool> {
        expect_bool(&self.apply(lambda, std::slice::from_ref(arg))?)
    }

    pub fn eval(&self, env: &Environment<'_>, expr: &Expr) -> EvalResult<Value> {
        Ok(match expr.kind() {
            ExprKind::Binary { op, lhs, rhs } => match op {
                BinaryOp::And => {
                    Value::Bool(self.eval_bool(env, lhs)? && self.eval_bool(env, rhs)?)
                }
                BinaryOp::Or => Value::Bool(self.eval_bool(env, lhs)? || self.eval_bool(env, rhs)?),
                _ => binary(*op, self.eval(env, lhs)?, self.eval(env, rhs)?)?,
            },
            ExprKind::Unary { op, operand } => {
                let value = self.eval(env, operand)?;
                match op {
                    UnaryOp::Not => Value::Bool(!expect_bool(&value)?),
                    UnaryOp::IsTrue => Value::Bool(expect_bool(&value)?),
                    UnaryOp::IsFalse => Value::Bool(!expect_bool(&value)?),
                    UnaryOp::Neg => match value {
                        Value::Int(n) => Value::Int(n.wrapping_neg()),
                        Value::Float(x) => Value::float(-x.value()),
                        other => return Err(mismatch("number", &other)),
                    },
                }
            }
            ExprKind::Member { target, member } => {
                let holder = match target {
                    Some(target) => self.eval(env, target)?,
                    None => self.statics().get(&member.declaring_type).ok_or_else(|| {
                        ResolveError::UnknownType {
                            name: member.declaring_type.clone(),
                        }
                    })?,
                };
                read_member(&holder, &member.name)?
            }
            ExprKind::Call { method, args, .. } if is_expandable(method) => {
                let Some((lambda_ref, args)) = args.split_first() else {
                    return Err(EvalError::ArityMismatch {
                        expected: 1,
                        found: 0,
                    });
                };
                let callee = self.eval(env, lambda_ref)?;
                let Some(lambda) = callee.as_lambda() else {
                    return Err(mismatch("lambda", &callee));
                };
                let args = self.eval_all(env, args)?;
                self.apply(lambda, &args)?
            }
            ExprKind::Call {
                target,
                method,
                args,
            } => {
                let key = (method.declaring_type.clone(), method.name.clone());
                let Some(f) = self.methods.get(&key) else {
                    return Err(EvalError::UnknownMethod {
                        declaring_type: key.0,
                        name: key.1,
                    });
                };
                let mut values = Vec::with_capacity(args.len() + 1);
                if let Some(target) = target {
                    values.push(self.eval(env, target)?);
                }
                values.extend(self.eval_all(env, args)?);
                f(self, &values)?
            }
            ExprKind::Constant(value) => value.clone(),
            ExprKind::Parameter(param) => env.lookup(param)?.clone(),
            ExprKind::Conditional {
                test,
                if_true,
                if_false,
            } => {
                if self.eval_bool(env, test)? {
                    self.eval(env, if_true)?
                } else {
                    self.eval(env, if_false)?
                }
            }
            ExprKind::Default => default_value(expr.ty()),
            ExprKind::Dynamic { binder, args } => {
                let Some(f) = self.binders.get(binder) else {
                    return Err(EvalError::UnknownBinder {
                        binder: binder.clone(),
                    });
                };
                let values = self.eval_all(env, args)?;
                f(self, &values)?
            }
            // Nested lambdas close over the current bindings.
            ExprKind::Lambda(lambda) => {
                let body = substitute(lambda.body(), &env.visible());
                Value::Lambda(lambda.with_body(body))
            }
        })
    }

    fn eval_bool(&self, env: &Environment<'_>, expr: &Expr) -> EvalResult<bool> {
        expect_bool(&self.eval(env, expr)?)
    }

    fn eval_all(&self, env: &Environment<'_>, exprs: &[Expr]) -> EvalResult<Vec<Value>> {
        exprs.iter().map(|expr| self.eval(env, expr)).collect()
    }
}

fn mismatch(expected: &'static str, found: &Value) -> EvalError {
    EvalError::TypeMismatch {
        expected,
        found: found.kind_name(),
    }
}

fn expect_bool(value: &Value) -> EvalResult<bool> {
    value.as_bool().ok_or_else(|| mismatch("bool", value))
}

fn default_value(ty: &Type) -> Value {
    match ty {
        Type::Bool => Value::Bool(false),
        Type::Int => Value::Int(0),
        Type::Float => Value::float(0.0),
        Type::String | Type::Named(_) | Type::Func { .. } => Value::Null,
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(x) => Some(x.value()),
        _ => None,
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> EvalResult<Value> {
    use std::cmp::Ordering;

    if matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
        let equal = match (as_float(&lhs), as_float(&rhs)) {
            (Some(a), Some(b)) => a == b,
            _ => lhs == rhs,
        };
        return Ok(Value::Bool(equal == (op == BinaryOp::Eq)));
    }

    if !op.is_boolean() {
        return arithmetic(op, lhs, rhs);
    }

    let ordering = match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        _ => match (as_float(&lhs), as_float(&rhs)) {
            (Some(a), Some(b)) => a.partial_cmp(&b).ok_or(EvalError::TypeMismatch {
                expected: "comparable number",
                found: "NaN",
            })?,
            _ => return Err(mismatch(lhs.kind_name(), &rhs)),
        },
    };
    Ok(Value::Bool(match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        _ => unreachable!("logical operators are evaluated lazily"),
    }))
}

fn arithmetic(op: BinaryOp, lhs: Value, rhs: Value) -> EvalResult<Value> {
    match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => {
            let (a, b) = (*a, *b);
            Ok(Value::Int(match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                BinaryOp::Div => a.checked_div(b).ok_or(EvalError::DivisionByZero)?,
                BinaryOp::Rem => a.checked_rem(b).ok_or(EvalError::DivisionByZero)?,
                _ => unreachable!("not an arithmetic operator"),
            }))
        }
        (Value::Str(a), Value::Str(b)) if op == BinaryOp::Add => Ok(Value::Str(format!("{a}{b}"))),
        _ => {
            let (Some(a), Some(b)) = (as_float(&lhs), as_float(&rhs)) else {
                return Err(mismatch("number", if as_float(&lhs).is_none() { &lhs } else { &rhs }));
            };
            Ok(Value::float(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Rem => a % b,
                _ => unreachable!("not an arithmetic operator"),
            }))
        }
    }
}

mod builtins {
    use super::*;

    type Method = fn(&Evaluator, &[Value]) -> EvalResult<Value>;

    pub const METHODS: &[(&str, &str, Method)] = &[
        ("string", "starts_with", starts_with),
        ("string", "ends_with", ends_with),
        ("string", "contains", contains),
        ("string", "len", len),
        ("string", "is_empty", is_empty),
        ("string", "to_lowercase", to_lowercase),
        ("int", "abs", abs),
    ];

    fn strings<'a>(args: &'a [Value], arity: usize) -> EvalResult<Vec<&'a str>> {
        if args.len() != arity {
            return Err(EvalError::ArityMismatch {
                expected: arity,
                found: args.len(),
            });
        }
        args.iter()
            .map(|arg| match arg {
                Value::Str(s) => Ok(s.as_str()),
                other => Err(mismatch("string", other)),
            })
            .collect()
    }

    fn starts_with(_: &Evaluator, args: &[Value]) -> EvalResult<Value> {
        let s = strings(args, 2)?;
        Ok(Value::Bool(s[0].starts_with(s[1])))
    }

    fn ends_with(_: &Evaluator, args: &[Value]) -> EvalResult<Value> {
        let s = strings(args, 2)?;
        Ok(Value::Bool(s[0].ends_with(s[1])))
    }

    fn contains(_: &Evaluator, args: &[Value]) -> EvalResult<Value> {
        let s = strings(args, 2)?;
        Ok(Value::Bool(s[0].contains(s[1])))
    }

    fn len(_: &Evaluator, args: &[Value]) -> EvalResult<Value> {
        let s = strings(args, 1)?;
        Ok(Value::Int(s[0].chars().count() as i64))
    }

    fn is_empty(_: &Evaluator, args: &[Value]) -> EvalResult<Value> {
        let s = strings(args, 1)?;
        Ok(Value::Bool(s[0].is_empty()))
    }

    fn to_lowercase(_: &Evaluator, args: &[Value]) -> EvalResult<Value> {
        let s = strings(args, 1)?;
        Ok(Value::str(s[0].to_lowercase()))
    }

    fn abs(_: &Evaluator, args: &[Value]) -> EvalResult<Value> {
        match args {
            [Value::Int(n)] => Ok(Value::Int(n.wrapping_abs())),
            [other] => Err(mismatch("int", other)),
            _ => Err(EvalError::ArityMismatch {
                expected: 1,
                found: args.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use exprkit_ast::{Method, Object};

    use super::*;

    fn person(age: i64, name: &str) -> Value {
        Value::object(
            Object::new("Person")
                .with_field("age", age)
                .with_field("name", name),
        )
    }

    #[test]
    fn test_eval_predicate() {
        let p = Param::new("p", Type::named("Person"));
        let body = Expr::and(
            Expr::binary(
                BinaryOp::Ge,
                Expr::member(p.to_expr(), "age", Type::Int),
                Expr::int(18),
            ),
            Expr::call(
                Some(Expr::member(p.to_expr(), "name", Type::String)),
                Method::new("string", "starts_with"),
                vec![Expr::constant(Value::str("A"))],
                Type::Bool,
            ),
        );
        let lambda = Lambda::new(vec![p], body);
        let evaluator = Evaluator::default();
        assert!(evaluator.test(&lambda, &person(30, "Ada")).unwrap());
        assert!(!evaluator.test(&lambda, &person(30, "Bob")).unwrap());
        assert!(!evaluator.test(&lambda, &person(12, "Ann")).unwrap());
    }

    #[test]
    fn test_short_circuit() {
        // `false && (1 / 0 == 0)` never divides.
        let division = Expr::binary(
            BinaryOp::Eq,
            Expr::binary(BinaryOp::Div, Expr::int(1), Expr::int(0)),
            Expr::int(0),
        );
        let tree = Expr::and(Expr::bool(false), division.clone());
        let env = Environment::toplevel();
        let evaluator = Evaluator::default();
        assert_eq!(evaluator.eval(&env, &tree).unwrap(), Value::Bool(false));
        assert!(matches!(
            evaluator.eval(&env, &division),
            Err(EvalError::DivisionByZero)
        ));
    }

    #[test]
    fn test_expandable_call_is_applied() {
        let x = Param::new("x", Type::Int);
        let positive = Lambda::new(
            vec![x.clone()],
            Expr::binary(BinaryOp::Gt, x.to_expr(), Expr::int(0)),
        );
        let statics = StaticRegistry::new();
        statics.register("Rules", "positive", positive);
        let evaluator = Evaluator::new(statics);

        let n = Param::new("n", Type::Int);
        let tree = Expr::expand(
            Expr::static_member("Rules", "positive", Type::func(vec![Type::Int], Type::Bool)),
            vec![n.to_expr()],
            Type::Bool,
        );
        let mut env = Environment::toplevel();
        env.bind(n, Value::Int(-4));
        assert_eq!(evaluator.eval(&env, &tree).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_dynamic_binder_with_closure() {
        let limit = Param::new("limit", Type::Int);
        let v = Param::new("v", Type::Int);
        // dynamic check(5, |v| v > limit)
        let tree = Expr::dynamic(
            "check",
            vec![
                Expr::int(5),
                Expr::lambda(Lambda::new(
                    vec![v.clone()],
                    Expr::binary(BinaryOp::Gt, v.to_expr(), limit.to_expr()),
                )),
            ],
            Type::Bool,
        );
        let evaluator = Evaluator::default().with_binder("check", |eval, args| {
            let [value, Value::Lambda(f)] = args else {
                return Err(EvalError::host("check(value, f)"));
            };
            eval.apply(f, std::slice::from_ref(value))
        });
        let mut env = Environment::toplevel();
        env.bind(limit, Value::Int(3));
        assert_eq!(evaluator.eval(&env, &tree).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_defaults_and_mixed_numbers() {
        let evaluator = Evaluator::default();
        let env = Environment::toplevel();
        assert_eq!(
            evaluator.eval(&env, &Expr::default_of(Type::Bool)).unwrap(),
            Value::Bool(false)
        );
        let mixed = Expr::binary(BinaryOp::Lt, Expr::int(1), Expr::constant(Value::float(1.5)));
        assert_eq!(evaluator.eval(&env, &mixed).unwrap(), Value::Bool(true));
        let equal = Expr::binary(BinaryOp::Eq, Expr::int(2), Expr::constant(Value::float(2.0)));
        assert_eq!(evaluator.eval(&env, &equal).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_errors() {
        let evaluator = Evaluator::default();
        let env = Environment::toplevel();
        let p = Param::new("p", Type::Bool);
        assert_eq!(
            evaluator.eval(&env, &p.to_expr()).unwrap_err().to_string(),
            "unbound parameter `p`"
        );
        let not_bool = Expr::unary(UnaryOp::Not, Expr::int(1));
        assert_eq!(
            evaluator.eval(&env, &not_bool).unwrap_err().to_string(),
            "expected bool, found int"
        );
        let null_member = Expr::member(
            Expr::typed_constant(Value::Null, Type::named("Person")),
            "age",
            Type::Int,
        );
        assert_eq!(
            evaluator.eval(&env, &null_member).unwrap_err().to_string(),
            "cannot read `age` from null"
        );
        let unknown = Expr::dynamic("nope", vec![], Type::Bool);
        assert!(matches!(
            evaluator.eval(&env, &unknown),
            Err(EvalError::UnknownBinder { .. })
        ));
    }
}
