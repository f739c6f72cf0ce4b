//! Expression tree node model.
//!
//! Trees are immutable and reference counted. Rewrites never mutate a node;
//! they either build a new node or hand back the same [`Expr`] (sharing the
//! allocation) when nothing below it changed. [`Expr::ptr_eq`] observes that
//! sharing, while `==` compares structure.

use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Static result type of a node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    Int,
    Float,
    String,
    /// A host class, identified by name.
    Named(String),
    /// Function type: `fn(A, B) -> R`
    Func { params: Vec<Type>, result: Box<Type> },
}

impl Type {
    pub fn named(name: impl Into<String>) -> Self {
        Type::Named(name.into())
    }

    pub fn func(params: Vec<Type>, result: Type) -> Self {
        Type::Func {
            params,
            result: Box::new(result),
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Bool)
    }

    /// Name used as the declaring type of members read from values of this type.
    pub fn class_name(&self) -> String {
        match self {
            Type::Named(name) => name.clone(),
            other => other.to_string(),
        }
    }
}

/// Error returned when a type annotation cannot be parsed.
#[derive(Clone, Debug, PartialEq, Eq, Display, Error)]
#[display("invalid type `{input}`")]
pub struct TypeParseError {
    pub input: String,
}

impl FromStr for Type {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = TypeParser { input: s, rest: s };
        let ty = parser.parse()?;
        if !parser.rest.trim().is_empty() {
            return Err(parser.error());
        }
        Ok(ty)
    }
}

struct TypeParser<'a> {
    input: &'a str,
    rest: &'a str,
}

impl TypeParser<'_> {
    fn error(&self) -> TypeParseError {
        TypeParseError {
            input: self.input.to_owned(),
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        let trimmed = self.rest.trim_start();
        match trimmed.strip_prefix(token) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn parse(&mut self) -> Result<Type, TypeParseError> {
        if self.eat("fn(") {
            let mut params = Vec::new();
            if !self.eat(")") {
                loop {
                    params.push(self.parse()?);
                    if self.eat(")") {
                        break;
                    }
                    if !self.eat(",") {
                        return Err(self.error());
                    }
                }
            }
            if !self.eat("->") {
                return Err(self.error());
            }
            let result = self.parse()?;
            return Ok(Type::func(params, result));
        }

        let trimmed = self.rest.trim_start();
        let end = trimmed
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(trimmed.len());
        if end == 0 {
            return Err(self.error());
        }
        let (word, rest) = trimmed.split_at(end);
        self.rest = rest;
        Ok(match word {
            "bool" => Type::Bool,
            "int" => Type::Int,
            "float" => Type::Float,
            "string" => Type::String,
            name => Type::Named(name.to_owned()),
        })
    }
}

/// A bound variable: the formal input of an enclosing lambda.
///
/// Parameters compare by identity. Two parameters that share a name and a
/// type are still different variables.
#[derive(Clone)]
pub struct Param(Arc<ParamData>);

#[derive(Debug)]
struct ParamData {
    name: String,
    ty: Type,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self(Arc::new(ParamData {
            name: name.into(),
            ty,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn ty(&self) -> &Type {
        &self.0.ty
    }

    /// A fresh reference node to this parameter.
    pub fn to_expr(&self) -> Expr {
        Expr::param(self)
    }
}

impl PartialEq for Param {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Param {}

impl Hash for Param {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl std::fmt::Debug for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Param").field(&self.0.name).finish()
    }
}

/// Binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Short-circuit logic
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// Whether the operator always produces a boolean.
    pub fn is_boolean(self) -> bool {
        !matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem
        )
    }
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// Boolean negation: `!x`
    Not,
    /// Arithmetic negation: `-x`
    Neg,
    /// `x == true`, kept as its own node kind.
    IsTrue,
    /// `x == false`, kept as its own node kind.
    IsFalse,
}

/// Tags attached to methods. Markers carry no behaviour of their own; passes
/// look them up to decide what to do with a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    /// Calls are replaced by the body of the lambda named by their first argument.
    Expandable,
    /// The method yields a constant within a query.
    ConstantValue,
}

/// A field or property of a host type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub declaring_type: String,
    pub name: String,
}

impl MemberRef {
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
        }
    }
}

/// A method of a host type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Method {
    pub declaring_type: String,
    pub name: String,
    pub markers: Vec<Marker>,
}

impl Method {
    /// Declaring type of the built-in `expand` method.
    pub const EXPAND_DECLARING_TYPE: &'static str = "exprkit";

    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            markers: Vec::new(),
        }
    }

    /// The built-in method that invokes a stored lambda: `exprkit::expand(f, args..)`.
    pub fn expand() -> Self {
        Self::new(Self::EXPAND_DECLARING_TYPE, "expand").with_marker(Marker::Expandable)
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        if !self.markers.contains(&marker) {
            self.markers.push(marker);
        }
        self
    }

    pub fn has_marker(&self, marker: Marker) -> bool {
        self.markers.contains(&marker)
    }
}

/// A function node: ordered formal parameters and a body.
///
/// This is also the "bound lambda value" stored in host fields and fetched
/// during expansion.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Lambda {
    params: Vec<Param>,
    body: Expr,
}

impl Lambda {
    pub fn new(params: Vec<Param>, body: Expr) -> Self {
        Self { params, body }
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }

    /// Same parameters, different body.
    pub fn with_body(&self, body: Expr) -> Self {
        Self {
            params: self.params.clone(),
            body,
        }
    }

    pub fn ty(&self) -> Type {
        Type::func(
            self.params.iter().map(|p| p.ty().clone()).collect(),
            self.body.ty().clone(),
        )
    }
}

/// The different kinds of nodes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExprKind {
    /// `lhs op rhs`
    Binary { op: BinaryOp, lhs: Expr, rhs: Expr },

    /// `op operand`
    Unary { op: UnaryOp, operand: Expr },

    /// Field or property read. A missing target means a static member of
    /// `member.declaring_type`.
    Member {
        target: Option<Expr>,
        member: MemberRef,
    },

    /// Method call. A missing target means a static method.
    Call {
        target: Option<Expr>,
        method: Method,
        args: Vec<Expr>,
    },

    /// A host value embedded in the tree.
    Constant(Value),

    /// Reference to a bound variable.
    Parameter(Param),

    /// `test ? if_true : if_false`
    Conditional {
        test: Expr,
        if_true: Expr,
        if_false: Expr,
    },

    /// The default value of the node's type.
    Default,

    /// Late-bound operation resolved by the host at run time.
    Dynamic { binder: String, args: Vec<Expr> },

    /// Nested function, e.g. the argument of a collection predicate.
    Lambda(Lambda),
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ExprNode {
    pub ty: Type,
    pub kind: ExprKind,
}

/// A reference-counted, immutable expression node.
#[derive(Clone)]
pub struct Expr(Arc<ExprNode>);

impl Expr {
    pub fn new(ty: Type, kind: ExprKind) -> Self {
        Self(Arc::new(ExprNode { ty, kind }))
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    pub fn ty(&self) -> &Type {
        &self.0.ty
    }

    pub fn is_bool(&self) -> bool {
        self.0.ty.is_bool()
    }

    /// Reference identity: both handles point at the same node.
    pub fn ptr_eq(&self, other: &Expr) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// A node of the same type with a different kind.
    pub fn with_kind(&self, kind: ExprKind) -> Self {
        Self::new(self.ty().clone(), kind)
    }

    // === Constructors ===

    /// Binary node. Comparisons and logical operators are `bool`; arithmetic
    /// takes the type of the left operand.
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        let ty = if op.is_boolean() {
            Type::Bool
        } else {
            lhs.ty().clone()
        };
        Self::new(ty, ExprKind::Binary { op, lhs, rhs })
    }

    pub fn and(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinaryOp::And, lhs, rhs)
    }

    pub fn or(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinaryOp::Or, lhs, rhs)
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        let ty = match op {
            UnaryOp::Neg => operand.ty().clone(),
            UnaryOp::Not | UnaryOp::IsTrue | UnaryOp::IsFalse => Type::Bool,
        };
        Self::new(ty, ExprKind::Unary { op, operand })
    }

    /// Instance member read: `target.name`
    pub fn member(target: Expr, name: impl Into<String>, ty: Type) -> Self {
        let member = MemberRef::new(target.ty().class_name(), name);
        Self::new(
            ty,
            ExprKind::Member {
                target: Some(target),
                member,
            },
        )
    }

    /// Static member read: `DeclaringType::name`
    pub fn static_member(
        declaring_type: impl Into<String>,
        name: impl Into<String>,
        ty: Type,
    ) -> Self {
        Self::new(
            ty,
            ExprKind::Member {
                target: None,
                member: MemberRef::new(declaring_type, name),
            },
        )
    }

    pub fn call(target: Option<Expr>, method: Method, args: Vec<Expr>, ty: Type) -> Self {
        Self::new(
            ty,
            ExprKind::Call {
                target,
                method,
                args,
            },
        )
    }

    /// Call to the built-in expandable method: `exprkit::expand(lambda_ref, args..)`.
    pub fn expand(lambda_ref: Expr, args: Vec<Expr>, result: Type) -> Self {
        let mut all_args = Vec::with_capacity(args.len() + 1);
        all_args.push(lambda_ref);
        all_args.extend(args);
        Self::call(None, Method::expand(), all_args, result)
    }

    /// Constant typed after its value.
    pub fn constant(value: Value) -> Self {
        Self::new(value.ty(), ExprKind::Constant(value))
    }

    /// Constant with an explicit type, e.g. a typed `null`.
    pub fn typed_constant(value: Value, ty: Type) -> Self {
        Self::new(ty, ExprKind::Constant(value))
    }

    pub fn bool(value: bool) -> Self {
        Self::constant(Value::Bool(value))
    }

    pub fn int(value: i64) -> Self {
        Self::constant(Value::Int(value))
    }

    pub fn param(param: &Param) -> Self {
        Self::new(param.ty().clone(), ExprKind::Parameter(param.clone()))
    }

    pub fn conditional(test: Expr, if_true: Expr, if_false: Expr) -> Self {
        Self::new(
            if_true.ty().clone(),
            ExprKind::Conditional {
                test,
                if_true,
                if_false,
            },
        )
    }

    pub fn default_of(ty: Type) -> Self {
        Self::new(ty, ExprKind::Default)
    }

    pub fn dynamic(binder: impl Into<String>, args: Vec<Expr>, ty: Type) -> Self {
        Self::new(
            ty,
            ExprKind::Dynamic {
                binder: binder.into(),
                args,
            },
        )
    }

    pub fn lambda(lambda: Lambda) -> Self {
        Self::new(lambda.ty(), ExprKind::Lambda(lambda))
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0 == *other.0
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl std::fmt::Debug for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Lambda> for Expr {
    fn from(lambda: Lambda) -> Self {
        Expr::lambda(lambda)
    }
}
