//! JSON tree documents.
//!
//! A document carries one predicate plus the host values it refers to:
//!
//! ```json
//! {
//!   "statics": { "Rules": { "is_adult": { "kind": "lambda", ... } } },
//!   "constants": { "rules": { "object": "RuleSet", "fields": { ... } } },
//!   "predicate": { "kind": "lambda", "params": [{ "name": "p", "type": "Person" }], "body": ... }
//! }
//! ```
//!
//! Parameters are referenced by name and resolved against the enclosing
//! lambdas, innermost first. Lowering turns names into [`Param`] identities.

use std::collections::{BTreeMap, HashSet};

use derive_more::{Display, Error, From};
use serde::{Deserialize, Serialize};

use crate::ast::{BinaryOp, Expr, Lambda, Marker, Method, Param, Type, TypeParseError, UnaryOp};
use crate::value::{Object, Value};

pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors raised while reading or lowering a document.
#[derive(Debug, Display, Error, From)]
pub enum DocumentError {
    #[display("invalid document: {_0}")]
    Json(#[error(source)] serde_json::Error),

    #[display("{_0}")]
    Type(#[error(source)] TypeParseError),

    #[from(ignore)]
    #[display("unbound parameter `{name}`")]
    UnboundParameter { name: String },

    #[from(ignore)]
    #[display("unknown constant `{name}`")]
    UnknownConstant { name: String },

    #[from(ignore)]
    #[display("constant `{name}` refers to itself")]
    CyclicConstant { name: String },

    #[from(ignore)]
    #[display("static `{name}` needs a declaring type")]
    MissingDeclaringType { name: String },

    #[from(ignore)]
    #[display("the predicate must be a lambda")]
    PredicateNotLambda,

    #[from(ignore)]
    #[display("only lambdas and constant references can be stored as values")]
    NotAValue,

    #[from(ignore)]
    #[display("integer literal {value} does not fit in a 64-bit signed integer")]
    IntegerOutOfRange { value: u64 },
}

/// Top-level document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Declaring type -> member name -> value.
    #[serde(default)]
    pub statics: BTreeMap<String, BTreeMap<String, ValueDoc>>,
    /// Named constant roots, referenced by `{"kind": "constant", "ref": name}`.
    #[serde(default)]
    pub constants: BTreeMap<String, ValueDoc>,
    pub predicate: NodeDoc,
}

/// A host value as written in a document.
///
/// Integer literals must fit in an `i64`; larger ones up to `u64::MAX` are
/// rejected when lowered. serde_json itself reads integers beyond `u64::MAX`
/// as floats, so those arrive as [`ValueDoc::Float`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueDoc {
    Null,
    Bool(bool),
    Int(i64),
    /// Only matched by integers above `i64::MAX`.
    Unsigned(u64),
    Float(f64),
    Str(String),
    Object {
        object: String,
        #[serde(default)]
        fields: BTreeMap<String, ValueDoc>,
    },
    /// A lambda, or a reference to another constant.
    Node(Box<NodeDoc>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// A tree node as written in a document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeDoc {
    Lambda {
        params: Vec<ParamDoc>,
        body: Box<NodeDoc>,
    },
    Param {
        name: String,
    },
    Literal {
        value: ValueDoc,
        #[serde(default, rename = "type")]
        ty: Option<String>,
    },
    Constant {
        #[serde(rename = "ref")]
        name: String,
    },
    Member {
        #[serde(default)]
        target: Option<Box<NodeDoc>>,
        #[serde(default)]
        declaring_type: Option<String>,
        name: String,
        #[serde(rename = "type")]
        ty: String,
    },
    Call {
        #[serde(default)]
        target: Option<Box<NodeDoc>>,
        #[serde(default)]
        declaring_type: Option<String>,
        method: String,
        #[serde(default)]
        args: Vec<NodeDoc>,
        #[serde(default)]
        markers: Vec<Marker>,
        #[serde(rename = "type")]
        ty: String,
    },
    Expand {
        lambda: Box<NodeDoc>,
        #[serde(default)]
        args: Vec<NodeDoc>,
        #[serde(rename = "type")]
        ty: String,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<NodeDoc>,
        rhs: Box<NodeDoc>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<NodeDoc>,
    },
    Conditional {
        test: Box<NodeDoc>,
        if_true: Box<NodeDoc>,
        if_false: Box<NodeDoc>,
    },
    Default {
        #[serde(rename = "type")]
        ty: String,
    },
    Dynamic {
        binder: String,
        #[serde(default)]
        args: Vec<NodeDoc>,
        #[serde(rename = "type")]
        ty: String,
    },
}

/// A document with every name resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoweredDocument {
    pub statics: BTreeMap<String, BTreeMap<String, Value>>,
    pub constants: BTreeMap<String, Value>,
    pub predicate: Lambda,
}

impl Document {
    pub fn from_json(text: &str) -> DocumentResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Resolve every name in the document.
    pub fn lower(&self) -> DocumentResult<LoweredDocument> {
        let mut lowerer = Lowerer::new(self);
        for name in self.constants.keys() {
            lowerer.constant(name)?;
        }

        let mut statics = BTreeMap::new();
        for (declaring_type, members) in &self.statics {
            let mut lowered = BTreeMap::new();
            for (name, value) in members {
                lowered.insert(name.clone(), lowerer.closed_value(value)?);
            }
            statics.insert(declaring_type.clone(), lowered);
        }

        let NodeDoc::Lambda { params, body } = &self.predicate else {
            return Err(DocumentError::PredicateNotLambda);
        };
        let predicate = lowerer.lambda(params, body)?;

        Ok(LoweredDocument {
            statics,
            constants: lowerer.constants,
            predicate,
        })
    }

    /// Lower a standalone value, e.g. an argument supplied next to the
    /// document. It may refer to the document's constants.
    pub fn lower_value(&self, value: &ValueDoc) -> DocumentResult<Value> {
        Lowerer::new(self).closed_value(value)
    }

    /// Parse a JSON value and lower it with [`Document::lower_value`].
    pub fn parse_value(&self, text: &str) -> DocumentResult<Value> {
        let value: ValueDoc = serde_json::from_str(text)?;
        self.lower_value(&value)
    }
}

struct Lowerer<'a> {
    doc: &'a Document,
    constants: BTreeMap<String, Value>,
    in_progress: HashSet<String>,
    scopes: Vec<Vec<Param>>,
}

impl<'a> Lowerer<'a> {
    fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            constants: BTreeMap::new(),
            in_progress: HashSet::new(),
            scopes: Vec::new(),
        }
    }

    fn constant(&mut self, name: &str) -> DocumentResult<Value> {
        if let Some(value) = self.constants.get(name) {
            return Ok(value.clone());
        }
        let Some(doc) = self.doc.constants.get(name) else {
            return Err(DocumentError::UnknownConstant {
                name: name.to_owned(),
            });
        };
        if !self.in_progress.insert(name.to_owned()) {
            return Err(DocumentError::CyclicConstant {
                name: name.to_owned(),
            });
        }
        let value = self.closed_value(doc)?;
        self.in_progress.remove(name);
        self.constants.insert(name.to_owned(), value.clone());
        Ok(value)
    }

    /// Lower a value outside of any lambda scope.
    fn closed_value(&mut self, value: &ValueDoc) -> DocumentResult<Value> {
        let saved = std::mem::take(&mut self.scopes);
        let result = self.value(value);
        self.scopes = saved;
        result
    }

    fn value(&mut self, value: &ValueDoc) -> DocumentResult<Value> {
        Ok(match value {
            ValueDoc::Null => Value::Null,
            ValueDoc::Bool(b) => Value::Bool(*b),
            ValueDoc::Int(n) => Value::Int(*n),
            ValueDoc::Unsigned(value) => {
                return Err(DocumentError::IntegerOutOfRange { value: *value });
            }
            ValueDoc::Float(x) => Value::float(*x),
            ValueDoc::Str(s) => Value::Str(s.clone()),
            ValueDoc::Object { object, fields } => {
                let mut lowered = Object::new(object.clone());
                for (name, field) in fields {
                    lowered = lowered.with_field(name.clone(), self.value(field)?);
                }
                Value::object(lowered)
            }
            ValueDoc::Node(node) => match node.as_ref() {
                NodeDoc::Lambda { params, body } => Value::Lambda(self.lambda(params, body)?),
                NodeDoc::Constant { name } => self.constant(name)?,
                _ => return Err(DocumentError::NotAValue),
            },
        })
    }

    fn lambda(&mut self, params: &[ParamDoc], body: &NodeDoc) -> DocumentResult<Lambda> {
        let mut lowered = Vec::with_capacity(params.len());
        for param in params {
            lowered.push(Param::new(param.name.clone(), param.ty.parse()?));
        }
        self.scopes.push(lowered.clone());
        let body = self.node(body);
        self.scopes.pop();
        Ok(Lambda::new(lowered, body?))
    }

    fn lookup(&self, name: &str) -> DocumentResult<Param> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter())
            .find(|param| param.name() == name)
            .cloned()
            .ok_or_else(|| DocumentError::UnboundParameter {
                name: name.to_owned(),
            })
    }

    fn nodes(&mut self, nodes: &[NodeDoc]) -> DocumentResult<Vec<Expr>> {
        nodes.iter().map(|node| self.node(node)).collect()
    }

    fn optional(&mut self, node: Option<&NodeDoc>) -> DocumentResult<Option<Expr>> {
        node.map(|node| self.node(node)).transpose()
    }

    fn node(&mut self, node: &NodeDoc) -> DocumentResult<Expr> {
        Ok(match node {
            NodeDoc::Lambda { params, body } => Expr::lambda(self.lambda(params, body)?),
            NodeDoc::Param { name } => self.lookup(name)?.to_expr(),
            NodeDoc::Literal { value, ty } => {
                let value = self.value(value)?;
                match ty {
                    Some(ty) => Expr::typed_constant(value, ty.parse()?),
                    None => Expr::constant(value),
                }
            }
            NodeDoc::Constant { name } => Expr::constant(self.constant(name)?),
            NodeDoc::Member {
                target,
                declaring_type,
                name,
                ty,
            } => {
                let ty: Type = ty.parse()?;
                match self.optional(target.as_deref())? {
                    Some(target) => Expr::member(target, name.clone(), ty),
                    None => {
                        let declaring_type = required_declaring_type(declaring_type, name)?;
                        Expr::static_member(declaring_type, name.clone(), ty)
                    }
                }
            }
            NodeDoc::Call {
                target,
                declaring_type,
                method,
                args,
                markers,
                ty,
            } => {
                let ty: Type = ty.parse()?;
                let target = self.optional(target.as_deref())?;
                let declaring_type = match (&target, declaring_type) {
                    (_, Some(declaring_type)) => declaring_type.clone(),
                    (Some(target), None) => target.ty().class_name(),
                    (None, None) => {
                        return Err(DocumentError::MissingDeclaringType {
                            name: method.clone(),
                        });
                    }
                };
                let method = markers
                    .iter()
                    .fold(Method::new(declaring_type, method.clone()), |m, marker| {
                        m.with_marker(*marker)
                    });
                Expr::call(target, method, self.nodes(args)?, ty)
            }
            NodeDoc::Expand { lambda, args, ty } => {
                let lambda_ref = self.node(lambda)?;
                Expr::expand(lambda_ref, self.nodes(args)?, ty.parse()?)
            }
            NodeDoc::Binary { op, lhs, rhs } => Expr::binary(*op, self.node(lhs)?, self.node(rhs)?),
            NodeDoc::Unary { op, operand } => Expr::unary(*op, self.node(operand)?),
            NodeDoc::Conditional {
                test,
                if_true,
                if_false,
            } => Expr::conditional(self.node(test)?, self.node(if_true)?, self.node(if_false)?),
            NodeDoc::Default { ty } => Expr::default_of(ty.parse()?),
            NodeDoc::Dynamic { binder, args, ty } => {
                Expr::dynamic(binder.clone(), self.nodes(args)?, ty.parse()?)
            }
        })
    }
}

fn required_declaring_type(declaring_type: &Option<String>, name: &str) -> DocumentResult<String> {
    declaring_type
        .clone()
        .ok_or_else(|| DocumentError::MissingDeclaringType {
            name: name.to_owned(),
        })
}
