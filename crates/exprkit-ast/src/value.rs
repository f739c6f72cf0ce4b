//! Host values embedded in trees as constants and stored in host fields.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ast::{Lambda, Type};

/// A runtime value of the host program.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(FloatBits),
    Str(String),
    Object(Arc<Object>),
    /// A stored function body.
    Lambda(Lambda),
}

impl Value {
    pub fn float(value: f64) -> Self {
        Value::Float(FloatBits::new(value))
    }

    pub fn str(value: impl Into<String>) -> Self {
        Value::Str(value.into())
    }

    pub fn object(object: Object) -> Self {
        Value::Object(Arc::new(object))
    }

    /// Static type of the value. `null` has no class of its own and reports
    /// the top `object` type.
    pub fn ty(&self) -> Type {
        match self {
            Value::Null => Type::named("object"),
            Value::Bool(_) => Type::Bool,
            Value::Int(_) => Type::Int,
            Value::Float(_) => Type::Float,
            Value::Str(_) => Type::String,
            Value::Object(object) => Type::named(object.class()),
            Value::Lambda(lambda) => lambda.ty(),
        }
    }

    /// Short description of the value's kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
            Value::Lambda(_) => "lambda",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_lambda(&self) -> Option<&Lambda> {
        match self {
            Value::Lambda(lambda) => Some(lambda),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::str(value)
    }
}

impl From<Lambda> for Value {
    fn from(value: Lambda) -> Self {
        Value::Lambda(value)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::object(value)
    }
}

/// An instance of a host class with named fields.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Object {
    class: String,
    fields: BTreeMap<String, Value>,
}

impl Object {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }
}

impl FromIterator<(String, Value)> for Object {
    /// Builds an anonymous object; use [`Object::new`] to name the class.
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            class: "object".to_owned(),
            fields: iter.into_iter().collect(),
        }
    }
}

/// Wrapper for f64 that implements Eq and Hash.
///
/// This is needed because f64 doesn't implement Eq/Hash due to NaN.
/// We use the bit representation for comparison.
#[derive(Clone, Copy, Debug)]
pub struct FloatBits(f64);

impl FloatBits {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for FloatBits {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatBits {}

impl std::hash::Hash for FloatBits {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}
