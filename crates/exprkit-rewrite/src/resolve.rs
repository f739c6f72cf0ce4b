//! Resolution of member chains to stored lambdas.
//!
//! An expandable call names its callee with a member-access chain such as
//! `Rules::adults.is_adult` or `value(RuleSet).active`. The chain is rooted
//! either at a constant value or at a declaring type, and a
//! [`HostResolver`] turns it into the [`Lambda`] stored at its end.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use derive_more::{Display, Error};
use exprkit_ast::{Lambda, Object, Value};

/// Where a member chain starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainRoot {
    /// A constant embedded in the tree.
    Constant(Value),
    /// The static members of a declaring type.
    Static(String),
}

/// A chain of member names read from a root, outermost last.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberChain {
    pub root: ChainRoot,
    pub members: Vec<String>,
}

impl fmt::Display for MemberChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut members = self.members.iter();
        match &self.root {
            ChainRoot::Constant(value) => write!(f, "{value}")?,
            ChainRoot::Static(declaring_type) => {
                f.write_str(declaring_type)?;
                if let Some(first) = members.next() {
                    write!(f, "::{first}")?;
                }
            }
        }
        for member in members {
            write!(f, ".{member}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Display, Error)]
pub enum ResolveError {
    #[display("`{class}` has no member `{member}`")]
    UnknownMember { class: String, member: String },

    #[display("unknown declaring type `{name}`")]
    UnknownType { name: String },

    #[display("cannot read `{member}` from {kind}")]
    NotAnObject { kind: &'static str, member: String },
}

/// Host capability that dereferences member chains.
///
/// `Ok(None)` means the chain does not lead to a lambda; the call naming it
/// is then left as it is.
pub trait HostResolver {
    fn resolve(&self, chain: &MemberChain) -> Result<Option<Lambda>, ResolveError>;
}

impl<F> HostResolver for F
where
    F: Fn(&MemberChain) -> Result<Option<Lambda>, ResolveError>,
{
    fn resolve(&self, chain: &MemberChain) -> Result<Option<Lambda>, ResolveError> {
        self(chain)
    }
}

/// Static members of host types, keyed by declaring type.
///
/// Each declaring type is stored as an [`Object`] whose fields are its
/// static members. Cloning shares the underlying map.
#[derive(Clone, Debug, Default)]
pub struct StaticRegistry {
    types: Arc<DashMap<String, Object>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or overwrite) one static member.
    pub fn register(
        &self,
        declaring_type: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) {
        let declaring_type = declaring_type.into();
        self.types
            .entry(declaring_type.clone())
            .or_insert_with(|| Object::new(declaring_type))
            .set_field(name, value);
    }

    pub fn member(&self, declaring_type: &str, name: &str) -> Option<Value> {
        self.types.get(declaring_type)?.field(name).cloned()
    }

    /// The statics of `declaring_type` as an object value.
    pub fn get(&self, declaring_type: &str) -> Option<Value> {
        self.types
            .get(declaring_type)
            .map(|object| Value::object(object.clone()))
    }

    pub fn contains(&self, declaring_type: &str) -> bool {
        self.types.contains_key(declaring_type)
    }
}

impl FromIterator<(String, BTreeMap<String, Value>)> for StaticRegistry {
    fn from_iter<T: IntoIterator<Item = (String, BTreeMap<String, Value>)>>(iter: T) -> Self {
        let registry = Self::new();
        for (declaring_type, members) in iter {
            for (name, value) in members {
                registry.register(declaring_type.clone(), name, value);
            }
        }
        registry
    }
}

/// Read one member of a host value.
pub fn read_member(value: &Value, member: &str) -> Result<Value, ResolveError> {
    let Some(object) = value.as_object() else {
        return Err(ResolveError::NotAnObject {
            kind: value.kind_name(),
            member: member.to_owned(),
        });
    };
    object
        .field(member)
        .cloned()
        .ok_or_else(|| ResolveError::UnknownMember {
            class: object.class().to_owned(),
            member: member.to_owned(),
        })
}

/// Resolves chains by reading fields of host objects, with statics taken
/// from a [`StaticRegistry`].
#[derive(Clone, Debug, Default)]
pub struct ValueResolver {
    statics: StaticRegistry,
}

impl ValueResolver {
    pub fn new(statics: StaticRegistry) -> Self {
        Self { statics }
    }

    pub fn statics(&self) -> &StaticRegistry {
        &self.statics
    }

    /// Follow `chain` to the value at its end.
    pub fn read(&self, chain: &MemberChain) -> Result<Value, ResolveError> {
        let mut value = match &chain.root {
            ChainRoot::Constant(value) => value.clone(),
            ChainRoot::Static(name) => {
                self.statics
                    .get(name)
                    .ok_or_else(|| ResolveError::UnknownType { name: name.clone() })?
            }
        };
        for member in &chain.members {
            value = read_member(&value, member)?;
        }
        Ok(value)
    }
}

impl HostResolver for ValueResolver {
    fn resolve(&self, chain: &MemberChain) -> Result<Option<Lambda>, ResolveError> {
        Ok(self.read(chain)?.as_lambda().cloned())
    }
}

#[cfg(test)]
mod tests {
    use exprkit_ast::{Expr, Param, Type};

    use super::*;

    fn is_positive() -> Lambda {
        let x = Param::new("x", Type::Int);
        Lambda::new(
            vec![x.clone()],
            Expr::binary(exprkit_ast::BinaryOp::Gt, x.to_expr(), Expr::int(0)),
        )
    }

    #[test]
    fn test_resolve_static_chain() {
        let statics = StaticRegistry::new();
        let rules = Object::new("NumberRules").with_field("positive", is_positive());
        statics.register("Rules", "numbers", rules);
        let resolver = ValueResolver::new(statics);

        let chain = MemberChain {
            root: ChainRoot::Static("Rules".into()),
            members: vec!["numbers".into(), "positive".into()],
        };
        assert_eq!(chain.to_string(), "Rules::numbers.positive");
        let lambda = resolver.resolve(&chain).unwrap().unwrap();
        assert_eq!(lambda.to_string(), "|x: int| (x > 0)");
    }

    #[test]
    fn test_resolve_constant_chain() {
        let holder = Value::object(Object::new("Holder").with_field("rule", is_positive()));
        let chain = MemberChain {
            root: ChainRoot::Constant(holder),
            members: vec!["rule".into()],
        };
        assert_eq!(chain.to_string(), "value(Holder).rule");
        assert!(ValueResolver::default().resolve(&chain).unwrap().is_some());
    }

    #[test]
    fn test_non_lambda_resolves_to_none() {
        let statics = StaticRegistry::new();
        statics.register("Limits", "max", 10i64);
        let chain = MemberChain {
            root: ChainRoot::Static("Limits".into()),
            members: vec!["max".into()],
        };
        assert_eq!(ValueResolver::new(statics).resolve(&chain), Ok(None));
    }

    #[test]
    fn test_resolution_errors() {
        let statics = StaticRegistry::new();
        statics.register("Limits", "max", 10i64);
        let resolver = ValueResolver::new(statics);

        let missing_type = MemberChain {
            root: ChainRoot::Static("Nope".into()),
            members: vec!["rule".into()],
        };
        assert_eq!(
            resolver.resolve(&missing_type),
            Err(ResolveError::UnknownType {
                name: "Nope".into()
            })
        );

        let missing_member = MemberChain {
            root: ChainRoot::Static("Limits".into()),
            members: vec!["min".into()],
        };
        assert_eq!(
            resolver.resolve(&missing_member).unwrap_err().to_string(),
            "`Limits` has no member `min`"
        );

        let through_scalar = MemberChain {
            root: ChainRoot::Static("Limits".into()),
            members: vec!["max".into(), "rule".into()],
        };
        assert_eq!(
            resolver.resolve(&through_scalar).unwrap_err().to_string(),
            "cannot read `rule` from int"
        );
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |_: &MemberChain| -> Result<Option<Lambda>, ResolveError> {
            Ok(Some(is_positive()))
        };
        let chain = MemberChain {
            root: ChainRoot::Static("Anything".into()),
            members: vec![],
        };
        assert!(resolver.resolve(&chain).unwrap().is_some());
    }

    #[test]
    fn test_registry_is_shared_between_clones() {
        let statics = StaticRegistry::new();
        let clone = statics.clone();
        clone.register("Rules", "positive", is_positive());
        assert!(statics.contains("Rules"));
        assert!(statics.member("Rules", "positive").is_some());
    }
}
