//! Expression tree model for exprkit.
//!
//! Trees describe pure predicates and projections over host values. This
//! crate holds the node model, printing, a structural fold, and the JSON
//! document format; the rewrite passes live in `exprkit-rewrite`.

pub mod ast;
pub mod display;
pub mod document;
pub mod fold;
pub mod value;

pub use ast::{
    BinaryOp, Expr, ExprKind, ExprNode, Lambda, Marker, MemberRef, Method, Param, Type,
    TypeParseError, UnaryOp,
};
pub use document::{Document, DocumentError, DocumentResult, LoweredDocument};
pub use fold::{Fold, fold_children};
pub use value::{FloatBits, Object, Value};
