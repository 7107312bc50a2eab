use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

/// A scalar attribute or body value.
///
/// Numbers split into integers and floats at build time: a literal with no
/// decimal point is an `Int`, one with a decimal point is a `Float`.
/// Booleans are tokenized by the lexer but are not part of the value
/// grammar, so no boolean variant exists here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
}

impl Scalar {
    /// Primitive type name used in schema diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Str(_) => "string",
            Scalar::Int(_) | Scalar::Float(_) => "number",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// JSON value for this scalar. Literals are always finite, so the
    /// float conversion cannot fail in practice; a non-finite float maps
    /// to null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::Str(s) => serde_json::Value::String(s.clone()),
            Scalar::Int(n) => serde_json::Value::Number((*n).into()),
            Scalar::Float(x) => serde_json::Number::from_f64(*x)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => write!(f, "{}", s),
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Float(x) => write!(f, "{}", x),
        }
    }
}

/// One node of the document tree.
///
/// A block either carries a scalar `value` and no attributes or children
/// (a single-value block), or only attributes and children (an aggregate
/// block). A block with neither is empty and still valid. `name` is
/// present only when the block's head had a second identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: String,
    pub name: Option<String>,
    pub value: Option<Scalar>,
    /// Keys are unique and kept in source order.
    pub attributes: IndexMap<String, Scalar>,
    pub children: Vec<Block>,
}

impl Block {
    pub fn new(kind: impl Into<String>) -> Self {
        Block {
            kind: kind.into(),
            name: None,
            value: None,
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.attributes.get(key)
    }

    pub fn is_single_value(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.attributes.is_empty() && self.children.is_empty()
    }
}

/// An ordered sequence of root-level blocks. There is no implicit wrapping
/// root node.
pub type Document = Vec<Block>;
