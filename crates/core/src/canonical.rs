//! Canonical JSON form of a document. Structural fields carry a `$`
//! prefix, which no attribute key can collide with since names never
//! start with `$`.

use serde_json::{Map, Value};

use crate::block::{Block, Document};

/// JSON value for one block: `$kind`, `$name`, `$value` when present,
/// `$children`, then the attributes in source order.
pub fn canonicalize_block(block: &Block) -> Value {
    let mut data = Map::new();
    data.insert("$kind".to_owned(), Value::String(block.kind.clone()));
    data.insert(
        "$name".to_owned(),
        match &block.name {
            Some(name) => Value::String(name.clone()),
            None => Value::Null,
        },
    );
    if let Some(value) = &block.value {
        data.insert("$value".to_owned(), value.to_json());
    }
    data.insert(
        "$children".to_owned(),
        Value::Array(block.children.iter().map(canonicalize_block).collect()),
    );
    for (key, value) in &block.attributes {
        data.insert(key.clone(), value.to_json());
    }
    Value::Object(data)
}

/// Canonical JSON for a whole document.
pub fn canonicalize_document(doc: &Document) -> Value {
    Value::Array(doc.iter().map(canonicalize_block).collect())
}
