//! Datafication: validate a document against a schema and project it
//! into plain data. Output objects hold, in order: the block identity,
//! attributes as written, defaults for declared attributes that were
//! omitted, then one field per sub-block slot.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::block::{Block, Document, Scalar};
use crate::error::EdfError;
use crate::schema::{AttributeSchema, AttributeType, BlockSchema, Multiplicity, Schema, SchemaRef};

/// Datafy all root blocks. Each root must match a root definition of
/// the schema, by kind or alias.
pub fn datafy_document(document: &Document, schema: &Schema) -> Result<Value, EdfError> {
    let roots = root_table(schema);
    let mut out = Vec::with_capacity(document.len());
    for block in document {
        let definition = match roots.get(block.kind.as_str()) {
            Some(&r) => r,
            None => {
                return Err(EdfError::datafy(format!(
                    "unknown block kind '{}' at document root",
                    block.kind
                )));
            }
        };
        out.push(datafy_block(schema, definition, block)?);
    }
    Ok(Value::Array(out))
}

fn root_table(schema: &Schema) -> BTreeMap<&str, SchemaRef> {
    let mut table = BTreeMap::new();
    for &root in schema.roots() {
        let definition = schema.node(root);
        table.insert(definition.kind.as_str(), root);
        for alias in &definition.aliases {
            table.insert(alias.as_str(), root);
        }
    }
    table
}

/// kind or alias to (owning slot, definition).
fn child_table<'a>(
    schema: &'a Schema,
    block_schema: &'a BlockSchema,
) -> BTreeMap<&'a str, (usize, SchemaRef)> {
    let mut table = BTreeMap::new();
    for (slot, sub_block) in block_schema.sub_blocks.iter().enumerate() {
        let definition = schema.node(sub_block.block);
        table.insert(definition.kind.as_str(), (slot, sub_block.block));
        for alias in &definition.aliases {
            table.insert(alias.as_str(), (slot, sub_block.block));
        }
    }
    table
}

fn datafy_block(schema: &Schema, definition: SchemaRef, block: &Block) -> Result<Value, EdfError> {
    let block_schema = schema.node(definition);
    let mut data = Map::new();

    match (&block.name, block_schema.anonymous) {
        (Some(_), true) => {
            return Err(EdfError::datafy(format!(
                "anonymous block '{}' has a name",
                block.kind
            )));
        }
        (None, false) => {
            return Err(EdfError::datafy(format!(
                "named block '{}' is missing a name",
                block.kind
            )));
        }
        (Some(name), false) => {
            data.insert("id".to_owned(), Value::String(name.clone()));
        }
        (None, true) => {}
    }

    if block.value.is_some() {
        return Err(EdfError::datafy(format!(
            "unexpected value body in block '{}'",
            block.kind
        )));
    }

    let declared: BTreeMap<&str, &AttributeSchema> = block_schema
        .attributes
        .iter()
        .map(|a| (a.name.as_str(), a))
        .collect();
    for (key, value) in &block.attributes {
        let attribute_schema = match declared.get(key.as_str()) {
            Some(&a) => a,
            None => {
                return Err(EdfError::datafy(format!(
                    "unexpected attribute '{}' in block '{}'",
                    key, block.kind
                )));
            }
        };
        if let Some(ty) = &attribute_schema.ty {
            check_type(key, ty, value)?;
        }
        data.insert(key.clone(), value.to_json());
    }

    for attribute_schema in &block_schema.attributes {
        if data.contains_key(&attribute_schema.name) {
            continue;
        }
        if let Some(default) = &attribute_schema.default {
            data.insert(attribute_schema.name.clone(), default.to_json());
        } else if attribute_schema.required {
            return Err(EdfError::datafy(format!(
                "missing required attribute '{}' in block '{}'",
                attribute_schema.name, block.kind
            )));
        }
    }

    for sub_block in &block_schema.sub_blocks {
        if data.contains_key(&sub_block.field) {
            return Err(EdfError::datafy(format!(
                "duplicate sub-block field '{}' in block '{}'",
                sub_block.field, block.kind
            )));
        }
        let initial = match sub_block.multiplicity {
            Multiplicity::One => Value::Null,
            Multiplicity::Many => Value::Array(Vec::new()),
        };
        data.insert(sub_block.field.clone(), initial);
    }

    let children = child_table(schema, block_schema);
    for child in &block.children {
        let (slot, child_ref) = match children.get(child.kind.as_str()) {
            Some(&entry) => entry,
            None => {
                return Err(EdfError::datafy(format!(
                    "unexpected child block '{}' in block '{}'",
                    child.kind, block.kind
                )));
            }
        };
        let sub_block = &block_schema.sub_blocks[slot];
        let child_data = datafy_block(schema, child_ref, child)?;
        match sub_block.multiplicity {
            Multiplicity::One => match data.get_mut(&sub_block.field) {
                Some(slot_value) if slot_value.is_null() => *slot_value = child_data,
                Some(_) => {
                    return Err(EdfError::datafy(format!(
                        "more than one '{}' child in block '{}'",
                        child.kind, block.kind
                    )));
                }
                None => {
                    return Err(EdfError::datafy(format!(
                        "sub-block field '{}' was never initialized",
                        sub_block.field
                    )));
                }
            },
            Multiplicity::Many => match data.get_mut(&sub_block.field) {
                Some(Value::Array(items)) => items.push(child_data),
                _ => {
                    return Err(EdfError::datafy(format!(
                        "sub-block field '{}' was never initialized",
                        sub_block.field
                    )));
                }
            },
        }
    }

    Ok(Value::Object(data))
}

fn check_type(key: &str, expected: &AttributeType, value: &Scalar) -> Result<(), EdfError> {
    let ok = match expected {
        AttributeType::String => matches!(value, Scalar::Str(_)),
        AttributeType::Number => matches!(value, Scalar::Int(_) | Scalar::Float(_)),
        // No boolean literal survives parsing, so nothing satisfies it.
        AttributeType::Boolean => false,
    };
    if ok {
        Ok(())
    } else {
        Err(EdfError::datafy(format!(
            "expected {} for attribute '{}', found {}",
            expected.name(),
            key,
            value.type_name()
        )))
    }
}
