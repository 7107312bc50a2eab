//! Schema model and the analyzer that interprets a parsed document as
//! a schema definition. Definitions live in an arena indexed by
//! [`SchemaRef`] so a sub-block definition can refer to an enclosing
//! one without ownership cycles.

use crate::block::{Block, Document, Scalar};
use crate::error::EdfError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Number,
    Boolean,
}

impl AttributeType {
    pub fn name(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Number => "number",
            AttributeType::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Multiplicity {
    One,
    Many,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Option<AttributeType>,
    pub required: bool,
    pub default: Option<Scalar>,
}

/// Index of a block definition within its [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchemaRef(pub usize);

/// A slot for child blocks: the data field they land in, how many are
/// allowed, and the definition they must match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubBlockSchema {
    pub field: String,
    pub multiplicity: Multiplicity,
    pub block: SchemaRef,
}

/// Definition of one block kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockSchema {
    pub kind: String,
    pub aliases: Vec<String>,
    pub anonymous: bool,
    pub attributes: Vec<AttributeSchema>,
    pub sub_blocks: Vec<SubBlockSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    nodes: Vec<BlockSchema>,
    roots: Vec<SchemaRef>,
}

impl Schema {
    pub fn node(&self, r: SchemaRef) -> &BlockSchema {
        &self.nodes[r.0]
    }

    pub fn roots(&self) -> &[SchemaRef] {
        &self.roots
    }

    fn add(&mut self, block: BlockSchema) -> SchemaRef {
        let r = SchemaRef(self.nodes.len());
        self.nodes.push(block);
        r
    }

    fn add_root(&mut self, r: SchemaRef) {
        self.roots.push(r);
    }

    /// The schema that schema documents themselves conform to. Slot 0
    /// is the `block` definition; its `sub_blocks` slot points at the
    /// `sub_block` definition, which points back at slot 0.
    pub fn meta() -> Schema {
        let block = SchemaRef(0);
        let attribute = SchemaRef(1);
        let sub_block = SchemaRef(2);
        let mut schema = Schema::default();
        schema.add(BlockSchema {
            kind: "block".to_owned(),
            aliases: Vec::new(),
            anonymous: false,
            attributes: vec![
                AttributeSchema {
                    name: "aliases".to_owned(),
                    ty: Some(AttributeType::String),
                    required: false,
                    default: None,
                },
                AttributeSchema {
                    name: "anonymous".to_owned(),
                    ty: Some(AttributeType::Number),
                    required: false,
                    default: Some(Scalar::Int(0)),
                },
            ],
            sub_blocks: vec![
                SubBlockSchema {
                    field: "attributes".to_owned(),
                    multiplicity: Multiplicity::Many,
                    block: attribute,
                },
                SubBlockSchema {
                    field: "sub_blocks".to_owned(),
                    multiplicity: Multiplicity::Many,
                    block: sub_block,
                },
            ],
        });
        schema.add(BlockSchema {
            kind: "attribute".to_owned(),
            aliases: Vec::new(),
            anonymous: false,
            attributes: vec![
                AttributeSchema {
                    name: "type".to_owned(),
                    ty: Some(AttributeType::String),
                    required: false,
                    default: None,
                },
                AttributeSchema {
                    name: "required".to_owned(),
                    ty: Some(AttributeType::Number),
                    required: false,
                    default: Some(Scalar::Int(0)),
                },
                AttributeSchema {
                    name: "default".to_owned(),
                    ty: None,
                    required: false,
                    default: None,
                },
            ],
            sub_blocks: Vec::new(),
        });
        schema.add(BlockSchema {
            kind: "sub_block".to_owned(),
            aliases: Vec::new(),
            anonymous: true,
            attributes: vec![
                AttributeSchema {
                    name: "field".to_owned(),
                    ty: Some(AttributeType::String),
                    required: true,
                    default: None,
                },
                AttributeSchema {
                    name: "multiplicity".to_owned(),
                    ty: Some(AttributeType::String),
                    required: false,
                    default: Some(Scalar::Str("many".to_owned())),
                },
            ],
            sub_blocks: vec![SubBlockSchema {
                field: "block".to_owned(),
                multiplicity: Multiplicity::One,
                block,
            }],
        });
        schema.add_root(block);
        schema
    }
}

/// Interpret a document as schema definitions. Every root block must be
/// a `block` definition.
pub fn analyze_schema_document(doc: &Document) -> Result<Schema, EdfError> {
    let mut schema = Schema::default();
    for block in doc {
        if block.kind != "block" {
            return Err(EdfError::schema(format!(
                "schema document roots must be block definitions, found '{}'",
                block.kind
            )));
        }
        let root = analyze_block(&mut schema, block)?;
        schema.add_root(root);
    }
    Ok(schema)
}

fn analyze_block(schema: &mut Schema, block: &Block) -> Result<SchemaRef, EdfError> {
    let name = match &block.name {
        Some(name) => name.clone(),
        None => return Err(EdfError::schema("block definition requires a name")),
    };
    if block.value.is_some() {
        return Err(EdfError::schema(format!(
            "block definition '{}' cannot have a value body",
            name
        )));
    }
    let mut aliases = Vec::new();
    let mut anonymous = false;
    for (key, value) in &block.attributes {
        match key.as_str() {
            "aliases" => aliases = split_aliases(value)?,
            "anonymous" => anonymous = flag_value("anonymous", value)?,
            other => {
                return Err(EdfError::schema(format!(
                    "unknown attribute '{}' in block definition '{}'",
                    other, name
                )));
            }
        }
    }
    let mut attributes = Vec::new();
    let mut sub_blocks = Vec::new();
    for child in &block.children {
        match child.kind.as_str() {
            "attribute" => attributes.push(analyze_attribute(child)?),
            "sub_block" => sub_blocks.push(analyze_sub_block(schema, child)?),
            other => {
                return Err(EdfError::schema(format!(
                    "unexpected '{}' inside block definition '{}'",
                    other, name
                )));
            }
        }
    }
    Ok(schema.add(BlockSchema {
        kind: name,
        aliases,
        anonymous,
        attributes,
        sub_blocks,
    }))
}

fn analyze_attribute(block: &Block) -> Result<AttributeSchema, EdfError> {
    let name = match &block.name {
        Some(name) => name.clone(),
        None => return Err(EdfError::schema("attribute definition requires a name")),
    };
    if block.value.is_some() {
        return Err(EdfError::schema(format!(
            "attribute definition '{}' cannot have a value body",
            name
        )));
    }
    if !block.children.is_empty() {
        return Err(EdfError::schema(format!(
            "attribute definition '{}' cannot contain blocks",
            name
        )));
    }
    let mut ty = None;
    let mut required = false;
    let mut default = None;
    for (key, value) in &block.attributes {
        match key.as_str() {
            "type" => ty = Some(parse_type(value)?),
            "required" => required = flag_value("required", value)?,
            "default" => default = Some(value.clone()),
            other => {
                return Err(EdfError::schema(format!(
                    "unknown attribute '{}' in attribute definition '{}'",
                    other, name
                )));
            }
        }
    }
    Ok(AttributeSchema {
        name,
        ty,
        required,
        default,
    })
}

fn analyze_sub_block(schema: &mut Schema, block: &Block) -> Result<SubBlockSchema, EdfError> {
    if block.name.is_some() {
        return Err(EdfError::schema("sub-block definition cannot have a name"));
    }
    if block.value.is_some() {
        return Err(EdfError::schema(
            "sub-block definition cannot have a value body",
        ));
    }
    let mut field = None;
    let mut multiplicity = Multiplicity::Many;
    for (key, value) in &block.attributes {
        match key.as_str() {
            "field" => match value {
                Scalar::Str(s) => field = Some(s.clone()),
                other => {
                    return Err(EdfError::schema(format!(
                        "sub-block field must be a string, found {}",
                        other.type_name()
                    )));
                }
            },
            "multiplicity" => multiplicity = parse_multiplicity(value)?,
            other => {
                return Err(EdfError::schema(format!(
                    "unknown attribute '{}' in sub-block definition",
                    other
                )));
            }
        }
    }
    let field = field.ok_or_else(|| EdfError::schema("sub-block definition requires a field"))?;
    let child = block.children.first().ok_or_else(|| {
        EdfError::schema(format!(
            "sub-block '{}' is missing its block definition",
            field
        ))
    })?;
    if child.kind != "block" {
        return Err(EdfError::schema(format!(
            "sub-block '{}' must contain a block definition, found '{}'",
            field, child.kind
        )));
    }
    if block.children.len() > 1 {
        return Err(EdfError::schema(format!(
            "sub-block '{}' must contain exactly one block definition",
            field
        )));
    }
    let block_ref = analyze_block(schema, child)?;
    Ok(SubBlockSchema {
        field,
        multiplicity,
        block: block_ref,
    })
}

fn parse_type(value: &Scalar) -> Result<AttributeType, EdfError> {
    match value.as_str() {
        Some("string") => Ok(AttributeType::String),
        Some("number") => Ok(AttributeType::Number),
        Some("boolean") => Ok(AttributeType::Boolean),
        Some(other) => Err(EdfError::schema(format!(
            "unknown attribute type '{}'",
            other
        ))),
        None => Err(EdfError::schema("attribute type must be a string")),
    }
}

fn parse_multiplicity(value: &Scalar) -> Result<Multiplicity, EdfError> {
    match value.as_str() {
        Some("one") => Ok(Multiplicity::One),
        Some("many") => Ok(Multiplicity::Many),
        Some(other) => Err(EdfError::schema(format!("unknown multiplicity '{}'", other))),
        None => Err(EdfError::schema("multiplicity must be a string")),
    }
}

/// Numeric flag: 0 is false, any other number is true.
fn flag_value(name: &str, value: &Scalar) -> Result<bool, EdfError> {
    match value {
        Scalar::Int(n) => Ok(*n != 0),
        Scalar::Float(x) => Ok(*x != 0.0),
        Scalar::Str(_) => Err(EdfError::schema(format!(
            "attribute '{}' expects a numeric flag",
            name
        ))),
    }
}

fn split_aliases(value: &Scalar) -> Result<Vec<String>, EdfError> {
    match value.as_str() {
        Some(s) => Ok(s
            .split(',')
            .map(|alias| alias.trim().to_owned())
            .filter(|alias| !alias.is_empty())
            .collect()),
        None => Err(EdfError::schema("aliases must be a comma separated string")),
    }
}
