//! Entry points joining the pipeline stages.

use crate::block::Document;
use crate::builder::build;
use crate::datafy::datafy_document;
use crate::error::EdfError;
use crate::lexer::tokenize;
use crate::parser::parse;
use crate::schema::{analyze_schema_document, Schema};

/// Read EDF text into a [`Document`]: tokenize, parse, build.
pub fn read_document(text: &str) -> Result<Document, EdfError> {
    let tokens = tokenize(text)?;
    let nodes = parse(&tokens)?;
    build(nodes)
}

/// Read EDF text holding schema definitions into a [`Schema`].
pub fn read_schema(text: &str) -> Result<Schema, EdfError> {
    let doc = read_document(text)?;
    analyze_schema_document(&doc)
}

/// Read EDF text and datafy it against `schema` into plain data.
pub fn read_data(text: &str, schema: &Schema) -> Result<serde_json::Value, EdfError> {
    let doc = read_document(text)?;
    datafy_document(&doc, schema)
}
