//! edf-core: EDF document pipeline core library.
//!
//! Provides the three-stage pipeline from EDF text to block trees:
//! tokenize (with token fabrication and delimiter recovery), parse (an
//! explicit state machine producing a flat node stream), and build
//! (stack reduction into a [`Document`]). On top of the pipeline sit
//! schema analysis, datafication, and the JSON and XML projections.
//!
//! # Public API
//!
//! Key types and entry points are re-exported at the crate root:
//!
//! - [`read_document()`] -- full pipeline from text to [`Document`]
//! - [`read_schema()`] -- read a schema definition document
//! - [`read_data()`] -- datafy a document against a [`Schema`]
//! - [`Block`], [`Scalar`] -- the document tree
//! - [`EdfError`] -- pipeline error type
//!
//! Individual stage entry points are also re-exported for selective
//! execution.

pub mod block;
pub mod builder;
pub mod canonical;
pub mod datafy;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod read;
pub mod schema;
pub mod xml;

// ── Convenience re-exports: key types ────────────────────────────────

pub use block::{Block, Document, Scalar};
pub use error::EdfError;
pub use lexer::{Token, TokenKind};
pub use parser::{Node, NodeKind, State, StateId};
pub use schema::{
    AttributeSchema, AttributeType, BlockSchema, Multiplicity, Schema, SchemaRef, SubBlockSchema,
};

// ── Convenience re-exports: pipeline entry points ────────────────────

pub use builder::build;
pub use canonical::{canonicalize_block, canonicalize_document};
pub use datafy::datafy_document;
pub use lexer::{tokenize, tokenize_strict};
pub use parser::parse;
pub use read::{read_data, read_document, read_schema};
pub use schema::analyze_schema_document;
pub use xml::document_to_xml_string;
