//! XML projection of a document. Blocks become elements named by their
//! kind, the block name becomes an `id` attribute, and single values
//! become text content.

use crate::block::{Block, Document};

/// Render a document as pretty-printed XML, two-space indent, with a
/// `<document>` root element wrapping the root blocks.
pub fn document_to_xml_string(doc: &Document) -> String {
    let mut out = String::from("<?xml version=\"1.0\" ?>\n");
    if doc.is_empty() {
        out.push_str("<document/>\n");
    } else {
        out.push_str("<document>\n");
        for block in doc {
            write_block(&mut out, block, 1);
        }
        out.push_str("</document>\n");
    }
    out
}

fn write_block(out: &mut String, block: &Block, depth: usize) {
    let indent = "  ".repeat(depth);
    out.push_str(&format!("{}<{}", indent, block.kind));
    if let Some(name) = &block.name {
        out.push_str(&format!(" id=\"{}\"", escape_attr(name)));
    }
    for (key, value) in &block.attributes {
        out.push_str(&format!(" {}=\"{}\"", key, escape_attr(&value.to_string())));
    }
    if let Some(value) = &block.value {
        out.push_str(&format!(
            ">{}</{}>\n",
            escape_text(&value.to_string()),
            block.kind
        ));
    } else if block.children.is_empty() {
        out.push_str("/>\n");
    } else {
        out.push_str(">\n");
        for child in &block.children {
            write_block(out, child, depth + 1);
        }
        out.push_str(&format!("{}</{}>\n", indent, block.kind));
    }
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
