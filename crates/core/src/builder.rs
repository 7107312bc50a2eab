//! Tree builder. Replays the flat postfix node stream over a stack:
//! introducers and literals push, reductions pop back to their opening
//! introducer and fold the span into an attribute or a [`Block`].

use crate::block::{Block, Document, Scalar};
use crate::error::EdfError;
use crate::parser::{Node, NodeKind};

/// One stack slot: the node that produced it plus the value it has
/// been folded into so far.
enum Entry {
    /// Introducer or block id text.
    Text(Node, String),
    /// Decoded literal.
    Value(Node, Scalar),
    /// Reduced key/value pair.
    Attribute(Node, String, Scalar),
    /// Reduced block.
    Block(Node, Block),
    /// Body start or assignment; consumed positionally by reductions.
    Marker(Node),
}

impl Entry {
    fn node(&self) -> &Node {
        match self {
            Entry::Text(node, _)
            | Entry::Value(node, _)
            | Entry::Attribute(node, _, _)
            | Entry::Block(node, _)
            | Entry::Marker(node) => node,
        }
    }
}

fn build_err(node: &Node, message: impl Into<String>) -> EdfError {
    EdfError::build(node.token.line, node.token.col, message)
}

/// Fold a node stream into a [`Document`]. Every root-level entry must
/// reduce to a block.
pub fn build(nodes: Vec<Node>) -> Result<Document, EdfError> {
    let mut stack: Vec<Entry> = Vec::new();

    for node in nodes {
        match node.kind {
            NodeKind::BlockIntroducer | NodeKind::BlockId | NodeKind::AttributeIntroducer => {
                let text = node.token.text.clone();
                stack.push(Entry::Text(node, text));
            }
            NodeKind::LitString => {
                let value = Scalar::Str(decode_string_literal(&node.token.text));
                stack.push(Entry::Value(node, value));
            }
            NodeKind::LitNumber => {
                let value = parse_number(&node)?;
                stack.push(Entry::Value(node, value));
            }
            NodeKind::BlockBodyStart | NodeKind::AttributeAssignment => {
                stack.push(Entry::Marker(node));
            }
            NodeKind::Attribute => {
                let entry = reduce_attribute(&mut stack, node)?;
                stack.push(entry);
            }
            NodeKind::Block => {
                let entry = reduce_block(&mut stack, node)?;
                stack.push(entry);
            }
        }
    }

    let mut document = Vec::with_capacity(stack.len());
    for entry in stack {
        match entry {
            Entry::Block(_, block) => document.push(block),
            other => {
                return Err(build_err(other.node(), "unreduced content at document level"));
            }
        }
    }
    Ok(document)
}

/// Pop the span opened by the reduction's introducer, nearest match
/// first scanning down from the top.
fn reduce(stack: &mut Vec<Entry>, node: &Node) -> Result<Vec<Entry>, EdfError> {
    let opener = match node.kind.opener() {
        Some(kind) => kind,
        None => return Err(build_err(node, "not a bracketed node kind")),
    };
    let idx = stack
        .iter()
        .rposition(|entry| entry.node().kind == opener)
        .ok_or_else(|| build_err(node, "no opening introducer on the stack"))?;
    Ok(stack.split_off(idx))
}

fn reduce_attribute(stack: &mut Vec<Entry>, node: Node) -> Result<Entry, EdfError> {
    let mut parts = reduce(stack, &node)?;
    if parts.len() != 3 {
        return Err(build_err(&node, "malformed attribute"));
    }
    let value = match parts.pop() {
        Some(Entry::Value(_, value)) => value,
        _ => return Err(build_err(&node, "attribute value is not a literal")),
    };
    parts.pop(); // assignment marker
    let key = match parts.pop() {
        Some(Entry::Text(_, key)) => key,
        _ => return Err(build_err(&node, "attribute key is not a name")),
    };
    Ok(Entry::Attribute(node, key, value))
}

fn reduce_block(stack: &mut Vec<Entry>, node: Node) -> Result<Entry, EdfError> {
    let mut parts = reduce(stack, &node)?.into_iter().peekable();

    let kind = match parts.next() {
        Some(Entry::Text(_, kind)) => kind,
        _ => return Err(build_err(&node, "malformed block")),
    };
    let name = parts
        .next_if(|entry| entry.node().kind == NodeKind::BlockId)
        .and_then(|entry| match entry {
            Entry::Text(_, name) => Some(name),
            _ => None,
        });
    match parts.next() {
        Some(Entry::Marker(marker)) if marker.kind == NodeKind::BlockBodyStart => {}
        _ => return Err(build_err(&node, "block body start missing")),
    }

    let mut block = Block::new(kind);
    block.name = name;

    let body: Vec<Entry> = parts.collect();
    if body.len() == 1 && matches!(body[0], Entry::Value(_, _)) {
        if let Some(Entry::Value(_, value)) = body.into_iter().next() {
            block.value = Some(value);
        }
    } else {
        for entry in body {
            match entry {
                Entry::Attribute(child, key, value) => {
                    if block.attributes.contains_key(&key) {
                        return Err(build_err(
                            &child,
                            format!("duplicate attribute key '{}'", key),
                        ));
                    }
                    block.attributes.insert(key, value);
                }
                Entry::Block(_, child) => block.children.push(child),
                other => {
                    return Err(build_err(other.node(), "unexpected content in block body"));
                }
            }
        }
    }

    Ok(Entry::Block(node, block))
}

fn parse_number(node: &Node) -> Result<Scalar, EdfError> {
    let text = node.token.text.as_str();
    let parsed = if text.contains('.') {
        text.parse().map(Scalar::Float).ok()
    } else {
        text.parse().map(Scalar::Int).ok()
    };
    parsed.ok_or_else(|| build_err(node, format!("invalid number literal '{}'", text)))
}

/// Strip the quotes and decode backslash escapes. An unrecognized
/// escape keeps the backslash and the character.
fn decode_string_literal(text: &str) -> String {
    let inner = if text.len() >= 2 {
        &text[1..text.len() - 1]
    } else {
        text
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn build_src(src: &str) -> Result<Document, EdfError> {
        build(parse(&tokenize(src).expect("tokenize")).expect("parse"))
    }

    #[test]
    fn named_block_with_attributes() {
        let doc = build_src(concat!(
            "named_block block_name {\n",
            "    key1 = \"value1\"\n",
            "    key2 = \"value2\"\n",
            "}\n",
        ))
        .expect("build");
        assert_eq!(doc.len(), 1);
        let block = &doc[0];
        assert_eq!(block.kind, "named_block");
        assert_eq!(block.name.as_deref(), Some("block_name"));
        assert_eq!(block.get("key1"), Some(&Scalar::Str("value1".into())));
        assert_eq!(block.get("key2"), Some(&Scalar::Str("value2".into())));
        let keys: Vec<&String> = block.attributes.keys().collect();
        assert_eq!(keys, vec!["key1", "key2"]);
    }

    #[test]
    fn anonymous_block_has_no_name() {
        let doc = build_src("anon_block { k = \"v\" }").expect("build");
        assert_eq!(doc[0].kind, "anon_block");
        assert_eq!(doc[0].name, None);
    }

    #[test]
    fn single_value_bodies() {
        let doc = build_src("s { \"text\" }").expect("build");
        assert!(doc[0].is_single_value());
        assert_eq!(doc[0].value, Some(Scalar::Str("text".into())));

        let doc = build_src("i { -42 }").expect("build");
        assert_eq!(doc[0].value, Some(Scalar::Int(-42)));

        let doc = build_src("f { 3.25 }").expect("build");
        assert_eq!(doc[0].value, Some(Scalar::Float(3.25)));
    }

    #[test]
    fn nested_blocks_become_children() {
        let doc = build_src(concat!(
            "outer {\n",
            "    a = 1\n",
            "    inner first {\n",
            "        b = 2\n",
            "    }\n",
            "    inner second {\n",
            "        b = 3\n",
            "    }\n",
            "}\n",
        ))
        .expect("build");
        let outer = &doc[0];
        assert_eq!(outer.get("a"), Some(&Scalar::Int(1)));
        assert_eq!(outer.children.len(), 2);
        assert_eq!(outer.children[0].name.as_deref(), Some("first"));
        assert_eq!(outer.children[1].name.as_deref(), Some("second"));
        assert_eq!(outer.children[1].get("b"), Some(&Scalar::Int(3)));
    }

    #[test]
    fn empty_block_is_empty() {
        let doc = build_src("e { }").expect("build");
        assert!(doc[0].is_empty());
        assert!(!doc[0].is_single_value());
    }

    #[test]
    fn multiple_roots_preserve_order() {
        let doc = build_src("a { }\nb { }\nc { }\n").expect("build");
        let kinds: Vec<&str> = doc.iter().map(|b| b.kind.as_str()).collect();
        assert_eq!(kinds, vec!["a", "b", "c"]);
    }

    #[test]
    fn duplicate_attribute_key_is_rejected() {
        let err = build_src(concat!("d {\n", "    k = 1\n", "    k = 2\n", "}\n")).unwrap_err();
        assert!(err.to_string().contains("duplicate attribute key 'k'"));
    }

    #[test]
    fn string_escapes_decode() {
        let doc = build_src(r#"m { s = "say \"hi\"\n\tdone\\" }"#).expect("build");
        assert_eq!(
            doc[0].get("s").and_then(|v| v.as_str()),
            Some("say \"hi\"\n\tdone\\"),
        );
        // Unrecognized escapes keep the backslash.
        let doc = build_src(r#"m { s = "x\qy" }"#).expect("build");
        assert_eq!(doc[0].get("s").and_then(|v| v.as_str()), Some("x\\qy"));
    }

    #[test]
    fn marked_number_is_rejected_at_build() {
        let err = build_src("m { n = 12# }").unwrap_err();
        assert!(err.to_string().contains("invalid number literal '12#'"));
    }

    #[test]
    fn recovered_input_still_builds() {
        let doc = build_src("block { a = \"1\"").expect("build");
        assert_eq!(doc[0].get("a"), Some(&Scalar::Str("1".into())));
    }

    #[test]
    fn mixed_scalar_attribute_types() {
        let doc = build_src(concat!(
            "cfg {\n",
            "    host = \"localhost\"\n",
            "    port = 8080\n",
            "    ratio = 1.5\n",
            "}\n",
        ))
        .expect("build");
        let block = &doc[0];
        assert_eq!(block.get("host"), Some(&Scalar::Str("localhost".into())));
        assert_eq!(block.get("port"), Some(&Scalar::Int(8080)));
        assert_eq!(block.get("ratio"), Some(&Scalar::Float(1.5)));
    }
}
