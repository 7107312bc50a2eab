//! Explicit state-machine parser. Tokens go in, a flat postfix stream
//! of nodes comes out; nesting is recovered later by the tree builder.
//! The machine keeps a stack of states and dispatches on the pair of
//! current state and current token, with one token of lookahead at most.

use crate::error::EdfError;
use crate::lexer::{Token, TokenKind};

/// Kinds of nodes in the flat parse stream. `Block` and `Attribute`
/// are bracketed kinds: each closes the span opened by the nearest
/// preceding introducer of the matching kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    BlockIntroducer,
    BlockId,
    BlockBodyStart,
    Block,
    AttributeIntroducer,
    AttributeAssignment,
    Attribute,
    LitString,
    LitNumber,
}

impl NodeKind {
    /// For bracketed kinds, the introducer that opens their span.
    pub fn opener(self) -> Option<NodeKind> {
        match self {
            NodeKind::Block => Some(NodeKind::BlockIntroducer),
            NodeKind::Attribute => Some(NodeKind::AttributeIntroducer),
            _ => None,
        }
    }
}

/// A parse node and the token that produced it. Reductions carry their
/// closing token: a `Block` carries the `}`, an `Attribute` the
/// terminating semicolon.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub token: Token,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateId {
    /// Root level, between blocks.
    Doc,
    /// Saw a block kind, expecting a name or a body.
    BlockIntroducer,
    /// Saw kind and name, expecting a body.
    BlockNamed,
    /// Inside `{`, nothing seen yet.
    BlockBodyUnknown,
    /// Body holds a single literal value.
    BlockBodyValue,
    /// Body holds attributes and nested blocks.
    BlockBodyAggregate,
    /// Saw an attribute key, expecting `=`.
    AttributeIntroducer,
    /// Unused by the dispatch table; the assignment is emitted as a
    /// node without entering a dedicated state.
    AttributeAssignment,
    /// Expecting the semicolon that closes an attribute.
    AttributeValue,
    /// Expecting a literal.
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    pub id: StateId,
    /// Token index where this state was entered.
    pub start: usize,
}

fn state_name(id: StateId) -> &'static str {
    match id {
        StateId::Doc => "document",
        StateId::BlockIntroducer => "block introducer",
        StateId::BlockNamed => "named block",
        StateId::BlockBodyUnknown => "block body",
        StateId::BlockBodyValue => "block value body",
        StateId::BlockBodyAggregate => "block aggregate body",
        StateId::AttributeIntroducer => "attribute introducer",
        StateId::AttributeAssignment => "attribute assignment",
        StateId::AttributeValue => "attribute value",
        StateId::Value => "value",
    }
}

fn parse_err(token: &Token, message: impl Into<String>) -> EdfError {
    EdfError::parse(token.line, token.col, message)
}

/// Parse a token stream into the flat node stream. The stream is
/// postfix: introducers and literals appear as encountered, reductions
/// after their contents.
pub fn parse(tokens: &[Token]) -> Result<Vec<Node>, EdfError> {
    let mut parser = Parser::new(tokens);
    parser.run()?;
    Ok(parser.nodes)
}

struct Parser<'a> {
    tokens: &'a [Token],
    nodes: Vec<Node>,
    states: Vec<State>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Parser {
            tokens,
            nodes: Vec::new(),
            states: vec![State {
                id: StateId::Doc,
                start: 0,
            }],
            pos: 0,
        }
    }

    fn run(&mut self) -> Result<(), EdfError> {
        while self.pos < self.tokens.len() {
            self.step()?;
        }
        if self.states.len() != 1 {
            let (line, col) = match self.tokens.last() {
                Some(token) => (token.line, token.col),
                None => (1, 1),
            };
            return Err(EdfError::parse(line, col, "unexpected end of input"));
        }
        Ok(())
    }

    fn current(&self) -> &'a Token {
        &self.tokens[self.pos]
    }

    fn consume(&mut self) -> &'a Token {
        let token = self.current();
        self.pos += 1;
        token
    }

    fn push(&mut self, id: StateId) {
        self.states.push(State {
            id,
            start: self.pos,
        });
    }

    fn retag(&mut self, id: StateId) {
        if let Some(state) = self.states.last_mut() {
            state.id = id;
        }
    }

    fn emit(&mut self, kind: NodeKind, token: &Token) {
        self.nodes.push(Node {
            kind,
            token: token.clone(),
        });
    }

    fn step(&mut self) -> Result<(), EdfError> {
        let state = match self.states.last() {
            Some(state) => *state,
            None => return Err(parse_err(self.current(), "empty state stack")),
        };
        let token = self.current();
        match (state.id, token.kind) {
            (StateId::Doc, TokenKind::Name) => {
                let token = self.consume();
                self.push(StateId::BlockIntroducer);
                self.emit(NodeKind::BlockIntroducer, token);
            }
            (StateId::BlockIntroducer, TokenKind::Name) => {
                self.retag(StateId::BlockNamed);
                let token = self.consume();
                self.emit(NodeKind::BlockId, token);
            }
            (StateId::BlockIntroducer | StateId::BlockNamed, TokenKind::LBrace) => {
                let token = self.consume();
                self.push(StateId::BlockBodyUnknown);
                self.emit(NodeKind::BlockBodyStart, token);
            }
            (
                StateId::BlockBodyUnknown | StateId::BlockBodyValue | StateId::BlockBodyAggregate,
                TokenKind::RBrace,
            ) => {
                let token = self.consume();
                self.states.pop();
                match self.states.pop() {
                    Some(opener)
                        if matches!(opener.id, StateId::BlockIntroducer | StateId::BlockNamed) => {}
                    _ => {
                        return Err(parse_err(token, "block body closed without an open block"));
                    }
                }
                self.emit(NodeKind::Block, token);
            }
            (StateId::BlockBodyUnknown | StateId::BlockBodyAggregate, TokenKind::Name) => {
                self.retag(StateId::BlockBodyAggregate);
                // One token of lookahead tells an attribute apart from
                // a nested block.
                let next = match self.tokens.get(self.pos + 1) {
                    Some(next) => next,
                    None => return Err(parse_err(token, "unexpected end of input")),
                };
                if next.kind == TokenKind::Equals {
                    let token = self.consume();
                    self.push(StateId::AttributeIntroducer);
                    self.emit(NodeKind::AttributeIntroducer, token);
                } else {
                    let token = self.consume();
                    self.push(StateId::BlockIntroducer);
                    self.emit(NodeKind::BlockIntroducer, token);
                }
            }
            (StateId::BlockBodyUnknown, _) => {
                // Not a name, so the body holds a single value.
                self.retag(StateId::BlockBodyValue);
                self.push(StateId::Value);
            }
            (StateId::BlockBodyValue, TokenKind::Semicolon) => {
                self.consume();
            }
            (StateId::AttributeIntroducer, TokenKind::Equals) => {
                self.push(StateId::AttributeValue);
                self.push(StateId::Value);
                let token = self.consume();
                self.emit(NodeKind::AttributeAssignment, token);
            }
            (StateId::Value, TokenKind::Str) => {
                let token = self.consume();
                self.emit(NodeKind::LitString, token);
                self.states.pop();
            }
            (StateId::Value, TokenKind::Number) => {
                let token = self.consume();
                self.emit(NodeKind::LitNumber, token);
                self.states.pop();
            }
            (StateId::Value, TokenKind::True | TokenKind::False) => {
                return Err(parse_err(token, "boolean literals are not valid values"));
            }
            (StateId::AttributeValue, TokenKind::Semicolon) => {
                let token = self.consume();
                self.states.pop();
                match self.states.pop() {
                    Some(opener) if opener.id == StateId::AttributeIntroducer => {}
                    _ => {
                        return Err(parse_err(
                            token,
                            "attribute terminated without an open attribute",
                        ));
                    }
                }
                self.emit(NodeKind::Attribute, token);
            }
            (_, _) => {
                return Err(parse_err(
                    token,
                    format!("unexpected {} in {}", token.kind, state_name(state.id)),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn kinds(src: &str) -> Vec<NodeKind> {
        let tokens = tokenize(src).expect("tokenize");
        parse(&tokens)
            .expect("parse")
            .into_iter()
            .map(|node| node.kind)
            .collect()
    }

    fn parse_src(src: &str) -> Result<Vec<Node>, EdfError> {
        parse(&tokenize(src).expect("tokenize"))
    }

    #[test]
    fn simple_named_block() {
        let src = concat!(
            "named_block block_name {\n",
            "    key1 = \"value1\"\n",
            "    key2 = \"value2\"\n",
            "}\n",
        );
        assert_eq!(
            kinds(src),
            vec![
                NodeKind::BlockIntroducer,
                NodeKind::BlockId,
                NodeKind::BlockBodyStart,
                NodeKind::AttributeIntroducer,
                NodeKind::AttributeAssignment,
                NodeKind::LitString,
                NodeKind::Attribute,
                NodeKind::AttributeIntroducer,
                NodeKind::AttributeAssignment,
                NodeKind::LitString,
                NodeKind::Attribute,
                NodeKind::Block,
            ],
        );
    }

    #[test]
    fn simple_anonymous_block() {
        let src = concat!(
            "anon_block {\n",
            "    key1 = \"value1\"\n",
            "    key2 = \"value2\"\n",
            "}\n",
        );
        assert_eq!(
            kinds(src),
            vec![
                NodeKind::BlockIntroducer,
                NodeKind::BlockBodyStart,
                NodeKind::AttributeIntroducer,
                NodeKind::AttributeAssignment,
                NodeKind::LitString,
                NodeKind::Attribute,
                NodeKind::AttributeIntroducer,
                NodeKind::AttributeAssignment,
                NodeKind::LitString,
                NodeKind::Attribute,
                NodeKind::Block,
            ],
        );
    }

    #[test]
    fn single_value_block() {
        let src = concat!("anon_block {\n", "    \"value\"\n", "}\n");
        assert_eq!(
            kinds(src),
            vec![
                NodeKind::BlockIntroducer,
                NodeKind::BlockBodyStart,
                NodeKind::LitString,
                NodeKind::Block,
            ],
        );
    }

    #[test]
    fn nested_blocks() {
        let src = concat!(
            "anon_block {\n",
            "    key1 = \"value1\"\n",
            "    key2 = \"value2\"\n",
            "    \n",
            "    nested_block block_name {\n",
            "        key3 = \"value3\"\n",
            "        key4 = \"value4\"\n",
            "    }\n",
            "\n",
            "    nested_anon_block {\n",
            "        key5 = \"value5\"\n",
            "        key6 = \"value6\"\n",
            "    }\n",
            "}\n",
        );
        assert_eq!(
            kinds(src),
            vec![
                NodeKind::BlockIntroducer,
                NodeKind::BlockBodyStart,
                NodeKind::AttributeIntroducer,
                NodeKind::AttributeAssignment,
                NodeKind::LitString,
                NodeKind::Attribute,
                NodeKind::AttributeIntroducer,
                NodeKind::AttributeAssignment,
                NodeKind::LitString,
                NodeKind::Attribute,
                NodeKind::BlockIntroducer,
                NodeKind::BlockId,
                NodeKind::BlockBodyStart,
                NodeKind::AttributeIntroducer,
                NodeKind::AttributeAssignment,
                NodeKind::LitString,
                NodeKind::Attribute,
                NodeKind::AttributeIntroducer,
                NodeKind::AttributeAssignment,
                NodeKind::LitString,
                NodeKind::Attribute,
                NodeKind::Block,
                NodeKind::BlockIntroducer,
                NodeKind::BlockBodyStart,
                NodeKind::AttributeIntroducer,
                NodeKind::AttributeAssignment,
                NodeKind::LitString,
                NodeKind::Attribute,
                NodeKind::AttributeIntroducer,
                NodeKind::AttributeAssignment,
                NodeKind::LitString,
                NodeKind::Attribute,
                NodeKind::Block,
                NodeKind::Block,
            ],
        );
    }

    #[test]
    fn empty_block() {
        assert_eq!(
            kinds("e { }"),
            vec![
                NodeKind::BlockIntroducer,
                NodeKind::BlockBodyStart,
                NodeKind::Block,
            ],
        );
    }

    #[test]
    fn number_value_block() {
        assert_eq!(
            kinds("n { 42 }"),
            vec![
                NodeKind::BlockIntroducer,
                NodeKind::BlockBodyStart,
                NodeKind::LitNumber,
                NodeKind::Block,
            ],
        );
    }

    #[test]
    fn attribute_with_number_value() {
        assert_eq!(
            kinds("a { x = 5 }"),
            vec![
                NodeKind::BlockIntroducer,
                NodeKind::BlockBodyStart,
                NodeKind::AttributeIntroducer,
                NodeKind::AttributeAssignment,
                NodeKind::LitNumber,
                NodeKind::Attribute,
                NodeKind::Block,
            ],
        );
    }

    #[test]
    fn multiple_root_blocks() {
        assert_eq!(
            kinds("a { }\nb { }\n"),
            vec![
                NodeKind::BlockIntroducer,
                NodeKind::BlockBodyStart,
                NodeKind::Block,
                NodeKind::BlockIntroducer,
                NodeKind::BlockBodyStart,
                NodeKind::Block,
            ],
        );
    }

    #[test]
    fn reductions_carry_closing_tokens() {
        let nodes = parse_src(concat!("a {\n", "    k = \"v\"\n", "}\n")).expect("parse");
        let attribute = nodes
            .iter()
            .find(|n| n.kind == NodeKind::Attribute)
            .expect("attribute node");
        assert_eq!(attribute.token.kind, TokenKind::Semicolon);
        assert!(attribute.token.fabricated);
        let block = nodes
            .iter()
            .find(|n| n.kind == NodeKind::Block)
            .expect("block node");
        assert_eq!(block.token.kind, TokenKind::RBrace);
        assert_eq!(block.token.text, "}");
    }

    #[test]
    fn boolean_values_are_rejected() {
        let err = parse_src("flag { enabled = true }").unwrap_err();
        assert!(err.to_string().contains("boolean literals"));
        let err = parse_src("flag { false }").unwrap_err();
        assert!(err.to_string().contains("boolean literals"));
    }

    #[test]
    fn unterminated_document() {
        let err = parse_src("my_block").unwrap_err();
        assert!(err.to_string().contains("unexpected end of input"));
        let err = parse_src("a b").unwrap_err();
        assert!(err.to_string().contains("unexpected end of input"));
    }

    #[test]
    fn lookahead_past_last_token_fails() {
        // Hand-built stream; tokenize() would have healed the body.
        fn t(kind: TokenKind, text: &str, col: u32) -> Token {
            Token {
                kind,
                text: text.to_owned(),
                offset: col as usize - 1,
                len: text.len(),
                line: 1,
                col,
                fabricated: false,
                error: false,
            }
        }
        let tokens = vec![
            t(TokenKind::Name, "a", 1),
            t(TokenKind::LBrace, "{", 3),
            t(TokenKind::Name, "x", 5),
        ];
        let err = parse(&tokens).unwrap_err();
        assert!(err.to_string().contains("unexpected end of input"));
    }

    #[test]
    fn stray_closer_is_a_parse_error() {
        let err = parse_src("a ) b").unwrap_err();
        assert!(err.to_string().contains("unexpected ')'"));
    }

    #[test]
    fn second_value_in_value_body_is_rejected() {
        let err = parse_src("v { \"a\" \"b\" }").unwrap_err();
        assert!(err.to_string().contains("unexpected string literal"));
    }

    #[test]
    fn empty_input_parses_to_nothing() {
        assert_eq!(parse(&[]).expect("parse"), vec![]);
    }
}
