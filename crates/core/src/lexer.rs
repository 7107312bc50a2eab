//! Tokenizer with two token-insertion mechanisms: delimiter balancing
//! (unmatched brackets are healed with fabricated closers) and
//! offside-rule semicolon insertion (a block's first item sets an
//! indentation baseline; later lines at or left of it terminate the
//! previous entry, deeper lines continue it).

use crate::error::EdfError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Eof,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Equals,
    True,
    False,
    Name,
    Number,
    Str,
}

impl TokenKind {
    /// The closing kind paired with an opening delimiter.
    fn closer(self) -> Option<TokenKind> {
        match self {
            TokenKind::LParen => Some(TokenKind::RParen),
            TokenKind::LBrace => Some(TokenKind::RBrace),
            TokenKind::LBracket => Some(TokenKind::RBracket),
            _ => None,
        }
    }

    fn is_closer(self) -> bool {
        matches!(
            self,
            TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Eof => "end of input",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Comma => "','",
            TokenKind::Semicolon => "';'",
            TokenKind::Equals => "'='",
            TokenKind::True => "'true'",
            TokenKind::False => "'false'",
            TokenKind::Name => "identifier",
            TokenKind::Number => "number literal",
            TokenKind::Str => "string literal",
        };
        f.write_str(name)
    }
}

/// A single token. `text` is the exact source lexeme (string literals
/// keep their quotes); `offset`/`len` are byte positions; `line`/`col`
/// are 1-based. Fabricated tokens have empty text and zero length, and
/// `error` marks the fabricated closers that record a recovered
/// structural mistake.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub offset: usize,
    pub len: usize,
    pub line: u32,
    pub col: u32,
    pub fabricated: bool,
    pub error: bool,
}

impl Token {
    fn read(kind: TokenKind, text: &str, offset: usize, line: u32, col: u32) -> Self {
        Token {
            kind,
            text: text.to_owned(),
            offset,
            len: text.len(),
            line,
            col,
            fabricated: false,
            error: false,
        }
    }

    fn fabricate(kind: TokenKind, offset: usize, line: u32, col: u32, error: bool) -> Self {
        Token {
            kind,
            text: String::new(),
            offset,
            len: 0,
            line,
            col,
            fabricated: true,
            error,
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '#' | '\'')
}

/// Scanner state for a single tokenize call.
struct Lexer<'a> {
    src: &'a str,
    offset: usize,
    line: u32,
    col: u32,
    /// Right delimiters awaiting their opener, innermost last.
    open_delimiters: Vec<TokenKind>,
    /// One record per open brace: the lazily-set indentation column of
    /// the block's first body item.
    brace_blocks: Vec<Option<u32>>,
    /// No token emitted yet on the current source line.
    first_on_line: bool,
    strict: bool,
    tokens: Vec<Token>,
}

/// Tokenize EDF source. Unbalanced brackets do not fail: they are healed
/// with fabricated closers flagged as errors, and every delimiter still
/// open at end of input is auto-closed.
pub fn tokenize(src: &str) -> Result<Vec<Token>, EdfError> {
    Lexer::new(src, false).run()
}

/// Tokenize with recovery disabled: a mismatched or unmatched right
/// delimiter is a lexical error. End-of-input auto-closing still applies.
pub fn tokenize_strict(src: &str) -> Result<Vec<Token>, EdfError> {
    Lexer::new(src, true).run()
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str, strict: bool) -> Self {
        Lexer {
            src,
            offset: 0,
            line: 1,
            col: 1,
            open_delimiters: Vec::new(),
            brace_blocks: Vec::new(),
            first_on_line: true,
            strict,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, EdfError> {
        while self.read_token()? {}
        Ok(self.tokens)
    }

    fn newline(&mut self) {
        self.line += 1;
        self.col = 1;
        self.first_on_line = true;
    }

    /// Skip whitespace and `#` comments. A comment runs to end of line;
    /// the newline itself is handled by the newline rule.
    fn skip_trivia(&mut self) {
        while self.offset < self.src.len() {
            let rest = &self.src[self.offset..];
            if rest.starts_with("\r\n") {
                self.offset += 2;
                self.newline();
            } else if rest.starts_with('\r') || rest.starts_with('\n') {
                self.offset += 1;
                self.newline();
            } else if rest.starts_with('#') {
                for c in rest.chars() {
                    if c == '\r' || c == '\n' {
                        break;
                    }
                    self.offset += c.len_utf8();
                    self.col += 1;
                }
            } else {
                match rest.chars().next() {
                    Some(c) if c.is_whitespace() => {
                        self.offset += c.len_utf8();
                        self.col += 1;
                    }
                    _ => return,
                }
            }
        }
    }

    /// Scan and emit one token. Returns false once end of input has been
    /// processed.
    ///
    /// Punctuation and keywords advance the cursor before emitting;
    /// names and literals emit first. Fabricated tokens are stamped with
    /// the cursor position, which differs between the two paths.
    fn read_token(&mut self) -> Result<bool, EdfError> {
        self.skip_trivia();

        if self.offset >= self.src.len() {
            let eof = Token::read(TokenKind::Eof, "", self.offset, self.line, self.col);
            self.emit(eof)?;
            return Ok(false);
        }

        if let Some(token) = self.match_punctuation() {
            self.emit(token)?;
        } else if let Some(token) = self.match_keyword() {
            self.emit(token)?;
        } else if let Some(token) = self.scan_name() {
            self.emit_then_advance(token)?;
        } else if let Some(token) = self.scan_number() {
            self.emit_then_advance(token)?;
        } else if self.src[self.offset..].starts_with('"') {
            let token = self.scan_string()?;
            self.emit_then_advance(token)?;
        } else {
            let c = self.src[self.offset..].chars().next().unwrap_or('\0');
            return Err(EdfError::lexical(
                self.offset,
                self.line,
                self.col,
                format!("unexpected character '{}'", c),
            ));
        }

        self.first_on_line = false;
        Ok(true)
    }

    fn emit_then_advance(&mut self, token: Token) -> Result<(), EdfError> {
        let len = token.len;
        let cols = token.text.chars().count() as u32;
        self.emit(token)?;
        self.offset += len;
        self.col += cols;
        Ok(())
    }

    fn match_punctuation(&mut self) -> Option<Token> {
        let kind = match self.src.as_bytes().get(self.offset)? {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semicolon,
            b'=' => TokenKind::Equals,
            _ => return None,
        };
        let token = Token::read(
            kind,
            &self.src[self.offset..self.offset + 1],
            self.offset,
            self.line,
            self.col,
        );
        self.offset += 1;
        self.col += 1;
        Some(token)
    }

    fn match_keyword(&mut self) -> Option<Token> {
        const KEYWORDS: [(&str, TokenKind); 2] =
            [("true", TokenKind::True), ("false", TokenKind::False)];
        let rest = &self.src[self.offset..];
        for (word, kind) in KEYWORDS {
            if !rest.starts_with(word) {
                continue;
            }
            // Keywords only match at a word boundary.
            if rest[word.len()..].chars().next().is_some_and(is_word_char) {
                continue;
            }
            let token = Token::read(kind, word, self.offset, self.line, self.col);
            self.offset += word.len();
            self.col += word.len() as u32;
            return Some(token);
        }
        None
    }

    /// `[a-z_][a-zA-Z0-9'_]*#?`
    fn scan_name(&self) -> Option<Token> {
        let rest = &self.src[self.offset..];
        let bytes = rest.as_bytes();
        if !matches!(bytes.first()?, b'a'..=b'z' | b'_') {
            return None;
        }
        let mut len = 1;
        while let Some(&b) = bytes.get(len) {
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'\'' {
                len += 1;
            } else {
                if b == b'#' {
                    len += 1;
                }
                break;
            }
        }
        Some(Token::read(
            TokenKind::Name,
            &rest[..len],
            self.offset,
            self.line,
            self.col,
        ))
    }

    /// `-?[1-9][0-9]*(\.[0-9]+)?#?` — note: no leading zero, so a lone
    /// `0` does not scan as a number.
    fn scan_number(&self) -> Option<Token> {
        let rest = &self.src[self.offset..];
        let bytes = rest.as_bytes();
        let mut len = 0;
        if bytes.first() == Some(&b'-') {
            len += 1;
        }
        match bytes.get(len) {
            Some(b'1'..=b'9') => len += 1,
            _ => return None,
        }
        while matches!(bytes.get(len), Some(b'0'..=b'9')) {
            len += 1;
        }
        if bytes.get(len) == Some(&b'.') && matches!(bytes.get(len + 1), Some(b'0'..=b'9')) {
            len += 2;
            while matches!(bytes.get(len), Some(b'0'..=b'9')) {
                len += 1;
            }
        }
        if bytes.get(len) == Some(&b'#') {
            len += 1;
        }
        Some(Token::read(
            TokenKind::Number,
            &rest[..len],
            self.offset,
            self.line,
            self.col,
        ))
    }

    /// Double-quoted, single-line; a backslash escapes the following
    /// character. The lexeme keeps its quotes and escapes; decoding
    /// happens at build time.
    fn scan_string(&self) -> Result<Token, EdfError> {
        let rest = &self.src[self.offset..];
        // A quote immediately followed by two more is reserved syntax.
        if rest.starts_with("\"\"\"") {
            return Err(EdfError::lexical(
                self.offset,
                self.line,
                self.col,
                "unexpected character '\"'",
            ));
        }
        let mut escaped = false;
        for (i, c) in rest.char_indices().skip(1) {
            if c == '\r' || c == '\n' {
                break;
            }
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                return Ok(Token::read(
                    TokenKind::Str,
                    &rest[..i + 1],
                    self.offset,
                    self.line,
                    self.col,
                ));
            }
        }
        Err(EdfError::lexical(
            self.offset,
            self.line,
            self.col,
            "unterminated string literal",
        ))
    }

    /// Place a token into the output, running delimiter balancing and
    /// then semicolon insertion. The end-of-input token drives final
    /// auto-closing and is itself discarded.
    fn emit(&mut self, token: Token) -> Result<(), EdfError> {
        if let Some(closer) = token.kind.closer() {
            self.open_delimiters.push(closer);
        } else if token.kind.is_closer() {
            if self.strict {
                match self.open_delimiters.last() {
                    Some(&expected) if expected == token.kind => {
                        self.open_delimiters.pop();
                    }
                    Some(&expected) => {
                        return Err(EdfError::lexical(
                            token.offset,
                            token.line,
                            token.col,
                            format!("mismatched delimiter: expected {}", expected),
                        ));
                    }
                    None => {
                        return Err(EdfError::lexical(
                            token.offset,
                            token.line,
                            token.col,
                            format!("unmatched {}", token.kind),
                        ));
                    }
                }
            } else {
                // Close everything open that doesn't match, then pop the
                // match itself. A closer that matches nothing is emitted
                // as-is and left to the parser to reject.
                while let Some(&expected) = self.open_delimiters.last() {
                    if expected == token.kind {
                        break;
                    }
                    self.open_delimiters.pop();
                    self.close_unmatched(expected);
                }
                if self.open_delimiters.last() == Some(&token.kind) {
                    self.open_delimiters.pop();
                }
            }
        } else if token.kind == TokenKind::Eof {
            while let Some(expected) = self.open_delimiters.pop() {
                self.close_unmatched(expected);
            }
        }

        match token.kind {
            TokenKind::LBrace => self.brace_blocks.push(None),
            TokenKind::RBrace => {
                if self.brace_blocks.pop().is_some() {
                    self.terminate_last_entry();
                }
            }
            _ if self.first_on_line
                && !matches!(self.tokens.last(), Some(last) if last.kind == TokenKind::RBrace) =>
            {
                if let Some(block) = self.brace_blocks.last_mut() {
                    match *block {
                        // The first item of a block sets its baseline.
                        None => *block = Some(token.col),
                        Some(indent) if token.col <= indent => {
                            let after_semicolon = matches!(
                                self.tokens.last(),
                                Some(last) if last.kind == TokenKind::Semicolon
                            );
                            if !after_semicolon {
                                self.tokens.push(Token::fabricate(
                                    TokenKind::Semicolon,
                                    self.offset,
                                    self.line,
                                    self.col,
                                    false,
                                ));
                            }
                        }
                        // Deeper indentation continues the previous line.
                        Some(_) => {}
                    }
                }
            }
            _ => {}
        }

        if token.kind != TokenKind::Eof {
            self.tokens.push(token);
        }
        Ok(())
    }

    /// Fabricate a closer for an unmatched opener. A synthesized brace
    /// takes the same path as one read from source: its brace-block
    /// record pops and the body's last entry gets its terminator.
    fn close_unmatched(&mut self, kind: TokenKind) {
        if kind == TokenKind::RBrace && self.brace_blocks.pop().is_some() {
            self.terminate_last_entry();
        }
        self.tokens
            .push(Token::fabricate(kind, self.offset, self.line, self.col, true));
    }

    /// Every block body ends in a semicolon-terminated entry; insert one
    /// unless the previous token already closes the entry.
    fn terminate_last_entry(&mut self) {
        let needs_semicolon = match self.tokens.last() {
            Some(last) => !matches!(
                last.kind,
                TokenKind::Semicolon | TokenKind::RBrace | TokenKind::LBrace
            ),
            None => false,
        };
        if needs_semicolon {
            self.tokens.push(Token::fabricate(
                TokenKind::Semicolon,
                self.offset,
                self.line,
                self.col,
                false,
            ));
        }
    }
}
