use serde_json::json;
use thiserror::Error;

/// Any failure the pipeline or its consumers can produce.
///
/// Lexical, parse, and build errors carry 1-based line/column positions
/// for caret-style diagnostics; lexical errors also carry the byte offset
/// of the offending character. The recovery tokens the lexer fabricates
/// are not errors in this sense -- they travel in-band as flagged tokens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EdfError {
    /// Unrecognized character, unterminated string literal, or a
    /// delimiter mismatch in strict mode. Fatal, no recovery.
    #[error("lexical error at {line}:{col}: {message}")]
    Lexical {
        offset: usize,
        line: u32,
        col: u32,
        message: String,
    },

    /// A (state, token) pair with no defined transition, or input that
    /// ended mid-construct.
    #[error("parse error at {line}:{col}: {message}")]
    Parse { line: u32, col: u32, message: String },

    /// A structural invariant failed while reducing nodes into blocks.
    #[error("build error at {line}:{col}: {message}")]
    Build { line: u32, col: u32, message: String },

    /// A schema document that does not describe a valid schema.
    #[error("schema error: {message}")]
    Schema { message: String },

    /// A document that does not conform to its schema.
    #[error("datafy error: {message}")]
    Datafy { message: String },
}

impl EdfError {
    pub fn lexical(offset: usize, line: u32, col: u32, message: impl Into<String>) -> Self {
        EdfError::Lexical {
            offset,
            line,
            col,
            message: message.into(),
        }
    }

    pub fn parse(line: u32, col: u32, message: impl Into<String>) -> Self {
        EdfError::Parse {
            line,
            col,
            message: message.into(),
        }
    }

    pub fn build(line: u32, col: u32, message: impl Into<String>) -> Self {
        EdfError::Build {
            line,
            col,
            message: message.into(),
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        EdfError::Schema {
            message: message.into(),
        }
    }

    pub fn datafy(message: impl Into<String>) -> Self {
        EdfError::Datafy {
            message: message.into(),
        }
    }

    /// Serialize to a flat JSON object for machine consumption. Position
    /// fields are null for the error kinds that have no position.
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            EdfError::Lexical {
                offset,
                line,
                col,
                message,
            } => json!({
                "error":   "lexical",
                "offset":  offset,
                "line":    line,
                "col":     col,
                "message": message,
            }),
            EdfError::Parse { line, col, message } => json!({
                "error":   "parse",
                "offset":  null,
                "line":    line,
                "col":     col,
                "message": message,
            }),
            EdfError::Build { line, col, message } => json!({
                "error":   "build",
                "offset":  null,
                "line":    line,
                "col":     col,
                "message": message,
            }),
            EdfError::Schema { message } => json!({
                "error":   "schema",
                "offset":  null,
                "line":    null,
                "col":     null,
                "message": message,
            }),
            EdfError::Datafy { message } => json!({
                "error":   "datafy",
                "offset":  null,
                "line":    null,
                "col":     null,
                "message": message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_position() {
        let err = EdfError::lexical(5, 2, 3, "unexpected character '?'");
        assert_eq!(
            err.to_string(),
            "lexical error at 2:3: unexpected character '?'"
        );
    }

    #[test]
    fn json_value_is_flat() {
        let err = EdfError::parse(1, 4, "unexpected ';' in document");
        let value = err.to_json_value();
        assert_eq!(value["error"], "parse");
        assert_eq!(value["line"], 1);
        assert_eq!(value["col"], 4);
        assert!(value["offset"].is_null());
    }
}
