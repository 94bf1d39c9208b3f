use thiserror::Error;

/// Syntax errors. Every variant carries the byte offset of the offending token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty expression")]
    Empty,

    #[error("Invalid character '{ch}' at position {position}")]
    InvalidCharacter { ch: char, position: usize },

    #[error("Malformed number '{text}' at position {position}")]
    InvalidNumber { text: String, position: usize },

    #[error("Expected a number or '(' at position {position}, found '{found}'")]
    ExpectedOperand { found: String, position: usize },

    #[error("Operator at position {position} has no right operand")]
    MissingOperand { position: usize },

    #[error("Expected an operator at position {position}")]
    ExpectedOperator { position: usize },

    #[error("Parenthesis opened at position {position} is never closed")]
    UnclosedParenthesis { position: usize },

    #[error("Unmatched ')' at position {position}")]
    UnmatchedParenthesis { position: usize },

    #[error("Unary operator at position {position} must be followed by a number")]
    UnaryOperator { position: usize },

    #[error("Parentheses nested deeper than {limit} at position {position}")]
    NestingTooDeep { limit: usize, position: usize },

    #[error("More than {limit} operators (position {position})")]
    TooManyOperators { limit: usize, position: usize },
}

impl ParseError {
    /// Byte offset of the error, if it refers to a token.
    pub fn position(&self) -> Option<usize> {
        match self {
            ParseError::Empty => None,
            ParseError::InvalidCharacter { position, .. }
            | ParseError::InvalidNumber { position, .. }
            | ParseError::ExpectedOperand { position, .. }
            | ParseError::MissingOperand { position }
            | ParseError::ExpectedOperator { position }
            | ParseError::UnclosedParenthesis { position }
            | ParseError::UnmatchedParenthesis { position }
            | ParseError::UnaryOperator { position }
            | ParseError::NestingTooDeep { position, .. }
            | ParseError::TooManyOperators { position, .. } => Some(*position),
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
