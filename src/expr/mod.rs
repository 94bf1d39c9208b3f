//! Arithmetic expressions: tokens, syntax tree and parser.

pub mod ast;
pub mod errors;
pub mod lexer;
pub mod parser;

pub use ast::{ExpressionNode, Operator};
pub use errors::{ParseError, ParseResult};
pub use parser::{ParseLimits, parse, parse_with_limits};
