//! Recursive-descent parser with BODMAS precedence.
//!
//! ```text
//! expression := term (('+' | '-') term)*
//! term       := factor (('*' | '/') factor)*
//! factor     := NUMBER | '-' NUMBER | '(' expression ')'
//! ```
//!
//! Both binary levels are left associative. A `-` in operand position is
//! accepted only as the sign of the literal that follows it.

use super::ast::{ExpressionNode, Operator};
use super::errors::{ParseError, ParseResult};
use super::lexer::{Lexer, Token, TokenKind};
use serde::{Deserialize, Serialize};

/// Bounds on adversarial input. Nesting depth also bounds parser recursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseLimits {
    pub max_depth: usize,
    pub max_operators: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_operators: 256,
        }
    }
}

pub fn parse(text: &str) -> ParseResult<ExpressionNode> {
    parse_with_limits(text, ParseLimits::default())
}

pub fn parse_with_limits(text: &str, limits: ParseLimits) -> ParseResult<ExpressionNode> {
    let tokens = Lexer::new(text).tokenize()?;
    if tokens.len() == 1 {
        return Err(ParseError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        operators: 0,
        limits,
    };
    let tree = parser.parse_expression()?;
    let trailing = parser.current();
    match trailing.kind {
        TokenKind::Eof => Ok(tree),
        TokenKind::RParen => Err(ParseError::UnmatchedParenthesis {
            position: trailing.position,
        }),
        _ => Err(ParseError::ExpectedOperator {
            position: trailing.position,
        }),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    operators: usize,
    limits: ParseLimits,
}

impl Parser {
    fn current(&self) -> &Token {
        // the token stream always ends with Eof and the parser never moves past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self, offset: usize) -> &TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn count_operator(&mut self, position: usize) -> ParseResult<()> {
        self.operators += 1;
        if self.operators > self.limits.max_operators {
            return Err(ParseError::TooManyOperators {
                limit: self.limits.max_operators,
                position,
            });
        }
        Ok(())
    }

    fn parse_expression(&mut self) -> ParseResult<ExpressionNode> {
        let mut left = self.parse_term()?;
        loop {
            let operator = match self.current().kind {
                TokenKind::Plus => Operator::Add,
                TokenKind::Minus => Operator::Sub,
                _ => return Ok(left),
            };
            let token = self.advance();
            self.count_operator(token.position)?;
            let right = self.parse_operand(token.position, Self::parse_term)?;
            left = ExpressionNode::binary(operator, left, right);
        }
    }

    fn parse_term(&mut self) -> ParseResult<ExpressionNode> {
        let mut left = self.parse_factor()?;
        loop {
            let operator = match self.current().kind {
                TokenKind::Star => Operator::Mul,
                TokenKind::Slash => Operator::Div,
                _ => return Ok(left),
            };
            let token = self.advance();
            self.count_operator(token.position)?;
            let right = self.parse_operand(token.position, Self::parse_factor)?;
            left = ExpressionNode::binary(operator, left, right);
        }
    }

    /// Right operand of the operator at `operator_position`.
    fn parse_operand(
        &mut self,
        operator_position: usize,
        rule: fn(&mut Self) -> ParseResult<ExpressionNode>,
    ) -> ParseResult<ExpressionNode> {
        if self.current().kind == TokenKind::Eof {
            return Err(ParseError::MissingOperand {
                position: operator_position,
            });
        }
        rule(self)
    }

    fn parse_factor(&mut self) -> ParseResult<ExpressionNode> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(value) => Ok(ExpressionNode::Literal(value)),
            TokenKind::Minus => match self.peek_kind(0).clone() {
                TokenKind::Number(value) => {
                    self.advance();
                    Ok(ExpressionNode::Literal(-value))
                }
                _ => Err(ParseError::UnaryOperator {
                    position: token.position,
                }),
            },
            TokenKind::LParen => {
                self.depth += 1;
                if self.depth > self.limits.max_depth {
                    return Err(ParseError::NestingTooDeep {
                        limit: self.limits.max_depth,
                        position: token.position,
                    });
                }
                let inner = self.parse_expression()?;
                let closing = self.advance();
                match closing.kind {
                    TokenKind::RParen => {
                        self.depth -= 1;
                        Ok(inner)
                    }
                    TokenKind::Eof => Err(ParseError::UnclosedParenthesis {
                        position: token.position,
                    }),
                    _ => Err(ParseError::ExpectedOperator {
                        position: closing.position,
                    }),
                }
            }
            TokenKind::Eof => Err(ParseError::MissingOperand {
                position: token.position,
            }),
            other => Err(ParseError::ExpectedOperand {
                found: other.describe(),
                position: token.position,
            }),
        }
    }
}
