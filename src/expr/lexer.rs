use super::errors::{ParseError, ParseResult};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Eof,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Number(v) => v.to_string(),
            TokenKind::Plus => "+".into(),
            TokenKind::Minus => "-".into(),
            TokenKind::Star => "*".into(),
            TokenKind::Slash => "/".into(),
            TokenKind::LParen => "(".into(),
            TokenKind::RParen => ")".into(),
            TokenKind::Eof => "end of input".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// byte offset into the source
    pub position: usize,
}

pub struct Lexer<'a> {
    source: &'a str,
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            input: source.as_bytes(),
            pos: 0,
        }
    }

    /// Tokenizes the whole input; the last token is always `Eof`.
    pub fn tokenize(mut self) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn next_token(&mut self) -> ParseResult<Token> {
        self.skip_whitespace();
        let position = self.pos;
        let Some(byte) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                position,
            });
        };

        if byte.is_ascii_digit() || byte == b'.' {
            return self.scan_number();
        }

        let kind = match byte {
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            _ => {
                // report the full character, not a UTF-8 fragment
                let ch = self.source[position..].chars().next().unwrap_or('\u{FFFD}');
                return Err(ParseError::InvalidCharacter { ch, position });
            }
        };
        self.pos += 1;
        Ok(Token { kind, position })
    }

    /// `digits [. digits]`, `. digits` or `digits .`
    fn scan_number(&mut self) -> ParseResult<Token> {
        let start = self.pos;
        let mut seen_dot = false;
        let mut seen_digit = false;
        while let Some(byte) = self.peek() {
            match byte {
                b'0'..=b'9' => seen_digit = true,
                b'.' if !seen_dot => seen_dot = true,
                b'.' => {
                    // second dot: swallow the rest of the literal for the message
                    while matches!(self.peek(), Some(b'0'..=b'9' | b'.')) {
                        self.pos += 1;
                    }
                    return Err(ParseError::InvalidNumber {
                        text: self.source[start..self.pos].to_string(),
                        position: start,
                    });
                }
                _ => break,
            }
            self.pos += 1;
        }

        let text = &self.source[start..self.pos];
        let invalid = || ParseError::InvalidNumber {
            text: text.to_string(),
            position: start,
        };
        if !seen_digit {
            return Err(invalid());
        }
        let value: f64 = text.parse().map_err(|_| invalid())?;
        if !value.is_finite() {
            return Err(invalid());
        }
        Ok(Token {
            kind: TokenKind::Number(value),
            position: start,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_operators_and_numbers() {
        assert_eq!(
            kinds(" 2+3.5 *(.5- 5.) / 7"),
            vec![
                TokenKind::Number(2.0),
                TokenKind::Plus,
                TokenKind::Number(3.5),
                TokenKind::Star,
                TokenKind::LParen,
                TokenKind::Number(0.5),
                TokenKind::Minus,
                TokenKind::Number(5.0),
                TokenKind::RParen,
                TokenKind::Slash,
                TokenKind::Number(7.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn records_byte_positions() {
        let tokens = Lexer::new("  12 *  3").tokenize().unwrap();
        let positions: Vec<usize> = tokens.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![2, 5, 8, 9]);
    }

    #[test]
    fn rejects_unknown_characters() {
        for (source, ch, position) in [("2^3", '^', 1), ("4 % 2", '%', 2), ("sin(1)", 's', 0)] {
            assert_eq!(
                Lexer::new(source).tokenize(),
                Err(ParseError::InvalidCharacter { ch, position })
            );
        }
        assert_eq!(
            Lexer::new("1 + é").tokenize(),
            Err(ParseError::InvalidCharacter {
                ch: 'é',
                position: 4
            })
        );
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert_eq!(
            Lexer::new("1.2.3 + 1").tokenize(),
            Err(ParseError::InvalidNumber {
                text: "1.2.3".into(),
                position: 0
            })
        );
        assert!(matches!(
            Lexer::new("2 * .").tokenize(),
            Err(ParseError::InvalidNumber { position: 4, .. })
        ));
        let huge = "9".repeat(400);
        assert!(matches!(
            Lexer::new(&huge).tokenize(),
            Err(ParseError::InvalidNumber { .. })
        ));
    }
}
