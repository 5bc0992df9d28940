//! Strategy DSL parser.
//!
//! Recursive descent parser for the s-expression strategy grammar. Converts
//! text to AST with meaningful error messages including character offset.
//!
//! Grammar:
//! - `( … )` operator call or plain list
//! - `[ … ]` vector
//! - `{ :key value … }` parameter map
//! - `"…"` string literal (supports `\"`, `\\`, `\n`, `\t`)
//! - decimal numbers, optionally signed
//! - bare symbols (operator names, tickers)
//! - `;` line comments

use crate::domain::ast::AstNode;
use crate::domain::error::ParseError;
use rust_decimal::Decimal;

/// Parse a complete strategy expression; trailing non-whitespace is an error.
pub fn parse_strategy(input: &str) -> Result<AstNode, ParseError> {
    let mut parser = Parser::new(input);
    let ast = parser.parse_expr()?;
    parser.skip_whitespace();
    if let Some(ch) = parser.peek() {
        return Err(ParseError {
            message: format!("unexpected trailing input starting at '{}'", ch),
            position: parser.pos,
        });
    }
    Ok(ast)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Skips whitespace, commas (treated as whitespace) and `;` comments.
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || ch == ',' {
                self.advance();
            } else if ch == ';' {
                while let Some(ch) = self.peek() {
                    if ch == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(ParseError {
                message: format!("expected '{}', found '{}'", expected, ch),
                position: self.pos,
            }),
            None => Err(ParseError {
                message: format!("expected '{}', found end of input", expected),
                position: self.pos,
            }),
        }
    }

    fn parse_expr(&mut self) -> Result<AstNode, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some('(') => self.parse_list(),
            Some('[') => self.parse_vector(),
            Some('{') => self.parse_map(),
            Some('"') => self.parse_string().map(AstNode::Str),
            Some(ch) if ch.is_ascii_digit() || ch == '-' => self.parse_number(),
            Some(_) => self.parse_symbol().map(AstNode::Symbol),
            None => Err(ParseError {
                message: "expected expression, found end of input".to_string(),
                position: self.pos,
            }),
        }
    }

    fn parse_list(&mut self) -> Result<AstNode, ParseError> {
        self.expect_char('(')?;
        let mut children = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(')') => {
                    self.advance();
                    return Ok(AstNode::List(children));
                }
                Some(_) => children.push(self.parse_expr()?),
                None => {
                    return Err(ParseError {
                        message: "unclosed '(', found end of input".to_string(),
                        position: self.pos,
                    });
                }
            }
        }
    }

    fn parse_vector(&mut self) -> Result<AstNode, ParseError> {
        self.expect_char('[')?;
        let mut children = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(']') => {
                    self.advance();
                    return Ok(AstNode::Vector(children));
                }
                Some(_) => children.push(self.parse_expr()?),
                None => {
                    return Err(ParseError {
                        message: "unclosed '[', found end of input".to_string(),
                        position: self.pos,
                    });
                }
            }
        }
    }

    fn parse_map(&mut self) -> Result<AstNode, ParseError> {
        self.expect_char('{')?;
        let mut pairs = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('}') => {
                    self.advance();
                    return Ok(AstNode::Map(pairs));
                }
                Some(':') => {
                    self.advance();
                    let key = self.parse_symbol()?;
                    let value = self.parse_expr()?;
                    pairs.push((key, value));
                }
                Some(ch) => {
                    return Err(ParseError {
                        message: format!("expected ':key' or '}}' in map, found '{}'", ch),
                        position: self.pos,
                    });
                }
                None => {
                    return Err(ParseError {
                        message: "unclosed '{', found end of input".to_string(),
                        position: self.pos,
                    });
                }
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.expect_char('"')?;
        let mut value = String::new();
        loop {
            match self.advance() {
                Some('"') => return Ok(value),
                Some('\\') => match self.advance() {
                    Some('"') => value.push('"'),
                    Some('\\') => value.push('\\'),
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(ch) => {
                        return Err(ParseError {
                            message: format!("unsupported escape '\\{}'", ch),
                            position: self.pos,
                        });
                    }
                    None => {
                        return Err(ParseError {
                            message: "unterminated string".to_string(),
                            position: start,
                        });
                    }
                },
                Some(ch) => value.push(ch),
                None => {
                    return Err(ParseError {
                        message: "unterminated string".to_string(),
                        position: start,
                    });
                }
            }
        }
    }

    fn parse_number(&mut self) -> Result<AstNode, ParseError> {
        let start = self.pos;
        let mut digits = 0;
        let mut has_dot = false;

        if self.peek() == Some('-') {
            self.advance();
        }
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.input[start..self.pos];
        if digits == 0 {
            // A lone '-' begins a symbol, not a number.
            self.pos = start;
            return self.parse_symbol().map(AstNode::Symbol);
        }
        text.parse::<Decimal>()
            .map(AstNode::Number)
            .map_err(|_| ParseError {
                message: format!("invalid number: {}", text),
                position: start,
            })
    }

    fn parse_symbol(&mut self) -> Result<String, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || matches!(ch, '(' | ')' | '[' | ']' | '{' | '}' | '"' | ';' | ',' | ':') {
                break;
            }
            self.advance();
        }
        if self.pos == start {
            return Err(ParseError {
                message: "expected symbol".to_string(),
                position: start,
            });
        }
        Ok(self.input[start..self.pos].to_string())
    }
}
