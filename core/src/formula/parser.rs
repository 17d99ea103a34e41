//! Parser for formula source text.
//!
//! Supports:
//! - Numbers (integers, floats, scientific notation)
//! - Argument names (`a`, `width`, `x_1`)
//! - Arithmetic operators (+, -, *, /, ^)
//! - Parentheses for grouping
//! - Function calls with one or more comma separated arguments
//! - Built-in constants (PI, E)

use super::FormulaError;
use std::iter::Peekable;
use std::str::Chars;

/// Formula AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// Reference to a named formula argument
    Name(String),
    /// Built-in constant (PI, E)
    Constant(String),
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    FnCall {
        name: String,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOperator {
    Neg,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
    Eof,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    position: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            position: 0,
        }
    }

    fn next_token(&mut self) -> Result<Token, FormulaError> {
        self.skip_whitespace();

        let pos = self.position;
        let Some(&c) = self.chars.peek() else {
            return Ok(Token::Eof);
        };

        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '^' => Some(Token::Caret),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            ',' => Some(Token::Comma),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        if c.is_ascii_digit() || c == '.' {
            self.read_number()
        } else if c.is_ascii_alphabetic() || c == '_' {
            Ok(Token::Identifier(self.read_identifier()))
        } else {
            Err(FormulaError::Parse {
                message: format!("Unexpected character: '{}'", c),
                position: pos,
            })
        }
    }

    fn advance(&mut self) -> Option<char> {
        self.position += 1;
        self.chars.next()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    fn take_digits(&mut self, out: &mut String) {
        while let Some(&c) = self.chars.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            out.push(c);
            self.advance();
        }
    }

    fn read_number(&mut self) -> Result<Token, FormulaError> {
        let pos = self.position;
        let mut num_str = String::new();

        self.take_digits(&mut num_str);
        if self.chars.peek() == Some(&'.') {
            num_str.push('.');
            self.advance();
            self.take_digits(&mut num_str);
        }

        // Scientific notation (1e10, 1.5e-3)
        if matches!(self.chars.peek(), Some('e') | Some('E')) {
            num_str.push('e');
            self.advance();
            if let Some(&sign) = self.chars.peek() {
                if sign == '+' || sign == '-' {
                    num_str.push(sign);
                    self.advance();
                }
            }
            self.take_digits(&mut num_str);
        }

        num_str.parse::<f64>().map(Token::Number).map_err(|_| FormulaError::Parse {
            message: format!("Invalid number: '{}'", num_str),
            position: pos,
        })
    }

    fn read_identifier(&mut self) -> String {
        let mut name = String::new();
        while let Some(&c) = self.chars.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            name.push(c);
            self.advance();
        }
        name
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Result<Self, FormulaError> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    fn advance(&mut self) -> Result<(), FormulaError> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> FormulaError {
        FormulaError::Parse {
            message: message.into(),
            position: self.lexer.position,
        }
    }

    fn expect(&mut self, token: Token, message: &str) -> Result<(), FormulaError> {
        if self.current != token {
            return Err(self.error(message));
        }
        self.advance()
    }

    fn parse(&mut self) -> Result<Expr, FormulaError> {
        let expr = self.parse_additive()?;
        if self.current != Token::Eof {
            return Err(self.error(format!("Unexpected token after expression: {:?}", self.current)));
        }
        Ok(expr)
    }

    // Additive: term (('+' | '-') term)*
    fn parse_additive(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = Expr::BinaryOp { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    // Multiplicative: power (('*' | '/') power)*
    fn parse_multiplicative(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.parse_power()?;
        loop {
            let op = match self.current {
                Token::Star => BinaryOperator::Mul,
                Token::Slash => BinaryOperator::Div,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_power()?;
            left = Expr::BinaryOp { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    // Power: unary ('^' power)?  (right associative)
    fn parse_power(&mut self) -> Result<Expr, FormulaError> {
        let base = self.parse_unary()?;
        if self.current != Token::Caret {
            return Ok(base);
        }
        self.advance()?;
        let exp = self.parse_power()?;
        Ok(Expr::BinaryOp { op: BinaryOperator::Pow, left: Box::new(base), right: Box::new(exp) })
    }

    // Unary: '-' unary | primary
    fn parse_unary(&mut self) -> Result<Expr, FormulaError> {
        if self.current == Token::Minus {
            self.advance()?;
            let operand = self.parse_unary()?;
            return Ok(Expr::UnaryOp { op: UnaryOperator::Neg, operand: Box::new(operand) });
        }
        self.parse_primary()
    }

    // Primary: number | name | constant | call | '(' expr ')'
    fn parse_primary(&mut self) -> Result<Expr, FormulaError> {
        match self.current.clone() {
            Token::Number(n) => {
                self.advance()?;
                Ok(Expr::Number(n))
            }
            Token::Identifier(name) => {
                self.advance()?;
                if self.current == Token::LParen {
                    self.advance()?;
                    let args = self.parse_call_args()?;
                    return Ok(Expr::FnCall { name, args });
                }
                match name.as_str() {
                    "PI" | "pi" => Ok(Expr::Constant("PI".to_string())),
                    "E" => Ok(Expr::Constant("E".to_string())),
                    _ => Ok(Expr::Name(name)),
                }
            }
            Token::LParen => {
                self.advance()?;
                let expr = self.parse_additive()?;
                self.expect(Token::RParen, "Expected ')'")?;
                Ok(expr)
            }
            other => Err(self.error(format!("Unexpected token: {:?}", other))),
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, FormulaError> {
        let mut args = vec![self.parse_additive()?];
        while self.current == Token::Comma {
            self.advance()?;
            args.push(self.parse_additive()?);
        }
        self.expect(Token::RParen, "Expected ')' after function arguments")?;
        Ok(args)
    }
}

/// Parse formula source into an AST.
pub fn parse_formula(input: &str) -> Result<Expr, FormulaError> {
    if input.trim().is_empty() {
        return Err(FormulaError::Parse {
            message: "Empty formula".to_string(),
            position: 0,
        });
    }
    Parser::new(input)?.parse()
}
