// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Recursive-descent expression parser with literal precomputation.
//!
//! Binary operations whose two sides are same-typed literals are folded
//! while parsing: `2+3*4+5` parses straight to `19`, and
//! `"a"+"b"` to `"ab"`. Mixed int/float operations and anything
//! referencing a binding stay as trees for the resolver to evaluate.

use crate::assembler::error::{AsmError, AsmErrorKind};
use crate::assembler::tokenizer::{unescape, Token, TokenKind};
use crate::core::location::FileLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOpKind {
    Plus,
    Minus,
    Times,
    Divide,
    Modulo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    NumLitInt(i64),
    NumLitFloat(f64),
    StringLit(String),
    ByteList(Vec<u8>),
    Binding(String),
    BinaryOp {
        kind: BinaryOpKind,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
}

/// The type of an evaluated expression, used to select the result type
/// of binary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalKind {
    Int,
    Float,
    Str,
    Bytes,
}

impl EvalKind {
    pub fn name(self) -> &'static str {
        match self {
            EvalKind::Int => "integer",
            EvalKind::Float => "float",
            EvalKind::Str => "string",
            EvalKind::Bytes => "byte list",
        }
    }
}

/// Parse a token slice as a single expression. Fails on trailing
/// tokens; `eol` locates errors raised when the tokens run out.
pub fn parse_expr(tokens: &[Token], eol: &FileLocation) -> Result<Expression, AsmError> {
    let mut parser = ExprParser {
        tokens,
        pos: 0,
        eol,
    };
    let expr = parser.parse_sum()?;
    if let Some(extra) = parser.peek() {
        return Err(AsmError::new(
            AsmErrorKind::UnexpectedToken,
            "unexpected token after expression",
            Some(&extra.to_string()),
        )
        .with_location(extra.location.clone()));
    }
    Ok(expr)
}

struct ExprParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    eol: &'a FileLocation,
}

impl<'a> ExprParser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn here(&self) -> FileLocation {
        self.peek()
            .map(|t| t.location.clone())
            .unwrap_or_else(|| self.eol.clone())
    }

    fn parse_sum(&mut self) -> Result<Expression, AsmError> {
        let mut lhs = self.parse_factor()?;
        while let Some(op) = self.peek().and_then(|t| match t.kind {
            TokenKind::Plus => Some(BinaryOpKind::Plus),
            TokenKind::Minus => Some(BinaryOpKind::Minus),
            _ => None,
        }) {
            let location = self.here();
            self.pos += 1;
            let rhs = self.parse_factor()?;
            lhs = combine(op, lhs, rhs, &location)?;
        }
        Ok(lhs)
    }

    fn parse_factor(&mut self) -> Result<Expression, AsmError> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = self.peek().and_then(|t| match t.kind {
            TokenKind::Asterisk => Some(BinaryOpKind::Times),
            TokenKind::Slash => Some(BinaryOpKind::Divide),
            TokenKind::Percent => Some(BinaryOpKind::Modulo),
            _ => None,
        }) {
            let location = self.here();
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = combine(op, lhs, rhs, &location)?;
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expression, AsmError> {
        if self.peek().is_some_and(|t| t.kind == TokenKind::Minus) {
            let location = self.here();
            self.pos += 1;
            return match self.parse_primary()? {
                Expression::NumLitInt(value) => Ok(Expression::NumLitInt(value.wrapping_neg())),
                Expression::NumLitFloat(value) => Ok(Expression::NumLitFloat(-value)),
                _ => Err(AsmError::new(
                    AsmErrorKind::UnsupportedOperation,
                    "unary '-' is only supported on numeric literals",
                    None,
                )
                .with_location(location)),
            };
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expression, AsmError> {
        let location = self.here();
        let Some(token) = self.next() else {
            return Err(AsmError::new(
                AsmErrorKind::UnexpectedToken,
                "expecting an expression",
                None,
            )
            .with_location(location));
        };
        match token.kind {
            TokenKind::OpenParen => {
                let inner = self.parse_sum()?;
                match self.next() {
                    Some(t) if t.kind == TokenKind::CloseParen => Ok(inner),
                    _ => Err(AsmError::new(
                        AsmErrorKind::UnexpectedToken,
                        "expecting ')'",
                        None,
                    )
                    .with_location(self.eol.clone())),
                }
            }
            TokenKind::NumLit => parse_number_literal(&token.text, &token.location),
            TokenKind::CharLit => parse_char_literal(&token.text, &token.location),
            TokenKind::StringLit => Ok(Expression::StringLit(token.text.clone())),
            TokenKind::Symbol => Ok(Expression::Binding(token.text.clone())),
            TokenKind::OpenBracket => self.parse_byte_list(),
            _ => Err(AsmError::new(
                AsmErrorKind::UnexpectedToken,
                "expecting an expression",
                Some(&token.to_string()),
            )
            .with_location(token.location.clone())),
        }
    }

    // A byte list is a comma-separated sequence of byte-valued
    // expressions; a string element splices its bytes in. Trailing
    // commas are allowed.
    fn parse_byte_list(&mut self) -> Result<Expression, AsmError> {
        let mut bytes = Vec::new();
        loop {
            if self.peek().is_some_and(|t| t.kind == TokenKind::CloseBracket) {
                self.pos += 1;
                return Ok(Expression::ByteList(bytes));
            }
            let location = self.here();
            match self.parse_sum()? {
                Expression::NumLitInt(value) if (0..=255).contains(&value) => {
                    bytes.push(value as u8);
                }
                Expression::StringLit(text) => bytes.extend_from_slice(text.as_bytes()),
                Expression::NumLitInt(value) => {
                    return Err(AsmError::new(
                        AsmErrorKind::TypeMismatch,
                        "byte list value out of range 0..=255",
                        Some(&value.to_string()),
                    )
                    .with_location(location));
                }
                _ => {
                    return Err(AsmError::new(
                        AsmErrorKind::TypeMismatch,
                        "byte list elements must be byte-sized integers or strings",
                        None,
                    )
                    .with_location(location));
                }
            }
            match self.next() {
                Some(t) if t.kind == TokenKind::Comma => {}
                Some(t) if t.kind == TokenKind::CloseBracket => {
                    return Ok(Expression::ByteList(bytes));
                }
                Some(t) => {
                    return Err(AsmError::new(
                        AsmErrorKind::UnexpectedToken,
                        "expecting ',' or ']' in byte list",
                        Some(&t.to_string()),
                    )
                    .with_location(t.location.clone()));
                }
                None => {
                    return Err(AsmError::new(
                        AsmErrorKind::UnexpectedToken,
                        "expecting ']'",
                        None,
                    )
                    .with_location(self.eol.clone()));
                }
            }
        }
    }
}

fn combine(
    op: BinaryOpKind,
    lhs: Expression,
    rhs: Expression,
    location: &FileLocation,
) -> Result<Expression, AsmError> {
    if literal_kind(&lhs).is_some() && literal_kind(&lhs) == literal_kind(&rhs) {
        return compute_op_with_same_type(lhs, rhs, op, location);
    }
    Ok(Expression::BinaryOp {
        kind: op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

fn literal_kind(expr: &Expression) -> Option<EvalKind> {
    match expr {
        Expression::NumLitInt(_) => Some(EvalKind::Int),
        Expression::NumLitFloat(_) => Some(EvalKind::Float),
        Expression::StringLit(_) => Some(EvalKind::Str),
        _ => None,
    }
}

/// Fold a binary operation over two literals of the same type.
fn compute_op_with_same_type(
    lhs: Expression,
    rhs: Expression,
    op: BinaryOpKind,
    location: &FileLocation,
) -> Result<Expression, AsmError> {
    match (lhs, rhs) {
        (Expression::NumLitInt(a), Expression::NumLitInt(b)) => {
            let value = match op {
                BinaryOpKind::Plus => a.wrapping_add(b),
                BinaryOpKind::Minus => a.wrapping_sub(b),
                BinaryOpKind::Times => a.wrapping_mul(b),
                BinaryOpKind::Divide | BinaryOpKind::Modulo => {
                    if b == 0 {
                        return Err(AsmError::new(
                            AsmErrorKind::DivideByZero,
                            "divide by zero",
                            None,
                        )
                        .with_location(location.clone()));
                    }
                    if op == BinaryOpKind::Divide {
                        a.wrapping_div(b)
                    } else {
                        a.wrapping_rem(b)
                    }
                }
            };
            Ok(Expression::NumLitInt(value))
        }
        (Expression::NumLitFloat(a), Expression::NumLitFloat(b)) => {
            let value = match op {
                BinaryOpKind::Plus => a + b,
                BinaryOpKind::Minus => a - b,
                BinaryOpKind::Times => a * b,
                BinaryOpKind::Divide => {
                    if b == 0.0 {
                        return Err(AsmError::new(
                            AsmErrorKind::DivideByZero,
                            "divide by zero",
                            None,
                        )
                        .with_location(location.clone()));
                    }
                    a / b
                }
                BinaryOpKind::Modulo => {
                    return Err(AsmError::new(
                        AsmErrorKind::UnsupportedOperation,
                        "unsupported '%' operation between floating point literals",
                        None,
                    )
                    .with_location(location.clone()));
                }
            };
            Ok(Expression::NumLitFloat(value))
        }
        (Expression::StringLit(a), Expression::StringLit(b)) => match op {
            BinaryOpKind::Plus => Ok(Expression::StringLit(a + &b)),
            _ => Err(AsmError::new(
                AsmErrorKind::UnsupportedOperation,
                "unsupported operations ['-', '*', '/', '%'] between string literals",
                None,
            )
            .with_location(location.clone())),
        },
        _ => unreachable!("folding is only attempted on same-typed literals"),
    }
}

/// Parse a number literal with prefix-dispatched base: `0x`/`0X` hex,
/// `0b`/`0B` binary, a `.` anywhere means float, anything else decimal.
fn parse_number_literal(text: &str, location: &FileLocation) -> Result<Expression, AsmError> {
    let malformed = || {
        AsmError::new(
            AsmErrorKind::UnexpectedToken,
            "malformed number literal",
            Some(text),
        )
        .with_location(location.clone())
    };

    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        let value = u64::from_str_radix(hex, 16).map_err(|_| malformed())?;
        return Ok(Expression::NumLitInt(value as i64));
    }
    if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        let value = u64::from_str_radix(bin, 2).map_err(|_| malformed())?;
        return Ok(Expression::NumLitInt(value as i64));
    }
    if text.contains('.') {
        let value: f64 = text.parse().map_err(|_| malformed())?;
        return Ok(Expression::NumLitFloat(value));
    }
    let value: i64 = text.parse().map_err(|_| malformed())?;
    Ok(Expression::NumLitInt(value))
}

fn parse_char_literal(raw: &str, location: &FileLocation) -> Result<Expression, AsmError> {
    let text = unescape(raw).map_err(|msg| {
        AsmError::new(AsmErrorKind::Lex, "error parsing char literal", Some(&msg))
            .with_location(location.clone())
    })?;
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Expression::NumLitInt(c as i64)),
        _ => Err(AsmError::new(
            AsmErrorKind::UnexpectedToken,
            "char literal must contain exactly one character",
            Some(raw),
        )
        .with_location(location.clone())),
    }
}
