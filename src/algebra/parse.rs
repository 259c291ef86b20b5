//! Textual constraint parser.
//!
//! Accepts the notation used by the contract templates:
//!
//! ```text
//! 0 <= duration_dsn1
//! 2*duration_dsn1 <= soc1_entry - soc1_exit <= 2.5*duration_dsn1
//! soc1_exit = soc1_entry
//! |r1_exit - r1_entry| <= 0
//! ```
//!
//! # Grammar
//!
//! ```text
//! constraint := side (relop side)+
//! relop      := "<=" | ">=" | "=" | "=="
//! side       := "|" expr "|" | expr
//! expr       := term (("+" | "-") term)*
//! term       := unary (("*" | "/") unary)*
//! unary      := ("+" | "-") unary | atom
//! atom       := number | identifier | "(" expr ")"
//! ```
//!
//! A chain `a <= b <= c` yields one constraint per adjacent pair. Products
//! of two non-constant expressions, and division by a non-constant, are
//! rejected as non-linear. An absolute value is only accepted on the
//! smaller side of `<=` (or the larger side of `>=`).

use super::linear::{Constraint, LinearExpr, Relation};
use crate::error::ContractError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Pipe,
    Le,
    Ge,
    Eq,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RelOp {
    Le,
    Ge,
    Eq,
}

enum Side {
    Plain(LinearExpr),
    Abs(LinearExpr),
}

/// Parses one textual constraint into one or more normalized constraints.
pub fn parse_constraint(text: &str) -> Result<Vec<Constraint>, ContractError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        text,
    };

    let mut sides = vec![parser.side()?];
    let mut ops = Vec::new();
    while let Some(op) = parser.relop() {
        ops.push(op);
        sides.push(parser.side()?);
    }
    if parser.pos != tokens.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    if ops.is_empty() {
        return Err(parser.error("missing relational operator"));
    }

    let mut constraints = Vec::new();
    for (i, op) in ops.iter().enumerate() {
        relate(&sides[i], *op, &sides[i + 1], text, &mut constraints)?;
    }
    Ok(constraints)
}

/// Parses every string and concatenates the results.
pub fn parse_constraints<S: AsRef<str>>(texts: &[S]) -> Result<Vec<Constraint>, ContractError> {
    let mut all = Vec::new();
    for text in texts {
        all.extend(parse_constraint(text.as_ref())?);
    }
    Ok(all)
}

fn relate(
    left: &Side,
    op: RelOp,
    right: &Side,
    text: &str,
    out: &mut Vec<Constraint>,
) -> Result<(), ContractError> {
    let (small, large, relation) = match op {
        RelOp::Le => (left, right, Relation::LessEq),
        RelOp::Ge => (right, left, Relation::LessEq),
        RelOp::Eq => (left, right, Relation::Equal),
    };
    match (small, large, relation) {
        (Side::Plain(a), Side::Plain(b), _) => {
            let mut diff = a.clone();
            diff.add_scaled(b, -1.0);
            out.push(Constraint::from_expr(diff, relation));
        }
        (Side::Abs(a), Side::Plain(b), Relation::LessEq) => {
            // |a| <= b  <=>  a - b <= 0  and  -a - b <= 0
            let mut upper = a.clone();
            upper.add_scaled(b, -1.0);
            let mut lower = a.clone();
            lower.scale(-1.0);
            lower.add_scaled(b, -1.0);
            out.push(Constraint::from_expr(upper, Relation::LessEq));
            out.push(Constraint::from_expr(lower, Relation::LessEq));
        }
        _ => {
            return Err(ContractError::malformed(format!(
                "absolute value is only supported as |e| <= f in '{text}'"
            )))
        }
    }
    Ok(())
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    text: &'a str,
}

impl Parser<'_> {
    fn error(&self, what: &str) -> ContractError {
        ContractError::malformed(format!("{what} at token {} in '{}'", self.pos, self.text))
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn relop(&mut self) -> Option<RelOp> {
        let op = match self.peek()? {
            Token::Le => RelOp::Le,
            Token::Ge => RelOp::Ge,
            Token::Eq => RelOp::Eq,
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    fn side(&mut self) -> Result<Side, ContractError> {
        if self.eat(&Token::Pipe) {
            let inner = self.expr()?;
            if !self.eat(&Token::Pipe) {
                return Err(self.error("unterminated absolute value"));
            }
            Ok(Side::Abs(inner))
        } else {
            Ok(Side::Plain(self.expr()?))
        }
    }

    fn expr(&mut self) -> Result<LinearExpr, ContractError> {
        let mut acc = self.term()?;
        loop {
            if self.eat(&Token::Plus) {
                let rhs = self.term()?;
                acc.add_scaled(&rhs, 1.0);
            } else if self.eat(&Token::Minus) {
                let rhs = self.term()?;
                acc.add_scaled(&rhs, -1.0);
            } else {
                return Ok(acc);
            }
        }
    }

    fn term(&mut self) -> Result<LinearExpr, ContractError> {
        let mut acc = self.unary()?;
        loop {
            if self.eat(&Token::Star) {
                let rhs = self.unary()?;
                acc = if acc.is_constant() {
                    let mut scaled = rhs;
                    scaled.scale(acc.constant);
                    scaled
                } else if rhs.is_constant() {
                    acc.scale(rhs.constant);
                    acc
                } else {
                    return Err(self.error("non-linear product"));
                };
            } else if self.eat(&Token::Slash) {
                let rhs = self.unary()?;
                if !rhs.is_constant() {
                    return Err(self.error("non-linear division"));
                }
                if rhs.constant == 0.0 {
                    return Err(self.error("division by zero"));
                }
                acc.scale(1.0 / rhs.constant);
            } else {
                return Ok(acc);
            }
        }
    }

    fn unary(&mut self) -> Result<LinearExpr, ContractError> {
        if self.eat(&Token::Minus) {
            let mut inner = self.unary()?;
            inner.scale(-1.0);
            Ok(inner)
        } else if self.eat(&Token::Plus) {
            self.unary()
        } else {
            self.atom()
        }
    }

    fn atom(&mut self) -> Result<LinearExpr, ContractError> {
        match self.peek().cloned() {
            Some(Token::Number(value)) => {
                self.pos += 1;
                Ok(LinearExpr::constant(value))
            }
            Some(Token::Ident(name)) => {
                self.pos += 1;
                Ok(LinearExpr::var(name))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.expr()?;
                if !self.eat(&Token::RParen) {
                    return Err(self.error("expected ')'"));
                }
                Ok(inner)
            }
            _ => Err(self.error("expected a number, variable or '('")),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, ContractError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        match ch {
            c if c.is_whitespace() => i += 1,
            '+' => push(&mut tokens, &mut i, Token::Plus, 1),
            '-' => push(&mut tokens, &mut i, Token::Minus, 1),
            '*' => push(&mut tokens, &mut i, Token::Star, 1),
            '/' => push(&mut tokens, &mut i, Token::Slash, 1),
            '(' => push(&mut tokens, &mut i, Token::LParen, 1),
            ')' => push(&mut tokens, &mut i, Token::RParen, 1),
            '|' => push(&mut tokens, &mut i, Token::Pipe, 1),
            '<' if chars.get(i + 1) == Some(&'=') => push(&mut tokens, &mut i, Token::Le, 2),
            '>' if chars.get(i + 1) == Some(&'=') => push(&mut tokens, &mut i, Token::Ge, 2),
            '=' if chars.get(i + 1) == Some(&'=') => push(&mut tokens, &mut i, Token::Eq, 2),
            '=' => push(&mut tokens, &mut i, Token::Eq, 1),
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // optional exponent: 1e-7, 2.5E3
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal.parse::<f64>().map_err(|_| {
                    ContractError::malformed(format!("invalid number '{literal}' in '{text}'"))
                })?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => {
                return Err(ContractError::malformed(format!(
                    "unexpected character '{other}' in '{text}'"
                )))
            }
        }
    }
    Ok(tokens)
}

fn push(tokens: &mut Vec<Token>, i: &mut usize, token: Token, width: usize) {
    tokens.push(token);
    *i += width;
}
