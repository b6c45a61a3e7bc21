// lang/src/parser.rs
use std::f64::consts::PI;
use std::fmt;

use danmaku_core::Value;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::builtins::{find_function, IF_NAME, PI_NAME};
use crate::lexer::{Span, Token, TokenKind};

/// Deepest tree the parser builds. Evaluation recurses once per level.
pub const MAX_NESTING: usize = 128;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Whole-input expression; anything left over is an error.
    pub fn parse_complete(&mut self) -> Result<Expr, SyntaxError> {
        if self.is_at_end() {
            return Err(self.error("empty expression"));
        }
        let expr = self.parse_expr()?;
        if self.check(&TokenKind::RParen) {
            return Err(self.error("unmatched ')'"));
        }
        if !self.is_at_end() {
            let raw = self.current().raw.clone();
            return Err(self.error(&format!("unexpected trailing token '{}'", raw)));
        }
        Ok(expr)
    }

    fn parse_expr(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_logical_or()
    }

    fn parse_logical_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut l = self.parse_logical_and()?;
        let mut chain = 0;
        while self.check(&TokenKind::Or) {
            self.enter()?;
            chain += 1;
            self.advance();
            let r = self.parse_logical_and()?;
            l = Expr::binary(BinaryOp::Or, l, r);
        }
        self.depth -= chain;
        Ok(l)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut l = self.parse_equality()?;
        let mut chain = 0;
        while self.check(&TokenKind::And) {
            self.enter()?;
            chain += 1;
            self.advance();
            let r = self.parse_equality()?;
            l = Expr::binary(BinaryOp::And, l, r);
        }
        self.depth -= chain;
        Ok(l)
    }

    fn parse_equality(&mut self) -> Result<Expr, SyntaxError> {
        let mut l = self.parse_comparison()?;
        let mut chain = 0;
        loop {
            let op = match self.current().kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.enter()?;
            chain += 1;
            self.advance();
            let r = self.parse_comparison()?;
            l = Expr::binary(op, l, r);
        }
        self.depth -= chain;
        Ok(l)
    }

    fn parse_comparison(&mut self) -> Result<Expr, SyntaxError> {
        let mut l = self.parse_addition()?;
        let mut chain = 0;
        loop {
            let op = match self.current().kind {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.enter()?;
            chain += 1;
            self.advance();
            let r = self.parse_addition()?;
            l = Expr::binary(op, l, r);
        }
        self.depth -= chain;
        Ok(l)
    }

    fn parse_addition(&mut self) -> Result<Expr, SyntaxError> {
        let mut l = self.parse_multiplication()?;
        let mut chain = 0;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.enter()?;
            chain += 1;
            self.advance();
            let r = self.parse_multiplication()?;
            l = Expr::binary(op, l, r);
        }
        self.depth -= chain;
        Ok(l)
    }

    fn parse_multiplication(&mut self) -> Result<Expr, SyntaxError> {
        let mut l = self.parse_unary()?;
        let mut chain = 0;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            self.enter()?;
            chain += 1;
            self.advance();
            let r = self.parse_unary()?;
            l = Expr::binary(op, l, r);
        }
        self.depth -= chain;
        Ok(l)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.current().kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Plus => {
                self.enter()?;
                self.advance();
                let expr = self.parse_unary()?;
                self.depth -= 1;
                return Ok(expr);
            }
            _ => return self.parse_primary(),
        };
        self.enter()?;
        self.advance();
        let expr = self.parse_unary()?;
        self.depth -= 1;
        Ok(Expr::Unary {
            op,
            expr: Box::new(expr),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let t = self.advance();
        match t.kind {
            TokenKind::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            TokenKind::StringLit(s) => Ok(Expr::Literal(Value::text(&s))),
            TokenKind::Ident(name) => {
                if self.check(&TokenKind::LParen) {
                    return self.parse_call(name, t.span);
                }
                if name == PI_NAME {
                    return Ok(Expr::Literal(Value::Number(PI)));
                }
                Ok(Expr::Variable(name))
            }
            TokenKind::LParen => {
                self.enter_at(t.span.start)?;
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen, "expected ')'")?;
                self.depth -= 1;
                Ok(expr)
            }
            TokenKind::RParen => Err(SyntaxError::new(t.span.start, "unmatched ')'")),
            TokenKind::Eof => Err(SyntaxError::new(t.span.start, "unexpected end of expression")),
            _ => Err(SyntaxError::new(
                t.span.start,
                &format!("unexpected token '{}'", t.raw),
            )),
        }
    }

    fn parse_call(&mut self, name: String, name_span: Span) -> Result<Expr, SyntaxError> {
        self.expect(&TokenKind::LParen, "expected '('")?;
        self.enter_at(name_span.start)?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.check(&TokenKind::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect(&TokenKind::RParen, "expected ')' after arguments")?;
        self.depth -= 1;

        if name == IF_NAME {
            if args.len() != 3 {
                return Err(SyntaxError::new(
                    name_span.start,
                    &format!("arity mismatch: if takes 3 arguments, got {}", args.len()),
                ));
            }
            let mut it = args.into_iter();
            let (Some(cond), Some(then_expr), Some(else_expr)) = (it.next(), it.next(), it.next())
            else {
                return Err(SyntaxError::new(name_span.start, "if needs 3 arguments"));
            };
            return Ok(Expr::Conditional {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            });
        }

        let sig = find_function(&name).ok_or_else(|| {
            SyntaxError::new(name_span.start, &format!("unknown function '{}'", name))
        })?;
        if sig.arity() != args.len() {
            return Err(SyntaxError::new(
                name_span.start,
                &format!(
                    "arity mismatch: {} takes {} argument(s), got {}",
                    name,
                    sig.arity(),
                    args.len()
                ),
            ));
        }
        Ok(Expr::Call { name, args })
    }

    fn enter(&mut self) -> Result<(), SyntaxError> {
        let pos = self.current().span.start;
        self.enter_at(pos)
    }

    fn enter_at(&mut self, pos: usize) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(SyntaxError::new(pos, "expression nested too deeply"));
        }
        Ok(())
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.pos += 1;
            return self.tokens[self.pos - 1].clone();
        }
        self.tokens[self.pos].clone()
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn check(&self, k: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(k)
    }

    fn expect(&mut self, k: &TokenKind, m: &str) -> Result<Token, SyntaxError> {
        if self.check(k) {
            Ok(self.advance())
        } else {
            Err(self.error(m))
        }
    }

    fn error(&self, m: &str) -> SyntaxError {
        SyntaxError::new(self.current().span.start, m)
    }
}

/// Malformed expression text. `position` is a byte offset into the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub position: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(position: usize, message: &str) -> Self {
        Self {
            position,
            message: message.to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        "E_EXPR_SYNTAX"
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at {}: {}", self.code(), self.position, self.message)
    }
}

impl std::error::Error for SyntaxError {}
