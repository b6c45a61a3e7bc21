// lang/src/lexer.rs
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    StringLit(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
    Lt,
    LtEq,
    Gt,
    GtEq,
    EqEq,
    NotEq,
    And,
    Or,
    Bang,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub raw: String,
}

pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            if self.is_eof() {
                break;
            }
            tokens.push(self.next_token()?);
        }
        tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span::new(self.pos, self.pos),
            raw: String::new(),
        });
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        let ch = self.peek_char().ok_or_else(|| LexError::new(self.pos, "unexpected end of input"))?;
        let kind = match ch {
            '0'..='9' => return self.read_number(),
            '.' if self.peek_ahead(1).map(|c| c.is_ascii_digit()).unwrap_or(false) => {
                return self.read_number()
            }
            '"' => return self.read_string(),
            'a'..='z' | 'A'..='Z' | '_' => return self.read_ident(),
            '+' => {
                self.advance();
                TokenKind::Plus
            }
            '-' => {
                self.advance();
                TokenKind::Minus
            }
            '*' => {
                self.advance();
                TokenKind::Star
            }
            '/' => {
                self.advance();
                TokenKind::Slash
            }
            '(' => {
                self.advance();
                TokenKind::LParen
            }
            ')' => {
                self.advance();
                TokenKind::RParen
            }
            ',' => {
                self.advance();
                TokenKind::Comma
            }
            '<' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '=' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    TokenKind::EqEq
                } else {
                    return Err(LexError::new(start, "unknown operator '=' (use '==')"));
                }
            }
            '!' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            '&' => {
                self.advance();
                if self.peek_char() == Some('&') {
                    self.advance();
                    TokenKind::And
                } else {
                    return Err(LexError::new(start, "unknown operator '&' (use '&&')"));
                }
            }
            '|' => {
                self.advance();
                if self.peek_char() == Some('|') {
                    self.advance();
                    TokenKind::Or
                } else {
                    return Err(LexError::new(start, "unknown operator '|' (use '||')"));
                }
            }
            other => {
                return Err(LexError::new(start, &format!("unknown character '{}'", other)));
            }
        };
        Ok(Token {
            kind,
            span: Span::new(start, self.pos),
            raw: self.source[start..self.pos].to_string(),
        })
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        self.eat_digits();
        // `1.` is a number
        if self.peek_char() == Some('.') {
            self.advance();
            self.eat_digits();
        }
        if matches!(self.peek_char(), Some('e') | Some('E')) {
            let sign = matches!(self.peek_ahead(1), Some('+') | Some('-'));
            let digit_at = if sign { 2 } else { 1 };
            if !self.peek_ahead(digit_at).map(|c| c.is_ascii_digit()).unwrap_or(false) {
                return Err(LexError::new(self.pos, "exponent needs digits"));
            }
            for _ in 0..digit_at {
                self.advance();
            }
            self.eat_digits();
        }
        let raw = &self.source[start..self.pos];
        let value = raw
            .parse::<f64>()
            .map_err(|_| LexError::new(start, &format!("bad number '{}'", raw)))?;
        Ok(Token {
            kind: TokenKind::Number(value),
            span: Span::new(start, self.pos),
            raw: raw.to_string(),
        })
    }

    fn eat_digits(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_string(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        self.advance();
        let mut text = String::new();
        loop {
            let Some(ch) = self.peek_char() else {
                return Err(LexError::new(start, "unterminated string"));
            };
            self.advance();
            match ch {
                '"' => break,
                '\\' => {
                    let Some(escaped) = self.peek_char() else {
                        return Err(LexError::new(start, "unterminated string"));
                    };
                    self.advance();
                    match escaped {
                        'n' => text.push('\n'),
                        't' => text.push('\t'),
                        '"' => text.push('"'),
                        '\\' => text.push('\\'),
                        other => text.push(other),
                    }
                }
                other => text.push(other),
            }
        }
        Ok(Token {
            kind: TokenKind::StringLit(text),
            span: Span::new(start, self.pos),
            raw: self.source[start..self.pos].to_string(),
        })
    }

    fn read_ident(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let raw = self.source[start..self.pos].to_string();
        Ok(Token {
            kind: TokenKind::Ident(raw.clone()),
            span: Span::new(start, self.pos),
            raw,
        })
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(n)
    }

    fn advance(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.pos += ch.len_utf8();
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.source.len()
    }
}

#[derive(Debug, Clone)]
pub struct LexError {
    pub pos: usize,
    pub message: String,
}

impl LexError {
    fn new(pos: usize, message: &str) -> Self {
        Self {
            pos,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "lexer error at {}: {}", self.pos, self.message)
    }
}

impl std::error::Error for LexError {}
