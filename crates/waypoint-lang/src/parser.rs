//! Recursive descent parser for conditions and callback statements.
//!
//! Both entry points check syntax eagerly; a trigger or callback built from a
//! string never carries a latent parse error to fire time.

use smol_str::SmolStr;

use crate::ast::{AssignOp, Expr, Stmt};
use crate::error::ParseError;
use crate::lexer::{tokenize, Token, TokenKind};
use crate::ops::{BinaryOp, UnaryOp};
use crate::value::Value;

/// Parse a single expression, requiring the whole input to be consumed.
pub fn parse_expr(source: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(source);
    if parser.at_end() {
        return Err(ParseError::EmptyInput);
    }
    let expr = parser.expr()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse one or more `;`-separated statements.
pub fn parse_stmts(source: &str) -> Result<Vec<Stmt>, ParseError> {
    let mut parser = Parser::new(source);
    if parser.at_end() {
        return Err(ParseError::EmptyInput);
    }
    let mut stmts = Vec::new();
    loop {
        stmts.push(parser.stmt()?);
        if !parser.eat(TokenKind::Semicolon) {
            break;
        }
        // Trailing semicolon.
        if parser.at_end() {
            break;
        }
    }
    parser.expect_end()?;
    Ok(stmts)
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            source,
            tokens: tokenize(source),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn slice(&self, token: Token) -> &'src str {
        &self.source[token.span.0..token.span.1]
    }

    fn unexpected(&self, token: Token) -> ParseError {
        match token.kind {
            TokenKind::UnterminatedStr => ParseError::UnterminatedString,
            _ => ParseError::UnexpectedToken {
                found: SmolStr::new(self.slice(token)),
                offset: token.span.0,
            },
        }
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(self.unexpected(token)),
        }
    }

    fn stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Return) => {
                self.bump();
                if self.at_end() || self.peek_kind() == Some(TokenKind::Semicolon) {
                    Ok(Stmt::Return(None))
                } else {
                    Ok(Stmt::Return(Some(self.expr()?)))
                }
            }
            Some(TokenKind::Pass) => {
                self.bump();
                Ok(Stmt::Pass)
            }
            Some(TokenKind::Ident) => {
                let assign_op = self
                    .tokens
                    .get(self.pos + 1)
                    .and_then(|t| assign_op_for(t.kind));
                if let Some(op) = assign_op {
                    let target = self.bump().map(|t| SmolStr::new(self.slice(t)));
                    self.bump();
                    let value = self.expr()?;
                    Ok(Stmt::Assign {
                        target: target.unwrap_or_default(),
                        op,
                        value,
                    })
                } else {
                    Ok(Stmt::Expr(self.expr()?))
                }
            }
            _ => Ok(Stmt::Expr(self.expr()?)),
        }
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.and_expr()?;
        while self.eat(TokenKind::PipePipe) {
            let right = self.and_expr()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.equality()?;
        while self.eat(TokenKind::AmpAmp) {
            let right = self.equality()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.comparison()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::EqEq) => BinaryOp::Eq,
                Some(TokenKind::BangEq) => BinaryOp::Ne,
                _ => break,
            };
            self.bump();
            let right = self.comparison()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Lt) => BinaryOp::Lt,
                Some(TokenKind::Le) => BinaryOp::Le,
                Some(TokenKind::Gt) => BinaryOp::Gt,
                Some(TokenKind::Ge) => BinaryOp::Ge,
                _ => break,
            };
            self.bump();
            let right = self.term()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.factor()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.bump();
            let right = self.factor()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                Some(TokenKind::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.bump();
            let right = self.unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek_kind() {
            Some(TokenKind::Minus) => Some(UnaryOp::Neg),
            Some(TokenKind::Bang) => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let expr = self.unary()?;
            return Ok(Expr::Unary {
                op,
                expr: Box::new(expr),
            });
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let Some(token) = self.bump() else {
            return Err(ParseError::UnexpectedEof);
        };
        match token.kind {
            TokenKind::IntLiteral => {
                let text = self.slice(token);
                let value = text
                    .parse::<i64>()
                    .map_err(|_| ParseError::InvalidNumber(SmolStr::new(text)))?;
                Ok(Expr::Literal(Value::Int(value)))
            }
            TokenKind::FloatLiteral => {
                let text = self.slice(token);
                let value = text
                    .parse::<f64>()
                    .map_err(|_| ParseError::InvalidNumber(SmolStr::new(text)))?;
                Ok(Expr::Literal(Value::Float(value)))
            }
            TokenKind::StrLiteral => {
                let text = self.slice(token);
                Ok(Expr::Literal(Value::Str(SmolStr::new(
                    &text[1..text.len() - 1],
                ))))
            }
            TokenKind::True => Ok(Expr::Literal(Value::Bool(true))),
            TokenKind::False => Ok(Expr::Literal(Value::Bool(false))),
            TokenKind::Null => Ok(Expr::Literal(Value::Null)),
            TokenKind::Ident => Ok(Expr::Name(SmolStr::new(self.slice(token)))),
            TokenKind::LParen => {
                let expr = self.expr()?;
                if self.eat(TokenKind::RParen) {
                    Ok(expr)
                } else {
                    match self.peek() {
                        Some(next) => Err(self.unexpected(next)),
                        None => Err(ParseError::UnexpectedEof),
                    }
                }
            }
            _ => Err(self.unexpected(token)),
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn assign_op_for(kind: TokenKind) -> Option<AssignOp> {
    match kind {
        TokenKind::Assign => Some(AssignOp::Set),
        TokenKind::PlusAssign => Some(AssignOp::Add),
        TokenKind::MinusAssign => Some(AssignOp::Sub),
        TokenKind::StarAssign => Some(AssignOp::Mul),
        TokenKind::SlashAssign => Some(AssignOp::Div),
        _ => None,
    }
}
