use std::{fmt::Display, iter::Peekable};

use serde::{Deserialize, Serialize};

use crate::{
    diagnostics::Diagnostics,
    expr::{BinaryExpr, Expr, Literal, UnaryExpr},
    stmt::{Stmt, VarDeclaration},
    token::{LiteralValue, Token, TokenKind},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseError {
    kind: ParseErrorKind,
    location: String,
    line: usize,
}

impl ParseError {
    fn at(kind: ParseErrorKind, token: &Token) -> Self {
        Self {
            kind,
            location: token.location(),
            line: token.line,
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[Línea {}] Error en {}: {}", self.line, self.location, self.kind)
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("expected an expression")]
    ExpectedExpression,

    #[error("expected ')' after expression")]
    ExpectedClosingParenthesis,

    #[error("expected '.' after statement")]
    ExpectedDotAfterStatement,

    #[error("expected '.' after declaration")]
    ExpectedDotAfterDeclaration,

    #[error("expected a variable name after 'definir'")]
    ExpectedVariableName,
}

/// Recursive-descent parser over the scanner's token sequence.
///
/// Single-token lookahead throughout; the iterator is never advanced past the
/// end-of-file sentinel, which is what makes the `expect` calls below sound.
pub struct Parser<I>
where
    I: Iterator<Item = Token>,
{
    tokens: Peekable<I>,
}

macro_rules! binary_expression_impl {
    ($self:ident, $inner_parser:ident, $matcher:pat) => {{
        let mut current = $self.$inner_parser()?;

        while matches!($self.peek().kind, $matcher) {
            let operator = $self.next_token();
            let right = $self.$inner_parser()?;

            current = Expr::Binary(Box::new(BinaryExpr {
                left: current,
                operator,
                right,
            }));
        }

        Ok(current)
    }};
}

impl<I> Parser<I>
where
    I: Iterator<Item = Token>,
{
    pub fn new(tokens: I) -> Self {
        Self {
            tokens: tokens.peekable(),
        }
    }

    /// Parses the whole program. Each failing declaration is reported once,
    /// dropped, and parsing resumes at the next likely statement boundary.
    pub fn parse(&mut self, diagnostics: &mut Diagnostics) -> Vec<Stmt> {
        let mut program = Vec::new();

        while self.peek().kind != TokenKind::EndOfFile {
            match self.declaration() {
                Ok(stmt) => program.push(stmt),
                Err(error) => {
                    diagnostics.static_error(&error);
                    self.synchronize();
                }
            }
        }

        program
    }

    fn peek(&mut self) -> &Token {
        self.tokens.peek().expect("skipped past the end-of-file token")
    }

    fn next_token(&mut self) -> Token {
        self.tokens.next().expect("skipped past the end-of-file token")
    }

    /// Consumes the next token only when it has the expected kind; a
    /// mismatch leaves it in place for `synchronize` and reports against it.
    fn expect(
        &mut self,
        kind: TokenKind,
        error_on_mismatch: ParseErrorKind,
    ) -> Result<Token, ParseError> {
        if self.peek().kind == kind {
            Ok(self.next_token())
        } else {
            Err(ParseError::at(error_on_mismatch, self.peek()))
        }
    }

    /// Panic-mode recovery: discard tokens until the previously consumed one
    /// was `.` or the current one starts a statement.
    fn synchronize(&mut self) {
        loop {
            match self.peek().kind {
                TokenKind::EndOfFile => break,
                TokenKind::Dot => {
                    self.next_token();
                    break;
                }
                _ => {
                    self.next_token();
                    if matches!(
                        self.peek().kind,
                        TokenKind::KeywordClase
                            | TokenKind::KeywordDefinir
                            | TokenKind::KeywordDevolver
                            | TokenKind::KeywordMientras
                            | TokenKind::KeywordRepetir
                            | TokenKind::KeywordSi
                    ) {
                        break;
                    }
                }
            }
        }
    }

    fn declaration(&mut self) -> Result<Stmt, ParseError> {
        if self.peek().kind == TokenKind::KeywordDefinir {
            self.var_declaration()
        } else {
            self.statement()
        }
    }

    fn var_declaration(&mut self) -> Result<Stmt, ParseError> {
        self.next_token(); // the `definir` keyword

        let name = self.expect(TokenKind::Identifier, ParseErrorKind::ExpectedVariableName)?;
        let initializer = if self.peek().kind == TokenKind::Assign {
            self.next_token();
            Some(self.expression()?)
        } else {
            None
        };
        self.expect(TokenKind::Dot, ParseErrorKind::ExpectedDotAfterDeclaration)?;

        Ok(Stmt::VarDeclaration(VarDeclaration::new(name, initializer)))
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.expression()?;
        self.expect(TokenKind::Dot, ParseErrorKind::ExpectedDotAfterStatement)?;
        Ok(expr.into())
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        binary_expression_impl!(
            self,
            term,
            TokenKind::Equal
                | TokenKind::Unequal
                | TokenKind::Less
                | TokenKind::LessOrEqual
                | TokenKind::Greater
                | TokenKind::GreaterOrEqual
        )
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        binary_expression_impl!(self, factor, TokenKind::Plus | TokenKind::Minus)
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        binary_expression_impl!(
            self,
            unary,
            TokenKind::Asterisk | TokenKind::Slash | TokenKind::DoubleSlash
        )
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        // A leading `-` is unary; in operand position `term` claims it first.
        if matches!(self.peek().kind, TokenKind::Minus | TokenKind::KeywordNo) {
            let operator = self.next_token();
            let unary = UnaryExpr {
                operator,
                right: self.unary()?,
            };
            return Ok(Expr::Unary(Box::new(unary)));
        }

        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let next_token = self.peek();
        let maybe_parsed = match (&next_token.kind, &next_token.literal) {
            (TokenKind::KeywordVerdadero, _) => Some(Expr::Literal(Literal::Boolean(true))),
            (TokenKind::KeywordFalso, _) => Some(Expr::Literal(Literal::Boolean(false))),
            (TokenKind::Number, Some(LiteralValue::Number(n))) => {
                Some(Expr::Literal(Literal::Number(*n)))
            }
            (TokenKind::String, Some(LiteralValue::Text(s))) => {
                Some(Expr::Literal(Literal::Text(s.clone())))
            }
            _ => None,
        };

        if let Some(parsed) = maybe_parsed {
            self.next_token();
            return Ok(parsed);
        }

        if self.peek().kind == TokenKind::Identifier {
            return Ok(Expr::Variable(self.next_token()));
        }

        if self.peek().kind == TokenKind::OpeningParenthesis {
            self.next_token();
            let inner_expr = self.expression()?;
            self.expect(
                TokenKind::ClosingParenthesis,
                ParseErrorKind::ExpectedClosingParenthesis,
            )?;
            return Ok(Expr::Grouping(Box::new(inner_expr)));
        }

        Err(ParseError::at(ParseErrorKind::ExpectedExpression, self.peek()))
    }
}
