//! Recursive-descent parser for expressions and control statements
//!
//! ```text
//! expr     := '!' expr | postfix
//! postfix  := primary ( '.' ident [ '(' args ')' ] )*
//! primary  := literal | ident [ '(' args ')' ] | '(' expr ')' | '[' [ args ] ']'
//! args     := expr ( ',' expr )*
//! for      := ident ':' expr
//! ```

use super::ExprSource;
use super::lexer::{Token, TokenKind, tokenize};
use crate::error::{ExpressionError, Span, span};

/// Untyped expression syntax
#[derive(Debug, Clone)]
pub(crate) enum Ast {
    Bool(bool, Span),
    Int(i64, Span),
    Float(f64, Span),
    Str(String, Span),
    List(Vec<Ast>, Span),
    Ident(String, Span),
    /// `name(args)`: a method on the root context
    Call {
        name: String,
        args: Vec<Ast>,
        span: Span,
    },
    Field {
        base: Box<Ast>,
        name: String,
        span: Span,
    },
    Method {
        base: Box<Ast>,
        name: String,
        args: Vec<Ast>,
        span: Span,
    },
    Not(Box<Ast>, Span),
}

impl Ast {
    pub fn span(&self) -> Span {
        match self {
            Ast::Bool(_, span)
            | Ast::Int(_, span)
            | Ast::Float(_, span)
            | Ast::Str(_, span)
            | Ast::List(_, span)
            | Ast::Ident(_, span)
            | Ast::Not(_, span) => *span,
            Ast::Call { span, .. } | Ast::Field { span, .. } | Ast::Method { span, .. } => *span,
        }
    }
}

/// `variable:listExpression`
#[derive(Debug, Clone)]
pub(crate) struct ForStatement {
    pub variable: String,
    pub list: Ast,
}

struct Parser<'a, 'src> {
    src: &'a ExprSource<'src>,
    tokens: Vec<Token>,
    pos: usize,
}

pub(crate) fn parse_expression(src: &ExprSource<'_>) -> Result<Ast, ExpressionError> {
    let mut parser = Parser::new(src)?;
    let ast = parser.parse_expr()?;
    parser.expect_end()?;
    Ok(ast)
}

pub(crate) fn parse_for_statement(src: &ExprSource<'_>) -> Result<ForStatement, ExpressionError> {
    let grammar_error = || {
        src.error(
            src.span(0, src.text.len()),
            format!(
                "for statement must match \"var:list\", statement={}",
                src.text
            ),
        )
    };

    let mut parser = Parser::new(src)?;
    let variable = match parser.peek().kind.clone() {
        TokenKind::Ident(name) if name.chars().all(|c| c.is_ascii_alphanumeric()) => name,
        _ => return Err(grammar_error()),
    };
    parser.advance();
    if parser.peek().kind != TokenKind::Colon {
        return Err(grammar_error());
    }
    parser.advance();
    if parser.peek().kind == TokenKind::Eof {
        return Err(grammar_error());
    }
    let list = parser.parse_expr()?;
    parser.expect_end()?;

    Ok(ForStatement { variable, list })
}

impl<'a, 'src> Parser<'a, 'src> {
    fn new(src: &'a ExprSource<'src>) -> Result<Self, ExpressionError> {
        Ok(Self {
            src,
            tokens: tokenize(src)?,
            pos: 0,
        })
    }

    fn peek(&self) -> &Token {
        // tokenize always ends with Eof, and advance never moves past it
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn unexpected(&self, expected: &str) -> ExpressionError {
        let token = self.peek();
        self.src.error(
            token.span,
            format!("expected {expected}, found {}", token.kind.describe()),
        )
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token, ExpressionError> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_end(&self) -> Result<(), ExpressionError> {
        if self.peek().kind == TokenKind::Eof {
            Ok(())
        } else {
            Err(self.unexpected("end of expression"))
        }
    }

    fn parse_expr(&mut self) -> Result<Ast, ExpressionError> {
        if self.peek().kind == TokenKind::Bang {
            let bang = self.advance();
            let operand = self.parse_expr()?;
            let span = join(bang.span, operand.span());
            return Ok(Ast::Not(Box::new(operand), span));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Ast, ExpressionError> {
        let mut expr = self.parse_primary()?;
        while self.peek().kind == TokenKind::Dot {
            self.advance();
            let token = self.peek().clone();
            let TokenKind::Ident(name) = token.kind else {
                return Err(self.unexpected("field or method name after `.`"));
            };
            self.advance();
            if self.peek().kind == TokenKind::LParen {
                let (args, close) = self.parse_args()?;
                let span = join(expr.span(), close);
                expr = Ast::Method {
                    base: Box::new(expr),
                    name,
                    args,
                    span,
                };
            } else {
                let span = join(expr.span(), token.span);
                expr = Ast::Field {
                    base: Box::new(expr),
                    name,
                    span,
                };
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Ast, ExpressionError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::True => {
                self.advance();
                Ok(Ast::Bool(true, token.span))
            }
            TokenKind::False => {
                self.advance();
                Ok(Ast::Bool(false, token.span))
            }
            TokenKind::Int(i) => {
                self.advance();
                Ok(Ast::Int(i, token.span))
            }
            TokenKind::Float(f) => {
                self.advance();
                Ok(Ast::Float(f, token.span))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Ast::Str(s, token.span))
            }
            TokenKind::Ident(name) => {
                self.advance();
                if self.peek().kind == TokenKind::LParen {
                    let (args, close) = self.parse_args()?;
                    Ok(Ast::Call {
                        name,
                        args,
                        span: join(token.span, close),
                    })
                } else {
                    Ok(Ast::Ident(name, token.span))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                if self.peek().kind != TokenKind::RBracket {
                    items.push(self.parse_expr()?);
                    while self.peek().kind == TokenKind::Comma {
                        self.advance();
                        items.push(self.parse_expr()?);
                    }
                }
                let close = self.expect(TokenKind::RBracket, "`,` or `]`")?;
                Ok(Ast::List(items, join(token.span, close.span)))
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// Parse `( args )`, returning the arguments and the span of `)`
    fn parse_args(&mut self) -> Result<(Vec<Ast>, Span), ExpressionError> {
        self.expect(TokenKind::LParen, "`(`")?;
        let mut args = Vec::new();
        if self.peek().kind != TokenKind::RParen {
            args.push(self.parse_expr()?);
            while self.peek().kind == TokenKind::Comma {
                self.advance();
                args.push(self.parse_expr()?);
            }
        }
        let close = self.expect(TokenKind::RParen, "`,` or `)`")?;
        Ok((args, close.span))
    }
}

/// Span covering both `a` and `b`
fn join(a: Span, b: Span) -> Span {
    let start = a.offset().min(b.offset());
    let end = (a.offset() + a.len()).max(b.offset() + b.len());
    span(start, end - start)
}
