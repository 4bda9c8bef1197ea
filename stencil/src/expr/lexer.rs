//! Tokenizer for embedded expressions
//!
//! Expressions are short (an attribute value or a `#{}` body), so the whole
//! source is tokenized up front. Spans are absolute template offsets.

use super::ExprSource;
use crate::error::{ExpressionError, Span, span};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    True,
    False,
    Dot,
    Comma,
    Colon,
    Bang,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eof,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("`{name}`"),
            TokenKind::Int(i) => format!("`{i}`"),
            TokenKind::Float(f) => format!("`{f}`"),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::True => "`true`".to_string(),
            TokenKind::False => "`false`".to_string(),
            TokenKind::Dot => "`.`".to_string(),
            TokenKind::Comma => "`,`".to_string(),
            TokenKind::Colon => "`:`".to_string(),
            TokenKind::Bang => "`!`".to_string(),
            TokenKind::LParen => "`(`".to_string(),
            TokenKind::RParen => "`)`".to_string(),
            TokenKind::LBracket => "`[`".to_string(),
            TokenKind::RBracket => "`]`".to_string(),
            TokenKind::Eof => "end of expression".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

pub(crate) fn tokenize(src: &ExprSource<'_>) -> Result<Vec<Token>, ExpressionError> {
    let text = src.text;
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let single = match c {
            '.' => Some(TokenKind::Dot),
            ',' => Some(TokenKind::Comma),
            ':' => Some(TokenKind::Colon),
            '!' => Some(TokenKind::Bang),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '[' => Some(TokenKind::LBracket),
            ']' => Some(TokenKind::RBracket),
            _ => None,
        };
        if let Some(kind) = single {
            chars.next();
            tokens.push(Token {
                kind,
                span: src.span(start, 1),
            });
            continue;
        }

        if c == '"' || c == '\'' {
            chars.next();
            let mut value = String::new();
            let mut end = None;
            while let Some((i, ch)) = chars.next() {
                match ch {
                    _ if ch == c => {
                        end = Some(i + 1);
                        break;
                    }
                    '\\' => match chars.next() {
                        Some((_, 'n')) => value.push('\n'),
                        Some((_, 't')) => value.push('\t'),
                        Some((_, escaped)) => value.push(escaped),
                        None => break,
                    },
                    _ => value.push(ch),
                }
            }
            let Some(end) = end else {
                return Err(src.error(src.span(start, 1), "string literal is not terminated"));
            };
            tokens.push(Token {
                kind: TokenKind::Str(value),
                span: src.span(start, end - start),
            });
            continue;
        }

        let negative_number = c == '-'
            && text[start + 1..]
                .chars()
                .next()
                .is_some_and(|n| n.is_ascii_digit());
        if c.is_ascii_digit() || negative_number {
            chars.next();
            let mut end = start + 1;
            let mut is_float = false;
            while let Some(&(i, ch)) = chars.peek() {
                if ch.is_ascii_digit() {
                    chars.next();
                    end = i + 1;
                } else if ch == '.'
                    && !is_float
                    && text[i + 1..]
                        .chars()
                        .next()
                        .is_some_and(|n| n.is_ascii_digit())
                {
                    is_float = true;
                    chars.next();
                    end = i + 1;
                } else {
                    break;
                }
            }
            let literal = &text[start..end];
            let token_span = src.span(start, end - start);
            let kind = if is_float {
                literal
                    .parse()
                    .map(TokenKind::Float)
                    .map_err(|_| src.error(token_span, format!("invalid number `{literal}`")))?
            } else {
                literal.parse().map(TokenKind::Int).map_err(|_| {
                    src.error(token_span, format!("integer `{literal}` is out of range"))
                })?
            };
            tokens.push(Token {
                kind,
                span: token_span,
            });
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let mut end = start;
            while let Some(&(i, ch)) = chars.peek() {
                if ch.is_alphanumeric() || ch == '_' {
                    chars.next();
                    end = i + ch.len_utf8();
                } else {
                    break;
                }
            }
            let word = &text[start..end];
            let kind = match word {
                "true" => TokenKind::True,
                "false" => TokenKind::False,
                _ => TokenKind::Ident(word.to_string()),
            };
            tokens.push(Token {
                kind,
                span: src.span(start, end - start),
            });
            continue;
        }

        return Err(src.error(
            src.span(start, c.len_utf8()),
            format!("unexpected character `{c}` in expression"),
        ));
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: src.span(text.len(), 0),
    });
    Ok(tokens)
}

impl ExprSource<'_> {
    /// Absolute span for a range of the expression text
    pub(crate) fn span(&self, start: usize, len: usize) -> Span {
        span(self.offset + start, len)
    }
}
