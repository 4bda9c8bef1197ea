//! Error types for template compilation and rendering
//!
//! Compile-time errors carry the template source so miette can point at the
//! offending span. Every error also names the template and a line:column
//! location in its message, so the plain `Display` output is enough to find
//! the problem in a log line.

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A span in the template source (re-export from miette)
pub type Span = SourceSpan;

/// Create a span from offset and length
pub fn span(offset: usize, len: usize) -> Span {
    SourceSpan::new(offset.into(), len)
}

/// A 1-based line and column in a template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    /// Line number, starting at 1
    pub line: usize,
    /// Column number in characters, starting at 1
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A template's name and full text, shared by everything compiled from it.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    name: Arc<str>,
    text: Arc<str>,
}

impl TemplateSource {
    pub fn new(name: impl Into<Arc<str>>, text: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Resolve a byte offset to a line and column.
    pub fn location(&self, offset: usize) -> Location {
        let bytes = self.text.as_bytes();
        let offset = offset.min(bytes.len());
        let mut line = 1;
        let mut line_start = 0;
        for (i, &b) in bytes[..offset].iter().enumerate() {
            if b == b'\n' {
                line += 1;
                line_start = i + 1;
            }
        }
        // count UTF-8 leading bytes only, so columns are in characters
        let column = bytes[line_start..offset]
            .iter()
            .filter(|&&b| (b & 0xC0) != 0x80)
            .count()
            + 1;
        Location { line, column }
    }

    /// Create a NamedSource for miette
    pub fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(self.name.as_ref(), self.text.to_string())
    }

    pub(crate) fn lex_error(&self, span: Span, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            template: self.name.to_string(),
            location: self.location(span.offset()),
            span,
            src: self.named_source(),
        }
    }

    pub(crate) fn parse_error(&self, span: Span, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            template: self.name.to_string(),
            location: self.location(span.offset()),
            span,
            src: self.named_source(),
        }
    }

    pub(crate) fn expression_error(
        &self,
        span: Span,
        message: impl Into<String>,
    ) -> ExpressionError {
        ExpressionError {
            message: message.into(),
            template: self.name.to_string(),
            location: self.location(span.offset()),
            span,
            help: None,
            src: self.named_source(),
        }
    }
}

/// Any error raised while compiling a template.
///
/// A template that fails to compile must never be served, so all of these
/// surface at registration time.
#[derive(Error, Debug, Diagnostic)]
pub enum CompileError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Expression(#[from] ExpressionError),
}

impl CompileError {
    /// Where in the template the error was found.
    pub fn location(&self) -> Location {
        match self {
            CompileError::Lex(e) => e.location,
            CompileError::Parse(e) => e.location,
            CompileError::Expression(e) => e.location,
        }
    }
}

/// Malformed token: unterminated tag, comment, attribute value or raw text.
#[derive(Error, Debug, Diagnostic)]
#[error("{message} ({template}:{location})")]
#[diagnostic(code(stencil::lex))]
pub struct LexError {
    pub message: String,
    pub template: String,
    pub location: Location,
    #[label("here")]
    pub span: SourceSpan,
    #[source_code]
    pub src: NamedSource<String>,
}

/// Structural markup error: unmatched end tag, upper-case tag name,
/// malformed attribute.
#[derive(Error, Debug, Diagnostic)]
#[error("{message} ({template}:{location})")]
#[diagnostic(code(stencil::parse))]
pub struct ParseError {
    pub message: String,
    pub template: String,
    pub location: Location,
    #[label("here")]
    pub span: SourceSpan,
    #[source_code]
    pub src: NamedSource<String>,
}

/// An expression or control statement that does not type-check against the
/// declared context type.
#[derive(Error, Debug, Diagnostic)]
#[error("{message} ({template}:{location})")]
#[diagnostic(code(stencil::expression))]
pub struct ExpressionError {
    pub message: String,
    pub template: String,
    pub location: Location,
    #[label("here")]
    pub span: SourceSpan,
    #[help]
    pub help: Option<String>,
    #[source_code]
    pub src: NamedSource<String>,
}

impl ExpressionError {
    pub(crate) fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// An error raised while rendering a compiled template.
///
/// Scoped to a single render call: nothing is left behind in the template.
#[derive(Error, Debug, Diagnostic)]
pub enum RenderError {
    /// A runtime value did not have the shape its declared type promised.
    #[error("{message} ({template}:{location})")]
    #[diagnostic(code(stencil::render))]
    Eval {
        message: String,
        template: String,
        location: Location,
    },

    /// The engine has no template registered under this name.
    #[error("template `{name}` is not registered")]
    #[diagnostic(code(stencil::render::not_found))]
    NotFound { name: String },
}
