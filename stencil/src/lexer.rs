//! Lexer for the markup language
//!
//! The lexer is driven by the parser, which asks for the next token at the
//! right level: node-level (text, comments, tags), element-level (attributes
//! inside a start tag), or raw text for `script`/`style` bodies.

use crate::error::{LexError, Span, TemplateSource, span};

/// Tokens produced between elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeTokenKind {
    Eof,
    /// Character data, including `<!DOCTYPE>`-style declarations
    Text,
    /// `<!--`
    StartComment,
    /// `<name`
    StartTag,
    /// `</name>`
    EndTag,
}

/// Tokens produced inside a start tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ElementTokenKind {
    AttrName,
    /// `="value"`, `='value'` or `=value`, including the `=`
    AttrValue,
    /// `>`
    StartTagEnd,
    /// `/>`
    StartTagEndClose,
}

/// A token with its span
#[derive(Debug, Clone, Copy)]
pub(crate) struct Token<'src, K> {
    pub kind: K,
    pub text: &'src str,
    pub span: Span,
}

pub(crate) struct Lexer<'src> {
    source: &'src TemplateSource,
    text: &'src str,
    pos: usize,
    /// Offset of the `<` of the tag or comment being lexed, for error spans
    open: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src TemplateSource) -> Self {
        Self {
            source,
            text: source.text(),
            pos: 0,
            open: 0,
        }
    }

    fn rest(&self) -> &'src str {
        let text = self.text;
        &text[self.pos..]
    }

    fn token<K>(&mut self, kind: K, start: usize, end: usize) -> Token<'src, K> {
        let text = self.text;
        self.pos = end;
        Token {
            kind,
            text: &text[start..end],
            span: span(start, end - start),
        }
    }

    pub fn next_node_token(&mut self) -> Result<Token<'src, NodeTokenKind>, LexError> {
        let start = self.pos;
        let rest = self.rest();

        if rest.is_empty() {
            return Ok(self.token(NodeTokenKind::Eof, start, start));
        }

        if rest.starts_with("<!--") {
            self.open = start;
            return Ok(self.token(NodeTokenKind::StartComment, start, start + 4));
        }

        if rest.starts_with("</") {
            let Some(close) = rest.find('>') else {
                return Err(self
                    .source
                    .lex_error(span(start, 2), "end tag is not terminated by `>`"));
            };
            return Ok(self.token(NodeTokenKind::EndTag, start, start + close + 1));
        }

        if starts_tag(rest) {
            self.open = start;
            let name_len = rest[1..]
                .find(|c: char| !is_tag_name_char(c))
                .unwrap_or(rest.len() - 1);
            tracing::trace!(tag = &rest[1..1 + name_len], offset = start, "start tag");
            return Ok(self.token(NodeTokenKind::StartTag, start, start + 1 + name_len));
        }

        // text runs until the next tag, end tag or comment; a `<` that starts
        // none of those is ordinary text
        let mut end = rest.len();
        for (i, _) in rest.match_indices('<').filter(|&(i, _)| i > 0) {
            let candidate = &rest[i..];
            if candidate.starts_with("<!--") || candidate.starts_with("</") || starts_tag(candidate)
            {
                end = i;
                break;
            }
        }
        Ok(self.token(NodeTokenKind::Text, start, start + end))
    }

    /// Scan to the `-->` closing the comment opened by the last
    /// [`NodeTokenKind::StartComment`]. The token covers the whole comment.
    pub fn next_end_comment_token(&mut self) -> Result<Token<'src, NodeTokenKind>, LexError> {
        let Some(close) = self.rest().find("-->") else {
            return Err(self
                .source
                .lex_error(span(self.open, 4), "comment is not terminated by `-->`"));
        };
        let end = self.pos + close + 3;
        Ok(self.token(NodeTokenKind::Text, self.open, end))
    }

    pub fn next_element_token(&mut self) -> Result<Token<'src, ElementTokenKind>, LexError> {
        let skipped = self.rest().len() - self.rest().trim_start().len();
        self.pos += skipped;

        let start = self.pos;
        let rest = self.rest();

        if rest.is_empty() {
            return Err(self
                .source
                .lex_error(span(self.open, 1), "start tag is not terminated by `>`"));
        }

        if rest.starts_with("/>") {
            return Ok(self.token(ElementTokenKind::StartTagEndClose, start, start + 2));
        }

        if rest.starts_with('>') {
            return Ok(self.token(ElementTokenKind::StartTagEnd, start, start + 1));
        }

        if let Some(value) = rest.strip_prefix('=') {
            let len = match value.chars().next() {
                Some(quote @ ('"' | '\'')) => match value[1..].find(quote) {
                    Some(close) => close + 2,
                    None => {
                        return Err(self.source.lex_error(
                            span(start, 1),
                            "attribute value is not terminated by a closing quote",
                        ));
                    }
                },
                _ => value
                    .find(|c: char| c.is_ascii_whitespace() || c == '>')
                    .unwrap_or(value.len()),
            };
            if len == 0 {
                return Err(self
                    .source
                    .lex_error(span(start, 1), "attribute value is missing after `=`"));
            }
            return Ok(self.token(ElementTokenKind::AttrValue, start, start + 1 + len));
        }

        let len = rest
            .char_indices()
            .find(|&(i, c)| {
                c.is_ascii_whitespace()
                    || matches!(c, '=' | '>' | '"' | '\'' | '<')
                    || rest[i..].starts_with("/>")
            })
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        if len == 0 {
            let bad = rest.chars().next().map(char::len_utf8).unwrap_or(1);
            return Err(self
                .source
                .lex_error(span(start, bad), "unexpected character in start tag"));
        }
        Ok(self.token(ElementTokenKind::AttrName, start, start + len))
    }

    /// Consume the verbatim body of a raw-text element up to (not including)
    /// its `</tag>` end tag, which is left for [`Lexer::next_node_token`].
    pub fn next_script_token(&mut self, tag: &str) -> Result<Token<'src, NodeTokenKind>, LexError> {
        let start = self.pos;
        let rest = self.rest();
        for (i, _) in rest.match_indices("</") {
            let after = &rest[i + 2..];
            let Some(name) = after.get(..tag.len()) else {
                continue;
            };
            if name.eq_ignore_ascii_case(tag)
                && after[tag.len()..].starts_with(|c: char| c == '>' || c.is_ascii_whitespace())
            {
                return Ok(self.token(NodeTokenKind::Text, start, start + i));
            }
        }
        Err(self
            .source
            .lex_error(span(self.open, 1), format!("<{tag}> element is never closed")))
    }
}

fn starts_tag(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next() == Some('<') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
}

fn is_tag_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_tokens(text: &str) -> Vec<(NodeTokenKind, String)> {
        let source = TemplateSource::new("t", text);
        let mut lexer = Lexer::new(&source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_node_token().unwrap();
            if token.kind == NodeTokenKind::Eof {
                break;
            }
            tokens.push((token.kind, token.text.to_string()));
            if token.kind == NodeTokenKind::StartTag {
                loop {
                    let t = lexer.next_element_token().unwrap();
                    if matches!(
                        t.kind,
                        ElementTokenKind::StartTagEnd | ElementTokenKind::StartTagEndClose
                    ) {
                        break;
                    }
                }
            }
        }
        tokens
    }

    #[test]
    fn test_text_and_tags() {
        assert_eq!(
            node_tokens("a < b<p>x</p>"),
            vec![
                (NodeTokenKind::Text, "a < b".to_string()),
                (NodeTokenKind::StartTag, "<p".to_string()),
                (NodeTokenKind::Text, "x".to_string()),
                (NodeTokenKind::EndTag, "</p>".to_string()),
            ]
        );
    }

    #[test]
    fn test_doctype_is_text() {
        assert_eq!(
            node_tokens("<!DOCTYPE html><html>"),
            vec![
                (NodeTokenKind::Text, "<!DOCTYPE html>".to_string()),
                (NodeTokenKind::StartTag, "<html".to_string()),
            ]
        );
    }

    #[test]
    fn test_comment() {
        let source = TemplateSource::new("t", "<!-- hi -->after");
        let mut lexer = Lexer::new(&source);
        assert_eq!(
            lexer.next_node_token().unwrap().kind,
            NodeTokenKind::StartComment
        );
        assert_eq!(lexer.next_end_comment_token().unwrap().text, "<!-- hi -->");
        assert_eq!(lexer.next_node_token().unwrap().text, "after");
    }

    #[test]
    fn test_unterminated_comment() {
        let source = TemplateSource::new("t", "<!-- hi");
        let mut lexer = Lexer::new(&source);
        lexer.next_node_token().unwrap();
        let err = lexer.next_end_comment_token().unwrap_err();
        assert!(err.message.contains("comment"), "{err}");
    }

    #[test]
    fn test_attributes() {
        let source = TemplateSource::new(
            "t",
            r#"<input type="text" c:value=name disabled data-x='1' />"#,
        );
        let mut lexer = Lexer::new(&source);
        lexer.next_node_token().unwrap();
        let mut tokens = Vec::new();
        loop {
            let t = lexer.next_element_token().unwrap();
            tokens.push((t.kind, t.text));
            if t.kind == ElementTokenKind::StartTagEndClose {
                break;
            }
        }
        use ElementTokenKind::*;
        assert_eq!(
            tokens,
            vec![
                (AttrName, "type"),
                (AttrValue, "=\"text\""),
                (AttrName, "c:value"),
                (AttrValue, "=name"),
                (AttrName, "disabled"),
                (AttrName, "data-x"),
                (AttrValue, "='1'"),
                (StartTagEndClose, "/>"),
            ]
        );
    }

    #[test]
    fn test_unterminated_attribute_value() {
        let source = TemplateSource::new("t", r#"<a href="/x>"#);
        let mut lexer = Lexer::new(&source);
        lexer.next_node_token().unwrap();
        lexer.next_element_token().unwrap();
        let err = lexer.next_element_token().unwrap_err();
        assert!(err.message.contains("closing quote"), "{err}");
    }

    #[test]
    fn test_unterminated_start_tag() {
        let source = TemplateSource::new("t", "<div class=\"a\"");
        let mut lexer = Lexer::new(&source);
        lexer.next_node_token().unwrap();
        lexer.next_element_token().unwrap();
        lexer.next_element_token().unwrap();
        let err = lexer.next_element_token().unwrap_err();
        assert_eq!(err.location.column, 1);
    }

    #[test]
    fn test_script_body_is_verbatim() {
        let source = TemplateSource::new("t", "<script>if (a<b) {}</p></SCRIPT >");
        let mut lexer = Lexer::new(&source);
        lexer.next_node_token().unwrap();
        lexer.next_element_token().unwrap();
        let body = lexer.next_script_token("script").unwrap();
        assert_eq!(body.text, "if (a<b) {}</p>");
        assert_eq!(lexer.next_node_token().unwrap().text, "</SCRIPT >");
    }

    #[test]
    fn test_unclosed_script() {
        let source = TemplateSource::new("t", "<style>p {}");
        let mut lexer = Lexer::new(&source);
        lexer.next_node_token().unwrap();
        lexer.next_element_token().unwrap();
        assert!(lexer.next_script_token("style").is_err());
    }
}
