//! Parser for the markup language
//!
//! Builds a [`Document`] from lexer tokens using an explicit stack of open
//! containers. The stack starts with the document root; start tags push,
//! end tags pop until the matching element is found.

use crate::config::TemplateConfig;
use crate::error::{CompileError, Span, TemplateSource, span};
use crate::lexer::{ElementTokenKind, Lexer, NodeTokenKind, Token};
use crate::node::{Attribute, Comment, Document, Element, Node, Quote, Text};
use indextree::NodeId;

/// Elements whose body is raw text, never parsed as markup
pub(crate) const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// HTML void elements that cannot have children.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub(crate) fn is_raw_text_element(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Parser state
pub(crate) struct Parser<'src> {
    lexer: Lexer<'src>,
    source: &'src TemplateSource,
    config: &'src TemplateConfig,
    document: Document,
    /// Open containers, innermost last; `stack[0]` is the document root
    stack: Vec<NodeId>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src TemplateSource, config: &'src TemplateConfig) -> Self {
        let document = Document::new();
        let root = document.root();
        Self {
            lexer: Lexer::new(source),
            source,
            config,
            document,
            stack: vec![root],
        }
    }

    /// Parse the full template
    pub fn parse(mut self) -> Result<Document, CompileError> {
        loop {
            let token = self.lexer.next_node_token()?;
            match token.kind {
                NodeTokenKind::Eof => break,
                NodeTokenKind::Text => {
                    self.add_child(Node::Text(Text {
                        content: token.text.to_string(),
                        span: token.span,
                    }));
                }
                NodeTokenKind::StartComment => {
                    let comment = self.lexer.next_end_comment_token()?;
                    self.add_child(Node::Comment(Comment {
                        content: comment.text.to_string(),
                        span: comment.span,
                    }));
                }
                NodeTokenKind::StartTag => {
                    let name = self.validate_tag_name(&token.text[1..], token.span)?;
                    self.parse_element(name, token.span)?;
                }
                NodeTokenKind::EndTag => {
                    let inner = &token.text[2..token.text.len() - 1];
                    let name = self.validate_tag_name(inner.trim_end(), token.span)?;
                    self.close_tag(name, token.span)?;
                }
            }
        }

        self.finish()
    }

    fn parse_element(&mut self, name: &'src str, tag_span: Span) -> Result<(), CompileError> {
        let mut element = Element::new(name, tag_span);
        // index of the attribute still waiting for its value
        let mut pending: Option<usize> = None;

        loop {
            let token = self.lexer.next_element_token()?;
            match token.kind {
                ElementTokenKind::StartTagEndClose => {
                    element.start_tag_closed = true;
                    self.check_dynamic_attributes(&element)?;
                    self.add_child(Node::Element(element));
                    return Ok(());
                }
                ElementTokenKind::StartTagEnd => {
                    self.check_dynamic_attributes(&element)?;
                    let id = self.add_child(Node::Element(element));
                    if is_void_element(name) {
                        return Ok(());
                    }
                    tracing::trace!(tag = name, depth = self.stack.len(), "open element");
                    self.stack.push(id);
                    if is_raw_text_element(name) {
                        let body = self.lexer.next_script_token(name)?;
                        if !body.text.is_empty() {
                            self.add_child(Node::Text(Text {
                                content: body.text.to_string(),
                                span: body.span,
                            }));
                        }
                    }
                    return Ok(());
                }
                ElementTokenKind::AttrName => {
                    element.attributes.push(Attribute {
                        name: token.text.to_string(),
                        value: None,
                        quote: Quote::Bare,
                        dynamic: self.config.directive(token.text).is_some(),
                        span: token.span,
                        value_span: None,
                    });
                    pending = Some(element.attributes.len() - 1);
                }
                ElementTokenKind::AttrValue => {
                    let Some(index) = pending.take() else {
                        return Err(self
                            .source
                            .parse_error(token.span, "attribute value has no attribute name")
                            .into());
                    };
                    let (value, quote, value_span) = split_attribute_value(&token);
                    let attribute = &mut element.attributes[index];
                    attribute.value = Some(value.to_string());
                    attribute.quote = quote;
                    attribute.value_span = Some(value_span);
                }
            }
        }
    }

    fn check_dynamic_attributes(&self, element: &Element) -> Result<(), CompileError> {
        for attribute in element.attributes.iter().filter(|a| a.dynamic) {
            if attribute.value.is_none() {
                return Err(self
                    .source
                    .parse_error(
                        attribute.span,
                        format!("dynamic attribute `{}` requires a value", attribute.name),
                    )
                    .into());
            }
        }
        Ok(())
    }

    fn close_tag(&mut self, name: &str, end_span: Span) -> Result<(), CompileError> {
        // void elements are never on the stack; their end tag pairs with the
        // preceding sibling when it is the same element, otherwise it is dropped
        if is_void_element(name) {
            let parent = self.stack[self.stack.len() - 1];
            let previous = self.document.children(parent).last();
            if let Some(id) = previous
                && let Node::Element(element) = self.document.node_mut(id)
                && element.name == name
                && !element.start_tag_closed
            {
                element.has_end_tag = true;
            }
            tracing::trace!(tag = name, "end tag of void element");
            return Ok(());
        }

        // never pop the document root
        while self.stack.len() > 1 {
            let Some(id) = self.stack.pop() else {
                break;
            };
            if let Node::Element(element) = self.document.node_mut(id)
                && element.name == name
            {
                element.has_end_tag = true;
                tracing::trace!(tag = name, depth = self.stack.len(), "close element");
                return Ok(());
            }
        }
        Err(self
            .source
            .parse_error(
                end_span,
                format!("can not find matched tag to close, tagName={name}"),
            )
            .into())
    }

    fn validate_tag_name(&self, name: &'src str, tag_span: Span) -> Result<&'src str, CompileError> {
        if name.is_empty() {
            return Err(self.source.parse_error(tag_span, "tag name is empty").into());
        }
        if name.chars().any(|c| c.is_uppercase()) {
            return Err(self
                .source
                .parse_error(
                    tag_span,
                    format!("tag name must be in lower case, name={name}"),
                )
                .into());
        }
        Ok(name)
    }

    fn add_child(&mut self, node: Node) -> NodeId {
        let parent = self.stack[self.stack.len() - 1];
        self.document.append(parent, node)
    }

    /// Elements still open at end of input are accepted unless the config
    /// asks for strict end tags.
    fn finish(self) -> Result<Document, CompileError> {
        let unclosed: Vec<&Element> = self.stack[1..]
            .iter()
            .filter_map(|&id| self.document.node(id).as_element())
            .collect();

        if let Some(first) = unclosed.first() {
            if self.config.strict_end_tags {
                return Err(self
                    .source
                    .parse_error(first.span, format!("<{}> is never closed", first.name))
                    .into());
            }
            let names: Vec<&str> = unclosed.iter().map(|e| e.name.as_str()).collect();
            tracing::debug!(
                template = self.source.name(),
                unclosed = ?names,
                "accepting unclosed elements at end of input"
            );
        }

        Ok(self.document)
    }
}

fn split_attribute_value<'src>(token: &Token<'src, ElementTokenKind>) -> (&'src str, Quote, Span) {
    let raw = &token.text[1..];
    let offset = token.span.offset() + 1;
    let quote = match raw.as_bytes()[0] {
        b'"' => Quote::Double,
        b'\'' => Quote::Single,
        _ => return (raw, Quote::Unquoted, span(offset, raw.len())),
    };
    let inner = &raw[1..raw.len() - 1];
    (inner, quote, span(offset + 1, inner.len()))
}

/// Parse a template with the default config
pub fn parse(name: &str, text: &str) -> Result<Document, CompileError> {
    parse_with(name, text, &TemplateConfig::default())
}

/// Parse a template into its node tree without compiling it
pub fn parse_with(
    name: &str,
    text: &str,
    config: &TemplateConfig,
) -> Result<Document, CompileError> {
    let source = TemplateSource::new(name, text);
    Parser::new(&source, config).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element_names(document: &Document) -> Vec<String> {
        document
            .descendants()
            .filter_map(|id| document.node(id).as_element())
            .map(|e| e.name.clone())
            .collect()
    }

    #[test]
    fn test_nesting() {
        let document = parse("t", "<div><p>a</p><p>b</p></div>").unwrap();
        let root_children: Vec<_> = document.children(document.root()).collect();
        assert_eq!(root_children.len(), 1);
        let div = root_children[0];
        assert_eq!(document.children(div).count(), 2);
        assert_eq!(element_names(&document), vec!["div", "p", "p"]);
    }

    #[test]
    fn test_end_tag_flags() {
        let document = parse("t", "<div><br><img/></div>").unwrap();
        let elements: Vec<&Element> = document
            .descendants()
            .filter_map(|id| document.node(id).as_element())
            .collect();
        assert!(elements[0].has_end_tag);
        assert!(!elements[1].has_end_tag && !elements[1].start_tag_closed);
        assert!(elements[2].start_tag_closed);
        // void elements do not swallow following siblings
        let div = document.children(document.root()).next().unwrap();
        assert_eq!(document.children(div).count(), 2);
    }

    #[test]
    fn test_end_tag_closes_intermediate_elements() {
        let document = parse("t", "<div><span>x</div>after").unwrap();
        let root_children: Vec<_> = document.children(document.root()).collect();
        assert_eq!(root_children.len(), 2);
        let div = document.node(root_children[0]).as_element().unwrap();
        assert!(div.has_end_tag);
        let span_id = document.children(root_children[0]).next().unwrap();
        assert!(!document.node(span_id).as_element().unwrap().has_end_tag);
    }

    #[test]
    fn test_void_element_end_tags() {
        let document = parse("t", "<p>a<br></br>b</p><div><input type=\"x\"></input></div>").unwrap();
        assert_eq!(element_names(&document), vec!["p", "br", "div", "input"]);
        let elements: Vec<&Element> = document
            .descendants()
            .filter_map(|id| document.node(id).as_element())
            .collect();
        assert!(elements[1].has_end_tag);
        assert!(elements[3].has_end_tag);
        let p = document.children(document.root()).next().unwrap();
        assert_eq!(document.children(p).count(), 3);

        // a stray end tag for a void element is dropped
        let document = parse("t", "<p>a</br>b</p>").unwrap();
        let p = document.children(document.root()).next().unwrap();
        assert!(document.node(p).as_element().unwrap().has_end_tag);
        assert_eq!(element_names(&document), vec!["p"]);
    }

    #[test]
    fn test_unclosed_at_eof_is_accepted() {
        let document = parse("t", "<div><span>text").unwrap();
        assert_eq!(element_names(&document), vec!["div", "span"]);
    }

    #[test]
    fn test_strict_end_tags() {
        let config = TemplateConfig::default().with_strict_end_tags(true);
        let err = parse_with("t", "<div><span>text</span>", &config).unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
        assert!(err.to_string().contains("<div> is never closed"), "{err}");
    }

    #[test]
    fn test_unmatched_end_tag() {
        let err = parse("t", "<div></span>").unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
        assert!(err.to_string().contains("tagName=span"), "{err}");
    }

    #[test]
    fn test_upper_case_tag() {
        let err = parse("t", "<DIV>").unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
        let err = parse("t", "<div></Div>").unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
    }

    #[test]
    fn test_attributes() {
        let document =
            parse("t", r#"<a href="/x" title='t' data-n=3 hidden c:text="name">"#).unwrap();
        let a = document
            .descendants()
            .find_map(|id| document.node(id).as_element())
            .unwrap();
        let quotes: Vec<Quote> = a.attributes.iter().map(|a| a.quote).collect();
        assert_eq!(
            quotes,
            vec![
                Quote::Double,
                Quote::Single,
                Quote::Unquoted,
                Quote::Bare,
                Quote::Double
            ]
        );
        assert_eq!(a.attribute("href").unwrap().value.as_deref(), Some("/x"));
        assert_eq!(a.attribute("data-n").unwrap().value.as_deref(), Some("3"));
        let text = a.attribute("c:text").unwrap();
        assert!(text.dynamic);
        let value_span = text.value_span.unwrap();
        assert_eq!(value_span.offset(), 47);
        assert_eq!(value_span.len(), 4);
    }

    #[test]
    fn test_dynamic_attribute_needs_value() {
        let err = parse("t", "<p c:if>").unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
    }

    #[test]
    fn test_script_body_is_single_text() {
        let document = parse("t", "<script>a <b> c</script><p>").unwrap();
        let script = document.children(document.root()).next().unwrap();
        let body: Vec<_> = document.children(script).collect();
        assert_eq!(body.len(), 1);
        assert!(matches!(document.node(body[0]), Node::Text(t) if t.content == "a <b> c"));
        assert!(document.node(script).as_element().unwrap().has_end_tag);
    }

    #[test]
    fn test_comment_node() {
        let document = parse("t", "<p><!-- <b> --></p>").unwrap();
        let p = document.children(document.root()).next().unwrap();
        let child = document.children(p).next().unwrap();
        assert!(matches!(document.node(child), Node::Comment(c) if c.content == "<!-- <b> -->"));
    }
}
