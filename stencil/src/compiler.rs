//! Lowers a parsed [`Document`] into a [`Fragment`] tree
//!
//! Static markup is re-emitted as text and coalesced; dynamic attributes,
//! `#{}` interpolations and control statements are compiled against the
//! [`TypeStack`], which grows by one binding inside every loop body.

use crate::config::{Escape, TemplateConfig};
use crate::error::{CompileError, ExpressionError, Span, TemplateSource, span};
use crate::expr::{
    ExprSource, Expression, TypeStack, check_for_list, compile_expression, parse_for_statement,
};
use crate::fragment::{AttributeFragment, ForFragment, Fragment};
use crate::node::{Attribute, Document, Element, Node, Quote, Text};
use crate::parser::is_raw_text_element;
use crate::types::Type;
use indextree::NodeId;

/// Attributes whose presence alone means true
const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "checked",
    "selected",
    "disabled",
    "readonly",
    "multiple",
    "hidden",
    "required",
    "autofocus",
];

/// Collects fragments, merging adjacent static text into one [`Fragment::Text`].
#[derive(Default)]
struct Builder {
    fragments: Vec<Fragment>,
    text: String,
}

impl Builder {
    fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn push(&mut self, fragment: Fragment) {
        self.flush();
        self.fragments.push(fragment);
    }

    fn flush(&mut self) {
        if !self.text.is_empty() {
            self.fragments
                .push(Fragment::Text(std::mem::take(&mut self.text)));
        }
    }

    fn finish(mut self) -> Fragment {
        self.flush();
        if self.fragments.len() == 1
            && let Some(only) = self.fragments.pop()
        {
            return only;
        }
        Fragment::Container(self.fragments)
    }
}

/// The control directives found on one element
#[derive(Default)]
struct Directives<'d> {
    for_: Option<&'d Attribute>,
    if_: Option<&'d Attribute>,
    text: Option<&'d Attribute>,
    html: Option<&'d Attribute>,
}

pub(crate) struct FragmentCompiler<'a> {
    source: &'a TemplateSource,
    config: &'a TemplateConfig,
    document: &'a Document,
    types: TypeStack,
}

impl<'a> FragmentCompiler<'a> {
    pub fn new(
        source: &'a TemplateSource,
        config: &'a TemplateConfig,
        document: &'a Document,
        types: TypeStack,
    ) -> Self {
        Self {
            source,
            config,
            document,
            types,
        }
    }

    pub fn compile(mut self) -> Result<Fragment, CompileError> {
        let mut builder = Builder::default();
        let document = self.document;
        for child in document.children(document.root()) {
            self.compile_node(child, &mut builder)?;
        }
        Ok(builder.finish())
    }

    fn compile_node(&mut self, id: NodeId, builder: &mut Builder) -> Result<(), CompileError> {
        let document = self.document;
        match document.node(id) {
            Node::Document => {}
            Node::Text(text) => self.compile_text(text, builder)?,
            Node::Comment(comment) => {
                if !self.config.strip_comments {
                    builder.push_text(&comment.content);
                }
            }
            Node::Element(element) => self.compile_element(id, element, builder)?,
        }
        Ok(())
    }

    /// Split text on `#{...}` markers.
    fn compile_text(&mut self, text: &Text, builder: &mut Builder) -> Result<(), CompileError> {
        let content = text.content.as_str();
        let base = text.span.offset();
        let mut rest_start = 0;

        while let Some(found) = content[rest_start..].find("#{") {
            let open = rest_start + found;
            builder.push_text(&content[rest_start..open]);

            let body_start = open + 2;
            let Some(body_len) = find_closing_brace(&content[body_start..]) else {
                return Err(self
                    .source
                    .expression_error(
                        span(base + open, 2),
                        "`#{` is not terminated by `}`",
                    )
                    .into());
            };
            let body = &content[body_start..body_start + body_len];
            let src = ExprSource::new(self.source, body, base + body_start);
            let expr = compile_expression(&src, &self.types)?;
            self.expect_scalar(&expr, src.span(0, body.len()), "interpolated expression")?;
            builder.push(Fragment::Expression {
                expr,
                escape: self.config.escape,
            });

            rest_start = body_start + body_len + 1;
        }

        builder.push_text(&content[rest_start..]);
        Ok(())
    }

    fn compile_element(
        &mut self,
        id: NodeId,
        element: &'a Element,
        builder: &mut Builder,
    ) -> Result<(), CompileError> {
        let directives = self.directives(element)?;

        let Some(for_attr) = directives.for_ else {
            return self.compile_conditional(id, element, &directives, builder);
        };

        let (value, value_span) = dynamic_value(for_attr);
        let src = ExprSource::new(self.source, value, value_span.offset());
        let statement = parse_for_statement(&src)?;
        let list = check_for_list(&src, &self.types, &statement)?;
        let Some(element_type) = list.ty().element_type().cloned() else {
            return Err(src
                .error(
                    statement.list.span(),
                    format!(
                        "for statement must return List<T>, list={}, returnType={}",
                        list_text(&src, statement.list.span()),
                        list.ty()
                    ),
                )
                .into());
        };

        tracing::trace!(
            variable = %statement.variable,
            element_type = %element_type,
            "compile for"
        );
        self.types.push(statement.variable.clone(), element_type.clone());
        let mut body = Builder::default();
        let result = self.compile_conditional(id, element, &directives, &mut body);
        self.types.pop();
        result?;

        builder.push(Fragment::For(ForFragment {
            variable: statement.variable,
            element_type,
            list,
            body: Box::new(body.finish()),
        }));
        Ok(())
    }

    fn compile_conditional(
        &mut self,
        id: NodeId,
        element: &'a Element,
        directives: &Directives<'a>,
        builder: &mut Builder,
    ) -> Result<(), CompileError> {
        let Some(if_attr) = directives.if_ else {
            return self.emit_element(id, element, directives, builder);
        };

        let (value, value_span) = dynamic_value(if_attr);
        let src = ExprSource::new(self.source, value, value_span.offset());
        let condition = compile_expression(&src, &self.types)?;
        if condition.ty() != &Type::Bool {
            return Err(src
                .error(
                    value_span,
                    format!("if condition must be Bool, found {}", condition.ty()),
                )
                .into());
        }

        let mut body = Builder::default();
        self.emit_element(id, element, directives, &mut body)?;
        builder.push(Fragment::If {
            condition,
            body: Box::new(body.finish()),
        });
        Ok(())
    }

    fn emit_element(
        &mut self,
        id: NodeId,
        element: &'a Element,
        directives: &Directives<'a>,
        builder: &mut Builder,
    ) -> Result<(), CompileError> {
        builder.push_text("<");
        builder.push_text(&element.name);

        for attribute in &element.attributes {
            if attribute.dynamic {
                self.compile_dynamic_attribute(attribute, builder)?;
            } else {
                write_static_attribute(attribute, builder);
            }
        }

        let content = directives
            .text
            .map(|attr| (attr, self.config.escape))
            .or(directives.html.map(|attr| (attr, Escape::Disabled)));

        if element.start_tag_closed {
            if let Some((attr, _)) = content {
                return Err(self
                    .source
                    .expression_error(
                        attr.span,
                        format!(
                            "`{}` needs an element body, but <{}/> is self-closing",
                            attr.name, element.name
                        ),
                    )
                    .into());
            }
            builder.push_text("/>");
            return Ok(());
        }
        builder.push_text(">");

        if let Some((attr, escape)) = content {
            let (value, value_span) = dynamic_value(attr);
            let src = ExprSource::new(self.source, value, value_span.offset());
            let expr = compile_expression(&src, &self.types)?;
            self.expect_scalar(&expr, value_span, &format!("`{}` expression", attr.name))?;
            builder.push(Fragment::Expression { expr, escape });

            // the placeholder body is replaced, but must still compile
            if !is_raw_text_element(&element.name) {
                let document = self.document;
                let mut placeholder = Builder::default();
                for child in document.children(id) {
                    self.compile_node(child, &mut placeholder)?;
                }
            }
        } else if is_raw_text_element(&element.name) {
            let document = self.document;
            for child in document.children(id) {
                if let Node::Text(text) = document.node(child) {
                    builder.push_text(&text.content);
                }
            }
        } else {
            let document = self.document;
            for child in document.children(id) {
                self.compile_node(child, builder)?;
            }
        }

        if element.has_end_tag {
            builder.push_text("</");
            builder.push_text(&element.name);
            builder.push_text(">");
        }
        Ok(())
    }

    fn compile_dynamic_attribute(
        &mut self,
        attribute: &Attribute,
        builder: &mut Builder,
    ) -> Result<(), CompileError> {
        let Some(name) = self.config.directive(&attribute.name) else {
            return Ok(());
        };
        if matches!(name, "for" | "if" | "text" | "html") {
            return Ok(());
        }

        let (value, value_span) = dynamic_value(attribute);
        let src = ExprSource::new(self.source, value, value_span.offset());
        let expr = compile_expression(&src, &self.types)?;
        let boolean = BOOLEAN_ATTRIBUTES.contains(&name);
        if boolean {
            if expr.ty() != &Type::Bool {
                return Err(src
                    .error(
                        value_span,
                        format!("attribute `{name}` must be Bool, found {}", expr.ty()),
                    )
                    .into());
            }
        } else {
            self.expect_scalar(&expr, value_span, &format!("attribute `{name}`"))?;
        }

        builder.push(Fragment::Attribute(AttributeFragment {
            name: name.to_string(),
            expr,
            boolean,
            escape: self.config.escape,
        }));
        Ok(())
    }

    fn directives(&self, element: &'a Element) -> Result<Directives<'a>, ExpressionError> {
        let mut directives = Directives::default();
        for attribute in element.attributes.iter().filter(|a| a.dynamic) {
            let slot = match self.config.directive(&attribute.name) {
                Some("for") => &mut directives.for_,
                Some("if") => &mut directives.if_,
                Some("text") => &mut directives.text,
                Some("html") => &mut directives.html,
                _ => continue,
            };
            if slot.is_some() {
                return Err(self.source.expression_error(
                    attribute.span,
                    format!("duplicate `{}` on <{}>", attribute.name, element.name),
                ));
            }
            *slot = Some(attribute);
        }

        if let (Some(_), Some(html)) = (directives.text, directives.html) {
            return Err(self.source.expression_error(
                html.span,
                format!(
                    "<{}> cannot have both text and html content directives",
                    element.name
                ),
            ));
        }
        Ok(directives)
    }

    fn expect_scalar(
        &self,
        expr: &Expression,
        span: Span,
        what: &str,
    ) -> Result<(), ExpressionError> {
        if expr.ty().is_scalar() {
            return Ok(());
        }
        Err(self.source.expression_error(
            span,
            format!(
                "{what} must be Bool, Int, Float or String, found {}",
                expr.ty()
            ),
        ))
    }
}

/// Value text and span of a dynamic attribute. The parser rejects dynamic
/// attributes without a value, so the fallbacks only cover bare names.
fn dynamic_value(attribute: &Attribute) -> (&str, Span) {
    (
        attribute.value.as_deref().unwrap_or_default(),
        attribute.value_span.unwrap_or(attribute.span),
    )
}

fn list_text<'s>(src: &ExprSource<'s>, list_span: Span) -> &'s str {
    let start = list_span.offset().saturating_sub(src.offset);
    src.text
        .get(start..start + list_span.len())
        .unwrap_or(src.text)
}

fn write_static_attribute(attribute: &Attribute, builder: &mut Builder) {
    builder.push_text(" ");
    builder.push_text(&attribute.name);
    let value = attribute.value.as_deref().unwrap_or_default();
    match attribute.quote {
        Quote::Bare => {}
        Quote::Unquoted => {
            builder.push_text("=");
            builder.push_text(value);
        }
        Quote::Double => {
            builder.push_text("=\"");
            builder.push_text(value);
            builder.push_text("\"");
        }
        Quote::Single => {
            builder.push_text("='");
            builder.push_text(value);
            builder.push_text("'");
        }
    }
}

/// Byte length of an interpolation body: up to the first `}` outside a
/// string literal.
fn find_closing_brace(text: &str) -> Option<usize> {
    let mut quote = None;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '}' => return Some(i),
            None => {}
        }
    }
    None
}
