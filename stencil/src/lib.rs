#![warn(missing_debug_implementations)]

//! Statically typed HTML templates
//!
//! Templates are plain markup with a few dynamic pieces:
//!
//! ```text
//! #{expr}                         - Escaped interpolation in text
//! <li c:for="item:items">         - Repeat the element per list item
//! <p c:if="!items.isEmpty()">     - Render the element when true
//! <span c:text="user.name">       - Replace the body, escaped
//! <div c:html="page.body">        - Replace the body, unescaped
//! <a c:href="item.url">           - Dynamic attribute
//! ```
//!
//! A template is compiled once against a declared context type. Every
//! identifier, field and method is resolved at that point, so a typo or a
//! loop over something that is not a list is a [`CompileError`] when the
//! template is loaded, never a surprise in production. Rendering a compiled
//! template only fails when a runtime value does not have the declared shape.
//!
//! # Example
//!
//! ```
//! use stencil::{ObjectType, Type, Value};
//!
//! let item = ObjectType::builder("Item")
//!     .field("name", Type::String)
//!     .build();
//! let page = ObjectType::builder("Page")
//!     .field("items", Type::list(Type::object(item)))
//!     .build();
//!
//! let template = stencil::compile(
//!     "list.html",
//!     r#"<ul><li c:for="item:items">#{item.name}</li></ul>"#,
//!     page,
//! )?;
//!
//! let context = Value::object([(
//!     "items",
//!     Value::from(vec![
//!         Value::object([("name", "a & b")]),
//!         Value::object([("name", "c")]),
//!     ]),
//! )]);
//! assert_eq!(
//!     template.render(&context)?,
//!     "<ul><li>a &amp; b</li><li>c</li></ul>"
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod compiler;
mod config;
mod error;
mod escape;
mod expr;
mod fragment;
mod lexer;
mod node;
mod parser;
mod runtime;
mod template;
mod types;
mod value;

pub use config::{Escape, TemplateConfig};
pub use error::{
    CompileError, ExpressionError, LexError, Location, ParseError, RenderError, Span,
    TemplateSource,
};
pub use escape::escape_html;
pub use expr::Expression;
pub use fragment::{AttributeFragment, ForFragment, Fragment};
pub use node::{Attribute, Comment, Document, Element, Node, NodeId, Quote, Text};
pub use parser::{parse, parse_with};
pub use runtime::CallStack;
pub use template::{Engine, Template, compile, compile_with};
pub use types::{BoxError, Method, MethodFn, ObjectType, ObjectTypeBuilder, Type};
pub use value::Value;
