//! Syntax tree for parsed markup
//!
//! Nodes live in an [`indextree`] arena owned by the [`Document`]; children
//! are reached through the arena rather than through parent pointers. The
//! tree is built once by the parser and only read afterwards.

use crate::error::Span;
use indextree::Arena;

pub use indextree::NodeId;

/// A node in the markup tree
#[derive(Debug, Clone)]
pub enum Node {
    /// The root container
    Document,
    Element(Element),
    Text(Text),
    Comment(Comment),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }
}

/// Character data between tags
#[derive(Debug, Clone)]
pub struct Text {
    pub content: String,
    pub span: Span,
}

/// A `<!-- -->` comment, delimiters included
#[derive(Debug, Clone)]
pub struct Comment {
    pub content: String,
    pub span: Span,
}

/// An element; its children are stored in the document arena.
#[derive(Debug, Clone)]
pub struct Element {
    /// Tag name (always lower case)
    pub name: String,
    pub attributes: Vec<Attribute>,
    /// The start tag ended with `/>`
    pub start_tag_closed: bool,
    /// A matching `</name>` was found
    pub has_end_tag: bool,
    /// Span of `<name`
    pub span: Span,
}

impl Element {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            start_tag_closed: false,
            has_end_tag: false,
            span,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// How an attribute value was written in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Double,
    Single,
    /// `name=value`
    Unquoted,
    /// `name` with no value at all
    Bare,
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    /// Raw value without quotes; `None` for a bare attribute
    pub value: Option<String>,
    pub quote: Quote,
    /// The value is an expression to compile rather than literal text
    pub dynamic: bool,
    /// Span of the attribute name
    pub span: Span,
    /// Span of the value text, excluding quotes
    pub value_span: Option<Span>,
}

/// The root of a parsed template
#[derive(Debug, Clone)]
pub struct Document {
    arena: Arena<Node>,
    root: NodeId,
}

impl Document {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(Node::Document);
        Self { arena, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.arena[id].get()
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.arena[id].get_mut()
    }

    /// Children of `id`, in document order
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    /// All nodes below the root, depth-first in document order
    pub fn descendants(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.root.descendants(&self.arena).skip(1)
    }

    pub(crate) fn append(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = self.arena.new_node(node);
        parent.append(id, &mut self.arena);
        id
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
