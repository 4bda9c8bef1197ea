//! Per-render state

use crate::error::{Location, RenderError};
use crate::value::Value;

/// Variable bindings for a single render call: the root context object plus
/// one scope per enclosing loop, innermost last.
///
/// A fresh stack is created for every render, so concurrent renders of one
/// template never share bindings.
#[derive(Debug)]
pub struct CallStack<'a> {
    template: &'a str,
    root: &'a Value,
    scopes: Vec<(&'a str, Value)>,
}

impl<'a> CallStack<'a> {
    pub fn new(template: &'a str, root: &'a Value) -> Self {
        Self {
            template,
            root,
            scopes: Vec::new(),
        }
    }

    pub fn root(&self) -> &'a Value {
        self.root
    }

    pub fn template(&self) -> &'a str {
        self.template
    }

    /// Current value of a loop variable (searches all scopes)
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes
            .iter()
            .rev()
            .find(|(bound, _)| *bound == name)
            .map(|(_, value)| value)
    }

    /// Open a scope binding `name`; it shadows any outer binding of the same
    /// name until [`pop_scope`](Self::pop_scope).
    pub fn push_scope(&mut self, name: &'a str) {
        self.scopes.push((name, Value::Null));
    }

    /// Rebind the variable of the innermost scope
    pub fn set(&mut self, value: Value) {
        if let Some((_, slot)) = self.scopes.last_mut() {
            *slot = value;
        }
    }

    /// Close the innermost scope, un-shadowing whatever it hid
    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub(crate) fn error(&self, location: Location, message: impl Into<String>) -> RenderError {
        RenderError::Eval {
            message: message.into(),
            template: self.template.to_string(),
            location,
        }
    }
}
