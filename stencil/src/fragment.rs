//! Compiled fragments
//!
//! A fragment tree is the executable form of a template. It is built once by
//! the compiler and never mutated; all per-render state lives in the
//! [`CallStack`] and the output buffer passed to [`Fragment::render`].

use crate::config::Escape;
use crate::error::RenderError;
use crate::escape::write_escaped;
use crate::expr::Expression;
use crate::runtime::CallStack;
use crate::types::Type;
use crate::value::Value;

#[derive(Debug, Clone)]
pub enum Fragment {
    /// Pre-rendered static output
    Text(String),
    /// An interpolated value (`#{}`, `c:text`, `c:html`)
    Expression { expr: Expression, escape: Escape },
    /// A dynamic attribute, written with its leading space
    Attribute(AttributeFragment),
    /// Children rendered in document order
    Container(Vec<Fragment>),
    For(ForFragment),
    If { condition: Expression, body: Box<Fragment> },
}

#[derive(Debug, Clone)]
pub struct AttributeFragment {
    pub(crate) name: String,
    pub(crate) expr: Expression,
    /// Emit the bare name when true, nothing when false
    pub(crate) boolean: bool,
    pub(crate) escape: Escape,
}

/// Repeats its body once per list item with the loop variable bound
#[derive(Debug, Clone)]
pub struct ForFragment {
    pub(crate) variable: String,
    pub(crate) element_type: Type,
    pub(crate) list: Expression,
    pub(crate) body: Box<Fragment>,
}

impl ForFragment {
    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn element_type(&self) -> &Type {
        &self.element_type
    }

    pub fn list(&self) -> &Expression {
        &self.list
    }

    pub fn body(&self) -> &Fragment {
        &self.body
    }

    fn render<'a>(&'a self, out: &mut String, stack: &mut CallStack<'a>) -> Result<(), RenderError> {
        let items = match self.list.eval(stack)? {
            Value::List(items) => items,
            other => {
                return Err(stack.error(
                    self.list.location(),
                    format!("cannot iterate over {}", other.type_name()),
                ));
            }
        };

        stack.push_scope(&self.variable);
        let result = items.into_iter().enumerate().try_for_each(|(index, item)| {
            if !item.conforms(&self.element_type) {
                return Err(stack.error(
                    self.list.location(),
                    format!(
                        "item {index} of `{}`: expected {}, found {}",
                        self.variable,
                        self.element_type,
                        item.type_name()
                    ),
                ));
            }
            stack.set(item);
            self.body.render(out, stack)
        });
        stack.pop_scope();
        result
    }
}

impl Fragment {
    /// Render into `out`.
    pub fn render<'a>(&'a self, out: &mut String, stack: &mut CallStack<'a>) -> Result<(), RenderError> {
        match self {
            Fragment::Text(text) => out.push_str(text),
            Fragment::Expression { expr, escape } => {
                let value = expr.conform(stack, expr.eval(stack)?)?;
                write_escaped(out, &value.to_text(), *escape);
            }
            Fragment::Attribute(attribute) => attribute.render(out, stack)?,
            Fragment::Container(children) => {
                for child in children {
                    child.render(out, stack)?;
                }
            }
            Fragment::For(fragment) => fragment.render(out, stack)?,
            Fragment::If { condition, body } => match condition.eval(stack)? {
                Value::Bool(true) => body.render(out, stack)?,
                Value::Bool(false) => {}
                other => {
                    return Err(stack.error(
                        condition.location(),
                        format!("condition must be bool, found {}", other.type_name()),
                    ));
                }
            },
        }
        Ok(())
    }
}

impl AttributeFragment {
    fn render(&self, out: &mut String, stack: &CallStack<'_>) -> Result<(), RenderError> {
        let value = self.expr.conform(stack, self.expr.eval(stack)?)?;
        match (&value, self.boolean) {
            (Value::Null, _) | (Value::Bool(false), true) => {}
            (Value::Bool(true), true) => {
                out.push(' ');
                out.push_str(&self.name);
            }
            (other, true) => {
                return Err(stack.error(
                    self.expr.location(),
                    format!(
                        "attribute `{}` expects bool, found {}",
                        self.name,
                        other.type_name()
                    ),
                ));
            }
            (value, false) => {
                out.push(' ');
                out.push_str(&self.name);
                out.push_str("=\"");
                write_escaped(out, &value.to_text(), self.escape);
                out.push('"');
            }
        }
        Ok(())
    }
}
