//! Typed expressions
//!
//! An expression is parsed from its source text, then resolved against a
//! [`TypeStack`] (loop variables over the root context type). Every
//! identifier, field and method is checked here, at template-load time, so a
//! compiled [`Expression`] always has a known result type. Evaluation only
//! has to deal with values whose runtime shape disagrees with that type.

mod lexer;
mod parser;

pub(crate) use parser::{ForStatement, parse_for_statement};

use crate::error::{ExpressionError, Location, RenderError, Span, TemplateSource};
use crate::runtime::CallStack;
use crate::types::{Method, ObjectType, Type};
use crate::value::Value;
use indexmap::IndexSet;
use parser::Ast;
use std::sync::Arc;

/// Expression text plus where it sits in the template
pub(crate) struct ExprSource<'src> {
    pub template: &'src TemplateSource,
    pub text: &'src str,
    /// Byte offset of `text` in the template
    pub offset: usize,
}

impl<'src> ExprSource<'src> {
    pub fn new(template: &'src TemplateSource, text: &'src str, offset: usize) -> Self {
        Self {
            template,
            text,
            offset,
        }
    }

    pub fn error(&self, span: Span, message: impl Into<String>) -> ExpressionError {
        self.template.expression_error(span, message)
    }
}

/// Compile-time variable bindings: loop variables, innermost last, over the
/// root context type.
#[derive(Debug, Clone)]
pub(crate) struct TypeStack {
    root: Arc<ObjectType>,
    bindings: Vec<(String, Type)>,
}

impl TypeStack {
    pub fn new(root: Arc<ObjectType>) -> Self {
        Self {
            root,
            bindings: Vec::new(),
        }
    }

    pub fn root(&self) -> &Arc<ObjectType> {
        &self.root
    }

    pub fn push(&mut self, name: impl Into<String>, ty: Type) {
        self.bindings.push((name.into(), ty));
    }

    pub fn pop(&mut self) {
        self.bindings.pop();
    }

    /// Innermost binding wins
    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.bindings
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, ty)| ty)
    }

    fn names_in_scope(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .bindings
            .iter()
            .rev()
            .map(|(name, _)| name.clone())
            .collect();
        names.extend(self.root.fields().map(|(name, _)| name.to_string()));
        names.into_iter().collect::<IndexSet<_>>().into_iter().collect()
    }
}

/// A compiled, typed expression
#[derive(Debug, Clone)]
pub struct Expression {
    kind: ExprKind,
    ty: Type,
    location: Location,
}

#[derive(Debug, Clone)]
enum ExprKind {
    Literal(Value),
    List(Vec<Expression>),
    /// A loop variable
    Variable(String),
    /// A field of the root context object
    RootField(String),
    Field {
        base: Box<Expression>,
        name: String,
    },
    /// Host method; `receiver` is `None` for methods of the root context
    Method {
        receiver: Option<Box<Expression>>,
        name: String,
        method: Method,
        args: Vec<Expression>,
    },
    Builtin {
        receiver: Box<Expression>,
        builtin: Builtin,
    },
    Not(Box<Expression>),
}

/// Methods available on every list and string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    Size,
    IsEmpty,
}

impl Builtin {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "size" => Some(Builtin::Size),
            "isEmpty" => Some(Builtin::IsEmpty),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Builtin::Size => "size",
            Builtin::IsEmpty => "isEmpty",
        }
    }

    fn returns(self) -> Type {
        match self {
            Builtin::Size => Type::Int,
            Builtin::IsEmpty => Type::Bool,
        }
    }
}

/// Parse and type-check an expression.
pub(crate) fn compile_expression(
    src: &ExprSource<'_>,
    types: &TypeStack,
) -> Result<Expression, ExpressionError> {
    let ast = parser::parse_expression(src)?;
    Checker { src, types }.check(&ast)
}

/// Type-check the list expression of a parsed for statement.
pub(crate) fn check_for_list(
    src: &ExprSource<'_>,
    types: &TypeStack,
    statement: &ForStatement,
) -> Result<Expression, ExpressionError> {
    Checker { src, types }.check(&statement.list)
}

struct Checker<'a, 'src> {
    src: &'a ExprSource<'src>,
    types: &'a TypeStack,
}

impl Checker<'_, '_> {
    fn typed(&self, kind: ExprKind, ty: Type, span: Span) -> Expression {
        Expression {
            kind,
            ty,
            location: self.src.template.location(span.offset()),
        }
    }

    fn check(&self, ast: &Ast) -> Result<Expression, ExpressionError> {
        match ast {
            Ast::Bool(b, span) => Ok(self.typed(ExprKind::Literal(Value::Bool(*b)), Type::Bool, *span)),
            Ast::Int(i, span) => Ok(self.typed(ExprKind::Literal(Value::Int(*i)), Type::Int, *span)),
            Ast::Float(f, span) => Ok(self.typed(
                ExprKind::Literal(Value::Float(*f)),
                Type::Float,
                *span,
            )),
            Ast::Str(s, span) => Ok(self.typed(
                ExprKind::Literal(Value::String(s.clone())),
                Type::String,
                *span,
            )),
            Ast::List(items, span) => self.check_list(items, *span),
            Ast::Ident(name, span) => self.check_ident(name, *span),
            Ast::Call { name, args, span } => {
                let root = self.types.root();
                let Some(method) = root.method(name) else {
                    return Err(self
                        .src
                        .error(
                            *span,
                            format!("context type `{}` has no method `{name}()`", root.name()),
                        )
                        .with_help(available_members(root)));
                };
                let args = self.check_args(name, method, args, *span)?;
                Ok(self.typed(
                    ExprKind::Method {
                        receiver: None,
                        name: name.clone(),
                        method: method.clone(),
                        args,
                    },
                    method.returns().clone(),
                    *span,
                ))
            }
            Ast::Field { base, name, span } => {
                let base = self.check(base)?;
                let field_ty = match &base.ty {
                    Type::Object(object) => match object.field(name) {
                        Some(ty) => ty.clone(),
                        None => {
                            return Err(self
                                .src
                                .error(
                                    *span,
                                    format!("type `{}` has no field `{name}`", object.name()),
                                )
                                .with_help(available_members(object)));
                        }
                    },
                    other => {
                        return Err(self
                            .src
                            .error(*span, format!("type `{other}` has no field `{name}`")));
                    }
                };
                Ok(self.typed(
                    ExprKind::Field {
                        base: Box::new(base),
                        name: name.clone(),
                    },
                    field_ty,
                    *span,
                ))
            }
            Ast::Method {
                base,
                name,
                args,
                span,
            } => self.check_method(base, name, args, *span),
            Ast::Not(inner, span) => {
                let inner = self.check(inner)?;
                if inner.ty != Type::Bool {
                    return Err(self.src.error(
                        *span,
                        format!("`!` needs a Bool operand, found {}", inner.ty),
                    ));
                }
                Ok(self.typed(ExprKind::Not(Box::new(inner)), Type::Bool, *span))
            }
        }
    }

    fn check_list(&self, items: &[Ast], span: Span) -> Result<Expression, ExpressionError> {
        let items = items
            .iter()
            .map(|item| self.check(item))
            .collect::<Result<Vec<_>, _>>()?;
        let Some(first) = items.first() else {
            return Err(self
                .src
                .error(span, "cannot infer the element type of an empty list"));
        };
        let element = first.ty.clone();
        if let Some(odd) = items.iter().find(|item| item.ty != element) {
            return Err(self.src.error(
                span,
                format!(
                    "list items must all have one type: expected {element}, found {}",
                    odd.ty
                ),
            ));
        }
        Ok(self.typed(ExprKind::List(items), Type::list(element), span))
    }

    fn check_ident(&self, name: &str, span: Span) -> Result<Expression, ExpressionError> {
        if let Some(ty) = self.types.lookup(name) {
            return Ok(self.typed(ExprKind::Variable(name.to_string()), ty.clone(), span));
        }
        let root = self.types.root();
        if let Some(ty) = root.field(name) {
            return Ok(self.typed(ExprKind::RootField(name.to_string()), ty.clone(), span));
        }
        Err(self
            .src
            .error(span, format!("unknown identifier `{name}`"))
            .with_help(format!(
                "available: {}",
                self.types.names_in_scope().join(", ")
            )))
    }

    fn check_method(
        &self,
        base: &Ast,
        name: &str,
        args: &[Ast],
        span: Span,
    ) -> Result<Expression, ExpressionError> {
        let receiver = self.check(base)?;

        if let Some(object) = receiver.ty.as_object().cloned() {
            let Some(method) = object.method(name).cloned() else {
                return Err(self
                    .src
                    .error(
                        span,
                        format!("type `{}` has no method `{name}()`", object.name()),
                    )
                    .with_help(available_members(&object)));
            };
            let args = self.check_args(name, &method, args, span)?;
            let returns = method.returns().clone();
            return Ok(self.typed(
                ExprKind::Method {
                    receiver: Some(Box::new(receiver)),
                    name: name.to_string(),
                    method,
                    args,
                },
                returns,
                span,
            ));
        }

        let builtin = Builtin::from_name(name)
            .filter(|_| matches!(receiver.ty, Type::List(_) | Type::String));
        let Some(builtin) = builtin else {
            return Err(self.src.error(
                span,
                format!("type `{}` has no method `{name}()`", receiver.ty),
            ));
        };
        if !args.is_empty() {
            return Err(self.src.error(
                span,
                format!(
                    "method `{}()` takes no arguments, found {}",
                    builtin.name(),
                    args.len()
                ),
            ));
        }
        Ok(self.typed(
            ExprKind::Builtin {
                receiver: Box::new(receiver),
                builtin,
            },
            builtin.returns(),
            span,
        ))
    }

    fn check_args(
        &self,
        name: &str,
        method: &Method,
        args: &[Ast],
        span: Span,
    ) -> Result<Vec<Expression>, ExpressionError> {
        let params = method.params();
        if args.len() != params.len() {
            return Err(self.src.error(
                span,
                format!(
                    "method `{name}()` takes {} argument(s), found {}",
                    params.len(),
                    args.len()
                ),
            ));
        }
        args.iter()
            .zip(params)
            .enumerate()
            .map(|(i, (arg, param))| {
                let arg_span = arg.span();
                let arg = self.check(arg)?;
                if &arg.ty != param {
                    return Err(self.src.error(
                        arg_span,
                        format!(
                            "argument {} of `{name}()` must be {param}, found {}",
                            i + 1,
                            arg.ty
                        ),
                    ));
                }
                Ok(arg)
            })
            .collect()
    }
}

fn available_members(object: &ObjectType) -> String {
    let members = object.member_names();
    if members.is_empty() {
        format!("`{}` declares no fields or methods", object.name())
    } else {
        format!("available: {}", members.join(", "))
    }
}

impl Expression {
    /// The statically resolved result type
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub(crate) fn eval(&self, stack: &CallStack<'_>) -> Result<Value, RenderError> {
        match &self.kind {
            ExprKind::Literal(value) => Ok(value.clone()),
            ExprKind::List(items) => items
                .iter()
                .map(|item| item.eval(stack))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            ExprKind::Variable(name) => stack.lookup(name).cloned().ok_or_else(|| {
                stack.error(self.location, format!("variable `{name}` is not bound"))
            }),
            ExprKind::RootField(name) => self.read_field(stack, stack.root(), name),
            ExprKind::Field { base, name } => {
                let value = base.eval(stack)?;
                self.read_field(stack, &value, name)
            }
            ExprKind::Method {
                receiver,
                name,
                method,
                args,
            } => {
                let owned;
                let receiver = match receiver {
                    Some(expr) => {
                        owned = expr.eval(stack)?;
                        &owned
                    }
                    None => stack.root(),
                };
                if receiver.is_null() {
                    return Err(stack.error(self.location, format!("cannot call `{name}()` on null")));
                }
                let args = args
                    .iter()
                    .map(|arg| arg.eval(stack))
                    .collect::<Result<Vec<_>, _>>()?;
                let value = method.invoke(receiver, &args).map_err(|e| {
                    stack.error(self.location, format!("method `{name}()` failed: {e}"))
                })?;
                self.conform(stack, value)
            }
            ExprKind::Builtin { receiver, builtin } => {
                let value = receiver.eval(stack)?;
                let len = match (&receiver.ty, &value) {
                    (Type::List(_), Value::List(items)) => items.len(),
                    (Type::String, Value::String(s)) => s.chars().count(),
                    (_, Value::Null) => {
                        return Err(stack.error(
                            self.location,
                            format!("cannot call `{}()` on null", builtin.name()),
                        ));
                    }
                    (ty, other) => {
                        return Err(stack.error(
                            self.location,
                            format!(
                                "cannot call `{}()`: expected {ty}, found {}",
                                builtin.name(),
                                other.type_name()
                            ),
                        ));
                    }
                };
                Ok(match builtin {
                    Builtin::Size => Value::Int(i64::try_from(len).unwrap_or(i64::MAX)),
                    Builtin::IsEmpty => Value::Bool(len == 0),
                })
            }
            ExprKind::Not(inner) => match inner.eval(stack)? {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                other => Err(stack.error(
                    self.location,
                    format!("expected bool, found {}", other.type_name()),
                )),
            },
        }
    }

    /// Check a runtime value against the declared type. Null conforms to
    /// every type.
    pub(crate) fn conform(&self, stack: &CallStack<'_>, value: Value) -> Result<Value, RenderError> {
        if value.conforms(&self.ty) {
            return Ok(value);
        }
        Err(stack.error(
            self.location,
            format!("expected {}, found {}", self.ty, value.type_name()),
        ))
    }

    fn read_field(
        &self,
        stack: &CallStack<'_>,
        value: &Value,
        name: &str,
    ) -> Result<Value, RenderError> {
        match value {
            Value::Object(fields) => fields.get(name).cloned().ok_or_else(|| {
                stack.error(self.location, format!("object has no field `{name}`"))
            }),
            Value::Null => Err(stack.error(
                self.location,
                format!("cannot read field `{name}` of null"),
            )),
            other => Err(stack.error(
                self.location,
                format!("cannot read field `{name}` of {}", other.type_name()),
            )),
        }
    }
}
