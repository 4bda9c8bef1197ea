//! Type descriptors for template contexts
//!
//! The host declares the shape of the context object up front: field names,
//! their types, the element type of every list, and any methods templates may
//! call. Expressions are resolved against these descriptors at compile time
//! only; nothing is introspected while rendering.
//!
//! ```
//! use stencil::{ObjectType, Type};
//!
//! let product = ObjectType::builder("Product")
//!     .field("name", Type::String)
//!     .field("price", Type::Float)
//!     .build();
//!
//! let page = ObjectType::builder("ProductPage")
//!     .field("title", Type::String)
//!     .field("products", Type::list(Type::object(product)))
//!     .build();
//!
//! assert_eq!(page.field("products").unwrap().to_string(), "List<Product>");
//! ```

use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Error type returned by host method callbacks
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A host method callback: receives the receiver value and the evaluated
/// arguments.
pub type MethodFn = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, BoxError> + Send + Sync>;

/// The static type of a value or expression
#[derive(Debug, Clone)]
pub enum Type {
    Bool,
    Int,
    Float,
    String,
    List(Box<Type>),
    Object(Arc<ObjectType>),
}

impl Type {
    pub fn list(element: Type) -> Type {
        Type::List(Box::new(element))
    }

    pub fn object(object: Arc<ObjectType>) -> Type {
        Type::Object(object)
    }

    /// Declared element type, if this is a list type
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::List(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<ObjectType>> {
        match self {
            Type::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Scalars are the types that can be written into the output as text.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Bool | Type::Int | Type::Float | Type::String)
    }
}

/// Object types are equal when they are the same descriptor or declare the
/// same name, fields and method signatures.
impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Bool, Type::Bool)
            | (Type::Int, Type::Int)
            | (Type::Float, Type::Float)
            | (Type::String, Type::String) => true,
            (Type::List(a), Type::List(b)) => a == b,
            (Type::Object(a), Type::Object(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => f.write_str("Bool"),
            Type::Int => f.write_str("Int"),
            Type::Float => f.write_str("Float"),
            Type::String => f.write_str("String"),
            Type::List(element) => write!(f, "List<{element}>"),
            Type::Object(object) => f.write_str(&object.name),
        }
    }
}

/// A method callable from templates
#[derive(Clone)]
pub struct Method {
    params: Vec<Type>,
    returns: Type,
    call: MethodFn,
}

impl Method {
    pub fn params(&self) -> &[Type] {
        &self.params
    }

    pub fn returns(&self) -> &Type {
        &self.returns
    }

    pub(crate) fn invoke(&self, receiver: &Value, args: &[Value]) -> Result<Value, BoxError> {
        (self.call)(receiver, args)
    }
}

/// Signatures only; the callbacks are not compared.
impl PartialEq for Method {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params && self.returns == other.returns
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("params", &self.params)
            .field("returns", &self.returns)
            .finish_non_exhaustive()
    }
}

/// A host-declared object type: named, with ordered fields and methods
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    name: String,
    fields: IndexMap<String, Type>,
    methods: IndexMap<String, Method>,
}

impl ObjectType {
    pub fn builder(name: impl Into<String>) -> ObjectTypeBuilder {
        ObjectTypeBuilder {
            object: ObjectType {
                name: name.into(),
                fields: IndexMap::new(),
                methods: IndexMap::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self, name: &str) -> Option<&Type> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Type)> {
        self.fields.iter().map(|(name, ty)| (name.as_str(), ty))
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    /// Field names, then method names as `name()`, for diagnostics
    pub(crate) fn member_names(&self) -> Vec<String> {
        self.fields
            .keys()
            .cloned()
            .chain(self.methods.keys().map(|m| format!("{m}()")))
            .collect()
    }
}

/// Builder for [`ObjectType`]
#[derive(Debug)]
pub struct ObjectTypeBuilder {
    object: ObjectType,
}

impl ObjectTypeBuilder {
    pub fn field(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.object.fields.insert(name.into(), ty);
        self
    }

    pub fn method<P, F>(mut self, name: impl Into<String>, params: P, returns: Type, call: F) -> Self
    where
        P: IntoIterator<Item = Type>,
        F: Fn(&Value, &[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.object.methods.insert(
            name.into(),
            Method {
                params: params.into_iter().collect(),
                returns,
                call: Arc::new(call),
            },
        );
        self
    }

    pub fn build(self) -> Arc<ObjectType> {
        Arc::new(self.object)
    }
}
