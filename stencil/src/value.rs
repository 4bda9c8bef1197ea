//! Runtime values passed into templates
//!
//! A [`Value`] is the host's context object (and everything reachable from
//! it). Its shape is expected to match the [`Type`](crate::Type) the template
//! was compiled against; mismatches surface as render errors.

use crate::types::Type;
use indexmap::IndexMap;
use std::borrow::Cow;

/// A runtime value in the template
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Build an object value from `(field, value)` pairs.
    pub fn object<I, K, V>(fields: I) -> Value
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        fields.into_iter().collect()
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether the value has the shape of `ty`.
    ///
    /// Null conforms to every type. List items are checked recursively;
    /// object fields are checked when they are read.
    pub fn conforms(&self, ty: &Type) -> bool {
        match (self, ty) {
            (Value::Null, _)
            | (Value::Bool(_), Type::Bool)
            | (Value::Int(_), Type::Int)
            | (Value::Float(_), Type::Float)
            | (Value::String(_), Type::String)
            | (Value::Object(_), Type::Object(_)) => true,
            (Value::List(items), Type::List(element)) => {
                items.iter().all(|item| item.conforms(element))
            }
            _ => false,
        }
    }

    /// Field of an object value
    pub fn get(&self, field: &str) -> Option<&Value> {
        match self {
            Value::Object(fields) => fields.get(field),
            _ => None,
        }
    }

    /// Textual form used when the value is written into the output.
    ///
    /// Null renders as the empty string.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Value::Null => Cow::Borrowed(""),
            Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Value::Int(i) => Cow::Owned(i.to_string()),
            Value::Float(f) => Cow::Owned(f.to_string()),
            Value::String(s) => Cow::Borrowed(s),
            Value::List(items) => {
                let items: Vec<_> = items.iter().map(|v| v.to_text()).collect();
                Cow::Owned(format!("[{}]", items.join(", ")))
            }
            Value::Object(_) => Cow::Borrowed("[object]"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i.into())
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i.into())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Object(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_text() {
        assert_eq!(Value::Null.to_text(), "");
        assert_eq!(Value::from(true).to_text(), "true");
        assert_eq!(Value::from(42).to_text(), "42");
        assert_eq!(Value::from(1.5).to_text(), "1.5");
        assert_eq!(Value::from("hi").to_text(), "hi");
        assert_eq!(Value::from(vec![1, 2]).to_text(), "[1, 2]");
    }

    #[test]
    fn test_object_keeps_field_order() {
        let value = Value::object([("b", 1), ("a", 2)]);
        let Value::Object(fields) = &value else {
            panic!("expected object");
        };
        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(value.get("a"), Some(&Value::Int(2)));
        assert_eq!(Value::from(1).get("a"), None);
    }

    #[test]
    fn test_conforms() {
        let ints = Type::list(Type::Int);
        assert!(Value::from(vec![1, 2]).conforms(&ints));
        assert!(Value::Null.conforms(&ints));
        assert!(Value::from(vec![Value::Null, Value::from(3)]).conforms(&ints));
        assert!(!Value::from(vec!["x"]).conforms(&ints));
        assert!(!Value::from("abc").conforms(&ints));
        assert!(!Value::from(1).conforms(&Type::Float));
        assert!(!Value::from(vec![1]).conforms(&Type::String));
    }

    #[test]
    fn test_option_maps_to_null() {
        assert_eq!(Value::from(None::<&str>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".to_string()));
    }
}
