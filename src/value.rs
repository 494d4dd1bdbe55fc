use indexmap::IndexMap;
use rust_decimal::{Decimal, prelude::FromPrimitive};

use crate::path::PathSegment;

/// A JSON value as seen by the resolver, plus the `Unresolved` sentinel.
///
/// Integers and floats are kept apart the way the source JSON spelled them;
/// equality between the two goes through [`Value::strict_eq`], which compares
/// exact decimal values.
///
/// # The sentinel
///
/// [`Value::Unresolved`] marks a location whose value is not known yet. It is
/// never produced by parsing JSON and never a valid variable binding, so it can
/// be told apart from `null` with [`Value::is_unresolved`].
///
/// # Examples
///
/// ```
/// use resolve_json::Value;
/// use serde_json::json;
///
/// let value = Value::from(json!({"name": "Alice", "tags": [1, 2.5]}));
/// assert_eq!(value.get_field("name"), Some(&Value::String("Alice".into())));
/// assert!(!value.is_unresolved());
/// assert!(Value::Unresolved.is_unresolved());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// JSON null
    #[default]
    Null,

    /// JSON boolean (true/false)
    Boolean(bool),

    /// Floating-point number
    Float(f64),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// UTF-8 string
    String(String),

    /// Array of values
    Array(Vec<Value>),

    /// Object with keys in document order
    Object(IndexMap<String, Value>),

    /// Not yet known
    Unresolved,
}

impl Value {
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Value::Unresolved)
    }

    /// True when neither this value nor anything nested inside it is the sentinel.
    pub fn is_fully_resolved(&self) -> bool {
        match self {
            Value::Unresolved => false,
            Value::Array(items) => items.iter().all(Value::is_fully_resolved),
            Value::Object(map) => map.values().all(Value::is_fully_resolved),
            _ => true,
        }
    }

    /// Truthiness as used by `xf_bool`, `xf_invert` and return-value substitution.
    ///
    /// `null`, `false`, `0`, `NaN`, the empty string and the sentinel are falsy.
    /// Every array and object is truthy, empty or not.
    pub fn is_truthy(&self) -> bool {
        use Value::*;
        match self {
            Null | Unresolved => false,
            Boolean(b) => *b,
            Float(n) => *n != 0.0 && !n.is_nan(),
            Integer(n) => *n != 0,
            String(s) => !s.is_empty(),
            Array(_) | Object(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// String coercion used by `xf_join` and resource addresses.
    ///
    /// Integral floats print without a fraction, arrays print their elements
    /// joined by commas (with `null` as the empty string).
    pub fn as_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Float(n) => format_float(*n),
            Value::Integer(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Null => String::new(),
                    other => other.as_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Unresolved => "<unresolved>".to_string(),
        }
    }

    /// Strict equality: structural for containers, exact decimal comparison
    /// between integers and floats, and the sentinel equals nothing.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Unresolved, _) | (_, Value::Unresolved) => false,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                match (Decimal::from_i64(*a), Decimal::from_f64(*b)) {
                    (Some(ad), Some(bd)) => ad == bd,
                    _ => false,
                }
            }
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.strict_eq(y))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other| v.strict_eq(other)))
            }
            (a, b) => a == b,
        }
    }

    /// Field access on objects only.
    pub fn get_field(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Child addressed by one path segment.
    pub fn get_segment(&self, segment: &PathSegment) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(&segment.as_key()),
            Value::Array(items) => segment.as_index().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Nested value at `path`; the empty path is the value itself.
    pub fn get_path(&self, path: &[PathSegment]) -> Option<&Value> {
        path.iter()
            .try_fold(self, |current, segment| current.get_segment(segment))
    }

    /// Export as JSON. The sentinel becomes `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null | Value::Unresolved => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(arr) => serde_json::Value::Array(arr.iter().map(Value::to_json).collect()),
            Value::Object(obj) => serde_json::Value::Object(
                obj.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

fn format_float(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        (if n > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}
