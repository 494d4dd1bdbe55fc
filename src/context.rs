use indexmap::IndexMap;

use crate::{
    path::{Path, PathSegment},
    value::Value,
};

/// Caller-supplied variable bindings, looked up by `"$name"` expressions.
///
/// # Examples
///
/// ```
/// use resolve_json::{Value, Variables};
/// use serde_json::json;
///
/// let vars = Variables::from_json(json!({"condition": "has_any"})).with("limit", 3i64);
/// assert_eq!(vars.get("limit"), Some(&Value::Integer(3)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variables {
    bindings: IndexMap<String, Value>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bindings from the keys of a JSON object. Anything else yields no bindings.
    pub fn from_json(json: serde_json::Value) -> Self {
        match Value::from(json) {
            Value::Object(bindings) => Variables { bindings },
            _ => Variables::default(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.bindings.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Binding for `name`. The sentinel is never a binding.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name).filter(|v| !v.is_unresolved())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl From<IndexMap<String, Value>> for Variables {
    fn from(bindings: IndexMap<String, Value>) -> Self {
        Variables { bindings }
    }
}

/// Where an expression is being resolved and with which bindings.
///
/// Entering an iterating transform derives a new context and leaves the
/// outer one untouched.
#[derive(Debug, Clone)]
pub struct ResolveContext<'v> {
    /// Location of the expression being resolved
    pub location: Path,
    /// Bindings supplied by the caller
    pub variables: &'v Variables,
    /// The current element (what `$` refers to) inside an iterating transform
    pub lambda: Option<Value>,
}

impl<'v> ResolveContext<'v> {
    pub fn new(location: Path, variables: &'v Variables) -> Self {
        ResolveContext {
            location,
            variables,
            lambda: None,
        }
    }

    /// Create a new context with lambda item
    pub fn with_lambda(&self, lambda: Value) -> Self {
        ResolveContext {
            location: self.location.clone(),
            variables: self.variables,
            lambda: Some(lambda),
        }
    }

    /// Value of a variable; `"$"` is the current element when there is one.
    pub fn variable(&self, name: &str) -> Option<&Value> {
        match (name, &self.lambda) {
            ("$", Some(lambda)) => Some(lambda),
            _ => self.variables.get(name),
        }
    }

    /// Parent of the current location, the base of relative references.
    pub fn parent_location(&self) -> &[PathSegment] {
        match self.location.split_last() {
            Some((_, parent)) => parent,
            None => &[],
        }
    }
}
