//! Classification of raw document values into expression literals.
//!
//! Strings and arrays of particular shapes are expressions rather than data:
//!
//! | shape | kind |
//! |---|---|
//! | `"$name"`, `"$"`, `["$", ...path]` | variable |
//! | `["xf_<op>", ...args]` | transform |
//! | `"@/a/b"`, `["@@/a", ...args]` | absolute reference |
//! | `"@a/b"`, `["@@a", ...args]` | relative reference |
//! | `{ "method": .., "path": .., .. }` | resource (async mode, tree locations only) |
//!
//! When a value matches more than one shape, the first row wins.

use indexmap::IndexMap;

use crate::{transform::Op, value::Value};

/// Which shapes are recognised as expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Resource objects are plain data
    Sync,
    /// Resource objects become resource nodes
    Async,
}

/// A variable expression: a binding name plus optional path arguments into it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableDef<'a> {
    /// Binding name, `"$"` for the current element of an iterating transform
    pub name: &'a str,
    pub args: &'a [Value],
}

/// One of the four reference forms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReferenceDef<'a> {
    AbsoluteString(&'a str),
    AbsoluteArray(&'a str, &'a [Value]),
    RelativeString(&'a str),
    RelativeArray(&'a str, &'a [Value]),
}

impl<'a> ReferenceDef<'a> {
    /// The string carrying the address prefix.
    pub fn head(&self) -> &'a str {
        match self {
            ReferenceDef::AbsoluteString(s)
            | ReferenceDef::AbsoluteArray(s, _)
            | ReferenceDef::RelativeString(s)
            | ReferenceDef::RelativeArray(s, _) => s,
        }
    }

    /// Path arguments of the array forms.
    pub fn args(&self) -> &'a [Value] {
        match self {
            ReferenceDef::AbsoluteArray(_, args) | ReferenceDef::RelativeArray(_, args) => args,
            _ => &[],
        }
    }

    pub fn is_relative(&self) -> bool {
        matches!(
            self,
            ReferenceDef::RelativeString(_) | ReferenceDef::RelativeArray(..)
        )
    }
}

/// A raw value sorted into the expression kind it spells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal<'a> {
    Variable(VariableDef<'a>),
    Transform { tag: &'a str, args: &'a [Value] },
    Reference(ReferenceDef<'a>),
    Resource(&'a IndexMap<String, Value>),
    Plain,
}

impl<'a> Literal<'a> {
    /// Sort `value` into an expression kind, in priority order
    /// variable > transform > reference > resource > plain.
    pub fn classify(value: &'a Value, mode: Mode) -> Literal<'a> {
        match value {
            Value::String(s) if s.starts_with('$') => Literal::Variable(VariableDef {
                name: variable_name(s),
                args: &[],
            }),
            Value::String(s) if s.starts_with('@') => {
                if s.starts_with("@/") {
                    Literal::Reference(ReferenceDef::AbsoluteString(s))
                } else {
                    Literal::Reference(ReferenceDef::RelativeString(s))
                }
            }
            Value::Array(items) => match items.split_first() {
                Some((Value::String(head), args)) => {
                    if head == "$" {
                        Literal::Variable(VariableDef { name: head, args })
                    } else if head.starts_with("xf_") {
                        Literal::Transform { tag: head, args }
                    } else if head.starts_with("@@/") {
                        Literal::Reference(ReferenceDef::AbsoluteArray(head, args))
                    } else if head.starts_with("@@") {
                        Literal::Reference(ReferenceDef::RelativeArray(head, args))
                    } else {
                        Literal::Plain
                    }
                }
                _ => Literal::Plain,
            },
            Value::Object(map)
                if mode == Mode::Async && map.contains_key("method") && map.contains_key("path") =>
            {
                Literal::Resource(map)
            }
            _ => Literal::Plain,
        }
    }

    pub fn is_expression(&self) -> bool {
        !matches!(self, Literal::Plain)
    }

    /// True for transforms whose natural result is a boolean.
    pub fn is_boolean_result(&self) -> bool {
        match self {
            Literal::Transform { tag, .. } => {
                Op::from_tag(tag).is_some_and(|op| op.is_boolean_result())
            }
            _ => false,
        }
    }
}

fn variable_name(s: &str) -> &str {
    if s == "$" { s } else { &s[1..] }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classify(v: serde_json::Value) -> String {
        let value = Value::from(v);
        let kind = match Literal::classify(&value, Mode::Async) {
            Literal::Variable(_) => "variable",
            Literal::Transform { .. } => "transform",
            Literal::Reference(ReferenceDef::AbsoluteString(_)) => "abs-string",
            Literal::Reference(ReferenceDef::AbsoluteArray(..)) => "abs-array",
            Literal::Reference(ReferenceDef::RelativeString(_)) => "rel-string",
            Literal::Reference(ReferenceDef::RelativeArray(..)) => "rel-array",
            Literal::Resource(_) => "resource",
            Literal::Plain => "plain",
        };
        kind.to_string()
    }

    #[test]
    fn test_shapes() {
        assert_eq!(classify(json!("$user")), "variable");
        assert_eq!(classify(json!("$")), "variable");
        assert_eq!(classify(json!(["$", "name"])), "variable");
        assert_eq!(classify(json!(["xf_join", "a"])), "transform");
        assert_eq!(classify(json!("@/a/b")), "abs-string");
        assert_eq!(classify(json!("@a/b")), "rel-string");
        // Only `@/` makes a scalar absolute.
        assert_eq!(classify(json!("@@/a")), "rel-string");
        assert_eq!(classify(json!(["@@/a", "b"])), "abs-array");
        assert_eq!(classify(json!(["@@a", "b"])), "rel-array");
        assert_eq!(classify(json!({"method": "GET", "path": "x"})), "resource");
        assert_eq!(classify(json!(["@/a", "@/b"])), "plain");
        assert_eq!(classify(json!("plain")), "plain");
        assert_eq!(classify(json!(42)), "plain");
    }

    #[test]
    fn test_priority_order() {
        // A bare `$` head wins over everything after it.
        assert_eq!(classify(json!(["$", "@@/a"])), "variable");
        // Arrays that merely start with a variable are plain data.
        assert_eq!(classify(json!(["$one", "$two", "@/three"])), "plain");
        // A transform head is never read as a reference.
        assert_eq!(classify(json!(["xf_pick", "@@/a"])), "transform");
        // A resource whose path is itself an expression is still a resource.
        assert_eq!(
            classify(json!({"method": "GET", "path": ["xf_join", "a", "$b"]})),
            "resource"
        );
    }

    #[test]
    fn test_resources_are_plain_in_sync_mode() {
        let value = Value::from(json!({"method": "GET", "path": "x"}));
        assert_eq!(Literal::classify(&value, Mode::Sync), Literal::Plain);
    }

    #[test]
    fn test_variable_names() {
        let value = Value::from(json!("$users"));
        match Literal::classify(&value, Mode::Sync) {
            Literal::Variable(def) => assert_eq!(def.name, "users"),
            other => panic!("expected variable, got {:?}", other),
        }
    }

    #[test]
    fn test_boolean_result_transforms() {
        for tag in ["xf_bool", "xf_eq", "xf_not_eq", "xf_invert", "xf_some"] {
            let value = Value::from(json!([tag, 1]));
            assert!(Literal::classify(&value, Mode::Sync).is_boolean_result(), "{}", tag);
        }
        let value = Value::from(json!(["xf_join", 1]));
        assert!(!Literal::classify(&value, Mode::Sync).is_boolean_result());
    }
}
