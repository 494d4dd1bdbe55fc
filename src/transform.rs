use tracing::warn;

use crate::{
    date,
    error::ResolveError,
    literal::{Literal, Mode},
    path::PathSegment,
    value::Value,
};

/// A transform operator, named by its `xf_` tag in documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// `["xf_bool", ...args]` - true iff every argument is truthy
    Bool,
    /// `["xf_concat", ...args]` - one-level flattening concatenation
    Concat,
    /// `["xf_dateformat", date, format]`
    DateFormat,
    /// `["xf_eq", a, b, returns?]`
    Eq,
    /// `["xf_first", [candidates...]]`
    First,
    /// `["xf_hoist", value]` - first element of an array
    Hoist,
    /// `["xf_invert", value]`
    Invert,
    /// `["xf_join", ...args]` - string concatenation
    Join,
    /// `["xf_map", source, mapper]`
    Map,
    /// `["xf_not_eq", a, b, returns?]`
    NotEq,
    /// `["xf_pick", source, path?]`
    Pick,
    /// `["xf_some", source, comparator, returns?]`
    Some,
}

impl Op {
    pub fn from_tag(tag: &str) -> Option<Op> {
        let op = match tag {
            "xf_bool" => Op::Bool,
            "xf_concat" => Op::Concat,
            "xf_dateformat" => Op::DateFormat,
            "xf_eq" => Op::Eq,
            "xf_first" => Op::First,
            "xf_hoist" => Op::Hoist,
            "xf_invert" => Op::Invert,
            "xf_join" => Op::Join,
            "xf_map" => Op::Map,
            "xf_not_eq" => Op::NotEq,
            "xf_pick" => Op::Pick,
            "xf_some" => Op::Some,
            _ => return None,
        };
        Some(op)
    }

    pub fn tag(self) -> &'static str {
        match self {
            Op::Bool => "xf_bool",
            Op::Concat => "xf_concat",
            Op::DateFormat => "xf_dateformat",
            Op::Eq => "xf_eq",
            Op::First => "xf_first",
            Op::Hoist => "xf_hoist",
            Op::Invert => "xf_invert",
            Op::Join => "xf_join",
            Op::Map => "xf_map",
            Op::NotEq => "xf_not_eq",
            Op::Pick => "xf_pick",
            Op::Some => "xf_some",
        }
    }

    /// Operators whose natural result is a boolean.
    pub fn is_boolean_result(self) -> bool {
        matches!(self, Op::Bool | Op::Eq | Op::NotEq | Op::Invert | Op::Some)
    }

    /// Inclusive argument count bounds, `None` meaning unbounded.
    fn arity(self) -> (usize, Option<usize>, &'static str) {
        match self {
            Op::Bool | Op::Concat | Op::Join => (1, None, "1 or more"),
            Op::DateFormat | Op::Map => (2, Some(2), "2"),
            Op::Eq | Op::NotEq | Op::Some => (2, Some(3), "2 to 3"),
            Op::First | Op::Hoist | Op::Invert => (1, Some(1), "1"),
            Op::Pick => (1, Some(2), "1 to 2"),
        }
    }

    pub fn check_arity(self, found: usize) -> Result<(), ResolveError> {
        let (min, max, expected) = self.arity();
        if found < min || max.is_some_and(|max| found > max) {
            return Err(ResolveError::Arity {
                op: self.tag(),
                expected,
                found,
            });
        }
        Ok(())
    }
}

/// Apply a non-iterating operator to already-resolved arguments.
///
/// `None` means the operator has no value for these inputs (for example
/// picking a missing key), which leaves the transform unresolved. The
/// iterating operators go through [`map`], [`some`] and [`first`] instead and
/// fail here with [`ResolveError::Iterating`].
///
/// # Examples
///
/// ```
/// use resolve_json::{Value, transform::{Op, apply}};
///
/// let args = vec![Value::from("a"), Value::Null, Value::Integer(1)];
/// assert_eq!(apply(Op::Join, &args).unwrap(), Some(Value::from("a1")));
/// ```
pub fn apply(op: Op, args: &[Value]) -> Result<Option<Value>, ResolveError> {
    op.check_arity(args.len())?;

    let result = match op {
        Op::Bool => Some(Value::Boolean(args.iter().all(Value::is_truthy))),
        Op::Concat => Some(concat(args)),
        Op::DateFormat => Some(date::format(&args[0], &args[1])),
        Op::Eq => Some(with_return_value(
            args[0].strict_eq(&args[1]),
            args.get(2),
        )),
        Op::NotEq => Some(with_return_value(
            !args[0].strict_eq(&args[1]),
            args.get(2),
        )),
        Op::Hoist => hoist(&args[0]),
        Op::Invert => Some(Value::Boolean(!args[0].is_truthy())),
        Op::Join => Some(join(args)),
        Op::Pick => pick(&args[0], args.get(1)),
        Op::Map | Op::Some | Op::First => return Err(ResolveError::Iterating(op.tag())),
    };

    Ok(result)
}

fn with_return_value(holds: bool, returns: Option<&Value>) -> Value {
    match returns {
        Some(v) if holds && v.is_truthy() => v.clone(),
        _ => Value::Boolean(holds),
    }
}

fn concat(args: &[Value]) -> Value {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            Value::Array(items) => out.extend(items.iter().cloned()),
            other => out.push(other.clone()),
        }
    }
    Value::Array(out)
}

fn hoist(value: &Value) -> Option<Value> {
    match value {
        Value::Array(items) => items.first().cloned(),
        other => Some(other.clone()),
    }
}

fn join(args: &[Value]) -> Value {
    let joined: String = args
        .iter()
        .filter(|v| !matches!(v, Value::Null))
        .map(Value::as_string)
        .collect();
    Value::String(joined)
}

/// Segments of an `xf_pick` path argument.
///
/// Arrays are segment lists, strings are dot-separated keys, integers are a
/// single index and `null` is no path at all.
fn pick_segments(path: &Value) -> Vec<PathSegment> {
    match path {
        Value::Array(items) => items.iter().filter_map(PathSegment::from_value).collect(),
        Value::String(s) => s
            .split('.')
            .filter(|part| !part.is_empty())
            .map(PathSegment::from)
            .collect(),
        Value::Null => Vec::new(),
        other => PathSegment::from_value(other).into_iter().collect(),
    }
}

fn pick(source: &Value, path: Option<&Value>) -> Option<Value> {
    let segments = path.map(pick_segments).unwrap_or_default();
    source.get_path(&segments).cloned()
}

/// `xf_map`: run `resolve` once per element of `source`.
///
/// A source that is not an array has no mapping. An element whose result still
/// contains the sentinel leaves the whole map unresolved.
pub fn map<F>(source: &Value, mut resolve: F) -> Result<Option<Value>, ResolveError>
where
    F: FnMut(&Value) -> Result<Value, ResolveError>,
{
    let Value::Array(items) = source else {
        warn!(source = ?source, "xf_map source is not an array");
        return Ok(None);
    };

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let mapped = resolve(item)?;
        if !mapped.is_fully_resolved() {
            return Ok(None);
        }
        out.push(mapped);
    }

    Ok(Some(Value::Array(out)))
}

/// `xf_some`: true when any element passes the comparator.
///
/// An element passes when a boolean-result comparator yields `true`, or when the
/// comparator's value strictly equals the element itself. A comparator result
/// that is still pending before any element passed leaves the whole check
/// unresolved.
pub fn some<F>(
    source: &Value,
    comparator: &Value,
    returns: Option<&Value>,
    mut resolve: F,
) -> Result<Option<Value>, ResolveError>
where
    F: FnMut(&Value) -> Result<Value, ResolveError>,
{
    let Value::Array(items) = source else {
        warn!(source = ?source, "xf_some source is not an array");
        return Ok(None);
    };

    let is_boolean_result = Literal::classify(comparator, Mode::Sync).is_boolean_result();

    let mut found = false;
    for item in items {
        let resolved = resolve(item)?;
        if !resolved.is_fully_resolved() {
            return Ok(None);
        }
        if is_boolean_result && resolved == Value::Boolean(true) {
            found = true;
            break;
        }
        if resolved.strict_eq(item) {
            found = true;
            break;
        }
    }

    Ok(Some(with_return_value(found, returns)))
}

/// `xf_first`: the value of the first candidate that passes.
///
/// Boolean-result candidates pass unless they evaluate to `false`; any other
/// candidate passes once its value is known.
pub fn first<F>(candidates: &[Value], mut resolve: F) -> Result<Option<Value>, ResolveError>
where
    F: FnMut(&Value) -> Result<Value, ResolveError>,
{
    for candidate in candidates {
        let is_boolean_result = Literal::classify(candidate, Mode::Sync).is_boolean_result();
        let resolved = resolve(candidate)?;

        if resolved.is_unresolved() {
            continue;
        }
        if is_boolean_result && resolved == Value::Boolean(false) {
            continue;
        }
        return Ok(Some(resolved));
    }

    Ok(None)
}
