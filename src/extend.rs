//! `xf_inherit` / `xf_extend` merging.
//!
//! An object may list other objects to merge with it:
//!
//! ```json
//! {
//!   "shared": { "color": "red", "size": 2 },
//!   "widget": {
//!     "xf_inherit": ["@/shared"],
//!     "size": 3
//!   }
//! }
//! ```
//!
//! `xf_inherit` entries go under the object (its own keys win), `xf_extend`
//! entries go over it. Entries may be plain objects, references or transforms;
//! anything that does not come out as an object is skipped.

use indexmap::IndexMap;
use tracing::warn;

use crate::{
    context::Variables,
    error::ResolveError,
    literal::Mode,
    node::Document,
    path::{Path, PathSegment},
    resolver::Resolver,
    value::Value,
};

const INHERIT: &str = "xf_inherit";
const EXTEND: &str = "xf_extend";

/// Merge every `xf_inherit` and `xf_extend` list in `value`, recursively.
///
/// References inside the lists are resolved against `value` itself. The
/// `xf_*` keys are kept in the output.
///
/// # Examples
///
/// ```
/// use resolve_json::{Value, Variables, extend};
/// use serde_json::json;
///
/// let doc = Value::from(json!({
///     "base": {"a": 1, "b": 1},
///     "item": {"xf_inherit": ["@/base"], "b": 2},
/// }));
/// let extended = extend(&doc, &Variables::new()).unwrap();
/// let item = extended.get_field("item").unwrap();
/// assert_eq!(item.get_field("a"), Some(&Value::Integer(1)));
/// assert_eq!(item.get_field("b"), Some(&Value::Integer(2)));
/// ```
pub fn extend(value: &Value, variables: &Variables) -> Result<Value, ResolveError> {
    let mut doc = Document::new(value.clone());
    let mut resolver = Resolver::new(&mut doc, variables, Mode::Sync);
    extend_at(&mut resolver, value.clone(), &mut Vec::new())
}

fn extend_at(
    resolver: &mut Resolver<'_, '_>,
    value: Value,
    location: &mut Path,
) -> Result<Value, ResolveError> {
    let Value::Object(mut fields) = value else {
        return Ok(value);
    };

    if let Some(entries) = fields.get(INHERIT).cloned() {
        let mut merged = merge_entries(resolver, &entries, location, INHERIT)?;
        merged.extend(fields);
        fields = merged;
    }

    if let Some(entries) = fields.get(EXTEND).cloned() {
        let merged = merge_entries(resolver, &entries, location, EXTEND)?;
        fields.extend(merged);
    }

    for (key, child) in fields.iter_mut() {
        if matches!(child, Value::Object(_)) {
            location.push(PathSegment::Field(key.clone()));
            *child = extend_at(resolver, std::mem::take(child), location)?;
            location.pop();
        }
    }

    Ok(Value::Object(fields))
}

fn merge_entries(
    resolver: &mut Resolver<'_, '_>,
    entries: &Value,
    location: &[PathSegment],
    key: &str,
) -> Result<IndexMap<String, Value>, ResolveError> {
    let mut merged = IndexMap::new();
    let Value::Array(entries) = entries else {
        warn!(key, "merge list is not an array");
        return Ok(merged);
    };

    let mut entry_location = location.to_vec();
    entry_location.push(PathSegment::from(key));

    for entry in entries {
        let value = resolver.evaluate_detached(entry, entry_location.clone())?;
        if !value.is_fully_resolved() {
            continue;
        }
        match value {
            Value::Object(fields) => merged.extend(fields),
            other => warn!(key, entry = ?other, "merge entry is not an object"),
        }
    }

    Ok(merged)
}
