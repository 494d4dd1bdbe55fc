use crate::{
    node::{Cell, CellId, Document},
    value::Value,
};

/// Flatten a document into a plain value tree.
///
/// Nodes become their cached value, containers are rebuilt and unvisited
/// locations pass through as written. Unresolved nodes project to
/// [`Value::Unresolved`].
///
/// # Examples
///
/// ```
/// use resolve_json::{Document, Variables, resolve, to_plain_object};
/// use serde_json::json;
///
/// let mut doc = Document::from_json(json!({"greeting": ["xf_join", "hi ", "$name"]}));
/// resolve(&mut doc, &Variables::new()).unwrap();
/// assert!(to_plain_object(&doc).get_field("greeting").unwrap().is_unresolved());
/// ```
pub fn to_plain_object(doc: &Document) -> Value {
    project(doc, doc.root())
}

fn project(doc: &Document, id: CellId) -> Value {
    match doc.cell(id) {
        Cell::Raw(value) => value.clone(),
        Cell::Node(node) => node.value.clone(),
        Cell::Array(items) => Value::Array(items.iter().map(|item| project(doc, *item)).collect()),
        Cell::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, child)| (key.clone(), project(doc, *child)))
                .collect(),
        ),
    }
}
