//! The document arena and the nodes that replace expression literals.
//!
//! A [`Document`] owns every location of a resolved tree as an index-addressed
//! [`Cell`]. Cells start out [`Cell::Raw`]; the first visit either expands a
//! plain container into child cells or turns an expression literal into a
//! [`Node`] that caches its value. Later visits mutate the same cell, so callers
//! hold [`CellId`]s rather than references into the tree.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::{
    literal::{Literal, Mode},
    path::{Path, PathSegment},
    transform::Op,
    value::Value,
};

/// Index of a cell inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(usize);

impl CellId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Content of one location in the document.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Not visited yet: plain data or an expression literal still in source form
    Raw(Value),
    /// Visited object whose children live in their own cells
    Object(IndexMap<String, CellId>),
    /// Visited array whose elements live in their own cells
    Array(Vec<CellId>),
    /// Visited expression
    Node(Node),
}

/// The expression kind of a [`Node`] together with its kind-specific state.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// `"$name"`, `"$"` or `["$", ...path]`
    Variable,
    /// One of the four reference forms
    Reference {
        /// The location the reference reached, once resolved
        abs_path: Option<Path>,
    },
    /// `["xf_<op>", ...args]`
    Transform { op: Op },
    /// `{ method, path, query?, body?, headers? }`, async mode only
    Resource { fetched: bool },
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Variable => "variable",
            NodeKind::Reference { .. } => "reference",
            NodeKind::Transform { .. } => "transform",
            NodeKind::Resource { .. } => "resource",
        }
    }
}

/// A visited expression and everything the resolver learned about it.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// The expression literal as written in the document
    pub definition: Value,
    /// Location of this node
    pub path: Path,
    /// Cached result, [`Value::Unresolved`] until known
    pub value: Value,
    /// Cells this node read while resolving, in discovery order
    pub references: Vec<CellId>,
}

impl Node {
    pub fn new(kind: NodeKind, definition: Value, path: Path) -> Self {
        Node {
            kind,
            definition,
            path,
            value: Value::Unresolved,
            references: Vec::new(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        !self.value.is_unresolved()
    }

    /// Resolved with no pending leaf inside. A reference to a container holds
    /// a snapshot that may be resolved without being complete.
    pub fn is_complete(&self) -> bool {
        self.value.is_fully_resolved()
    }

    pub fn is_unfetched_resource(&self) -> bool {
        matches!(self.kind, NodeKind::Resource { fetched: false })
    }

    pub fn is_fetched(&self) -> bool {
        matches!(self.kind, NodeKind::Resource { fetched: true })
    }

    pub fn abs_path(&self) -> Option<&Path> {
        match &self.kind {
            NodeKind::Reference { abs_path } => abs_path.as_ref(),
            _ => None,
        }
    }
}

/// A JSON document under resolution.
///
/// # Examples
///
/// ```
/// use resolve_json::{Document, Variables, resolve, to_plain_object};
/// use serde_json::json;
///
/// let mut doc = Document::from_json(json!({"a": {"b": 42}, "ref": "@/a/b"}));
/// resolve(&mut doc, &Variables::new()).unwrap();
/// assert_eq!(to_plain_object(&doc).to_json(), json!({"a": {"b": 42}, "ref": 42}));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    cells: Vec<Cell>,
    root: CellId,
}

impl Document {
    pub fn new(value: impl Into<Value>) -> Self {
        Document {
            cells: vec![Cell::Raw(value.into())],
            root: CellId(0),
        }
    }

    pub fn from_json(json: serde_json::Value) -> Self {
        Document::new(Value::from(json))
    }

    pub fn root(&self) -> CellId {
        self.root
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.0]
    }

    pub(crate) fn cell_mut(&mut self, id: CellId) -> &mut Cell {
        &mut self.cells[id.0]
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn node(&self, id: CellId) -> Option<&Node> {
        match self.cell(id) {
            Cell::Node(node) => Some(node),
            _ => None,
        }
    }

    pub(crate) fn node_mut(&mut self, id: CellId) -> Option<&mut Node> {
        match self.cell_mut(id) {
            Cell::Node(node) => Some(node),
            _ => None,
        }
    }

    fn alloc(&mut self, cell: Cell) -> CellId {
        self.cells.push(cell);
        CellId(self.cells.len() - 1)
    }

    /// Cell at `path` among the locations visited so far.
    pub fn find(&self, path: &[PathSegment]) -> Option<CellId> {
        path.iter().try_fold(self.root, |id, segment| match self.cell(id) {
            Cell::Object(children) => children.get(&segment.as_key()).copied(),
            Cell::Array(children) => segment.as_index().and_then(|i| children.get(i).copied()),
            _ => None,
        })
    }

    /// Node at `path`, if that location holds a visited expression.
    pub fn node_at(&self, path: &[PathSegment]) -> Option<&Node> {
        self.find(path).and_then(|id| self.node(id))
    }

    /// Expand a raw plain container into child cells. Returns whether `id` is
    /// a container afterwards.
    pub(crate) fn materialize(&mut self, id: CellId, mode: Mode) -> bool {
        match self.cell(id) {
            Cell::Object(_) | Cell::Array(_) => return true,
            Cell::Node(_) => return false,
            Cell::Raw(value) => {
                let is_container = matches!(value, Value::Object(_) | Value::Array(_));
                if !is_container || Literal::classify(value, mode).is_expression() {
                    return false;
                }
            }
        }

        let Cell::Raw(value) = std::mem::replace(self.cell_mut(id), Cell::Raw(Value::Null)) else {
            unreachable!("checked above");
        };

        let expanded = match value {
            Value::Object(map) => Cell::Object(
                map.into_iter()
                    .map(|(key, child)| (key, self.alloc(Cell::Raw(child))))
                    .collect(),
            ),
            Value::Array(items) => Cell::Array(
                items
                    .into_iter()
                    .map(|child| self.alloc(Cell::Raw(child)))
                    .collect(),
            ),
            _ => unreachable!("checked above"),
        };
        *self.cell_mut(id) = expanded;
        true
    }

    /// Replace the raw expression literal in `id` with a fresh node.
    pub(crate) fn install(&mut self, id: CellId, kind: NodeKind, path: Path) {
        let definition = match std::mem::replace(self.cell_mut(id), Cell::Raw(Value::Null)) {
            Cell::Raw(value) => value,
            other => {
                *self.cell_mut(id) = other;
                return;
            }
        };
        *self.cell_mut(id) = Cell::Node(Node::new(kind, definition, path));
    }

    /// Child of a container cell, expanding it first if it is still raw.
    pub(crate) fn child(&mut self, id: CellId, segment: &PathSegment, mode: Mode) -> Option<CellId> {
        if !self.materialize(id, mode) {
            return None;
        }
        match self.cell(id) {
            Cell::Object(children) => children.get(&segment.as_key()).copied(),
            Cell::Array(children) => segment.as_index().and_then(|i| children.get(i).copied()),
            _ => None,
        }
    }

    /// Child cells of a container in document order, paired with their segment.
    pub(crate) fn children(&self, id: CellId) -> Vec<(PathSegment, CellId)> {
        match self.cell(id) {
            Cell::Object(children) => children
                .iter()
                .map(|(key, child)| (PathSegment::Field(key.clone()), *child))
                .collect(),
            Cell::Array(children) => children
                .iter()
                .enumerate()
                .map(|(i, child)| (PathSegment::Index(i), *child))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Resource nodes `id` depends on, directly or through other nodes.
    pub fn resources_of(&self, id: CellId) -> Vec<CellId> {
        let mut seen = HashSet::from([id]);
        let mut stack: Vec<CellId> = self
            .node(id)
            .map(|n| n.references.clone())
            .unwrap_or_default();
        let mut resources = Vec::new();

        while let Some(next) = stack.pop() {
            if !seen.insert(next) {
                continue;
            }
            if let Some(node) = self.node(next) {
                if matches!(node.kind, NodeKind::Resource { .. }) {
                    resources.push(next);
                }
                stack.extend(node.references.iter().copied());
            }
        }

        resources.sort();
        resources
    }
}
