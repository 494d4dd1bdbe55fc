//! The synchronous resolver.
//!
//! [`Resolver`] walks a [`Document`], turning expression literals into
//! [`Node`](crate::node::Node)s and caching every value it can compute. Values
//! it cannot compute yet stay [`Value::Unresolved`]; calling it again with more
//! variables picks up where the last pass stopped.
//!
//! Expressions are evaluated two ways:
//!
//! - at a tree location, where the result is memoized on the node in that cell
//! - immediately, for transform arguments and map templates, where nothing is
//!   written back and every cell looked up is recorded as a dependency of the
//!   node being evaluated

use indexmap::IndexSet;
use tracing::{debug, trace, warn};

use crate::{
    context::{ResolveContext, Variables},
    error::ResolveError,
    fetch::FetchRequest,
    literal::{Literal, Mode, ReferenceDef, VariableDef},
    node::{Cell, CellId, Document, NodeKind},
    path::{self, Path, PathPart, PathSegment, display_path},
    transform::{self, Op},
    value::Value,
};

/// Cells an evaluation read, in discovery order.
pub(crate) type Deps = IndexSet<CellId>;

/// Resolution state for one call against a document.
pub struct Resolver<'d, 'v> {
    doc: &'d mut Document,
    variables: &'v Variables,
    mode: Mode,
    /// Nodes currently being evaluated, innermost last
    stack: Vec<CellId>,
    /// Reference, transform and resource nodes left unresolved by an evaluation
    pending: Vec<CellId>,
}

impl<'d, 'v> Resolver<'d, 'v> {
    pub fn new(doc: &'d mut Document, variables: &'v Variables, mode: Mode) -> Self {
        Resolver {
            doc,
            variables,
            mode,
            stack: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        self.doc
    }

    /// Nodes registered as unresolved since the last call.
    pub(crate) fn take_pending(&mut self) -> Vec<CellId> {
        std::mem::take(&mut self.pending)
    }

    /// Resolve every location of the document.
    pub fn resolve_all(&mut self) -> Result<(), ResolveError> {
        let root = self.doc.root();
        self.resolve_tree(root, &[])
    }

    /// Resolve the location at `path` and return its value.
    ///
    /// A variable node at `path` is re-evaluated even when it already has a
    /// value, so new bindings show up. Containers come back with
    /// [`Value::Unresolved`] at the leaves that are still pending.
    pub fn resolve_at(&mut self, path: &[PathSegment]) -> Result<Value, ResolveError> {
        if let Some(id) = self.locate(path)?
            && matches!(self.doc.node(id).map(|n| &n.kind), Some(NodeKind::Variable))
        {
            self.evaluate_node(id)?;
        }
        self.value_at(path)
    }

    /// Current value at `path`, resolving whatever is still pending on the way.
    pub fn value_at(&mut self, path: &[PathSegment]) -> Result<Value, ResolveError> {
        let mut deps = Deps::new();
        self.lookup(path, &mut deps)
    }

    /// Evaluate a value as if it were written at `location`, without storing
    /// it in the document.
    pub(crate) fn evaluate_detached(&mut self, value: &Value, location: Path) -> Result<Value, ResolveError> {
        let ctx = ResolveContext::new(location, self.variables);
        let mut deps = Deps::new();
        self.resolve_immediate(value, &ctx, &mut deps)
    }

    fn resolve_tree(&mut self, id: CellId, location: &[PathSegment]) -> Result<(), ResolveError> {
        self.visit(id, location)?;

        if let Some(node) = self.doc.node(id) {
            if !node.is_complete() {
                self.evaluate_node(id)?;
            }
            return Ok(());
        }

        for (segment, child) in self.doc.children(id) {
            let mut child_location = location.to_vec();
            child_location.push(segment);
            self.resolve_tree(child, &child_location)?;
        }
        Ok(())
    }

    /// Prepare a cell for reading: expand a plain container, or install a node
    /// over an expression literal.
    fn visit(&mut self, id: CellId, location: &[PathSegment]) -> Result<(), ResolveError> {
        let kind = match self.doc.cell(id) {
            Cell::Raw(value) => match Literal::classify(value, self.mode) {
                Literal::Plain => None,
                Literal::Variable(_) => Some(NodeKind::Variable),
                Literal::Reference(_) => Some(NodeKind::Reference { abs_path: None }),
                Literal::Resource(_) => Some(NodeKind::Resource { fetched: false }),
                Literal::Transform { tag, .. } => {
                    let op = Op::from_tag(tag)
                        .ok_or_else(|| ResolveError::UnknownTransform(tag.to_string()))?;
                    Some(NodeKind::Transform { op })
                }
            },
            _ => return Ok(()),
        };

        match kind {
            Some(kind) => {
                trace!(kind = kind.name(), location = %display_path(location), "new node");
                self.doc.install(id, kind, location.to_vec());
            }
            None => {
                self.doc.materialize(id, self.mode);
            }
        }
        Ok(())
    }

    /// Walk to the cell at `path`. `None` when the path ends inside a node's
    /// value or leaves the document.
    fn locate(&mut self, path: &[PathSegment]) -> Result<Option<CellId>, ResolveError> {
        let mut id = self.doc.root();
        for (depth, segment) in path.iter().enumerate() {
            self.visit(id, &path[..depth])?;
            if self.doc.node(id).is_some() {
                return Ok(None);
            }
            match self.doc.child(id, segment, self.mode) {
                Some(child) => id = child,
                None => return Ok(None),
            }
        }
        self.visit(id, path)?;
        Ok(Some(id))
    }

    /// Re-evaluate a node from its definition and commit what it yields.
    pub(crate) fn evaluate_node(&mut self, id: CellId) -> Result<Value, ResolveError> {
        let Some(node) = self.doc.node(id) else {
            return Ok(Value::Unresolved);
        };
        let kind = node.kind.clone();
        let definition = node.definition.clone();
        let ctx = ResolveContext::new(node.path.clone(), self.variables);

        trace!(kind = kind.name(), location = %display_path(&ctx.location), "evaluating");

        let mut deps = Deps::new();
        self.stack.push(id);
        let outcome = match kind {
            NodeKind::Resource { .. } => self
                .resource_inputs(&definition, &ctx, &mut deps)
                .map(|_| (Value::Unresolved, None)),
            _ => match Literal::classify(&definition, Mode::Sync) {
                Literal::Reference(def) => self.eval_reference(def, &ctx, &mut deps),
                _ => self
                    .resolve_immediate(&definition, &ctx, &mut deps)
                    .map(|v| (v, None)),
            },
        };
        self.stack.pop();

        let (value, abs_path) = outcome?;
        Ok(self.commit(id, value, abs_path, deps))
    }

    fn commit(&mut self, id: CellId, value: Value, abs_path: Option<Path>, deps: Deps) -> Value {
        let Some(node) = self.doc.node_mut(id) else {
            return Value::Unresolved;
        };
        node.references = deps.into_iter().collect();

        if !value.is_fully_resolved() && !matches!(node.kind, NodeKind::Variable) {
            self.pending.push(id);
        }
        if value.is_unresolved() {
            return node.value.clone();
        }

        debug!(
            kind = node.kind.name(),
            location = %display_path(&node.path),
            "committed"
        );
        if let NodeKind::Reference { abs_path: slot } = &mut node.kind {
            *slot = abs_path;
        }
        node.value = value;
        node.value.clone()
    }

    /// Evaluate the inputs of a resource node and build its request when every
    /// input is known. Dependencies found on the way are stored on the node.
    pub(crate) fn resource_request(&mut self, id: CellId) -> Result<Option<FetchRequest>, ResolveError> {
        let Some(node) = self.doc.node(id) else {
            return Ok(None);
        };
        let definition = node.definition.clone();
        let ctx = ResolveContext::new(node.path.clone(), self.variables);

        let mut deps = Deps::new();
        self.stack.push(id);
        let request = self.resource_inputs(&definition, &ctx, &mut deps);
        self.stack.pop();

        if let Some(node) = self.doc.node_mut(id) {
            node.references = deps.into_iter().collect();
        }
        request
    }

    /// Store a fetched response on its resource node.
    pub(crate) fn complete_fetch(&mut self, id: CellId, response: Value) {
        if let Some(node) = self.doc.node_mut(id) {
            debug!(location = %display_path(&node.path), "resource fetched");
            node.kind = NodeKind::Resource { fetched: true };
            node.value = response;
        }
    }

    fn resource_inputs(
        &mut self,
        definition: &Value,
        ctx: &ResolveContext<'_>,
        deps: &mut Deps,
    ) -> Result<Option<FetchRequest>, ResolveError> {
        let Value::Object(fields) = definition else {
            return Ok(None);
        };

        let mut input = |key: &str, this: &mut Self| -> Result<Option<Value>, ResolveError> {
            fields
                .get(key)
                .map(|v| this.resolve_immediate(v, ctx, deps))
                .transpose()
        };

        let method = input("method", self)?.unwrap_or(Value::Unresolved);
        let address = input("path", self)?.unwrap_or(Value::Unresolved);
        let query = input("query", self)?;
        let headers = input("headers", self)?;

        let method = match &method {
            Value::Unresolved => None,
            other => Some(other.as_string().to_uppercase()),
        };
        let body = match &method {
            Some(m) if FetchRequest::has_body(m) => input("body", self)?,
            _ => None,
        };

        let pending = address.is_unresolved()
            || [&query, &body, &headers]
                .into_iter()
                .flatten()
                .any(|v| !v.is_fully_resolved());

        match method {
            Some(method) if !pending => Ok(Some(FetchRequest {
                method,
                address: address.as_string(),
                query,
                body,
                headers,
            })),
            _ => Ok(None),
        }
    }

    /// Whether any of `deps` is, or depends on, a resource not fetched yet.
    /// Always false outside asynchronous calls.
    fn awaits_fetch(&self, deps: &Deps) -> bool {
        self.mode == Mode::Async
            && deps.iter().any(|&id| {
                self.doc.node(id).is_some_and(|n| n.is_unfetched_resource())
                    || self
                        .doc
                        .resources_of(id)
                        .into_iter()
                        .any(|r| self.doc.node(r).is_some_and(|n| n.is_unfetched_resource()))
            })
    }

    /// Value of a node, evaluating it when it is missing or incomplete.
    fn node_value(&mut self, id: CellId, deps: &mut Deps) -> Result<Value, ResolveError> {
        deps.insert(id);
        let Some(node) = self.doc.node(id) else {
            return Ok(Value::Unresolved);
        };
        if node.is_complete() {
            return Ok(node.value.clone());
        }
        if self.stack.contains(&id) {
            return Err(ResolveError::Cycle {
                location: display_path(&node.path),
            });
        }
        self.evaluate_node(id)
    }

    /// Walk from the root to `path`, resolving nodes met on the way.
    ///
    /// Missing locations are [`Value::Unresolved`]; a present `null` is a value.
    fn lookup(&mut self, path: &[PathSegment], deps: &mut Deps) -> Result<Value, ResolveError> {
        let mut id = self.doc.root();

        for (depth, segment) in path.iter().enumerate() {
            self.visit(id, &path[..depth])?;

            if self.doc.node(id).is_some() {
                let value = self.node_value(id, deps)?;
                return Ok(value
                    .get_path(&path[depth..])
                    .cloned()
                    .unwrap_or(Value::Unresolved));
            }

            match self.doc.child(id, segment, self.mode) {
                Some(child) => id = child,
                None => return Ok(Value::Unresolved),
            }
        }

        self.cell_value(id, path, deps)
    }

    /// Snapshot of a cell. Containers are rebuilt from their children.
    fn cell_value(
        &mut self,
        id: CellId,
        location: &[PathSegment],
        deps: &mut Deps,
    ) -> Result<Value, ResolveError> {
        self.visit(id, location)?;

        if self.doc.node(id).is_some() {
            return self.node_value(id, deps);
        }
        if let Cell::Raw(value) = self.doc.cell(id) {
            return Ok(value.clone());
        }

        let is_array = matches!(self.doc.cell(id), Cell::Array(_));
        let children = self.doc.children(id);
        let mut entries = Vec::with_capacity(children.len());
        for (segment, child) in children {
            let mut child_location = location.to_vec();
            child_location.push(segment.clone());
            entries.push((segment, self.cell_value(child, &child_location, deps)?));
        }

        Ok(if is_array {
            Value::Array(entries.into_iter().map(|(_, v)| v).collect())
        } else {
            Value::Object(entries.into_iter().map(|(s, v)| (s.as_key(), v)).collect())
        })
    }

    /// Evaluate `value` without memoizing it anywhere.
    ///
    /// Plain containers are resolved element by element with the same context,
    /// so relative references inside them are based on the expression that
    /// holds them.
    pub(crate) fn resolve_immediate(
        &mut self,
        value: &Value,
        ctx: &ResolveContext<'_>,
        deps: &mut Deps,
    ) -> Result<Value, ResolveError> {
        match Literal::classify(value, Mode::Sync) {
            Literal::Variable(def) => self.eval_variable(def, ctx, deps),
            Literal::Reference(def) => self.eval_reference(def, ctx, deps).map(|(v, _)| v),
            Literal::Transform { tag, args } => {
                let op =
                    Op::from_tag(tag).ok_or_else(|| ResolveError::UnknownTransform(tag.to_string()))?;
                self.eval_transform(op, args, ctx, deps)
            }
            Literal::Resource(_) | Literal::Plain => match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| self.resolve_immediate(item, ctx, deps))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                Value::Object(fields) => fields
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), self.resolve_immediate(v, ctx, deps)?)))
                    .collect::<Result<_, ResolveError>>()
                    .map(Value::Object),
                other => Ok(other.clone()),
            },
        }
    }

    fn eval_variable(
        &mut self,
        def: VariableDef<'_>,
        ctx: &ResolveContext<'_>,
        deps: &mut Deps,
    ) -> Result<Value, ResolveError> {
        let binding = ctx.variable(def.name).cloned().unwrap_or(Value::Unresolved);
        if def.args.is_empty() {
            return Ok(binding);
        }

        let parts = self.resolve_args(def.args, ctx, deps)?;
        Ok(match path::into_path(parts) {
            Some(path) => binding.get_path(&path).cloned().unwrap_or(Value::Unresolved),
            None => Value::Unresolved,
        })
    }

    /// Resolve array-form arguments into path parts.
    fn resolve_args(
        &mut self,
        args: &[Value],
        ctx: &ResolveContext<'_>,
        deps: &mut Deps,
    ) -> Result<Vec<PathPart>, ResolveError> {
        args.iter()
            .map(|arg| {
                let value = self.resolve_immediate(arg, ctx, deps)?;
                Ok(PathSegment::from_value(&value)
                    .map(PathPart::Segment)
                    .unwrap_or(PathPart::Unresolved))
            })
            .collect()
    }

    /// The concrete location a reference addresses, if all its parts are known.
    fn expand_ref(
        &mut self,
        def: ReferenceDef<'_>,
        ctx: &ResolveContext<'_>,
        deps: &mut Deps,
    ) -> Result<Option<Path>, ResolveError> {
        let mut parts: Vec<PathPart> = Vec::new();
        if def.is_relative() {
            parts.extend(ctx.parent_location().iter().cloned().map(PathPart::Segment));
        }
        parts.extend(
            path::path_from_string(def.head())
                .into_iter()
                .map(PathPart::Segment),
        );
        parts.extend(self.resolve_args(def.args(), ctx, deps)?);

        Ok(path::into_path(path::abs_path(parts)?))
    }

    /// Resolve a reference to the value it addresses plus that address.
    ///
    /// A container target comes back as a snapshot that may still hold pending
    /// leaves; the node re-reads it on later visits until it is complete.
    fn eval_reference(
        &mut self,
        def: ReferenceDef<'_>,
        ctx: &ResolveContext<'_>,
        deps: &mut Deps,
    ) -> Result<(Value, Option<Path>), ResolveError> {
        let Some(path) = self.expand_ref(def, ctx, deps)? else {
            return Ok((Value::Unresolved, None));
        };

        let value = self.lookup(&path, deps)?;
        if value.is_unresolved() {
            return Ok((Value::Unresolved, None));
        }
        Ok((value, Some(path)))
    }

    fn eval_transform(
        &mut self,
        op: Op,
        args: &[Value],
        ctx: &ResolveContext<'_>,
        deps: &mut Deps,
    ) -> Result<Value, ResolveError> {
        op.check_arity(args.len())?;

        let result = match op {
            Op::Map => {
                let source = self.resolve_immediate(&args[0], ctx, deps)?;
                if !source.is_fully_resolved() {
                    return Ok(Value::Unresolved);
                }
                transform::map(&source, |item| {
                    self.resolve_immediate(&args[1], &ctx.with_lambda(item.clone()), deps)
                })?
            }
            Op::Some => {
                let source = self.resolve_immediate(&args[0], ctx, deps)?;
                let returns = args
                    .get(2)
                    .map(|v| self.resolve_immediate(v, ctx, deps))
                    .transpose()?;
                if !source.is_fully_resolved()
                    || returns.as_ref().is_some_and(|v| !v.is_fully_resolved())
                {
                    return Ok(Value::Unresolved);
                }
                transform::some(&source, &args[1], returns.as_ref(), |item| {
                    self.resolve_immediate(&args[1], &ctx.with_lambda(item.clone()), deps)
                })?
            }
            Op::First => match &args[0] {
                Value::Array(candidates)
                    if !Literal::classify(&args[0], Mode::Sync).is_expression() =>
                {
                    // A candidate still waiting on a fetch must not be skipped.
                    let mut awaiting = false;
                    let found = transform::first(candidates, |candidate| {
                        let mut seen = Deps::new();
                        let value = self.resolve_immediate(candidate, ctx, &mut seen)?;
                        awaiting |= value.is_unresolved() && self.awaits_fetch(&seen);
                        deps.extend(seen);
                        Ok(value)
                    })?;
                    if awaiting { None } else { found }
                }
                expr => match self.resolve_immediate(expr, ctx, deps)? {
                    Value::Unresolved => None,
                    Value::Array(values) => transform::first(&values, |v| Ok(v.clone()))?,
                    other => {
                        warn!(source = ?other, "xf_first candidates are not an array");
                        None
                    }
                },
            },
            _ => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.resolve_immediate(arg, ctx, deps)?);
                }
                if values.iter().any(|v| !v.is_fully_resolved()) {
                    return Ok(Value::Unresolved);
                }
                transform::apply(op, &values)?
            }
        };

        Ok(result.unwrap_or(Value::Unresolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::parse_path;
    use serde_json::json;

    fn resolver_for(doc: &mut Document, vars: &Variables) -> Vec<Value> {
        let mut resolver = Resolver::new(doc, vars, Mode::Sync);
        resolver.resolve_all().unwrap();
        ["/a", "/b"]
            .iter()
            .map(|p| resolver.value_at(&parse_path(p)).unwrap())
            .collect()
    }

    #[test]
    fn test_lookup_resolves_forward_references() {
        let mut doc = Document::from_json(json!({"a": "@/b", "b": ["xf_join", "x", "y"]}));
        let values = resolver_for(&mut doc, &Variables::new());
        assert_eq!(values, vec![Value::from("xy"), Value::from("xy")]);
    }

    #[test]
    fn test_dependencies_are_recorded() {
        let mut doc = Document::from_json(json!({"a": ["xf_join", "@/b", "$v"], "b": "@/c"}));
        let vars = Variables::new();
        Resolver::new(&mut doc, &vars, Mode::Sync).resolve_all().unwrap();

        let a = doc.node_at(&parse_path("a")).unwrap();
        let b = doc.find(&parse_path("b")).unwrap();
        assert_eq!(a.references, vec![b]);
        assert!(!a.is_resolved());
    }

    #[test]
    fn test_cycle_is_reported() {
        let mut doc = Document::from_json(json!({"a": "@/b", "b": ["xf_hoist", "@/a"]}));
        let vars = Variables::new();
        let err = Resolver::new(&mut doc, &vars, Mode::Sync)
            .resolve_all()
            .unwrap_err();
        assert!(matches!(err, ResolveError::Cycle { .. }));
    }

    #[test]
    fn test_pending_collects_unresolved_expressions() {
        let mut doc = Document::from_json(json!({"a": "@/missing", "b": "$nope", "c": 1}));
        let vars = Variables::new();
        let mut resolver = Resolver::new(&mut doc, &vars, Mode::Async);
        resolver.resolve_all().unwrap();
        let pending = resolver.take_pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(doc.find(&parse_path("a")), pending.first().copied());
    }
}
