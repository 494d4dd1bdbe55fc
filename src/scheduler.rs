//! Cooperative task runner for asynchronous resolution.
//!
//! Every reference, transform or resource node left unresolved by the
//! synchronous pass becomes a task. A task is ready once every node it depends
//! on has finished; ready resources start their fetch, other ready tasks are
//! evaluated again. Fetches run concurrently on a [`FuturesUnordered`] and the
//! document is only touched between polls.

use futures::stream::{FuturesUnordered, StreamExt};
use indexmap::IndexMap;
use tracing::debug;

use crate::{
    error::{FetchError, ResolveError},
    fetch::{FetchRequest, Fetcher},
    node::{CellId, NodeKind},
    resolver::Resolver,
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Waiting,
    InFlight,
    Done,
}

struct Tasks {
    states: IndexMap<CellId, TaskState>,
}

impl Tasks {
    fn register(&mut self, ids: impl IntoIterator<Item = CellId>) {
        for id in ids {
            self.states.entry(id).or_insert_with(|| {
                debug!(cell = id.index(), "task registered");
                TaskState::Waiting
            });
        }
    }

    fn is_done(&self, id: CellId) -> bool {
        self.states.get(&id).is_none_or(|s| *s == TaskState::Done)
    }

    fn set(&mut self, id: CellId, state: TaskState) {
        self.states.insert(id, state);
    }

    /// Waiting tasks whose dependencies have all finished.
    fn ready(&self, resolver: &Resolver<'_, '_>) -> Vec<CellId> {
        self.states
            .iter()
            .filter(|(_, state)| **state == TaskState::Waiting)
            .map(|(id, _)| *id)
            .filter(|id| self.deps_done(resolver, *id))
            .collect()
    }

    fn deps_done(&self, resolver: &Resolver<'_, '_>, id: CellId) -> bool {
        resolver
            .document()
            .node(id)
            .is_none_or(|node| node.references.iter().all(|dep| self.is_done(*dep)))
    }
}

async fn fetch_task<F: Fetcher>(
    fetcher: &F,
    id: CellId,
    request: FetchRequest,
) -> (CellId, Result<Value, FetchError>) {
    (id, fetcher.fetch(request).await)
}

/// Drive every task registered on `resolver` to quiescence.
///
/// Tasks that can never become ready, such as those in a dependency cycle, are
/// left pending. A failed fetch aborts the run.
pub(crate) async fn run<F: Fetcher>(
    resolver: &mut Resolver<'_, '_>,
    fetcher: Option<&F>,
) -> Result<(), ResolveError> {
    let mut tasks = Tasks {
        states: IndexMap::new(),
    };
    tasks.register(resolver.take_pending());

    let mut in_flight = FuturesUnordered::new();
    let mut wave = 0usize;

    loop {
        let ready = tasks.ready(resolver);

        if !ready.is_empty() {
            wave += 1;
            debug!(wave, ready = ready.len(), in_flight = in_flight.len(), "scheduler wave");

            for id in ready {
                match step(resolver, &mut tasks, id, fetcher)? {
                    Step::Done => tasks.set(id, TaskState::Done),
                    Step::Wait => tasks.set(id, TaskState::Waiting),
                    Step::Fetch(fetcher, request) => {
                        debug!(method = %request.method, address = %request.address, "fetching resource");
                        in_flight.push(fetch_task(fetcher, id, request));
                        tasks.set(id, TaskState::InFlight);
                    }
                }
            }
            continue;
        }

        let Some((id, response)) = in_flight.next().await else {
            break;
        };
        resolver.complete_fetch(id, response?);
        tasks.set(id, TaskState::Done);
    }

    let stalled = tasks
        .states
        .values()
        .filter(|s| **s == TaskState::Waiting)
        .count();
    debug!(waves = wave, stalled, "scheduler idle");
    Ok(())
}

enum Step<'f, F> {
    Done,
    Wait,
    Fetch(&'f F, FetchRequest),
}

/// Advance one ready task.
fn step<'f, F: Fetcher>(
    resolver: &mut Resolver<'_, '_>,
    tasks: &mut Tasks,
    id: CellId,
    fetcher: Option<&'f F>,
) -> Result<Step<'f, F>, ResolveError> {
    let Some(node) = resolver.document().node(id) else {
        return Ok(Step::Done);
    };
    if node.is_complete() {
        return Ok(Step::Done);
    }

    if matches!(node.kind, NodeKind::Resource { .. }) {
        let request = resolver.resource_request(id)?;
        tasks.register(resolver.take_pending());
        return Ok(match (request, fetcher) {
            (Some(request), Some(fetcher)) => Step::Fetch(fetcher, request),
            (Some(_), None) => Step::Done,
            (None, _) if tasks.deps_done(resolver, id) => Step::Done,
            (None, _) => Step::Wait,
        });
    }

    resolver.evaluate_node(id)?;
    tasks.register(resolver.take_pending());

    let complete = resolver.document().node(id).is_some_and(|n| n.is_complete());
    if complete || tasks.deps_done(resolver, id) {
        Ok(Step::Done)
    } else {
        Ok(Step::Wait)
    }
}
