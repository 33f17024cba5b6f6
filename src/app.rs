//! Compiled workflow application.
//!
//! An [`App`] is the immutable, validated form of a graph: node registry,
//! static edges, routers, join set, schema, and the reducer registry that
//! merges partials at each barrier. Apps are cheap to share behind an
//! `Arc`; each run gets its own state and event bus.

use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::config::RunConfig;
use crate::event_bus::EventBus;
use crate::graphs::RouterEdge;
use crate::node::{Node, NodePartial};
use crate::reducers::{ReducerError, ReducerRegistry};
use crate::runtimes::{GraphRunner, InvocationHandle, RunnerError};
use crate::state::{StateSchema, VersionedState};
use crate::types::NodeKind;
use crate::wire::WireStream;

/// Outcome of applying one barrier.
#[derive(Debug, Default, Clone)]
pub struct BarrierOutcome {
    /// Channels whose versions were bumped, in application order, deduped.
    pub updated_channels: Vec<String>,
}

/// An executable, validated workflow.
pub struct App {
    nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    edges: FxHashMap<NodeKind, Vec<NodeKind>>,
    routers: FxHashMap<NodeKind, RouterEdge>,
    deferred: FxHashSet<NodeKind>,
    schema: StateSchema,
    registry: ReducerRegistry,
    /// Structural predecessors per node: every static edge source plus
    /// every router source with a branch targeting the node.
    predecessors: FxHashMap<NodeKind, Vec<Predecessor>>,
}

/// One structural in-edge, as seen from the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predecessor {
    /// A static edge from `source`.
    Static { source: NodeKind },
    /// A router branch from `source` keyed by `key`.
    Branch { source: NodeKind, key: String },
}

impl Predecessor {
    pub fn source(&self) -> &NodeKind {
        match self {
            Predecessor::Static { source } | Predecessor::Branch { source, .. } => source,
        }
    }
}

impl App {
    pub(crate) fn from_parts(
        nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
        edges: FxHashMap<NodeKind, Vec<NodeKind>>,
        routers: Vec<RouterEdge>,
        deferred: FxHashSet<NodeKind>,
        schema: StateSchema,
    ) -> Self {
        let mut predecessors: FxHashMap<NodeKind, Vec<Predecessor>> = FxHashMap::default();
        for (from, tos) in &edges {
            for to in tos {
                predecessors
                    .entry(to.clone())
                    .or_default()
                    .push(Predecessor::Static {
                        source: from.clone(),
                    });
            }
        }
        for edge in &routers {
            for (key, to) in edge.branches() {
                predecessors
                    .entry(to.clone())
                    .or_default()
                    .push(Predecessor::Branch {
                        source: edge.from().clone(),
                        key: key.clone(),
                    });
            }
        }
        let routers = routers
            .into_iter()
            .map(|edge| (edge.from().clone(), edge))
            .collect();
        Self {
            nodes,
            edges,
            routers,
            deferred,
            schema,
            registry: ReducerRegistry::default(),
            predecessors,
        }
    }

    pub fn node(&self, kind: &NodeKind) -> Option<&Arc<dyn Node>> {
        self.nodes.get(kind)
    }

    pub fn node_kinds(&self) -> impl Iterator<Item = &NodeKind> {
        self.nodes.keys()
    }

    pub fn static_successors(&self, kind: &NodeKind) -> &[NodeKind] {
        self.edges.get(kind).map_or(&[], Vec::as_slice)
    }

    pub fn router_for(&self, kind: &NodeKind) -> Option<&RouterEdge> {
        self.routers.get(kind)
    }

    pub fn is_deferred(&self, kind: &NodeKind) -> bool {
        self.deferred.contains(kind)
    }

    pub fn deferred_nodes(&self) -> impl Iterator<Item = &NodeKind> {
        self.deferred.iter()
    }

    pub fn predecessors_of(&self, kind: &NodeKind) -> &[Predecessor] {
        self.predecessors.get(kind).map_or(&[], Vec::as_slice)
    }

    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    /// Seed a fresh state for this app's schema.
    #[must_use]
    pub fn fresh_state(&self) -> VersionedState {
        VersionedState::from_schema(&self.schema)
    }

    /// Merge completed node partials into state, one at a time, in the
    /// order given (the runner passes completion order).
    #[instrument(skip_all, fields(partials = partials.len()))]
    pub fn apply_barrier(
        &self,
        state: &mut VersionedState,
        partials: &[(NodeKind, NodePartial)],
    ) -> Result<BarrierOutcome, ReducerError> {
        let mut updated = Vec::new();
        for (kind, partial) in partials {
            let keys = self.registry.apply_partial(&self.schema, state, partial)?;
            if !keys.is_empty() {
                debug!(node = %kind, channels = ?keys, "barrier merged channels");
            }
            for key in keys {
                if !updated.contains(&key) {
                    updated.push(key);
                }
            }
        }
        Ok(BarrierOutcome {
            updated_channels: updated,
        })
    }

    /// Run to completion with a default (stdout-sink) event bus.
    pub async fn invoke(
        self: &Arc<Self>,
        initial: VersionedState,
        config: RunConfig,
    ) -> Result<VersionedState, RunnerError> {
        self.invoke_with_bus(initial, config, EventBus::default()).await
    }

    /// Run to completion against a caller-supplied event bus.
    pub async fn invoke_with_bus(
        self: &Arc<Self>,
        initial: VersionedState,
        config: RunConfig,
        bus: EventBus,
    ) -> Result<VersionedState, RunnerError> {
        bus.listen_for_events();
        let mut runner = GraphRunner::new(self.clone(), Arc::new(config), initial, bus.get_sender());
        let result = runner.run_until_complete().await;
        bus.stop_listener().await;
        result
    }

    /// Spawn the run and return a cancellable handle plus the multiplexed
    /// wire stream. Exactly one terminal message ends the stream.
    pub fn invoke_streaming(
        self: &Arc<Self>,
        initial: VersionedState,
        config: RunConfig,
    ) -> (InvocationHandle, WireStream) {
        crate::wire::spawn_streaming_run(self.clone(), initial, config)
    }
}
