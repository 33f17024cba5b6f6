//! Superstep execution of a compiled [`App`].
//!
//! Each superstep runs every frontier node concurrently against the same
//! snapshot, merges their partials at a barrier in completion order, then
//! fires edges to build the next frontier:
//!
//! - a static edge fires when its source completes;
//! - a router fires exactly one branch, chosen against the post-barrier
//!   snapshot; an unmapped branch key aborts the run;
//! - a join (deferred node) is never scheduled by a firing edge directly.
//!   It runs once, in the first superstep where every structural in-edge
//!   is accounted: fired, cancelled by a router choosing elsewhere, or
//!   cancelled because its source can no longer run at all.
//!
//! Step failures are recoverable for ordinary nodes (the run continues
//! with the step's declared empty default and an entry in the errors
//! channel) and fatal for joins.

use futures_util::stream::{FuturesUnordered, StreamExt};
use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::app::{App, Predecessor};
use crate::channels::errors::{CauseChain, ErrorEvent};
use crate::config::RunConfig;
use crate::event_bus::Event;
use crate::node::{NodeContext, NodeError, NodePartial};
use crate::reducers::ReducerError;
use crate::state::{StateSnapshot, VersionedState};
use crate::types::NodeKind;

#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    #[error("superstep limit exceeded ({limit})")]
    #[diagnostic(
        code(claritas::runner::step_limit),
        help("raise RunConfig::max_supersteps or check the graph for an unbounded cycle")
    )]
    StepLimitExceeded { limit: u64 },

    #[error("router on {from} returned unmapped branch key `{key}`")]
    #[diagnostic(
        code(claritas::runner::unknown_branch),
        help("every key a router can return must appear in its branch map")
    )]
    UnknownBranch { from: NodeKind, key: String },

    #[error("join node {node} failed with no recoverable output")]
    #[diagnostic(code(claritas::runner::join_failed))]
    JoinFailed {
        node: NodeKind,
        #[source]
        source: NodeError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Reducer(#[from] ReducerError),

    #[error("run task failed to join: {0}")]
    #[diagnostic(code(claritas::runner::task_join))]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Drives one run of an [`App`] to completion.
pub struct GraphRunner {
    app: Arc<App>,
    config: Arc<RunConfig>,
    state: VersionedState,
    step: u64,
    frontier: Vec<NodeKind>,
    completed: FxHashSet<NodeKind>,
    /// Last branch decision per router source.
    decided: FxHashMap<NodeKind, NodeKind>,
    event_sender: flume::Sender<Event>,
}

impl GraphRunner {
    pub fn new(
        app: Arc<App>,
        config: Arc<RunConfig>,
        initial: VersionedState,
        event_sender: flume::Sender<Event>,
    ) -> Self {
        Self {
            app,
            config,
            state: initial,
            step: 0,
            frontier: Vec::new(),
            completed: FxHashSet::default(),
            decided: FxHashMap::default(),
            event_sender,
        }
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    /// Run supersteps until the frontier empties and no join is ready.
    #[instrument(skip(self), fields(run = %self.config.run_id))]
    pub async fn run_until_complete(&mut self) -> Result<VersionedState, RunnerError> {
        let seed_snapshot = self.state.snapshot();
        let seeded = self.fire_outgoing(&NodeKind::Start, &seed_snapshot)?;
        self.completed.insert(NodeKind::Start);
        self.frontier = dedup(seeded);
        self.arm_ready_joins();

        while !self.frontier.is_empty() {
            self.step += 1;
            if self.step > self.config.max_supersteps {
                return Err(RunnerError::StepLimitExceeded {
                    limit: self.config.max_supersteps,
                });
            }
            self.run_one_superstep().await?;
        }
        Ok(std::mem::take(&mut self.state))
    }

    #[instrument(skip(self), fields(step = self.step, frontier = ?self.frontier))]
    async fn run_one_superstep(&mut self) -> Result<(), RunnerError> {
        let outputs = self.schedule_step().await?;
        self.app.apply_barrier(&mut self.state, &outputs)?;
        self.emit_step_updates(&outputs);
        self.compute_next_frontier(&outputs)?;
        Ok(())
    }

    /// Run every frontier node concurrently against one snapshot and
    /// collect partials in completion order.
    async fn schedule_step(&mut self) -> Result<Vec<(NodeKind, NodePartial)>, RunnerError> {
        let snapshot = self.state.snapshot();
        let mut tasks = FuturesUnordered::new();
        for kind in &self.frontier {
            let Some(node) = self.app.node(kind).cloned() else {
                warn!(node = %kind, "frontier references unregistered node; skipping");
                continue;
            };
            let ctx = NodeContext {
                node_id: kind.to_string(),
                step: self.step,
                config: self.config.clone(),
                event_sender: self.event_sender.clone(),
            };
            let kind = kind.clone();
            let snapshot = snapshot.clone();
            tasks.push(async move {
                let result = node.run(snapshot, ctx).await;
                (kind, result)
            });
        }

        let mut outputs = Vec::with_capacity(self.frontier.len());
        while let Some((kind, result)) = tasks.next().await {
            match result {
                Ok(partial) => outputs.push((kind, partial)),
                Err(err) if self.app.is_deferred(&kind) => {
                    return Err(RunnerError::JoinFailed {
                        node: kind,
                        source: err,
                    });
                }
                Err(err) => {
                    warn!(node = %kind, error = %err, "step failed; continuing with empty default");
                    let event = ErrorEvent::node(
                        kind.to_string(),
                        self.step,
                        CauseChain::msg(err.to_string()),
                    )
                    .with_tag("recovered");
                    outputs.push((kind, NodePartial::default().with_errors(vec![event])));
                }
            }
        }
        Ok(outputs)
    }

    /// Forward the first client-visible event per completed step.
    fn emit_step_updates(&self, outputs: &[(NodeKind, NodePartial)]) {
        for (kind, partial) in outputs {
            let mut events = partial.events.iter();
            if let Some(payload) = events.next() {
                let remaining = events.count();
                if remaining > 0 {
                    // First event only; the wire contract carries one update
                    // per step invocation.
                    debug!(node = %kind, dropped = remaining, "dropping extra step events");
                }
                let _ = self
                    .event_sender
                    .send(Event::step_update(kind.to_string(), payload.clone()));
            }
        }
    }

    /// Fire edges for every node that ran, then arm any join whose full
    /// predecessor closure is now accounted.
    fn compute_next_frontier(
        &mut self,
        outputs: &[(NodeKind, NodePartial)],
    ) -> Result<(), RunnerError> {
        let snapshot = self.state.snapshot();
        for (kind, _) in outputs {
            self.completed.insert(kind.clone());
        }
        let mut next = Vec::new();
        for (kind, _) in outputs {
            next.extend(self.fire_outgoing(kind, &snapshot)?);
        }
        self.frontier = dedup(next);
        self.arm_ready_joins();
        Ok(())
    }

    /// Fire `source`'s static edges and evaluate its router, if any.
    /// Returns the non-virtual, non-join targets to schedule; records the
    /// router decision for join accounting.
    fn fire_outgoing(
        &mut self,
        source: &NodeKind,
        snapshot: &StateSnapshot,
    ) -> Result<Vec<NodeKind>, RunnerError> {
        let mut fired = Vec::new();
        for to in self.app.static_successors(source) {
            if to.is_end() || self.app.is_deferred(to) {
                continue;
            }
            fired.push(to.clone());
        }
        if let Some(edge) = self.app.router_for(source) {
            let key = (edge.router())(snapshot, &self.config);
            let target = edge
                .target(&key)
                .ok_or_else(|| RunnerError::UnknownBranch {
                    from: source.clone(),
                    key: key.clone(),
                })?
                .clone();
            debug!(from = %source, %key, to = %target, "router decided");
            self.decided.insert(source.clone(), target.clone());
            if !target.is_end() && !self.app.is_deferred(&target) {
                fired.push(target);
            }
        }
        Ok(fired)
    }

    /// Append every ready join to the frontier.
    ///
    /// A join is ready when each structural in-edge is accounted and at
    /// least one actually fired. An in-edge is accounted when its source
    /// completed (fired, or cancelled by a router that chose elsewhere) or
    /// when its source can no longer run at all (its branch was never
    /// chosen), which counts as vacuously complete.
    fn arm_ready_joins(&mut self) {
        let live = self.live_set();
        let mut armed = Vec::new();
        for join in self.app.deferred_nodes() {
            if self.completed.contains(join) || self.frontier.contains(join) {
                continue;
            }
            let mut any_fired = false;
            let mut all_accounted = true;
            for pred in self.app.predecessors_of(join) {
                let source = pred.source();
                let settled =
                    self.completed.contains(source) && !self.frontier.contains(source);
                let accounted = if settled {
                    match pred {
                        Predecessor::Static { .. } => {
                            any_fired = true;
                            true
                        }
                        Predecessor::Branch { .. } => match self.decided.get(source) {
                            Some(chosen) if chosen == join => {
                                any_fired = true;
                                true
                            }
                            Some(_) => true,
                            None => false,
                        },
                    }
                } else if self.frontier.contains(source) || live.contains(source) {
                    false
                } else {
                    // Source is unreachable: its branch was never chosen.
                    true
                };
                if !accounted {
                    all_accounted = false;
                    break;
                }
            }
            if all_accounted && any_fired {
                debug!(join = %join, "join predecessors accounted; scheduling");
                armed.push(join.clone());
            }
        }
        for join in armed {
            if !self.frontier.contains(&join) {
                self.frontier.push(join);
            }
        }
    }

    /// Every node that may still run: closure from Start following static
    /// edges always, all branches of routers whose source has not settled,
    /// and only the chosen branch of settled routers.
    fn live_set(&self) -> FxHashSet<NodeKind> {
        let mut seen: FxHashSet<NodeKind> = FxHashSet::default();
        let mut queue: VecDeque<NodeKind> = VecDeque::new();
        queue.push_back(NodeKind::Start);
        seen.insert(NodeKind::Start);
        while let Some(node) = queue.pop_front() {
            let mut push = |target: &NodeKind, seen: &mut FxHashSet<NodeKind>,
                            queue: &mut VecDeque<NodeKind>| {
                if !target.is_end() && seen.insert(target.clone()) {
                    queue.push_back(target.clone());
                }
            };
            for to in self.app.static_successors(&node) {
                push(to, &mut seen, &mut queue);
            }
            if let Some(edge) = self.app.router_for(&node) {
                let settled =
                    self.completed.contains(&node) && !self.frontier.contains(&node);
                if settled {
                    if let Some(chosen) = self.decided.get(&node) {
                        push(chosen, &mut seen, &mut queue);
                    }
                } else {
                    for to in edge.targets() {
                        push(to, &mut seen, &mut queue);
                    }
                }
            }
        }
        seen
    }
}

fn dedup(kinds: Vec<NodeKind>) -> Vec<NodeKind> {
    let mut seen = FxHashSet::default();
    kinds
        .into_iter()
        .filter(|k| seen.insert(k.clone()))
        .collect()
}
