//! Graph compilation and structural validation.
//!
//! Configuration mistakes are caught here, before a run ever starts: an
//! invalid graph never compiles, so the only routing failure left at
//! runtime is a router returning an unmapped key.

use miette::Diagnostic;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::app::App;
use crate::types::NodeKind;

#[derive(Debug, Error, Diagnostic)]
pub enum GraphCompileError {
    #[error("graph has no registered nodes")]
    #[diagnostic(code(claritas::graphs::empty))]
    EmptyGraph,

    #[error("no entry point: nothing connects from Start")]
    #[diagnostic(
        code(claritas::graphs::no_entry),
        help("add at least one edge or router from NodeKind::Start")
    )]
    NoEntryPoint,

    #[error("edge references unregistered node: {from} -> {to}")]
    #[diagnostic(code(claritas::graphs::unknown_edge_endpoint))]
    UnknownEdgeEndpoint { from: NodeKind, to: NodeKind },

    #[error("router on {from}: branch `{key}` targets unregistered node {to}")]
    #[diagnostic(code(claritas::graphs::unknown_branch_target))]
    UnknownBranchTarget {
        from: NodeKind,
        key: String,
        to: NodeKind,
    },

    #[error("router registered on unknown node {from}")]
    #[diagnostic(code(claritas::graphs::unknown_router_source))]
    UnknownRouterSource { from: NodeKind },

    #[error("multiple routers registered on {from}")]
    #[diagnostic(
        code(claritas::graphs::duplicate_router),
        help("a node may carry at most one router; merge the branch maps")
    )]
    DuplicateRouter { from: NodeKind },

    #[error("deferred node {node} is not registered")]
    #[diagnostic(code(claritas::graphs::deferred_unregistered))]
    DeferredUnregistered { node: NodeKind },

    #[error("deferred node {node} has no incoming edges")]
    #[diagnostic(
        code(claritas::graphs::deferred_unreachable),
        help("a join must have at least one structural predecessor")
    )]
    DeferredUnreachable { node: NodeKind },
}

impl super::builder::GraphBuilder {
    /// Validates the graph and compiles it into an executable [`App`].
    ///
    /// # Errors
    ///
    /// Returns a [`GraphCompileError`] when the topology is unusable:
    /// missing entry point, edges into unregistered nodes, duplicate
    /// routers, or unreachable joins.
    pub fn compile(self) -> Result<App, GraphCompileError> {
        if self.nodes.is_empty() {
            return Err(GraphCompileError::EmptyGraph);
        }

        let registered = |kind: &NodeKind| kind.is_custom() && self.nodes.contains_key(kind);

        for (from, to) in self.static_edges() {
            let from_ok = from.is_start() || registered(from);
            let to_ok = to.is_end() || registered(to);
            if !from_ok || !to_ok {
                return Err(GraphCompileError::UnknownEdgeEndpoint {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        }

        let mut router_sources: FxHashSet<&NodeKind> = FxHashSet::default();
        for edge in &self.routers {
            let from = edge.from();
            if !(from.is_start() || registered(from)) {
                return Err(GraphCompileError::UnknownRouterSource { from: from.clone() });
            }
            if !router_sources.insert(from) {
                return Err(GraphCompileError::DuplicateRouter { from: from.clone() });
            }
            for (key, to) in edge.branches() {
                if !(to.is_end() || registered(to)) {
                    return Err(GraphCompileError::UnknownBranchTarget {
                        from: from.clone(),
                        key: key.clone(),
                        to: to.clone(),
                    });
                }
            }
        }

        for node in &self.deferred {
            if !registered(node) {
                return Err(GraphCompileError::DeferredUnregistered { node: node.clone() });
            }
            let has_in_edge = self
                .static_edges()
                .any(|(_, to)| to == node)
                || self
                    .routers
                    .iter()
                    .any(|edge| edge.targets().any(|t| t == node));
            if !has_in_edge {
                return Err(GraphCompileError::DeferredUnreachable { node: node.clone() });
            }
        }

        let has_entry = self.edges.get(&NodeKind::Start).is_some_and(|v| !v.is_empty())
            || self.routers.iter().any(|edge| edge.from().is_start());
        if !has_entry {
            return Err(GraphCompileError::NoEntryPoint);
        }

        let (nodes, edges, routers, deferred, schema) = self.into_parts();
        Ok(App::from_parts(nodes, edges, routers, deferred, schema))
    }
}
