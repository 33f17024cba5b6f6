//! `GraphBuilder` implementation for constructing workflow graphs.

use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

use super::edges::{RouterEdge, RouterFn};
use crate::node::Node;
use crate::state::StateSchema;
use crate::types::NodeKind;

/// Fluent builder for workflow graphs.
///
/// Add nodes, static edges, routers, joins, and the state schema, then
/// [`compile`](Self::compile) into an executable [`App`](crate::app::App).
/// `NodeKind::Start` and `NodeKind::End` are virtual endpoints: they appear
/// only in edges, never in the node registry.
///
/// # Examples
///
/// ```
/// use claritas::graphs::{GraphBuilder, RouterFn};
/// use claritas::state::StateSchema;
/// use claritas::types::NodeKind;
/// use std::sync::Arc;
///
/// # struct MyNode;
/// # #[async_trait::async_trait]
/// # impl claritas::node::Node for MyNode {
/// #     async fn run(&self, _: claritas::state::StateSnapshot, _: claritas::node::NodeContext) -> Result<claritas::node::NodePartial, claritas::node::NodeError> {
/// #         Ok(claritas::node::NodePartial::default())
/// #     }
/// # }
/// let route: RouterFn = Arc::new(|snapshot, _| {
///     if snapshot.list("claims").is_empty() { "skip".into() } else { "verify".into() }
/// });
///
/// let app = GraphBuilder::new()
///     .with_schema(StateSchema::builder().list("claims").scalar("report").build())
///     .add_node(NodeKind::from("extract"), MyNode)
///     .add_node(NodeKind::from("verify"), MyNode)
///     .add_node(NodeKind::from("report"), MyNode)
///     .add_edge(NodeKind::Start, NodeKind::from("extract"))
///     .add_router(
///         NodeKind::from("extract"),
///         route,
///         [("verify", "verify"), ("skip", "report")],
///     )
///     .add_edge(NodeKind::from("verify"), NodeKind::from("report"))
///     .add_edge(NodeKind::from("report"), NodeKind::End)
///     .set_deferred(NodeKind::from("report"))
///     .compile()
///     .unwrap();
/// # let _ = app;
/// ```
pub struct GraphBuilder {
    /// Registry of all nodes in the graph, keyed by their identifier.
    pub nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    /// Unconditional edges defining static topology.
    pub edges: FxHashMap<NodeKind, Vec<NodeKind>>,
    /// Routers for conditional, single-branch routing.
    pub routers: Vec<RouterEdge>,
    /// Nodes that join: they run once, after their full predecessor closure
    /// is accounted.
    pub deferred: FxHashSet<NodeKind>,
    /// Channel declarations for the run state.
    pub schema: StateSchema,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    /// Creates a new, empty graph builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: FxHashMap::default(),
            edges: FxHashMap::default(),
            routers: Vec::new(),
            deferred: FxHashSet::default(),
            schema: StateSchema::default(),
        }
    }

    /// Declares the state schema for runs of this graph.
    #[must_use]
    pub fn with_schema(mut self, schema: StateSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Registers a node implementation under an identifier.
    ///
    /// Registering `Start` or `End` is ignored with a warning: they are
    /// virtual and never executed. Re-registering an identifier replaces
    /// the previous implementation with a warning.
    #[must_use]
    pub fn add_node(mut self, id: NodeKind, node: impl Node + 'static) -> Self {
        match id {
            NodeKind::Start | NodeKind::End => {
                tracing::warn!(
                    ?id,
                    "ignoring registration of virtual node kind (Start/End are virtual)"
                );
            }
            _ => {
                if self.nodes.insert(id.clone(), Arc::new(node)).is_some() {
                    tracing::warn!(?id, "node registered twice; replacing previous implementation");
                }
            }
        }
        self
    }

    /// Adds an unconditional edge. When `from` completes, the edge fires
    /// and `to` is considered for the next superstep.
    #[must_use]
    pub fn add_edge(mut self, from: NodeKind, to: NodeKind) -> Self {
        self.edges.entry(from).or_default().push(to);
        self
    }

    /// Adds a router on `from`: after `from` completes, `router` picks one
    /// branch key and the mapped target fires. Unmapped keys abort the run.
    #[must_use]
    pub fn add_router<K, T, I>(mut self, from: NodeKind, router: RouterFn, branches: I) -> Self
    where
        K: Into<String>,
        T: Into<NodeKind>,
        I: IntoIterator<Item = (K, T)>,
    {
        let branches = branches
            .into_iter()
            .map(|(k, t)| (k.into(), t.into()))
            .collect();
        self.routers.push(RouterEdge::new(from, router, branches));
        self
    }

    /// Marks a node as a join: it runs exactly once, only after every
    /// structural predecessor has completed or been ruled out by routing.
    #[must_use]
    pub fn set_deferred(mut self, id: NodeKind) -> Self {
        self.deferred.insert(id);
        self
    }

    /// Nodes registered so far, in no particular order.
    pub fn node_kinds(&self) -> impl Iterator<Item = &NodeKind> {
        self.nodes.keys()
    }

    /// Static edges as `(from, to)` pairs.
    pub fn static_edges(&self) -> impl Iterator<Item = (&NodeKind, &NodeKind)> {
        self.edges
            .iter()
            .flat_map(|(from, tos)| tos.iter().map(move |to| (from, to)))
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        FxHashMap<NodeKind, Arc<dyn Node>>,
        FxHashMap<NodeKind, Vec<NodeKind>>,
        Vec<RouterEdge>,
        FxHashSet<NodeKind>,
        StateSchema,
    ) {
        (self.nodes, self.edges, self.routers, self.deferred, self.schema)
    }
}
