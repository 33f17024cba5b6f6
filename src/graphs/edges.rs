//! Edge types and routers for conditional graph flow.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::config::RunConfig;
use crate::state::StateSnapshot;
use crate::types::NodeKind;

/// Routing function for a conditional edge.
///
/// Evaluated when the source node completes, against the post-barrier
/// snapshot and the frozen run configuration. The returned key selects
/// exactly one branch from the edge's branch map; a key with no mapping is
/// a fatal configuration error that aborts the run.
///
/// # Examples
///
/// ```
/// use claritas::graphs::RouterFn;
/// use std::sync::Arc;
///
/// let after_extraction: RouterFn = Arc::new(|snapshot, config| {
///     if snapshot.list("claims").is_empty() {
///         "no_claims".to_string()
///     } else {
///         config.verification_source.branch_key().to_string()
///     }
/// });
/// ```
pub type RouterFn =
    Arc<dyn Fn(&StateSnapshot, &RunConfig) -> String + Send + Sync + 'static>;

/// A conditional edge: a router plus its branch map.
///
/// Unlike a static edge, only one branch fires per evaluation; the branches
/// not chosen are cancelled for join accounting.
#[derive(Clone)]
pub struct RouterEdge {
    from: NodeKind,
    router: RouterFn,
    branches: FxHashMap<String, NodeKind>,
}

impl RouterEdge {
    pub fn new(
        from: impl Into<NodeKind>,
        router: RouterFn,
        branches: FxHashMap<String, NodeKind>,
    ) -> Self {
        Self {
            from: from.into(),
            router,
            branches,
        }
    }

    pub fn from(&self) -> &NodeKind {
        &self.from
    }

    pub fn router(&self) -> &RouterFn {
        &self.router
    }

    pub fn branches(&self) -> &FxHashMap<String, NodeKind> {
        &self.branches
    }

    /// The target for a branch key, if mapped.
    pub fn target(&self, key: &str) -> Option<&NodeKind> {
        self.branches.get(key)
    }

    /// All targets this edge could ever fire into.
    pub fn targets(&self) -> impl Iterator<Item = &NodeKind> {
        self.branches.values()
    }
}

impl std::fmt::Debug for RouterEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterEdge")
            .field("from", &self.from)
            .field("branches", &self.branches)
            .finish_non_exhaustive()
    }
}
