//! Graph definition and compilation.
//!
//! The entry point is [`GraphBuilder`]: register nodes, wire static edges
//! and routers, mark joins, declare the state schema, and compile into an
//! [`App`](crate::app::App). Compilation validates the topology so that
//! configuration errors surface before any run starts.
//!
//! # Core concepts
//!
//! - **Nodes**: units of work implementing [`Node`](crate::node::Node)
//! - **Static edges**: fire whenever the source completes
//! - **Routers**: pick exactly one branch from a branch map at runtime
//! - **Joins** (deferred nodes): run once, after every structural
//!   predecessor is accounted, counting unchosen branches as complete
//! - **Virtual endpoints**: `NodeKind::Start` / `NodeKind::End`

mod builder;
mod compilation;
mod edges;

pub use builder::GraphBuilder;
pub use compilation::GraphCompileError;
pub use edges::{RouterEdge, RouterFn};
